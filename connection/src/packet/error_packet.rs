use std::fmt;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use common::err::SResult;

use crate::bytes::{read_fixed_string, read_rest_string};

/// ERR_Packet, header 0xff 已经被调用方剥离
#[derive(Debug)]
pub struct ErrorPacket {
    pub error_code: u16,
    pub sql_state: String,
    pub error_message: String,
}

impl ErrorPacket {
    pub fn parse(packet: &[u8]) -> SResult<Self> {
        let mut cursor = Cursor::new(packet);

        let error_code = cursor.read_u16::<LittleEndian>()?;

        // protocol 41 附带 '#' + 5 字节 sql state
        let mut sql_state = String::new();
        if !packet[2..].is_empty() && packet[2] == b'#' {
            cursor.read_u8()?;
            sql_state = read_fixed_string(&mut cursor, 5)?;
        }

        let error_message = read_rest_string(&mut cursor)?;

        Ok(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}

impl fmt::Display for ErrorPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sql_state.is_empty() {
            return write!(f, "({}) {}", self.error_code, self.error_message);
        }
        write!(
            f,
            "({}, {}) {}",
            self.error_code, self.sql_state, self.error_message
        )
    }
}
