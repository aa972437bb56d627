use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use common::err::SResult;

use crate::bytes::{read_fixed_string, read_null_term_string};

/// 初始握手包 (HandshakeV10)
#[derive(Debug)]
pub struct HandshakePacket {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub server_capabilities: u64,
    pub server_collation: u8,
    pub status_flags: u16,

    /// auth-plugin-data 两段拼接后的 scramble
    pub scramble: String,
    pub auth_plugin_name: String,
}

impl HandshakePacket {
    pub fn parse(packet: &[u8]) -> SResult<Self> {
        let mut cursor = Cursor::new(packet);

        let protocol_version = cursor.read_u8()?;
        let server_version = read_null_term_string(&mut cursor)?;
        let connection_id = cursor.read_u32::<LittleEndian>()?;

        let scramble_part1 = read_fixed_string(&mut cursor, 8)?;
        // filler
        cursor.read_u8()?;

        let capabilities_low = cursor.read_u16::<LittleEndian>()? as u64;
        let server_collation = cursor.read_u8()?;
        let status_flags = cursor.read_u16::<LittleEndian>()?;
        let capabilities_high = cursor.read_u16::<LittleEndian>()? as u64;
        let server_capabilities = capabilities_low | (capabilities_high << 16);

        let auth_plugin_data_len = cursor.read_u8()?;

        // reserved
        let mut reserved = [0u8; 10];
        cursor.read_exact(&mut reserved)?;

        // 第二段至少13字节, 含结尾的 0x00
        let part2_len = std::cmp::max(13, auth_plugin_data_len.saturating_sub(8)) as usize;
        let mut part2 = vec![0u8; part2_len];
        cursor.read_exact(&mut part2)?;
        while part2.last() == Some(&0u8) {
            part2.pop();
        }
        let scramble_part2 = String::from_utf8(part2)?;

        let auth_plugin_name = read_null_term_string(&mut cursor)?;

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            server_capabilities,
            server_collation,
            status_flags,
            scramble: format!("{}{}", scramble_part1, scramble_part2),
            auth_plugin_name,
        })
    }
}
