use std::io::Cursor;

use common::err::SResult;

use crate::bytes::read_len_enc_str_allow_null;

/// 文本协议的一行数据, cell 为 None 表示 NULL
#[derive(Debug)]
pub struct ResultSetRowPacket {
    pub cells: Vec<Option<String>>,
}

impl ResultSetRowPacket {
    pub fn parse(packet: &[u8]) -> SResult<Self> {
        let mut cursor = Cursor::new(packet);

        let len = cursor.get_ref().len() as u64;
        let mut cells = Vec::new();

        while cursor.position() < len {
            cells.push(read_len_enc_str_allow_null(&mut cursor)?);
        }

        Ok(Self { cells })
    }
}

#[cfg(test)]
mod test {
    use crate::packet::result_set_row_packet::ResultSetRowPacket;

    #[test]
    fn test_parse() {
        // "id" 值 1, name 为 NULL, email 为 "a@b"
        let packet: Vec<u8> = vec![0x01, b'1', 0xfb, 0x03, b'a', b'@', b'b'];
        let row = ResultSetRowPacket::parse(&packet).unwrap();

        assert_eq!(row.cells.len(), 3);
        assert_eq!(row.cells[0].as_deref(), Some("1"));
        assert_eq!(row.cells[1], None);
        assert_eq!(row.cells[2].as_deref(), Some("a@b"));
    }
}
