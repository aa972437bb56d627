use std::io::Cursor;

use common::err::SResult;

use crate::bytes::{read_null_term_string, read_rest_string};

/// AuthSwitchRequest, header 0xfe 已经被调用方剥离
#[derive(Debug)]
pub struct AuthPluginSwitchPacket {
    pub auth_plugin_name: String,
    pub auth_plugin_data: String,
}

impl AuthPluginSwitchPacket {
    pub fn parse(packet: &[u8]) -> SResult<Self> {
        let mut cursor = Cursor::new(packet);

        let auth_plugin_name = read_null_term_string(&mut cursor)?;
        // scramble 数据到包尾, 末尾的 0x00 不属于数据
        let mut auth_plugin_data = read_rest_string(&mut cursor)?;
        while auth_plugin_data.ends_with('\0') {
            auth_plugin_data.pop();
        }

        Ok(Self {
            auth_plugin_name,
            auth_plugin_data,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::packet::auth_switch_packet::AuthPluginSwitchPacket;

    #[test]
    fn test_parse() {
        let mut packet = b"mysql_native_password\0".to_vec();
        packet.extend_from_slice(b"12345678901234567890\0");

        let switch = AuthPluginSwitchPacket::parse(&packet).unwrap();
        assert_eq!(switch.auth_plugin_name, "mysql_native_password");
        assert_eq!(switch.auth_plugin_data, "12345678901234567890");
    }
}
