use common::err::schema_error::SchemaError;
use common::err::SResult;

use crate::packet::error_packet::ErrorPacket;
use crate::packet::response_type::ResponseType;

pub mod auth_switch_packet;
pub mod end_of_file_packet;
pub mod error_packet;
pub mod handshake_packet;
pub mod ok_packet;
pub mod response_type;
pub mod result_set_column_packet;
pub mod result_set_row_packet;

/// 检查收到的包是否为 err 包, 是则转换为错误
pub fn check_error_packet(packet: &[u8], message: &str) -> SResult<()> {
    if packet.is_empty() {
        return Err(SchemaError::ConnectionError(format!(
            "{} Empty packet.",
            message
        )));
    }

    if packet[0] == ResponseType::ERROR {
        let error = ErrorPacket::parse(&packet[1..])?;
        let message = format!("{} {}", message, error);
        return Err(SchemaError::ConnectionError(message));
    }

    return Ok(());
}
