use openssl::rsa::{Padding, Rsa};
use tracing::{debug, instrument};

use common::err::schema_error::SchemaError;
use common::err::SResult;
use common::row::row_string::RowString;

use crate::bytes::xor;
use crate::commands::auth_plugin_switch_command::AuthPluginSwitchCommand;
use crate::commands::authenticate_command::AuthenticateCommand;
use crate::commands::query_command::QueryCommand;
use crate::commands::ssl_request_command::SslRequestCommand;
use crate::conn::connection_options::ConnectionOptions;
use crate::conn::packet_channel::PacketChannel;
use crate::conn::query_result;
use crate::conn::query_result::StreamQueryResult;
use crate::conn::ssl_mode::SslMode;
use crate::declar::auth_plugin_names::AuthPlugin;
use crate::declar::capability_flags::CapabilityFlags;
use crate::declar::status_flags::StatusFlags;
use crate::declar::{auth_plugin_names, capability_flags, status_flags};
use crate::packet::auth_switch_packet::AuthPluginSwitchPacket;
use crate::packet::check_error_packet;
use crate::packet::error_packet::ErrorPacket;
use crate::packet::handshake_packet::HandshakePacket;
use crate::packet::ok_packet::OkPacket;
use crate::packet::response_type::ResponseType;
use crate::{NULL_TERMINATOR, UTF8_MB4_GENERAL_CI};

/// 工具链使用的数据库连接能力。
/// schema 读取、DDL 执行、流式导出都建立在这四个原语上。
pub trait IConnection {
    fn try_connect(&mut self) -> SResult<bool>;

    /// 执行不关心结果集的语句, 返回 affected rows
    fn exec(&mut self, sql: String) -> SResult<u64>;

    /// 执行查询, 结果集全部读入内存
    fn query(&mut self, sql: String) -> SResult<Vec<RowString>>;

    /// 获得流式的查询结果, 逐行读取, 内存占用有界
    fn query_stream(&mut self, sql: String) -> SResult<StreamQueryResult<'_>>;

    /// 连接方言的字符串转义, 不含首尾引号
    fn escape_string(&self, value: &str) -> String;

    /// 最近一次服务端报错
    fn last_error(&self) -> Option<String>;
}

#[derive(Debug)]
pub struct Connection {
    pub options: ConnectionOptions,

    channel: Option<PacketChannel>,

    // 连接是否关闭
    is_closed: bool,

    session: Session,

    last_error: Option<String>,
}

#[derive(Debug)]
struct Session {
    // 服务能力flag
    capability_flags: CapabilityFlags,
    // 连接id
    connection_id: u32,
    // 服务器状态, 从server返回的packet中获取
    status_flags: StatusFlags,

    character_set: u8,

    server_version: String,
}

impl Session {
    pub fn default() -> Self {
        Session {
            capability_flags: CapabilityFlags::empty(),
            connection_id: 0,
            status_flags: StatusFlags::empty(),
            character_set: 0,
            server_version: String::default(),
        }
    }
}

impl IConnection for Connection {
    #[instrument(skip(self))]
    fn try_connect(&mut self) -> SResult<bool> {
        if self.is_closed {
            let mut channel = PacketChannel::new(&self.options)?;
            // 处理握手
            channel = Connection::do_handshake(self, channel)?;
            self.channel = Some(channel);

            self.is_closed = false;
        }

        Ok(true)
    }

    fn exec(&mut self, sql: String) -> SResult<u64> {
        debug!("exec: {}", sql);

        let command = QueryCommand::new(sql.clone());
        self.write_packet(&command.serialize()?, 0)?;

        let (packet, _) = self.read_packet()?;
        match packet[0] {
            ResponseType::ERROR => Err(self.statement_error(&sql, &packet)),
            ResponseType::OK => {
                let ok = OkPacket::parse(&packet)?;
                self.session.status_flags = ok.status_flags;
                Ok(ok.affected_rows)
            }
            _ => {
                // 意外返回了结果集, 读完后丢弃
                let drained = query_result::drain_result_set(self, &packet)?;
                debug!("exec dropped a result set of {} rows", drained);
                Ok(0)
            }
        }
    }

    #[instrument(skip(self))]
    fn query(&mut self, sql: String) -> SResult<Vec<RowString>> {
        let mut stream = self.query_stream(sql)?;

        let mut result = Vec::new();
        while let Some(row) = stream.next() {
            result.push(row?);
        }

        Ok(result)
    }

    fn query_stream<'a>(&'a mut self, sql: String) -> SResult<StreamQueryResult<'a>> {
        debug!("query: {}", sql);

        let command = QueryCommand::new(sql.clone());
        self.write_packet(&command.serialize()?, 0)?;

        let (packet, _) = self.read_packet()?;
        match packet[0] {
            ResponseType::ERROR => Err(self.statement_error(&sql, &packet)),
            ResponseType::OK => {
                let ok = OkPacket::parse(&packet)?;
                self.session.status_flags = ok.status_flags;
                Ok(StreamQueryResult::empty())
            }
            _ => {
                // 获取column set
                let columns = query_result::read_column_set(self, &packet)?;
                Ok(StreamQueryResult::new_wire(self, columns.into()))
            }
        }
    }

    fn escape_string(&self, value: &str) -> String {
        if self
            .session
            .status_flags
            .contains(status_flags::SERVER_STATUS_NO_BACKSLASH_ESCAPES)
        {
            return value.replace('\'', "''");
        }

        escape_with_backslash(value)
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

/// MySQL 的 backslash 转义。 \ ' " NUL NL CR ctrl-Z
pub fn escape_with_backslash(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl Connection {
    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            options,
            channel: None,
            is_closed: true,
            session: Session::default(),
            last_error: None,
        }
    }

    pub fn close(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            let _ = channel.shutdown();
        }
        self.channel = None;
        self.is_closed = true;
        self.session = Session::default();
    }

    pub fn server_version(&self) -> &str {
        &self.session.server_version
    }

    /// 进行mysql握手, ssl的情况channel会发生变更
    fn do_handshake(&mut self, mut channel: PacketChannel) -> SResult<PacketChannel> {
        // 获取server发送的第一个握手包
        let (packet, seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Initial handshake error.")?;
        let handshake = HandshakePacket::parse(&packet)?;

        let mut seq_num = seq_num;
        // 协议版本号0x0A/10
        if handshake.protocol_version != 10u8 {
            return Err(SchemaError::ConnectionError(format!(
                "Unsupported protocol version. {}",
                handshake.protocol_version
            )));
        }

        let capability_flags = CapabilityFlags::new(handshake.server_capabilities);
        // 必须是CLIENT_PROTOCOL_41
        if !capability_flags.contains(capability_flags::CLIENT_PROTOCOL_41) {
            return Err(SchemaError::ConnectionError(format!(
                "Protocol41 not set. {}",
                handshake.protocol_version
            )));
        }

        // 记录握手包信息
        self.handle_handshake(&handshake);

        // 如果是ssl连接，发送ssl包
        if self.options.ssl_mode != SslMode::Disabled {
            // 检查服务器是否支持ssl
            let ssl_available = capability_flags.contains(capability_flags::CLIENT_SSL);
            if !ssl_available && self.options.ssl_mode as u8 >= SslMode::Require as u8 {
                return Err(SchemaError::ConnectionError(
                    "The server doesn't support SSL encryption".to_string(),
                ));
            }
            if ssl_available {
                let ssl_command = SslRequestCommand::new(UTF8_MB4_GENERAL_CI);
                seq_num += 1;
                channel.write_packet(&ssl_command.serialize()?, seq_num)?;
                // 切换到ssl
                channel = channel.upgrade_to_ssl(&self.options)?;
            }
        }

        // 发送握手结果并完成认证
        let auth_plugin = Connection::get_auth_plugin(&handshake.auth_plugin_name)?;
        let auth_command =
            AuthenticateCommand::new(&self.options, &handshake, auth_plugin, UTF8_MB4_GENERAL_CI);
        seq_num += 1;
        channel.write_packet(&auth_command.serialize()?, seq_num)?;

        let (packet, seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Authentication error.")?;
        match packet[0] {
            ResponseType::OK => return Ok(channel),
            ResponseType::AUTH_PLUGIN_SWITCH => {
                let switch_packet = AuthPluginSwitchPacket::parse(&packet[1..])?;
                Connection::handle_auth_plugin_switch(
                    &mut channel,
                    switch_packet,
                    &self.options,
                    seq_num + 1,
                )?;
                Ok(channel)
            }
            _ => {
                Connection::authenticate_sha_256(
                    &mut channel,
                    &packet,
                    &handshake.scramble,
                    &self.options.password,
                    seq_num + 1,
                )?;
                Ok(channel)
            }
        }
    }

    fn handle_auth_plugin_switch(
        channel: &mut PacketChannel,
        switch_packet: AuthPluginSwitchPacket,
        options: &ConnectionOptions,
        seq_num: u8,
    ) -> SResult<()> {
        let auth_plugin = Connection::get_auth_plugin(&switch_packet.auth_plugin_name)?;
        let auth_switch_command = AuthPluginSwitchCommand::new(
            &options.password,
            &switch_packet.auth_plugin_data,
            &switch_packet.auth_plugin_name,
            auth_plugin,
        );
        channel.write_packet(&auth_switch_command.serialize()?, seq_num)?;
        let (packet, seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Authentication switch error.")?;

        if switch_packet.auth_plugin_name == auth_plugin_names::CACHING_SHA2_PASSWORD {
            Connection::authenticate_sha_256(
                channel,
                &packet,
                &switch_packet.auth_plugin_data,
                &options.password,
                seq_num + 1,
            )?;
        }
        Ok(())
    }

    fn authenticate_sha_256(
        channel: &mut PacketChannel,
        packet: &[u8],
        scramble: &String,
        password: &String,
        seq_num: u8,
    ) -> SResult<()> {
        // See https://mariadb.com/kb/en/caching_sha2_password-authentication-plugin/
        // Success authentication.
        if packet[0] == 0x01 && packet[1] == 0x03 {
            return Ok(());
        }

        let mut password = password.as_bytes().to_vec();
        password.push(NULL_TERMINATOR);

        // Send clear password if ssl is used.
        if channel.is_ssl() {
            channel.write_packet(&password, seq_num)?;
            let (packet, _seq_num) = channel.read_packet()?;
            check_error_packet(&packet, "Sending clear password error.")?;
            return Ok(());
        }

        // Request public key.
        channel.write_packet(&[0x02], seq_num)?;
        let (packet, seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Requesting caching_sha2_password public key.")?;

        // Extract public key.
        let public_key = &packet[1..];
        let encrypted_password = xor(&password, &scramble.as_bytes());

        let rsa = Rsa::public_key_from_pem(public_key).map_err(|err| {
            SchemaError::ConnectionError(format!("Can not load public key. err:{{{err}}}"))
        })?;
        let mut encrypted_body = vec![0u8; rsa.size() as usize];
        rsa.public_encrypt(&encrypted_password, &mut encrypted_body, Padding::PKCS1_OAEP)
            .map_err(|err| {
                SchemaError::ConnectionError(format!("Password encrypt error. err:{{{err}}}"))
            })?;

        channel.write_packet(&encrypted_body, seq_num + 1)?;

        let (packet, _seq_num) = channel.read_packet()?;
        check_error_packet(&packet, "Authentication error.")?;
        Ok(())
    }

    fn get_auth_plugin(auth_plugin_name: &String) -> SResult<AuthPlugin> {
        if auth_plugin_name == auth_plugin_names::MY_SQL_NATIVE_PASSWORD {
            return Ok(AuthPlugin::MySqlNativePassword);
        }
        if auth_plugin_name == auth_plugin_names::CACHING_SHA2_PASSWORD {
            return Ok(AuthPlugin::CachingSha2Password);
        }

        let message = format!("{} auth plugin is not supported.", auth_plugin_name);
        Err(SchemaError::ConnectionError(message))
    }

    fn write_packet(&mut self, packet: &[u8], seq_num: u8) -> SResult<()> {
        let channel = self.channel_mut()?;
        channel.write_packet(packet, seq_num)?;
        Ok(())
    }

    /// 读取一个mysql packet
    pub(crate) fn read_packet(&mut self) -> SResult<(Vec<u8>, u8)> {
        let channel = self.channel_mut()?;
        channel.read_packet()
    }

    /// 读取一个mysql packet，并处理err包
    pub fn read_packet_with_check(&mut self, err_message: &str) -> SResult<(Vec<u8>, u8)> {
        let (packet, seq_num) = self.read_packet()?;
        check_error_packet(&packet, err_message)?;
        Ok((packet, seq_num))
    }

    fn channel_mut(&mut self) -> SResult<&mut PacketChannel> {
        match self.channel.as_mut() {
            None => Err(SchemaError::ConnectionError(String::from(
                "channel not found",
            ))),
            Some(channel) => Ok(channel),
        }
    }

    /// err 包转换为 StatementFailed, 并记录 last_error
    pub(crate) fn statement_error(&mut self, sql: &str, packet: &[u8]) -> SchemaError {
        let message = match ErrorPacket::parse(&packet[1..]) {
            Ok(error) => error.to_string(),
            Err(_) => "malformed error packet".to_string(),
        };
        self.last_error = Some(message.clone());

        SchemaError::StatementFailed {
            sql: sql.to_string(),
            message,
        }
    }

    /// 判定连接能力
    pub fn has_capability(&self, capability_flag: u64) -> bool {
        self.session.capability_flags.contains(capability_flag)
    }

    /// 记录握手包中获得的server信息
    fn handle_handshake(&mut self, hp: &HandshakePacket) {
        self.session.capability_flags =
            CapabilityFlags::new(hp.server_capabilities & self.get_client_flags());
        self.session.status_flags = StatusFlags::new(hp.status_flags);
        self.session.connection_id = hp.connection_id;
        self.session.character_set = hp.server_collation;
        self.session.server_version = hp.server_version.clone();
    }

    /// 获得client能力flag
    fn get_client_flags(&self) -> u64 {
        let client_flags = capability_flags::CLIENT_PROTOCOL_41
            | capability_flags::CLIENT_SECURE_CONNECTION
            | capability_flags::CLIENT_LONG_PASSWORD
            | capability_flags::CLIENT_TRANSACTIONS
            | capability_flags::CLIENT_LOCAL_FILES
            | capability_flags::CLIENT_MULTI_STATEMENTS
            | capability_flags::CLIENT_MULTI_RESULTS
            | capability_flags::CLIENT_PS_MULTI_RESULTS
            | capability_flags::CLIENT_PLUGIN_AUTH
            | capability_flags::CLIENT_LONG_FLAG;
        return client_flags;
    }
}

#[cfg(test)]
mod test {
    use crate::conn::connection::{escape_with_backslash, Connection, IConnection};
    use crate::conn::connection_options::ConnectionOptions;

    #[test]
    fn test_escape() {
        assert_eq!(escape_with_backslash("plain"), "plain");
        assert_eq!(escape_with_backslash("it's"), "it\\'s");
        assert_eq!(escape_with_backslash("a\\b"), "a\\\\b");
        assert_eq!(escape_with_backslash("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_with_backslash("nul\0byte"), "nul\\0byte");
    }

    #[test]
    fn test_escape_default_session() {
        let conn = Connection::new(ConnectionOptions::default());
        assert_eq!(conn.escape_string("o'clock"), "o\\'clock");
    }

    #[test]
    fn test_query_without_connect() {
        let mut conn = Connection::new(ConnectionOptions::default());
        assert!(conn.query(String::from("select 1")).is_err());
    }
}
