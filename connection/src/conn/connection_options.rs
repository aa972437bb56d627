use std::path::Path;
use std::time::Duration;

use native_tls::Identity;

use common::config::MysqlConfig;
use common::err::schema_error::SchemaError;
use common::err::SResult;

use crate::conn::ssl_mode::SslMode;

/// Settings used to connect to MySQL/MariaDB.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Port number to connect. Defaults to 3306.
    pub port: i16,

    /// Hostname to connect. Defaults to "localhost".
    pub hostname: String,

    /// Defines whether SSL/TLS must be used. Defaults to SslMode.DISABLED.
    pub ssl_mode: SslMode,

    /// A database user with enough privileges to read
    /// <c>INFORMATION_SCHEMA</c> and run DDL on the target database.
    pub username: String,

    /// The password of the user which is used to connect.
    pub password: String,

    /// Default database name specified in Handshake connection.
    pub database: Option<String>,

    /// Socket read timeout. Defaults to 30 seconds plus latency delta.
    pub read_timeout: Duration,

    /// Driver will require SSL connection if this option isn't `None` (default to `None`).
    pub ssl_opts: Option<SslOpts>,
}

impl Default for ConnectionOptions {
    fn default() -> ConnectionOptions {
        ConnectionOptions {
            port: 3306,
            hostname: String::from("localhost"),
            ssl_mode: SslMode::Disabled,
            username: String::new(),
            password: String::new(),
            database: None,
            read_timeout: Duration::from_secs(30),
            ssl_opts: None,
        }
    }
}

impl ConnectionOptions {
    pub fn new_str(hostname: &str, port: i16, username: &str, password: &str) -> ConnectionOptions {
        ConnectionOptions::new(
            hostname.to_string(),
            port,
            username.to_string(),
            password.to_string(),
        )
    }

    pub fn new(
        hostname: String,
        port: i16,
        username: String,
        password: String,
    ) -> ConnectionOptions {
        ConnectionOptions {
            hostname,
            port,
            username,
            password,
            ..ConnectionOptions::default()
        }
    }

    /// 从配置文件的 [mysql] 段构造
    pub fn from_config(config: &MysqlConfig) -> ConnectionOptions {
        let mut options = ConnectionOptions::new(
            config
                .host
                .clone()
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            config.port.unwrap_or(3306),
            config.username.clone(),
            config.password.clone(),
        );
        options.database = config.database.clone();

        options
    }

    pub fn update_auth(&mut self, username: String, password: String) {
        self.username = username;
        self.password = password;
    }

    pub fn update_database(&mut self, database: Option<String>) {
        self.database = database;
    }
}

/// Ssl 配置.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct SslOpts {
    client_identity: Option<ClientIdentity>,
    root_cert_path: Option<String>,
    skip_domain_validation: bool,
    accept_invalid_certs: bool,
}

/// SSL配置属性
impl SslOpts {
    /// 设置 client identity.
    pub fn with_client_identity(mut self, identity: Option<ClientIdentity>) -> Self {
        self.client_identity = identity;
        self
    }

    /// 设置证书路径
    ///
    /// 支持证书格式 .der .pem.
    /// ,pem证书中允许多个证书
    pub fn with_root_cert_path(mut self, root_cert_path: Option<String>) -> Self {
        self.root_cert_path = root_cert_path;
        self
    }

    /// 不验证服务器域
    /// (defaults to `false`).
    pub fn with_danger_skip_domain_validation(mut self, value: bool) -> Self {
        self.skip_domain_validation = value;
        self
    }

    /// true时接受无效证书
    /// (defaults to `false`).
    pub fn with_danger_accept_invalid_certs(mut self, value: bool) -> Self {
        self.accept_invalid_certs = value;
        self
    }

    pub fn client_identity(&self) -> Option<&ClientIdentity> {
        self.client_identity.as_ref()
    }

    pub fn root_cert_path(&self) -> Option<&Path> {
        self.root_cert_path.as_ref().map(Path::new)
    }

    pub fn skip_domain_validation(&self) -> bool {
        self.skip_domain_validation
    }

    pub fn accept_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity {
    pkcs12_path: String,
    password: Option<String>,
}

impl ClientIdentity {
    /// Creates new identity with the given path to the pkcs12 archive.
    pub fn new(pkcs12_path: String) -> Self {
        Self {
            pkcs12_path,
            password: None,
        }
    }

    /// Sets the archive password.
    pub fn with_password(mut self, pass: String) -> Self {
        self.password = Some(pass);
        self
    }

    /// Returns the pkcs12 archive path.
    pub fn pkcs12_path(&self) -> &Path {
        Path::new(&self.pkcs12_path)
    }

    /// Returns the archive password.
    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(AsRef::as_ref)
    }

    pub(crate) fn load(&self) -> SResult<Identity> {
        let der = std::fs::read(&self.pkcs12_path)?;
        match Identity::from_pkcs12(&der, self.password.as_deref().unwrap_or("")) {
            Ok(identity) => Ok(identity),
            Err(err) => Err(SchemaError::ConnectionError(format!(
                "Can not load identity. err:{{{err}}}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use common::config::MysqlConfig;

    use crate::conn::connection_options::ConnectionOptions;

    #[test]
    fn test_from_config() {
        let mut config = MysqlConfig::default();
        config.database = Some("app".to_string());

        let opts = ConnectionOptions::from_config(&config);
        assert_eq!(opts.hostname, "127.0.0.1");
        assert_eq!(opts.port, 3306);
        assert_eq!(opts.database.as_deref(), Some("app"));
    }

    #[test]
    fn test_update_auth() {
        let mut opts = ConnectionOptions::default();
        opts.update_auth(String::from("root"), String::from("123456"));
        assert_eq!(opts.username, "root");
        assert_eq!(opts.password, "123456");
    }
}
