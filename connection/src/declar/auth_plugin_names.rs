/// 服务端告知的认证插件名
pub const MY_SQL_NATIVE_PASSWORD: &str = "mysql_native_password";

/// MySQL 8.0 默认的认证插件
pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPlugin {
    MySqlNativePassword,

    CachingSha2Password,
}
