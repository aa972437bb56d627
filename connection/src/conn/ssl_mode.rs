/// SSL 连接策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SslMode {
    /// 不使用 SSL
    Disabled = 0,

    /// 服务器支持时使用, 不支持时回退明文
    IfAvailable = 1,

    /// 必须使用 SSL, 服务器不支持时报错
    Require = 2,
}

impl Default for SslMode {
    fn default() -> Self {
        SslMode::Disabled
    }
}
