use serde::Serialize;

use common::config::load_style::Format;

#[derive(Debug, Clone, Serialize)]
pub struct CliOptions {
    /// 是否调试模式
    debug: bool,

    /// 跳过所有确认, 脚本化使用
    assume_yes: bool,

    format: Format,
}

impl CliOptions {
    pub fn new(debug: bool, assume_yes: bool, format: Format) -> Self {
        CliOptions {
            debug,
            assume_yes,
            format,
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn is_assume_yes(&self) -> bool {
        self.assume_yes
    }

    pub fn get_format(&self) -> Format {
        self.format.clone()
    }
}

impl Default for CliOptions {
    fn default() -> Self {
        CliOptions::new(false, false, Format::None)
    }
}
