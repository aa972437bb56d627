use serde::{Deserialize, Serialize};

/// 配置的来源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LoadStyle {
    DEFAULT,

    TOML,
}

/// 命令行输出格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Format {
    None,

    Yaml,

    Json,
}

impl Format {
    pub fn format(name: &str) -> Format {
        match name.to_ascii_lowercase().as_str() {
            "json" => Format::Json,
            "yaml" | "yml" => Format::Yaml,
            _ => Format::None,
        }
    }
}
