pub mod load_style;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::load_style::LoadStyle;
use crate::err::schema_error::SchemaError;

#[derive(Debug, Serialize, Deserialize)]
pub struct FConfig {
    config: ToolConfig,

    /// 配置的加载方式
    load_style: LoadStyle,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    app_name: String,

    #[serde(default)]
    pub mysql: MysqlConfig,
    #[serde(default)]
    pub base: BaseConfig,
}

/// MySQL 连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MysqlConfig {
    pub host: Option<String>,
    pub port: Option<i16>,
    pub username: String,
    pub password: String,

    /// Default database the toolkit operates on.
    pub database: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// 日志输出路径
    log_dir: Option<String>,

    /// Directory the `.model` definition files are resolved from.
    models_dir: Option<String>,

    /// Directory dump files are written to.
    exports_dir: Option<String>,

    /// Directory `db seed` scripts are resolved from.
    seeds_dir: Option<String>,
}

impl Default for FConfig {
    fn default() -> Self {
        FConfig {
            config: ToolConfig::default(),
            load_style: LoadStyle::DEFAULT,
        }
    }
}

impl Default for MysqlConfig {
    fn default() -> Self {
        MysqlConfig {
            host: Some("127.0.0.1".to_string()),
            port: Some(3306),
            username: "root".to_string(),
            password: "".to_string(),
            database: None,
        }
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            log_dir: None,
            models_dir: Some("application/models".to_string()),
            exports_dir: Some("application/storage/exports".to_string()),
            seeds_dir: Some("application/storage/seeds".to_string()),
        }
    }
}

impl FConfig {
    pub fn new(c: ToolConfig) -> Self {
        FConfig {
            config: c,
            load_style: LoadStyle::TOML,
        }
    }

    pub fn get_config(self) -> ToolConfig {
        self.config
    }

    pub fn get_load_style(&self) -> LoadStyle {
        self.load_style.clone()
    }
}

impl MysqlConfig {
    pub fn have_host(&self) -> bool {
        self.host.as_ref().map(|h| !h.is_empty()).unwrap_or(false)
    }

    pub fn set_host(&mut self, host: Option<String>) {
        self.host = host;
    }

    pub fn have_port(&self) -> bool {
        self.port.is_some()
    }

    pub fn set_port(&mut self, port: Option<i16>) {
        self.port = port;
    }
}

impl BaseConfig {
    pub fn get_log_dir(&self) -> Option<String> {
        self.log_dir.clone()
    }

    pub fn models_dir(&self) -> &str {
        self.models_dir.as_deref().unwrap_or("application/models")
    }

    pub fn exports_dir(&self) -> &str {
        self.exports_dir
            .as_deref()
            .unwrap_or("application/storage/exports")
    }

    pub fn seeds_dir(&self) -> &str {
        self.seeds_dir
            .as_deref()
            .unwrap_or("application/storage/seeds")
    }
}

/// 读取指定路径下的配制文件信息
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<ToolConfig, SchemaError> {
    let mut file = File::open(path.as_ref())?;
    let mut s = String::new();

    let _ = file.read_to_string(&mut s);
    toml::from_str(s.as_str()).map_err(|e| SchemaError::ConfigFileParseErr(e.to_string()))
}
