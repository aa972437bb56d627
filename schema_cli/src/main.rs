mod cli_client;
mod cli_options;
mod executor;
mod prompt;

use std::env::current_dir;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use common::config::load_style::Format;
use common::config::{read_config, FConfig, MysqlConfig};
use common::err::schema_error::SchemaError;
use common::log::tracing_factory::{OutputType, TracingFactory, TracingFactoryOptions};
use common::pretty_util::to_string_pretty;
use common::server::Server;

use crate::cli_client::CliClient;
use crate::cli_options::CliOptions;

#[derive(Parser, Serialize, Debug, Clone)]
#[command(name = "schema-cli")]
#[command(version = "0.0.2")]
#[command(author = "rust-us")]
#[command(about = "MySQL declarative schema tool impl with Rust")]
#[command(long_about = None)]
pub(crate) struct CliArgs {
    /// 加载的配置文件路径
    #[arg(short, long, help = "Path to loaded configuration file", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    ///////////////////////////////////////////////////
    // Cli Options //
    ///////////////////////////////////////////////////
    /// enable debug info
    #[arg(short, long, help = "enable debug mode", default_value_t = false)]
    pub debug: bool,

    #[arg(short, long, help = "output format: [yaml | json], default Yaml", default_value = "yaml")]
    pub format: String,

    #[arg(short = 'y', long = "yes", help = "assume yes on every confirmation", default_value_t = false)]
    pub yes: bool,

    ///////////////////////////////////////////////////
    // MySQL Options //
    ///////////////////////////////////////////////////
    #[arg(long = "host", help = "mysql host", value_name = "host")]
    pub host: Option<String>,

    #[arg(long = "port", help = "mysql port, [1-65555]", value_name = "port")]
    pub port: Option<i16>,

    #[arg(short, long = "username", help = "mysql username", value_name = "username")]
    pub username: Option<String>,

    #[arg(short, long = "password", help = "mysql password", value_name = "password")]
    pub password: Option<String>,

    #[arg(short = 'D', long = "database", help = "mysql database", value_name = "database")]
    pub database: Option<String>,
}

#[derive(Subcommand, Serialize, Debug, Clone)]
pub(crate) enum Commands {
    /// 单个模型对应的表操作
    Model {
        #[command(subcommand)]
        command: ModelCommands,
    },

    /// 整库操作
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand, Serialize, Debug, Clone)]
pub(crate) enum ModelCommands {
    /// 按模型建表, 已存在时先删后建
    CreateTable { model: String },

    /// 模型与实际表结构对齐, 只执行最小变更
    UpdateTable { model: String },

    /// 删除模型对应的表, 两次确认
    DropTable { model: String },

    /// 清空表数据, 保留结构
    EmptyTable { model: String },

    /// 表重命名
    RenameTable { model: String, new_name: String },

    /// 打印实际表结构
    TableSchema { model: String },

    /// 导出单表, .csv 后缀时输出 CSV
    ExportTable {
        model: String,
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Serialize, Debug, Clone)]
pub(crate) enum DbCommands {
    /// 打印所有表的实际结构
    Schema,

    /// 整库导出
    Export { file: Option<PathBuf> },

    /// 导入 SQL 文件
    Import { file: PathBuf },

    /// 列出所有数据库
    List,

    /// 列出表
    Tables { database: Option<String> },

    /// 建库
    Create { database: Option<String> },

    /// 删库, 两次确认
    Drop { database: Option<String> },

    /// 清空所有表的数据
    Empty,

    /// 执行 seeds 目录下的 SQL
    Seed { name: Option<String> },

    /// 模型目录与实际库的双向迁移脚本
    Diff {
        /// 写出 <base>.up.sql / <base>.down.sql, 缺省打印
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    let format = Format::format(&args.format);

    let config = load_config(&args);
    let mut tool_config = config.get_config();

    // merge mysql settings
    merge(&mut tool_config.mysql, &args);

    let log_opt = TracingFactoryOptions::new(
        args.debug,
        OutputType::LOG,
        tool_config.base.get_log_dir(),
    );
    let log_factory = TracingFactory::init_log_with_options(log_opt);

    if args.debug {
        eprintln!("args: \n{}", to_string_pretty(&format, &args));
        eprintln!("log_dir: {:?}", log_factory.get_log_dir());
    }

    let command = match &args.command {
        Some(command) => command.clone(),
        None => {
            eprintln!("no command given, see --help");
            return ExitCode::from(1);
        }
    };

    let mut client = CliClient::new(
        CliOptions::new(args.debug, args.yes, format),
        tool_config,
        command,
    );

    match client.start().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            match &err {
                SchemaError::UserAborted => prompt::info("cancelled"),
                other => prompt::error_line(&other.to_string()),
            }
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

// 加载配置文件， 读取配置
fn load_config(args: &CliArgs) -> FConfig {
    let default_conf = get_config_path(args);

    match default_conf {
        Some(path) => match read_config(&path) {
            Ok(config) => FConfig::new(config),
            Err(err) => {
                if args.config.is_some() {
                    // 显式给出的配置文件必须可读
                    prompt::error_line(&format!("can not read config {:?}: {}", path, err));
                    std::process::exit(1);
                }
                FConfig::default()
            }
        },
        None => FConfig::default(),
    }
}

fn get_config_path(args: &CliArgs) -> Option<PathBuf> {
    if args.config.is_some() {
        return Some(args.config.as_ref().unwrap().clone());
    }

    let mut pwd = current_dir().unwrap_or("/".into());
    // ./conf/schema_cli.toml
    pwd.push("conf");
    pwd.push("schema_cli");
    pwd.set_extension("toml");

    Some(pwd)
}

fn merge(mysql_config: &mut MysqlConfig, args: &CliArgs) {
    if args.host.is_some() {
        mysql_config.set_host(args.host.clone());
    }
    if !mysql_config.have_host() {
        mysql_config.set_host(Some("127.0.0.1".to_string()));
    }

    if args.port.is_some() {
        mysql_config.set_port(args.port);
    }
    if !mysql_config.have_port() {
        mysql_config.set_port(Some(3306));
    }

    if args.username.is_some() {
        mysql_config.username = args.username.as_ref().unwrap().clone();
    }

    if args.password.is_some() {
        mysql_config.password = args.password.as_ref().unwrap().clone();
    }

    if args.database.is_some() {
        mysql_config.database = args.database.clone();
    }
}
