use std::io;
use std::num::ParseIntError;
use std::str::Utf8Error;
use std::string::FromUtf8Error;

use thiserror::Error;

/// 整个工具链共用的错误类型。
/// 按照错误的影响分类，而不是按照产生错误的模块分类。
#[derive(Debug, Error)]
pub enum SchemaError {
    //////////////////////
    // Model / IR
    //////////////////////
    /// Annotation parse error or IR invariant violation.
    /// Fatal to the current command.
    #[error("invalid model {model}{}: {message}", property_suffix(.property))]
    InvalidModel {
        model: String,
        property: Option<String>,
        message: String,
    },

    /// Live foreign key validation failed. Message carries both sides
    /// of the mismatch.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    //////////////////////
    // Database
    //////////////////////
    /// Connect or authentication failure.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// A driver error during an emitted DDL/DML statement. Prior
    /// statements remain applied, MySQL auto-commits DDL.
    #[error("statement failed: {message} (sql: {sql})")]
    StatementFailed { sql: String, message: String },

    /// Restore stream failed. The failing statement is reported verbatim.
    #[error("import failed at line {line}: {message}")]
    ImportFailed {
        line: usize,
        statement: String,
        message: String,
    },

    //////////////////////
    // Interaction
    //////////////////////
    /// 确认环节被用户拒绝。进程以 0 退出。
    #[error("aborted by user")]
    UserAborted,

    //////////////////////
    // IO
    //////////////////////
    #[error("{0}")]
    IoError(#[from] io::Error),

    #[error("{0}")]
    Utf8Error(#[from] Utf8Error),

    #[error("{0}")]
    FromUtf8Error(#[from] FromUtf8Error),

    #[error("{0}")]
    ParseIntError(#[from] ParseIntError),

    #[error("config file parse error: {0}")]
    ConfigFileParseErr(String),

    #[error("{0}")]
    String(String),
}

fn property_suffix(property: &Option<String>) -> String {
    match property {
        Some(p) => format!(", property {}", p),
        None => String::new(),
    }
}

impl SchemaError {
    pub fn invalid_model(model: &str, property: Option<&str>, message: impl Into<String>) -> Self {
        SchemaError::InvalidModel {
            model: model.to_string(),
            property: property.map(|p| p.to_string()),
            message: message.into(),
        }
    }

    /// UserAborted 不算失败。
    pub fn exit_code(&self) -> i32 {
        match self {
            SchemaError::UserAborted => 0,
            _ => 1,
        }
    }
}
