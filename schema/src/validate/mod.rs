pub mod fix;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use common::err::schema_error::SchemaError;
use common::err::SResult;

use crate::ir::table::TableIr;

static DECIMAL_LENGTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+,\d+$").unwrap());

/// IR 不变量的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckKind {
    /// 表至少要有一列
    NoColumns,

    /// 必须有主键
    NoPrimaryKey,

    /// 声明了 timestamps 但缺少 created_at/updated_at
    MissingTimestamps,

    /// ENUM/SET 缺少取值
    EmptyEnumValues,

    /// DECIMAL 长度不是 precision,scale
    BadDecimalLength,

    /// unsigned 用在了非数值类型上
    UnsignedNonNumeric,

    /// 分区列不存在
    PartitionColumnMissing,

    /// 分区列不在主键里
    PartitionColumnNotPrimary,
}

/// 一次违反, 带修复提示。
/// auto_fixable 为 true 时调用方可以交互式补全
#[derive(Debug, Clone, Serialize)]
pub struct SchemaCheck {
    pub kind: CheckKind,
    pub property: Option<String>,
    pub auto_fixable: bool,
    pub suggestion: String,
}

impl SchemaCheck {
    fn new(kind: CheckKind, property: Option<&str>, auto_fixable: bool, suggestion: String) -> Self {
        SchemaCheck {
            kind,
            property: property.map(|p| p.to_string()),
            auto_fixable,
            suggestion,
        }
    }
}

/// 逐条检查 IR 不变量, 返回全部违反项
pub fn validate(ir: &TableIr) -> Vec<SchemaCheck> {
    let mut checks = Vec::new();

    if ir.live_columns().next().is_none() {
        checks.push(SchemaCheck::new(
            CheckKind::NoColumns,
            None,
            false,
            "declare at least one property with @column".to_string(),
        ));
        return checks;
    }

    if ir.primary_key_columns().is_empty() {
        checks.push(SchemaCheck::new(
            CheckKind::NoPrimaryKey,
            None,
            true,
            "add an `id` property with @autonumber, or mark a column @primary".to_string(),
        ));
    }

    if ir.timestamps {
        for name in ["created_at", "updated_at"] {
            if ir.live_columns().all(|c| c.name != name) {
                checks.push(SchemaCheck::new(
                    CheckKind::MissingTimestamps,
                    Some(name),
                    true,
                    format!("timestamps is enabled, add `{}` with @column @datetime @nullable", name),
                ));
            }
        }
    }

    for column in ir.live_columns() {
        if column.is_enum_like() && column.values.is_empty() {
            checks.push(SchemaCheck::new(
                CheckKind::EmptyEnumValues,
                Some(&column.name),
                false,
                format!("@{} requires a comma separated value list", column.sql_type.to_lowercase()),
            ));
        }

        if column.sql_type == "DECIMAL" {
            if let Some(length) = &column.length {
                if !DECIMAL_LENGTH_RE.is_match(length) {
                    checks.push(SchemaCheck::new(
                        CheckKind::BadDecimalLength,
                        Some(&column.name),
                        false,
                        format!("decimal length must be precision,scale - got {}", length),
                    ));
                }
            }
        }

        if column.unsigned && !column.is_numeric() {
            checks.push(SchemaCheck::new(
                CheckKind::UnsignedNonNumeric,
                Some(&column.name),
                false,
                format!("@unsigned is not allowed on {}", column.sql_type),
            ));
        }
    }

    if let Some(partition) = &ir.partition {
        match ir.live_columns().find(|c| c.name == partition.column) {
            None => {
                checks.push(SchemaCheck::new(
                    CheckKind::PartitionColumnMissing,
                    Some(&partition.column),
                    false,
                    format!("partition column `{}` is not declared", partition.column),
                ));
            }
            Some(column) => {
                if !column.primary {
                    checks.push(SchemaCheck::new(
                        CheckKind::PartitionColumnNotPrimary,
                        Some(&partition.column),
                        true,
                        format!(
                            "partition column `{}` must be part of the primary key, add @primary",
                            partition.column
                        ),
                    ));
                }
            }
        }
    }

    checks
}

/// 有任何违反即转为 InvalidModel
pub fn ensure_valid(ir: &TableIr) -> SResult<()> {
    let checks = validate(ir);
    match checks.first() {
        None => Ok(()),
        Some(first) => Err(SchemaError::invalid_model(
            &ir.model_name,
            first.property.as_deref(),
            first.suggestion.clone(),
        )),
    }
}
