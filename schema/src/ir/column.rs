use serde::Serialize;

use crate::quote_ident;

/// varchar/char 未显式给出长度时的缺省值
pub const DEFAULT_VARCHAR_LENGTH: &str = "255";

/// decimal 未显式给出精度时的缺省值
pub const DEFAULT_DECIMAL_LENGTH: &str = "10,2";

/// 数值类型集合, unsigned 只允许出现在这些类型上
pub const NUMERIC_TYPES: [&str; 8] = [
    "INT",
    "BIGINT",
    "TINYINT",
    "SMALLINT",
    "MEDIUMINT",
    "DECIMAL",
    "FLOAT",
    "DOUBLE",
];

/// 一列的期望定义。 由注解解析产生, 与数据库驱动无关
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnIr {
    pub name: String,

    /// 规范化大写的类型 token, 如 VARCHAR / INT / ENUM
    pub sql_type: String,

    /// 长度。 DECIMAL 为 "precision,scale"
    pub length: Option<String>,

    /// ENUM/SET 的取值, 有序
    pub values: Vec<String>,

    pub primary: bool,
    pub unique: bool,
    pub nullable: bool,
    pub unsigned: bool,
    pub auto_increment: bool,
    pub index: bool,
    pub fulltext: bool,
    pub first: bool,
    pub drop: bool,

    /// 规范形式的默认值, 见 canonical_default
    pub default: Option<String>,

    pub comment: Option<String>,
    pub check: Option<String>,

    /// ALTER 时的位置提示
    pub after: Option<String>,

    /// @rename 记录的旧列名
    pub rename: Option<String>,

    pub foreign: Option<ForeignKeyIr>,
}

impl ColumnIr {
    pub fn named(name: &str) -> Self {
        ColumnIr {
            name: name.to_string(),
            ..ColumnIr::default()
        }
    }

    pub fn is_numeric(&self) -> bool {
        NUMERIC_TYPES.contains(&self.sql_type.as_str())
    }

    pub fn is_enum_like(&self) -> bool {
        self.sql_type == "ENUM" || self.sql_type == "SET"
    }

    /// 类型子句, 如 VARCHAR(255) / ENUM('a','b') / DECIMAL(10,2) / JSON
    pub fn type_clause(&self) -> String {
        if self.is_enum_like() {
            let values: Vec<String> = self
                .values
                .iter()
                .map(|v| format!("'{}'", escape_sql_literal(v)))
                .collect();
            return format!("{}({})", self.sql_type, values.join(","));
        }

        match &self.length {
            Some(length) => format!("{}({})", self.sql_type, length),
            None => self.sql_type.clone(),
        }
    }

    /// 列定义子句, 不含列名。 ADD/MODIFY/CHANGE/CREATE 共用
    pub fn render_definition(&self) -> String {
        let mut parts: Vec<String> = vec![self.type_clause()];

        if self.unsigned {
            parts.push("UNSIGNED".to_string());
        }

        if self.nullable {
            parts.push("NULL".to_string());
        } else {
            parts.push("NOT NULL".to_string());
        }

        if let Some(default) = &self.default {
            parts.push(format!("DEFAULT {}", canonical_default(default)));
        }

        if self.auto_increment {
            parts.push("AUTO_INCREMENT".to_string());
        }

        if let Some(comment) = &self.comment {
            parts.push(format!("COMMENT '{}'", escape_sql_literal(comment)));
        }

        if let Some(check) = &self.check {
            parts.push(format!("CHECK ({})", check));
        }

        parts.join(" ")
    }

    /// ADD COLUMN 的位置子句
    pub fn position_clause(&self) -> String {
        if self.first {
            return " FIRST".to_string();
        }
        match &self.after {
            Some(after) => format!(" AFTER {}", quote_ident(after)),
            None => String::new(),
        }
    }
}

/// 外键定义
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeyIr {
    pub ref_table: String,
    pub ref_column: String,
    pub on_delete: FkAction,
    pub on_update: FkAction,
}

impl ForeignKeyIr {
    pub fn new(ref_table: &str, ref_column: &str) -> Self {
        ForeignKeyIr {
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
            on_delete: FkAction::Restrict,
            on_update: FkAction::Restrict,
        }
    }
}

/// 外键动作, 默认 RESTRICT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FkAction {
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

impl FkAction {
    pub fn parse(value: &str) -> Option<FkAction> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CASCADE" => Some(FkAction::Cascade),
            "RESTRICT" => Some(FkAction::Restrict),
            "SET NULL" => Some(FkAction::SetNull),
            "NO ACTION" => Some(FkAction::NoAction),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            FkAction::Cascade => "CASCADE",
            FkAction::Restrict => "RESTRICT",
            FkAction::SetNull => "SET NULL",
            FkAction::NoAction => "NO ACTION",
        }
    }
}

/// 默认值的规范形式。
/// NULL / CURRENT_TIMESTAMP 不加引号; 已带单引号的原样输出;
/// 其余加单引号并做 backslash 转义
pub fn canonical_default(raw: &str) -> String {
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("NULL") {
        return "NULL".to_string();
    }
    if trimmed.eq_ignore_ascii_case("CURRENT_TIMESTAMP") {
        return "CURRENT_TIMESTAMP".to_string();
    }

    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        return trimmed.to_string();
    }

    format!("'{}'", escape_sql_literal(trimmed))
}

/// 默认值按规范输出比较, 空白折叠, 不带引号的关键字大小写不敏感
pub fn defaults_equal(left: Option<&str>, right: Option<&str>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(l), Some(r)) => fold_default(l) == fold_default(r),
        _ => false,
    }
}

fn fold_default(raw: &str) -> String {
    let canonical = canonical_default(raw);
    if canonical.starts_with('\'') {
        return canonical;
    }

    let collapsed: Vec<&str> = canonical.split_whitespace().collect();
    collapsed.join(" ").to_ascii_uppercase()
}

/// §4.3 要求的字面量转义: \ ' NUL NL CR ctrl-Z
pub fn escape_sql_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\x1a' => escaped.push_str("\\Z"),
            _ => escaped.push(c),
        }
    }
    escaped
}
