use crate::ir::column::{defaults_equal, ColumnIr};
use crate::observed::ObservedColumn;

/// 比较用的列规范形式。 IR 与实际列都折叠到这一种形状
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalColumn {
    /// 大写类型加长度/取值, 如 VARCHAR(255) / INT(11) / ENUM('a','b')
    pub type_clause: String,

    pub unsigned: bool,
    pub nullable: bool,
    pub auto_increment: bool,

    /// 原始默认值, 比较时走 defaults_equal
    pub default: Option<String>,

    pub comment: String,
}

impl CanonicalColumn {
    pub fn from_ir(column: &ColumnIr) -> Self {
        let type_clause = match column.is_enum_like() {
            true => column.type_clause(),
            false => normalize_type(&column.sql_type, column.length.as_deref()),
        };

        CanonicalColumn {
            type_clause,
            unsigned: column.unsigned,
            nullable: column.nullable,
            auto_increment: column.auto_increment,
            default: column.default.clone(),
            comment: column.comment.clone().unwrap_or_default(),
        }
    }

    pub fn from_observed(column: &ObservedColumn) -> Self {
        let (base, args, unsigned) = split_column_type(&column.column_type);

        let type_clause = if base == "ENUM" || base == "SET" {
            format!("{}({})", base, args.as_deref().unwrap_or(""))
        } else {
            normalize_type(&base, args.as_deref())
        };

        CanonicalColumn {
            type_clause,
            unsigned,
            nullable: column.nullable,
            auto_increment: column.is_auto_increment(),
            default: column.default.clone(),
            comment: column.comment.clone(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.type_clause == "JSON"
    }

    /// §4.5.1 的变更判定。
    /// 两侧都是 JSON 时只比较可空性与注释 (实际列的 json 不带 NULL 后缀)
    pub fn differs(&self, other: &CanonicalColumn) -> bool {
        if self.is_json() && other.is_json() {
            return self.nullable != other.nullable || self.comment != other.comment;
        }

        self.type_clause != other.type_clause
            || self.unsigned != other.unsigned
            || self.nullable != other.nullable
            || self.auto_increment != other.auto_increment
            || !defaults_equal(self.default.as_deref(), other.default.as_deref())
            || self.comment != other.comment
    }
}

/// 外键类型精确匹配: 规范类型串 + UNSIGNED, 大小写不敏感
pub fn types_match_exactly(declared: &ColumnIr, referenced: &ObservedColumn) -> bool {
    let declared = CanonicalColumn::from_ir(declared);
    let referenced = CanonicalColumn::from_observed(referenced);

    declared.type_clause.eq_ignore_ascii_case(&referenced.type_clause)
        && declared.unsigned == referenced.unsigned
}

/// 把 MySQL 渲染的类型拆成 (大写基础类型, 括号参数, unsigned)。
/// enum/set 的参数保留原始大小写
pub fn split_column_type(raw: &str) -> (String, Option<String>, bool) {
    let raw = raw.trim();
    let lowered = raw.to_ascii_lowercase();
    let unsigned = lowered.contains(" unsigned") || lowered.ends_with("unsigned");

    // 去掉 unsigned/zerofill 修饰
    let without_attrs = lowered.replace(" zerofill", "").replace(" unsigned", "");
    let without_attrs = without_attrs.trim();

    let (base, has_args) = match without_attrs.find('(') {
        Some(open) => (&without_attrs[..open], true),
        None => (without_attrs, false),
    };
    let base = base.trim().to_uppercase();

    if !has_args {
        return (base, None, unsigned);
    }

    // 参数从原始串取, enum('A','b') 的大小写不能丢
    let raw_open = raw.find('(').unwrap_or(raw.len());
    let raw_close = raw.rfind(')').unwrap_or(raw.len());
    let args = raw.get(raw_open + 1..raw_close).unwrap_or("").to_string();

    (base, Some(args), unsigned)
}

/// 整数族缺省显示宽度, 与解析器的补齐规则一致。
/// 8.0.19 之后整数渲染不再带宽度, 两侧同时补齐后比较仍然成立
fn normalize_type(base: &str, args: Option<&str>) -> String {
    let args = args.map(|a| a.trim()).filter(|a| !a.is_empty());

    let filled = match (base, args) {
        ("INT", None) => Some("11"),
        ("BIGINT", None) => Some("20"),
        ("TINYINT", None) => Some("4"),
        ("SMALLINT", None) => Some("6"),
        ("MEDIUMINT", None) => Some("9"),
        _ => args,
    };

    match filled {
        Some(args) => format!("{}({})", base, args),
        None => base.to_string(),
    }
}
