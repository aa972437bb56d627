use serde::Serialize;

/// 复合索引, 两列以上
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeIndex {
    pub name: String,
    pub columns: Vec<String>,
}

impl CompositeIndex {
    pub fn new(name: Option<String>, columns: Vec<String>, unique: bool) -> Self {
        let name = match name {
            Some(name) => name,
            None => CompositeIndex::default_name(&columns, unique),
        };
        CompositeIndex { name, columns }
    }

    /// 未显式命名时的约定: idx_c1_c2_… / unq_c1_c2_…
    pub fn default_name(columns: &[String], unique: bool) -> String {
        let prefix = if unique { "unq" } else { "idx" };
        format!("{}_{}", prefix, columns.join("_"))
    }
}

/// 由单列 @index/@unique 派生的索引
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleIndex {
    pub name: String,
    pub column: String,
    pub unique: bool,
}

impl SimpleIndex {
    pub fn for_column(column: &str, unique: bool) -> Self {
        let suffix = if unique { "unique" } else { "index" };
        SimpleIndex {
            name: format!("{}_{}", column, suffix),
            column: column.to_string(),
            unique,
        }
    }
}

/// 全文索引名约定
pub fn fulltext_index_name(column: &str) -> String {
    format!("{}_fulltext", column)
}
