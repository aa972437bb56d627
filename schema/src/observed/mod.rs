pub mod table_reader;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ir::partition::PartitionDef;

/// SHOW FULL COLUMNS 回读的一列。 值保持 MySQL 的原样渲染
#[derive(Debug, Clone, Default, Serialize)]
pub struct ObservedColumn {
    pub name: String,

    /// 如 varchar(255) / int(11) unsigned / enum('a','b')
    pub column_type: String,

    pub collation: Option<String>,
    pub nullable: bool,
    pub key: String,
    pub default: Option<String>,

    /// 如 auto_increment
    pub extra: String,

    pub comment: String,
}

impl ObservedColumn {
    pub fn is_auto_increment(&self) -> bool {
        self.extra.to_ascii_lowercase().contains("auto_increment")
    }
}

/// STATISTICS 回读的一个索引, PRIMARY 不在其中
#[derive(Debug, Clone, Serialize)]
pub struct ObservedIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub fulltext: bool,
}

impl ObservedIndex {
    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }
}

/// KEY_COLUMN_USAGE ⋈ REFERENTIAL_CONSTRAINTS 回读的外键
#[derive(Debug, Clone, Serialize)]
pub struct ObservedForeignKey {
    pub constraint_name: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    pub on_delete: String,
    pub on_update: String,
}

/// 命令执行时刻的实际表结构快照
#[derive(Debug, Clone, Serialize)]
pub struct ObservedTable {
    pub name: String,
    pub columns: Vec<ObservedColumn>,

    /// 主键列, 按索引顺序
    pub primary_key: Vec<String>,

    pub indexes: Vec<ObservedIndex>,
    pub foreign_keys: BTreeMap<String, ObservedForeignKey>,
    pub partition: Option<PartitionDef>,

    pub engine: String,
    pub charset: String,
    pub collation: String,
    pub comment: String,
}

impl ObservedTable {
    pub fn column(&self, name: &str) -> Option<&ObservedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&ObservedIndex> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// 单列的普通/唯一索引, 不含全文
    pub fn simple_indexes(&self) -> Vec<&ObservedIndex> {
        self.indexes
            .iter()
            .filter(|i| !i.is_composite() && !i.fulltext)
            .collect()
    }

    pub fn composite_indexes(&self, unique: bool) -> Vec<&ObservedIndex> {
        self.indexes
            .iter()
            .filter(|i| i.is_composite() && !i.fulltext && i.unique == unique)
            .collect()
    }

    pub fn fulltext_indexes(&self) -> Vec<&ObservedIndex> {
        self.indexes.iter().filter(|i| i.fulltext).collect()
    }
}
