use serde::Serialize;

use crate::ir::column::{ColumnIr, ForeignKeyIr};
use crate::ir::index::{CompositeIndex, SimpleIndex};
use crate::ir::partition::PartitionDef;

pub const DEFAULT_ENGINE: &str = "InnoDB";
pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_COLLATION: &str = "utf8mb4_unicode_ci";

/// 一张表的期望 schema。 注解解析的产物, 每个命令创建一次, 用完即弃
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableIr {
    /// 模型名, 仅用于报错
    pub model_name: String,

    pub table_name: String,

    pub columns: Vec<ColumnIr>,

    pub composite_indexes: Vec<CompositeIndex>,
    pub composite_unique_indexes: Vec<CompositeIndex>,

    pub table_comment: Option<String>,
    pub partition: Option<PartitionDef>,

    pub engine: String,
    pub charset: String,
    pub collation: String,

    /// 模型声明了 timestamps, created_at/updated_at 必须同时存在
    pub timestamps: bool,
}

impl TableIr {
    pub fn new(model_name: &str, table_name: &str) -> Self {
        TableIr {
            model_name: model_name.to_string(),
            table_name: table_name.to_string(),
            columns: Vec::new(),
            composite_indexes: Vec::new(),
            composite_unique_indexes: Vec::new(),
            table_comment: None,
            partition: None,
            engine: DEFAULT_ENGINE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            collation: DEFAULT_COLLATION.to_string(),
            timestamps: false,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnIr> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// 期望保留的列, 不含 @drop 标记的
    pub fn live_columns(&self) -> impl Iterator<Item = &ColumnIr> {
        self.columns.iter().filter(|c| !c.drop)
    }

    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.live_columns()
            .filter(|c| c.primary)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// 单列索引, 由 @index/@unique 派生。 主键不在其中
    pub fn simple_indexes(&self) -> Vec<SimpleIndex> {
        let mut indexes = Vec::new();
        for column in self.live_columns() {
            if column.unique {
                indexes.push(SimpleIndex::for_column(&column.name, true));
            }
            if column.index {
                indexes.push(SimpleIndex::for_column(&column.name, false));
            }
        }
        indexes
    }

    pub fn fulltext_columns(&self) -> Vec<&ColumnIr> {
        self.live_columns().filter(|c| c.fulltext).collect()
    }

    /// (列, 外键) 对, 约定约束名 fk_{table}_{column}
    pub fn foreign_keys(&self) -> Vec<(&ColumnIr, &ForeignKeyIr)> {
        self.live_columns()
            .filter_map(|c| c.foreign.as_ref().map(|fk| (c, fk)))
            .collect()
    }

    pub fn foreign_key_name(&self, column: &str) -> String {
        format!("fk_{}_{}", self.table_name, column)
    }
}

#[cfg(test)]
mod test {
    use crate::ir::column::{ColumnIr, ForeignKeyIr};
    use crate::ir::table::TableIr;

    fn sample() -> TableIr {
        let mut ir = TableIr::new("Posts", "posts");

        let mut id = ColumnIr::named("id");
        id.sql_type = "INT".to_string();
        id.primary = true;
        ir.columns.push(id);

        let mut user_id = ColumnIr::named("user_id");
        user_id.sql_type = "INT".to_string();
        user_id.index = true;
        user_id.foreign = Some(ForeignKeyIr::new("users", "id"));
        ir.columns.push(user_id);

        let mut legacy = ColumnIr::named("legacy_code");
        legacy.drop = true;
        ir.columns.push(legacy);

        ir
    }

    #[test]
    fn test_live_columns() {
        let ir = sample();
        let names: Vec<&str> = ir.live_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "user_id"]);
    }

    #[test]
    fn test_derived_indexes() {
        let ir = sample();
        let indexes = ir.simple_indexes();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name, "user_id_index");
        assert!(!indexes[0].unique);
    }

    #[test]
    fn test_foreign_keys() {
        let ir = sample();
        let fks = ir.foreign_keys();
        assert_eq!(fks.len(), 1);
        assert_eq!(ir.foreign_key_name(&fks[0].0.name), "fk_posts_user_id");
    }
}
