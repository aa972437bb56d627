use std::collections::BTreeMap;

use tracing::debug;

use common::err::schema_error::SchemaError;
use common::err::SResult;

use connection::conn::connection::IConnection;

use crate::ir::partition::{PartitionDef, PartitionKind};
use crate::observed::{ObservedColumn, ObservedForeignKey, ObservedIndex, ObservedTable};
use crate::{is_valid_ident, quote_ident};

/// SHOW FULL COLUMNS 结果表相关column的index
/// |Field|Type|Collation|Null|Key|Default|Extra|Privileges|Comment|
/// Field字段序号
const SHOW_COLUMNS_FIELD_INDEX: usize = 0;
const SHOW_COLUMNS_TYPE_INDEX: usize = 1;
const SHOW_COLUMNS_COLLATION_INDEX: usize = 2;
const SHOW_COLUMNS_NULL_INDEX: usize = 3;
const SHOW_COLUMNS_KEY_INDEX: usize = 4;
const SHOW_COLUMNS_DEFAULT_INDEX: usize = 5;
const SHOW_COLUMNS_EXTRA_INDEX: usize = 6;
const SHOW_COLUMNS_COMMENT_INDEX: usize = 8;

/// STATISTICS 查询结果相关column的index
/// |INDEX_NAME|COLUMN_NAME|NON_UNIQUE|SEQ_IN_INDEX|INDEX_TYPE|
const STATISTICS_INDEX_NAME_INDEX: usize = 0;
const STATISTICS_COLUMN_NAME_INDEX: usize = 1;
const STATISTICS_NON_UNIQUE_INDEX: usize = 2;
const STATISTICS_INDEX_TYPE_INDEX: usize = 4;

/// 实际表结构的只读访问。 全部查询走 INFORMATION_SCHEMA 与 SHOW 命令
pub struct TableReader<'a> {
    conn: &'a mut dyn IConnection,
}

impl<'a> TableReader<'a> {
    pub fn new(conn: &'a mut dyn IConnection) -> Self {
        TableReader { conn }
    }

    pub fn connection(&mut self) -> &mut dyn IConnection {
        self.conn
    }

    /// 组装一张表的完整快照
    pub fn observe(&mut self, table: &str) -> SResult<ObservedTable> {
        check_ident(table)?;

        let columns = self.columns(table)?;
        let (primary_key, indexes) = self.indexes(table)?;
        let foreign_keys = self.foreign_keys(table)?;
        let partition = self.partition(table)?;

        let escaped = self.conn.escape_string(table);
        let meta = self.query_one(format!(
            "SELECT ENGINE, TABLE_COLLATION, TABLE_COMMENT FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = '{}'",
            escaped
        ))?;
        let (engine, collation, comment) = match meta {
            Some(row) => (
                row.get_or_empty(0).to_string(),
                row.get_or_empty(1).to_string(),
                row.get_or_empty(2).to_string(),
            ),
            None => {
                return Err(SchemaError::SchemaMismatch(format!(
                    "table `{}` does not exist",
                    table
                )))
            }
        };
        let charset = collation.split('_').next().unwrap_or("").to_string();

        Ok(ObservedTable {
            name: table.to_string(),
            columns,
            primary_key,
            indexes,
            foreign_keys,
            partition,
            engine,
            charset,
            collation,
            comment,
        })
    }

    pub fn table_exists(&mut self, table: &str) -> SResult<bool> {
        check_ident(table)?;
        let escaped = self.conn.escape_string(table);
        let rows = self.conn.query(format!("SHOW TABLES LIKE '{}'", escaped))?;
        Ok(!rows.is_empty())
    }

    pub fn table_names(&mut self) -> SResult<Vec<String>> {
        let rows = self.conn.query("SHOW TABLES".to_string())?;
        Ok(rows
            .iter()
            .map(|r| r.get_or_empty(0).to_string())
            .collect())
    }

    pub fn tables_in(&mut self, database: &str) -> SResult<Vec<String>> {
        check_ident(database)?;
        let rows = self
            .conn
            .query(format!("SHOW TABLES FROM {}", quote_ident(database)))?;
        Ok(rows
            .iter()
            .map(|r| r.get_or_empty(0).to_string())
            .collect())
    }

    pub fn database_names(&mut self) -> SResult<Vec<String>> {
        let rows = self.conn.query("SHOW DATABASES".to_string())?;
        Ok(rows
            .iter()
            .map(|r| r.get_or_empty(0).to_string())
            .collect())
    }

    /// 按定义顺序读取全部列
    pub fn columns(&mut self, table: &str) -> SResult<Vec<ObservedColumn>> {
        check_ident(table)?;
        let rows = self
            .conn
            .query(format!("SHOW FULL COLUMNS FROM {}", quote_ident(table)))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(ObservedColumn {
                name: row.get_or_empty(SHOW_COLUMNS_FIELD_INDEX).to_string(),
                column_type: row.get_or_empty(SHOW_COLUMNS_TYPE_INDEX).to_string(),
                collation: row
                    .get(SHOW_COLUMNS_COLLATION_INDEX)
                    .map(|c| c.to_string()),
                nullable: row.get_or_empty(SHOW_COLUMNS_NULL_INDEX) == "YES",
                key: row.get_or_empty(SHOW_COLUMNS_KEY_INDEX).to_string(),
                default: row.get(SHOW_COLUMNS_DEFAULT_INDEX).map(|d| d.to_string()),
                extra: row.get_or_empty(SHOW_COLUMNS_EXTRA_INDEX).to_string(),
                comment: row.get_or_empty(SHOW_COLUMNS_COMMENT_INDEX).to_string(),
            });
        }

        debug!("observed {} columns on {}", columns.len(), table);
        Ok(columns)
    }

    /// (主键列, 其余索引)。 索引列按 SEQ_IN_INDEX 排列
    pub fn indexes(&mut self, table: &str) -> SResult<(Vec<String>, Vec<ObservedIndex>)> {
        check_ident(table)?;
        let escaped = self.conn.escape_string(table);
        let rows = self.conn.query(format!(
            "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE, SEQ_IN_INDEX, INDEX_TYPE \
             FROM INFORMATION_SCHEMA.STATISTICS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = '{}' \
             ORDER BY INDEX_NAME, SEQ_IN_INDEX",
            escaped
        ))?;

        let mut primary_key = Vec::new();
        let mut indexes: Vec<ObservedIndex> = Vec::new();

        for row in rows {
            let name = row.get_or_empty(STATISTICS_INDEX_NAME_INDEX).to_string();
            let column = row.get_or_empty(STATISTICS_COLUMN_NAME_INDEX).to_string();

            if name == "PRIMARY" {
                primary_key.push(column);
                continue;
            }

            let unique = row.get_or_empty(STATISTICS_NON_UNIQUE_INDEX) == "0";
            let fulltext = row
                .get_or_empty(STATISTICS_INDEX_TYPE_INDEX)
                .eq_ignore_ascii_case("FULLTEXT");

            match indexes.iter_mut().find(|i| i.name == name) {
                Some(index) => index.columns.push(column),
                None => indexes.push(ObservedIndex {
                    name,
                    columns: vec![column],
                    unique,
                    fulltext,
                }),
            }
        }

        Ok((primary_key, indexes))
    }

    pub fn foreign_keys(&mut self, table: &str) -> SResult<BTreeMap<String, ObservedForeignKey>> {
        check_ident(table)?;
        let escaped = self.conn.escape_string(table);
        let rows = self.conn.query(format!(
            "SELECT kcu.CONSTRAINT_NAME, kcu.COLUMN_NAME, kcu.REFERENCED_TABLE_NAME, \
             kcu.REFERENCED_COLUMN_NAME, rc.DELETE_RULE, rc.UPDATE_RULE \
             FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu \
             JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc \
             ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
             WHERE kcu.TABLE_SCHEMA = DATABASE() AND kcu.TABLE_NAME = '{}' \
             AND kcu.REFERENCED_TABLE_NAME IS NOT NULL \
             ORDER BY kcu.CONSTRAINT_NAME",
            escaped
        ))?;

        let mut foreign_keys = BTreeMap::new();
        for row in rows {
            let constraint_name = row.get_or_empty(0).to_string();
            foreign_keys.insert(
                constraint_name.clone(),
                ObservedForeignKey {
                    constraint_name,
                    column: row.get_or_empty(1).to_string(),
                    ref_table: row.get_or_empty(2).to_string(),
                    ref_column: row.get_or_empty(3).to_string(),
                    on_delete: row.get_or_empty(4).to_string(),
                    on_update: row.get_or_empty(5).to_string(),
                },
            );
        }
        Ok(foreign_keys)
    }

    pub fn partition(&mut self, table: &str) -> SResult<Option<PartitionDef>> {
        check_ident(table)?;
        let escaped = self.conn.escape_string(table);
        let row = self.query_one(format!(
            "SELECT PARTITION_METHOD, PARTITION_EXPRESSION, COUNT(*) \
             FROM INFORMATION_SCHEMA.PARTITIONS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = '{}' AND PARTITION_NAME IS NOT NULL \
             GROUP BY PARTITION_METHOD, PARTITION_EXPRESSION",
            escaped
        ))?;

        let row = match row {
            None => return Ok(None),
            Some(row) => row,
        };

        let method = row.get_or_empty(0).to_string();
        // LINEAR HASH 等变体取最后一个词
        let kind_word = method.split_whitespace().last().unwrap_or("");
        let kind = match PartitionKind::parse(kind_word) {
            Some(kind) => kind,
            None => return Ok(None),
        };

        let column = row.get_or_empty(1).replace('`', "").trim().to_string();
        let count = row.get_or_empty(2).parse::<u32>().unwrap_or(0);

        Ok(Some(PartitionDef {
            kind,
            column,
            count,
        }))
    }

    /// TABLE_ROWS 的近似行数, 快
    pub fn row_count_estimate(&mut self, table: &str) -> SResult<u64> {
        check_ident(table)?;
        let escaped = self.conn.escape_string(table);
        let row = self.query_one(format!(
            "SELECT TABLE_ROWS FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = '{}'",
            escaped
        ))?;
        Ok(row
            .and_then(|r| r.get_or_empty(0).parse::<u64>().ok())
            .unwrap_or(0))
    }

    /// COUNT(*), 只适合小表
    pub fn exact_row_count(&mut self, table: &str) -> SResult<u64> {
        check_ident(table)?;
        let row = self.query_one(format!("SELECT COUNT(*) FROM {}", quote_ident(table)))?;
        Ok(row
            .and_then(|r| r.get_or_empty(0).parse::<u64>().ok())
            .unwrap_or(0))
    }

    /// DATA_LENGTH + INDEX_LENGTH
    pub fn byte_size(&mut self, table: &str) -> SResult<u64> {
        check_ident(table)?;
        let escaped = self.conn.escape_string(table);
        let row = self.query_one(format!(
            "SELECT DATA_LENGTH + INDEX_LENGTH FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = '{}'",
            escaped
        ))?;
        Ok(row
            .and_then(|r| r.get_or_empty(0).parse::<u64>().ok())
            .unwrap_or(0))
    }

    /// 某列是否为某个索引的首列 (含主键)
    pub fn column_indexed(&mut self, table: &str, column: &str) -> SResult<bool> {
        check_ident(table)?;
        let escaped_table = self.conn.escape_string(table);
        let escaped_column = self.conn.escape_string(column);
        let rows = self.conn.query(format!(
            "SELECT INDEX_NAME FROM INFORMATION_SCHEMA.STATISTICS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = '{}' \
             AND COLUMN_NAME = '{}' AND SEQ_IN_INDEX = 1",
            escaped_table, escaped_column
        ))?;
        Ok(!rows.is_empty())
    }

    fn query_one(&mut self, sql: String) -> SResult<Option<common::row::row_string::RowString>> {
        let mut rows = self.conn.query(sql)?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.remove(0)))
    }
}

fn check_ident(name: &str) -> SResult<()> {
    if !is_valid_ident(name) {
        return Err(SchemaError::String(format!(
            "illegal identifier: {}",
            name
        )));
    }
    Ok(())
}
