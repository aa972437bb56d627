use common::err::schema_error::SchemaError;
use common::err::SResult;
use common::row::row_string::RowString;

use connection::conn::connection::{escape_with_backslash, IConnection};
use connection::conn::query_result::{QueryColumn, StreamQueryResult};

/// 预先写好结果集的连接桩。
/// 按 SQL 前缀匹配返回行, 记录所有 exec 过的语句, 测试用
pub struct MockConnection {
    results: Vec<MockResult>,

    /// exec 过的语句, 按顺序
    pub executed: Vec<String>,

    /// 语句包含该子串时 exec 失败
    fail_on: Option<String>,

    last_error: Option<String>,
}

struct MockResult {
    sql_prefix: String,
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl MockConnection {
    pub fn new() -> Self {
        MockConnection {
            results: Vec::new(),
            executed: Vec::new(),
            fail_on: None,
            last_error: None,
        }
    }

    /// 注册一个查询结果。 前缀匹配, 先注册的优先
    pub fn with_query_result(
        mut self,
        sql_prefix: &str,
        columns: Vec<&str>,
        rows: Vec<Vec<Option<&str>>>,
    ) -> Self {
        self.results.push(MockResult {
            sql_prefix: sql_prefix.to_string(),
            columns: columns.into_iter().map(|c| c.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|v| v.map(|v| v.to_string())).collect())
                .collect(),
        });
        self
    }

    /// 注册一个空结果
    pub fn with_empty_result(self, sql_prefix: &str) -> Self {
        self.with_query_result(sql_prefix, vec![], vec![])
    }

    pub fn with_fail_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    fn find(&self, sql: &str) -> Option<&MockResult> {
        self.results.iter().find(|r| sql.starts_with(&r.sql_prefix))
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        MockConnection::new()
    }
}

impl IConnection for MockConnection {
    fn try_connect(&mut self) -> SResult<bool> {
        Ok(true)
    }

    fn exec(&mut self, sql: String) -> SResult<u64> {
        if let Some(needle) = &self.fail_on {
            if sql.contains(needle.as_str()) {
                let message = format!("forced failure on: {}", needle);
                self.last_error = Some(message.clone());
                return Err(SchemaError::StatementFailed { sql, message });
            }
        }
        self.executed.push(sql);
        Ok(0)
    }

    fn query(&mut self, sql: String) -> SResult<Vec<RowString>> {
        match self.find(&sql) {
            Some(result) => Ok(result
                .rows
                .iter()
                .map(|cells| RowString::new_row(cells.clone()))
                .collect()),
            None => Err(SchemaError::String(format!(
                "no mock result registered for: {}",
                sql
            ))),
        }
    }

    fn query_stream(&mut self, sql: String) -> SResult<StreamQueryResult<'_>> {
        match self.find(&sql) {
            Some(result) => {
                let columns = result
                    .columns
                    .iter()
                    .map(|name| QueryColumn::named(name))
                    .collect();
                let rows = result
                    .rows
                    .iter()
                    .map(|cells| RowString::new_row(cells.clone()))
                    .collect();
                Ok(StreamQueryResult::from_rows(columns, rows))
            }
            None => Err(SchemaError::String(format!(
                "no mock result registered for: {}",
                sql
            ))),
        }
    }

    fn escape_string(&self, value: &str) -> String {
        escape_with_backslash(value)
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
