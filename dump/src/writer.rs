use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use common::err::SResult;
use common::time_util::{now_file_str, now_str};

use connection::conn::connection::{escape_with_backslash, IConnection};

use schema::observed::table_reader::TableReader;
use schema::quote_ident;
use schema::reconcile::create_table::render_create_table_observed;

use crate::progress::Progress;

/// 多行 INSERT 的固定批大小
pub const INSERT_BATCH_SIZE: usize = 1000;

/// 每多少行刷新一次进度
pub const PROGRESS_EVERY_ROWS: u64 = 10_000;

#[derive(Debug, Default)]
pub struct DumpStats {
    pub tables: usize,
    pub rows: u64,
}

/// 把若干表的结构和数据流式写成 SQL 文本。
/// 数据走无缓冲的行流, 任意大的表都只占有限内存
pub struct DumpWriter;

impl DumpWriter {
    /// 约定的导出文件名: {database}_backup_{YYYY-MM-DD_HHMMSS}.sql
    pub fn default_export_path(exports_dir: &Path, database: &str) -> PathBuf {
        exports_dir.join(format!("{}_backup_{}.sql", database, now_file_str()))
    }

    pub fn dump<W: Write>(
        conn: &mut dyn IConnection,
        database: &str,
        tables: &[String],
        sink: &mut W,
    ) -> SResult<DumpStats> {
        let mut stats = DumpStats::default();

        writeln!(sink, "-- MySQL schema toolkit dump")?;
        writeln!(sink, "-- database: {}", database)?;
        writeln!(sink, "-- created_at: {}", now_str())?;
        writeln!(sink, "-- tables: {}", tables.len())?;
        writeln!(sink)?;
        writeln!(sink, "SET FOREIGN_KEY_CHECKS=0;")?;

        for table in tables {
            DumpWriter::dump_table(conn, table, sink, &mut stats)?;
        }

        writeln!(sink)?;
        writeln!(sink, "SET FOREIGN_KEY_CHECKS=1;")?;
        sink.flush()?;

        stats.tables = tables.len();
        Ok(stats)
    }

    fn dump_table<W: Write>(
        conn: &mut dyn IConnection,
        table: &str,
        sink: &mut W,
        stats: &mut DumpStats,
    ) -> SResult<()> {
        let observed = {
            let mut reader = TableReader::new(&mut *conn);
            reader.observe(table)?
        };

        writeln!(sink)?;
        writeln!(sink, "DROP TABLE IF EXISTS {};", quote_ident(table))?;
        writeln!(sink, "{}", render_create_table_observed(&observed))?;

        let mut progress = Progress::new(&format!("dumping {}:", table));
        let mut table_rows = 0u64;
        let mut batch: Vec<String> = Vec::with_capacity(INSERT_BATCH_SIZE);

        let mut stream = conn.query_stream(format!("SELECT * FROM {}", quote_ident(table)))?;
        let column_list: Vec<String> = stream
            .column_names()
            .iter()
            .map(|c| quote_ident(c))
            .collect();
        let column_clause = column_list.join(",");

        while let Some(row) = stream.next() {
            let row = row?;

            let rendered: Vec<String> = row
                .as_slice()
                .iter()
                .map(|cell| match cell {
                    None => "NULL".to_string(),
                    Some(value) => format!("'{}'", escape_with_backslash(value)),
                })
                .collect();
            batch.push(format!("({})", rendered.join(",")));

            table_rows += 1;
            if batch.len() == INSERT_BATCH_SIZE {
                write_batch(sink, table, &column_clause, &mut batch)?;
            }
            if table_rows % PROGRESS_EVERY_ROWS == 0 {
                progress.update(&format!("{} rows", table_rows));
            }
        }
        drop(stream);

        if !batch.is_empty() {
            write_batch(sink, table, &column_clause, &mut batch)?;
        }

        progress.finish(&format!("{} rows", table_rows));
        debug!("dumped {} rows from {}", table_rows, table);

        stats.rows += table_rows;
        Ok(())
    }
}

fn write_batch<W: Write>(
    sink: &mut W,
    table: &str,
    column_clause: &str,
    batch: &mut Vec<String>,
) -> SResult<()> {
    writeln!(
        sink,
        "INSERT INTO {} ({}) VALUES {};",
        quote_ident(table),
        column_clause,
        batch.join(", ")
    )?;
    batch.clear();
    Ok(())
}

/// 单表导出为 CSV。 首行为列名
pub fn dump_table_csv<W: Write>(
    conn: &mut dyn IConnection,
    table: &str,
    sink: &mut W,
) -> SResult<u64> {
    let mut stream = conn.query_stream(format!("SELECT * FROM {}", quote_ident(table)))?;

    let header: Vec<String> = stream
        .column_names()
        .iter()
        .map(|c| csv_field(c))
        .collect();
    writeln!(sink, "{}", header.join(","))?;

    let mut rows = 0u64;
    while let Some(row) = stream.next() {
        let row = row?;
        let rendered: Vec<String> = row
            .as_slice()
            .iter()
            .map(|cell| match cell {
                None => String::new(),
                Some(value) => csv_field(value),
            })
            .collect();
        writeln!(sink, "{}", rendered.join(","))?;
        rows += 1;
    }

    sink.flush()?;
    Ok(rows)
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        return format!("\"{}\"", value.replace('"', "\"\""));
    }
    value.to_string()
}

#[cfg(test)]
mod test {
    use schema::mock::MockConnection;

    use crate::writer::{dump_table_csv, DumpWriter};

    fn users_schema_mock() -> MockConnection {
        MockConnection::new()
            .with_query_result(
                "SHOW FULL COLUMNS FROM `users`",
                vec![
                    "Field", "Type", "Collation", "Null", "Key", "Default", "Extra",
                    "Privileges", "Comment",
                ],
                vec![
                    vec![
                        Some("id"),
                        Some("int(11) unsigned"),
                        None,
                        Some("NO"),
                        Some("PRI"),
                        None,
                        Some("auto_increment"),
                        Some(""),
                        Some(""),
                    ],
                    vec![
                        Some("name"),
                        Some("varchar(100)"),
                        Some("utf8mb4_unicode_ci"),
                        Some("YES"),
                        Some(""),
                        None,
                        Some(""),
                        Some(""),
                        Some(""),
                    ],
                ],
            )
            .with_query_result(
                "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE, SEQ_IN_INDEX, INDEX_TYPE",
                vec![
                    "INDEX_NAME",
                    "COLUMN_NAME",
                    "NON_UNIQUE",
                    "SEQ_IN_INDEX",
                    "INDEX_TYPE",
                ],
                vec![vec![
                    Some("PRIMARY"),
                    Some("id"),
                    Some("0"),
                    Some("1"),
                    Some("BTREE"),
                ]],
            )
            .with_empty_result("SELECT kcu.CONSTRAINT_NAME")
            .with_empty_result("SELECT PARTITION_METHOD")
            .with_query_result(
                "SELECT ENGINE, TABLE_COLLATION, TABLE_COMMENT",
                vec!["ENGINE", "TABLE_COLLATION", "TABLE_COMMENT"],
                vec![vec![
                    Some("InnoDB"),
                    Some("utf8mb4_unicode_ci"),
                    Some(""),
                ]],
            )
            .with_query_result(
                "SELECT * FROM `users`",
                vec!["id", "name"],
                vec![
                    vec![Some("1"), Some("o'neill")],
                    vec![Some("2"), None],
                ],
            )
    }

    #[test]
    fn test_dump_layout() {
        let mut conn = users_schema_mock();
        let mut sink: Vec<u8> = Vec::new();

        let stats =
            DumpWriter::dump(&mut conn, "app", &["users".to_string()], &mut sink).unwrap();
        assert_eq!(stats.tables, 1);
        assert_eq!(stats.rows, 2);

        let text = String::from_utf8(sink).unwrap();
        assert!(text.starts_with("-- MySQL schema toolkit dump"));
        assert!(text.contains("-- database: app"));
        assert!(text.contains("SET FOREIGN_KEY_CHECKS=0;"));
        assert!(text.contains("DROP TABLE IF EXISTS `users`;"));
        assert!(text.contains("CREATE TABLE `users` ("));
        assert!(text.contains(
            "INSERT INTO `users` (`id`,`name`) VALUES ('1','o\\'neill'), ('2',NULL);"
        ));
        assert!(text.trim_end().ends_with("SET FOREIGN_KEY_CHECKS=1;"));
    }

    #[test]
    fn test_csv_export() {
        let mut conn = MockConnection::new().with_query_result(
            "SELECT * FROM `users`",
            vec!["id", "name"],
            vec![vec![Some("1"), Some("a,b")], vec![Some("2"), Some("plain")]],
        );

        let mut sink: Vec<u8> = Vec::new();
        let rows = dump_table_csv(&mut conn, "users", &mut sink).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(sink).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,name");
        assert_eq!(lines[1], "1,\"a,b\"");
        assert_eq!(lines[2], "2,plain");
    }

    #[test]
    fn test_batch_boundaries() {
        // 2500 行拆成 1000/1000/500 三个批
        let rows: Vec<Vec<Option<String>>> = (0..2500)
            .map(|i| vec![Some(i.to_string())])
            .collect();
        let rows_ref: Vec<Vec<Option<&str>>> = rows
            .iter()
            .map(|r| r.iter().map(|c| c.as_deref()).collect())
            .collect();

        let mut conn = MockConnection::new()
            .with_query_result(
                "SHOW FULL COLUMNS FROM `t1`",
                vec![
                    "Field", "Type", "Collation", "Null", "Key", "Default", "Extra",
                    "Privileges", "Comment",
                ],
                vec![vec![
                    Some("id"),
                    Some("int(11)"),
                    None,
                    Some("NO"),
                    Some("PRI"),
                    None,
                    Some(""),
                    Some(""),
                    Some(""),
                ]],
            )
            .with_query_result(
                "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE, SEQ_IN_INDEX, INDEX_TYPE",
                vec![
                    "INDEX_NAME",
                    "COLUMN_NAME",
                    "NON_UNIQUE",
                    "SEQ_IN_INDEX",
                    "INDEX_TYPE",
                ],
                vec![],
            )
            .with_empty_result("SELECT kcu.CONSTRAINT_NAME")
            .with_empty_result("SELECT PARTITION_METHOD")
            .with_query_result(
                "SELECT ENGINE, TABLE_COLLATION, TABLE_COMMENT",
                vec!["ENGINE", "TABLE_COLLATION", "TABLE_COMMENT"],
                vec![vec![Some("InnoDB"), Some("utf8mb4_unicode_ci"), Some("")]],
            )
            .with_query_result("SELECT * FROM `t1`", vec!["id"], rows_ref);

        let mut sink: Vec<u8> = Vec::new();
        let stats =
            DumpWriter::dump(&mut conn, "app", &["t1".to_string()], &mut sink).unwrap();
        assert_eq!(stats.rows, 2500);

        let text = String::from_utf8(sink).unwrap();
        let inserts: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("INSERT INTO `t1`"))
            .collect();
        assert_eq!(inserts.len(), 3);
        assert_eq!(inserts[0].matches("),").count() + 1, 1000);
        assert_eq!(inserts[2].matches("),").count() + 1, 500);
    }
}
