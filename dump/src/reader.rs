use std::io::BufRead;

use tracing::debug;

use common::err::schema_error::SchemaError;
use common::err::SResult;

use connection::conn::connection::IConnection;

use crate::progress::Progress;

/// 每多少条语句刷新一次进度
pub const PROGRESS_EVERY_STATEMENTS: usize = 100;

#[derive(Debug, Default)]
pub struct RestoreStats {
    pub statements: usize,
}

/// 逐行读 SQL 流, 在语句边界切分后顺序执行。
/// 失败即终止, 不回滚, 已执行的语句保持生效
pub struct RestoreReader;

impl RestoreReader {
    pub fn restore<R: BufRead>(conn: &mut dyn IConnection, source: R) -> SResult<RestoreStats> {
        let mut stats = RestoreStats::default();
        let mut progress = Progress::new("restoring:");

        let mut buffer = String::new();
        let mut line_no = 0usize;

        for line in source.lines() {
            let line = line?;
            line_no += 1;

            let trimmed = line.trim_start();

            // 注释行
            if trimmed.starts_with("--") {
                continue;
            }
            // 空行
            if trimmed.is_empty() {
                continue;
            }

            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(&line);

            // 语句边界: 右侧去空白后以分号结尾
            if !buffer.trim_end().ends_with(';') {
                continue;
            }

            let statement = std::mem::take(&mut buffer);
            if let Err(err) = conn.exec(statement.clone()) {
                let message = match &err {
                    SchemaError::StatementFailed { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                return Err(SchemaError::ImportFailed {
                    line: line_no,
                    statement,
                    message,
                });
            }

            stats.statements += 1;
            if stats.statements % PROGRESS_EVERY_STATEMENTS == 0 {
                progress.update(&format!("{} statements", stats.statements));
            }
        }

        if !buffer.trim().is_empty() {
            debug!("restore stream ended with an unterminated statement, ignored");
        }

        progress.finish(&format!("{} statements", stats.statements));
        Ok(stats)
    }
}

#[cfg(test)]
mod test {
    use std::io::BufReader;

    use connection::conn::connection::IConnection;
    use schema::mock::MockConnection;

    use crate::reader::RestoreReader;

    const DUMP: &str = "\
-- dump header
-- database: app

SET FOREIGN_KEY_CHECKS=0;

DROP TABLE IF EXISTS `users`;
CREATE TABLE `users` (
  `id` int(11) NOT NULL,
  PRIMARY KEY (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;
INSERT INTO `users` (`id`) VALUES ('1'), ('2');

SET FOREIGN_KEY_CHECKS=1;
";

    #[test]
    fn test_statement_split() {
        let mut conn = MockConnection::new();
        let stats =
            RestoreReader::restore(&mut conn, BufReader::new(DUMP.as_bytes())).unwrap();

        assert_eq!(stats.statements, 5);
        assert_eq!(conn.executed[0], "SET FOREIGN_KEY_CHECKS=0;");
        assert_eq!(conn.executed[1], "DROP TABLE IF EXISTS `users`;");
        assert!(conn.executed[2].starts_with("CREATE TABLE `users` (\n"));
        assert!(conn.executed[2].ends_with("COLLATE=utf8mb4_unicode_ci;"));
        assert!(conn.executed[3].starts_with("INSERT INTO `users`"));
        assert_eq!(conn.executed[4], "SET FOREIGN_KEY_CHECKS=1;");
    }

    #[test]
    fn test_failure_carries_line_and_statement() {
        let mut conn = MockConnection::new().with_fail_on("INSERT INTO `users`");
        let err =
            RestoreReader::restore(&mut conn, BufReader::new(DUMP.as_bytes())).unwrap_err();

        match err {
            common::err::schema_error::SchemaError::ImportFailed {
                line,
                statement,
                message,
            } => {
                assert_eq!(line, 11);
                assert!(statement.starts_with("INSERT INTO `users`"));
                assert!(message.contains("forced failure"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // 失败之前的语句保持生效
        assert_eq!(conn.executed.len(), 3);
        assert!(conn.last_error().is_some());
    }

    #[test]
    fn test_multi_line_statement() {
        let text = "CREATE TABLE `t` (\n  `a` int(11) NOT NULL\n);\n";
        let mut conn = MockConnection::new();
        let stats =
            RestoreReader::restore(&mut conn, BufReader::new(text.as_bytes())).unwrap();

        assert_eq!(stats.statements, 1);
        assert_eq!(
            conn.executed[0],
            "CREATE TABLE `t` (\n  `a` int(11) NOT NULL\n);"
        );
    }
}
