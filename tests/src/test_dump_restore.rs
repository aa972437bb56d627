#[cfg(test)]
mod test_dump_restore {
    use std::io::BufReader;

    use dump::reader::RestoreReader;
    use dump::writer::DumpWriter;
    use schema::mock::MockConnection;

    const SHOW_COLUMNS_HEADER: [&str; 9] = [
        "Field", "Type", "Collation", "Null", "Key", "Default", "Extra", "Privileges", "Comment",
    ];

    /// t1 行数可调, t2 固定 17 行
    fn source_database(t1_rows: usize) -> MockConnection {
        let mut conn = MockConnection::new();

        for table in ["t1", "t2"] {
            conn = conn
                .with_query_result(
                    &format!("SHOW FULL COLUMNS FROM `{}`", table),
                    SHOW_COLUMNS_HEADER.to_vec(),
                    vec![
                        vec![
                            Some("id"),
                            Some("int(11)"),
                            None,
                            Some("NO"),
                            Some("PRI"),
                            None,
                            Some(""),
                            Some(""),
                            Some(""),
                        ],
                        vec![
                            Some("payload"),
                            Some("varchar(255)"),
                            Some("utf8mb4_unicode_ci"),
                            Some("YES"),
                            Some(""),
                            None,
                            Some(""),
                            Some(""),
                            Some(""),
                        ],
                    ],
                );
        }

        conn = conn
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
                vec![vec![Some("InnoDB"), Some("utf8mb4_unicode_ci"), Some("")]],
            );

        let t1: Vec<Vec<Option<String>>> = (0..t1_rows)
            .map(|i| vec![Some(i.to_string()), Some(format!("row {}", i))])
            .collect();
        let t1_ref: Vec<Vec<Option<&str>>> = t1
            .iter()
            .map(|r| r.iter().map(|c| c.as_deref()).collect())
            .collect();
        conn = conn.with_query_result("SELECT * FROM `t1`", vec!["id", "payload"], t1_ref);

        let t2: Vec<Vec<Option<String>>> = (0..17)
            .map(|i| vec![Some(i.to_string()), None])
            .collect();
        let t2_ref: Vec<Vec<Option<&str>>> = t2
            .iter()
            .map(|r| r.iter().map(|c| c.as_deref()).collect())
            .collect();
        conn.with_query_result("SELECT * FROM `t2`", vec!["id", "payload"], t2_ref)
    }

    #[test]
    fn test_round_trip_batches_and_counts() {
        // S5: 2500 行拆 1000/1000/500, 17 行一批
        let mut source = source_database(2500);
        let mut sink: Vec<u8> = Vec::new();

        let tables = vec!["t1".to_string(), "t2".to_string()];
        let stats = DumpWriter::dump(&mut source, "app", &tables, &mut sink).unwrap();
        assert_eq!(stats.tables, 2);
        assert_eq!(stats.rows, 2517);

        let text = String::from_utf8(sink).unwrap();
        let t1_batches: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("INSERT INTO `t1`"))
            .collect();
        let t2_batches: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("INSERT INTO `t2`"))
            .collect();
        assert_eq!(t1_batches.len(), 3);
        assert_eq!(t2_batches.len(), 1);

        // P3: 对空库重放, 每张表的行数一致
        let mut target = MockConnection::new();
        let restore_stats =
            RestoreReader::restore(&mut target, BufReader::new(text.as_bytes())).unwrap();

        // 2 条 SET + 每表 DROP/CREATE + 4 个 INSERT 批
        assert_eq!(restore_stats.statements, 10);

        let restored_t1_rows: usize = target
            .executed
            .iter()
            .filter(|s| s.starts_with("INSERT INTO `t1`"))
            .map(|s| s.matches("), (").count() + 1)
            .sum();
        assert_eq!(restored_t1_rows, 2500);

        let restored_t2_rows: usize = target
            .executed
            .iter()
            .filter(|s| s.starts_with("INSERT INTO `t2`"))
            .map(|s| s.matches("), (").count() + 1)
            .sum();
        assert_eq!(restored_t2_rows, 17);

        // 结构语句按表重放
        assert!(target
            .executed
            .iter()
            .any(|s| s == "DROP TABLE IF EXISTS `t1`;"));
        assert!(target
            .executed
            .iter()
            .any(|s| s.starts_with("CREATE TABLE `t2` (")));
    }

    #[test]
    fn test_values_with_semicolons_and_newlines_survive() {
        // 值里的 ; 和换行经转义落在同一行, 导入侧不会错切语句
        let mut source = MockConnection::new()
            .with_query_result(
                "SHOW FULL COLUMNS FROM `notes`",
                SHOW_COLUMNS_HEADER.to_vec(),
                vec![vec![
                    Some("body"),
                    Some("text"),
                    Some("utf8mb4_unicode_ci"),
                    Some("YES"),
                    Some(""),
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
            .with_query_result(
                "SELECT * FROM `notes`",
                vec!["body"],
                vec![vec![Some("line one;\nline two; done")]],
            );

        let mut sink: Vec<u8> = Vec::new();
        DumpWriter::dump(&mut source, "app", &["notes".to_string()], &mut sink).unwrap();
        let text = String::from_utf8(sink).unwrap();

        // 换行被转义, INSERT 仍是单行
        assert!(text.contains("VALUES ('line one;\\nline two; done');"));

        let mut target = MockConnection::new();
        RestoreReader::restore(&mut target, BufReader::new(text.as_bytes())).unwrap();

        let inserts: Vec<&String> = target
            .executed
            .iter()
            .filter(|s| s.starts_with("INSERT INTO `notes`"))
            .collect();
        assert_eq!(inserts.len(), 1);
        assert!(inserts[0].contains("line one;\\nline two; done"));
    }
}
