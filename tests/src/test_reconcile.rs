#[cfg(test)]
mod test_reconcile {
    use schema::annotation::parser::AnnotationParser;
    use schema::mock::MockConnection;
    use schema::observed::table_reader::TableReader;
    use schema::reconcile::cost;
    use schema::reconcile::plan::StatementKind;
    use schema::reconcile::reconciler::Reconciler;

    const SHOW_COLUMNS_HEADER: [&str; 9] = [
        "Field", "Type", "Collation", "Null", "Key", "Default", "Extra", "Privileges", "Comment",
    ];

    /// 空库: SHOW TABLES LIKE 查不到任何表
    fn empty_database() -> MockConnection {
        MockConnection::new().with_empty_result("SHOW TABLES LIKE")
    }

    #[test]
    fn test_create_against_empty_database_is_one_statement() {
        // P1: 合法模型对空库的计划恰好一条 CREATE TABLE
        let ir = AnnotationParser::parse_text(
            "model Users {\n  /// @autonumber\n  id;\n  /// @column @varchar 255 @unique\n  email;\n}",
        )
        .unwrap();

        let mut conn = empty_database();
        let mut reader = TableReader::new(&mut conn);
        let plan = Reconciler::plan_create(&ir, &mut reader, true).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.statements[0].kind, StatementKind::CreateTable);
        assert!(plan.statements[0].sql.starts_with("CREATE TABLE `users`"));
    }

    #[test]
    fn test_create_over_existing_table_drops_first() {
        let ir = AnnotationParser::parse_text(
            "model Users {\n  /// @autonumber\n  id;\n}",
        )
        .unwrap();

        let mut conn = MockConnection::new().with_query_result(
            "SHOW TABLES LIKE",
            vec!["Tables_in_app (users)"],
            vec![vec![Some("users")]],
        );
        let mut reader = TableReader::new(&mut conn);
        let plan = Reconciler::plan_create(&ir, &mut reader, true).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.statements[0].sql, "DROP TABLE IF EXISTS `users`;");
        assert_eq!(plan.statements[1].kind, StatementKind::CreateTable);
    }

    #[test]
    fn test_fk_validation_passes_on_exact_type() {
        let ir = AnnotationParser::parse_text(
            "model Posts {\n  /// @autonumber\n  id;\n  /// @column @int @unsigned @index\n  /// @foreign users(id)\n  user_id;\n}",
        )
        .unwrap();

        let mut conn = MockConnection::new()
            .with_query_result(
                "SHOW TABLES LIKE",
                vec!["tables"],
                vec![vec![Some("users")]],
            )
            .with_query_result(
                "SHOW FULL COLUMNS FROM `users`",
                SHOW_COLUMNS_HEADER.to_vec(),
                vec![vec![
                    Some("id"),
                    Some("int(11) unsigned"),
                    None,
                    Some("NO"),
                    Some("PRI"),
                    None,
                    Some("auto_increment"),
                    Some(""),
                    Some(""),
                ]],
            )
            .with_query_result(
                "SELECT INDEX_NAME FROM INFORMATION_SCHEMA.STATISTICS",
                vec!["INDEX_NAME"],
                vec![vec![Some("PRIMARY")]],
            );

        let mut reader = TableReader::new(&mut conn);
        assert!(Reconciler::validate_foreign_keys(&ir, &mut reader).is_ok());
    }

    #[test]
    fn test_fk_type_mismatch_aborts_with_both_sides() {
        let ir = AnnotationParser::parse_text(
            "model Posts {\n  /// @autonumber\n  id;\n  /// @column @bigint @unsigned @index\n  /// @foreign users(id)\n  user_id;\n}",
        )
        .unwrap();

        let mut conn = MockConnection::new()
            .with_query_result(
                "SHOW TABLES LIKE",
                vec!["tables"],
                vec![vec![Some("users")]],
            )
            .with_query_result(
                "SHOW FULL COLUMNS FROM `users`",
                SHOW_COLUMNS_HEADER.to_vec(),
                vec![vec![
                    Some("id"),
                    Some("int(11) unsigned"),
                    None,
                    Some("NO"),
                    Some("PRI"),
                    None,
                    Some("auto_increment"),
                    Some(""),
                    Some(""),
                ]],
            )
            .with_query_result(
                "SELECT INDEX_NAME FROM INFORMATION_SCHEMA.STATISTICS",
                vec!["INDEX_NAME"],
                vec![vec![Some("PRIMARY")]],
            );

        let mut reader = TableReader::new(&mut conn);
        let err = Reconciler::validate_foreign_keys(&ir, &mut reader).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("BIGINT(20) UNSIGNED"), "{}", message);
        assert!(message.contains("int(11) unsigned"), "{}", message);
    }

    #[test]
    fn test_fk_missing_reference_table() {
        let ir = AnnotationParser::parse_text(
            "model Posts {\n  /// @autonumber\n  id;\n  /// @column @int @unsigned\n  /// @foreign users(id)\n  user_id;\n}",
        )
        .unwrap();

        let mut conn = empty_database();
        let mut reader = TableReader::new(&mut conn);
        let err = Reconciler::validate_foreign_keys(&ir, &mut reader).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_partition_switch_warns_once_on_big_table() {
        // S4: 50 万行的分区切换, 恰好一条警告
        let ir = AnnotationParser::parse_text(
            "/// @partition hash(source) 32\nmodel Events {\n  /// @column @bigint @primary\n  id;\n  /// @column @int @primary\n  source;\n}",
        )
        .unwrap();

        let observed = {
            use std::collections::BTreeMap;
            schema::observed::ObservedTable {
                name: "events".to_string(),
                columns: vec![
                    schema::observed::ObservedColumn {
                        name: "id".to_string(),
                        column_type: "bigint(20)".to_string(),
                        ..schema::observed::ObservedColumn::default()
                    },
                    schema::observed::ObservedColumn {
                        name: "source".to_string(),
                        column_type: "int(11)".to_string(),
                        ..schema::observed::ObservedColumn::default()
                    },
                ],
                primary_key: vec!["id".to_string(), "source".to_string()],
                indexes: Vec::new(),
                foreign_keys: BTreeMap::new(),
                partition: None,
                engine: "InnoDB".to_string(),
                charset: "utf8mb4".to_string(),
                collation: "utf8mb4_unicode_ci".to_string(),
                comment: String::new(),
            }
        };

        let plan = Reconciler::plan_update(&ir, &observed).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan.statements[0].sql,
            "ALTER TABLE `events` PARTITION BY HASH(`source`) PARTITIONS 32;"
        );

        let warnings = cost::scan(&plan, 500_000, 128 * 1024 * 1024);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("temp space"));
    }

    #[test]
    fn test_apply_then_plan_is_empty() {
        // P2 的近似: observed 恰为模型应用后的样子, 计划为空
        let ir = AnnotationParser::parse_text(
            r#"
/// @composite (status, created_at)
model Orders {
    /// @autonumber
    id;

    /// @column @varchar 64 @unique
    number;

    /// @column @enum open,closed @default open @index
    status;

    /// @column @datetime @nullable
    created_at;
}
"#,
        )
        .unwrap();

        let observed = {
            use std::collections::BTreeMap;

            let mut id = schema::observed::ObservedColumn {
                name: "id".to_string(),
                column_type: "int(11) unsigned".to_string(),
                ..schema::observed::ObservedColumn::default()
            };
            id.extra = "auto_increment".to_string();

            let number = schema::observed::ObservedColumn {
                name: "number".to_string(),
                column_type: "varchar(64)".to_string(),
                ..schema::observed::ObservedColumn::default()
            };

            let mut status = schema::observed::ObservedColumn {
                name: "status".to_string(),
                column_type: "enum('open','closed')".to_string(),
                ..schema::observed::ObservedColumn::default()
            };
            status.default = Some("'open'".to_string());

            let mut created_at = schema::observed::ObservedColumn {
                name: "created_at".to_string(),
                column_type: "datetime".to_string(),
                ..schema::observed::ObservedColumn::default()
            };
            created_at.nullable = true;

            schema::observed::ObservedTable {
                name: "orders".to_string(),
                columns: vec![id, number, status, created_at],
                primary_key: vec!["id".to_string()],
                indexes: vec![
                    schema::observed::ObservedIndex {
                        name: "number_unique".to_string(),
                        columns: vec!["number".to_string()],
                        unique: true,
                        fulltext: false,
                    },
                    schema::observed::ObservedIndex {
                        name: "status_index".to_string(),
                        columns: vec!["status".to_string()],
                        unique: false,
                        fulltext: false,
                    },
                    schema::observed::ObservedIndex {
                        name: "idx_status_created_at".to_string(),
                        columns: vec!["status".to_string(), "created_at".to_string()],
                        unique: false,
                        fulltext: false,
                    },
                ],
                foreign_keys: BTreeMap::new(),
                partition: None,
                engine: "InnoDB".to_string(),
                charset: "utf8mb4".to_string(),
                collation: "utf8mb4_unicode_ci".to_string(),
                comment: String::new(),
            }
        };

        let plan = Reconciler::plan_update(&ir, &observed).unwrap();
        assert!(plan.is_empty(), "unexpected plan: {:?}", plan.sql_lines());
    }
}
