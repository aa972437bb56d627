#[cfg(test)]
mod test_annotation {
    use schema::annotation::parser::AnnotationParser;
    use schema::ir::column::canonical_default;
    use schema::reconcile::create_table::render_create_table;

    const ACCOUNTS: &str = r#"
/// @tablecomment "Customer accounts"
/// @composite idx_status_created (status, created_at)
/// @compositeUnique (email, tenant_id)
model Accounts {
    table = accounts;
    timestamps = true;

    /// @autonumber
    id;

    /// @column @varchar 255
    email;

    /// @column @int @unsigned @primary
    tenant_id;

    /// @column @enum active,disabled @default active @index
    status;

    /// @column @decimal 12,4 @default 0
    balance;

    /// @column @datetime @nullable
    created_at;

    /// @column @datetime @nullable
    updated_at;
}
"#;

    #[test]
    fn test_parse_is_deterministic() {
        // 同一段文本解析两次得到同一个 IR
        let first = AnnotationParser::parse_text(ACCOUNTS).unwrap();
        let second = AnnotationParser::parse_text(ACCOUNTS).unwrap();
        assert_eq!(first, second);

        // 生成的 CREATE TABLE 也稳定
        assert_eq!(
            render_create_table(&first).unwrap(),
            render_create_table(&second).unwrap()
        );
    }

    #[test]
    fn test_enum_default_not_requoted() {
        // 'active' 不能二次加引号变成 ''active''
        let once = canonical_default("active");
        assert_eq!(once, "'active'");
        let twice = canonical_default(&once);
        assert_eq!(twice, "'active'");
    }

    #[test]
    fn test_full_create_table_shape() {
        let ir = AnnotationParser::parse_text(ACCOUNTS).unwrap();
        let sql = render_create_table(&ir).unwrap();

        assert!(sql.starts_with("CREATE TABLE `accounts` (\n"));
        assert!(sql.contains("  `id` INT(11) UNSIGNED NOT NULL AUTO_INCREMENT,\n"));
        assert!(sql.contains("  `balance` DECIMAL(12,4) NOT NULL DEFAULT '0',\n"));
        assert!(sql.contains("  PRIMARY KEY (`id`, `tenant_id`),\n"));
        assert!(sql.contains("  KEY `status_index` (`status`),\n"));
        assert!(sql.contains("  KEY `idx_status_created` (`status`, `created_at`),\n"));
        assert!(sql.contains("  UNIQUE KEY `unq_email_tenant_id` (`email`, `tenant_id`)\n"));
        assert!(sql.ends_with(
            ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci COMMENT='Customer accounts';"
        ));
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        // @xint 这类打错的 token 直接报 InvalidModel
        let err = AnnotationParser::parse_text(
            "model T {\n  /// @column @xint 11\n  n;\n}",
        )
        .unwrap_err();
        assert!(err.to_string().contains("@xint"));
    }
}
