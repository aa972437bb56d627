#[cfg(test)]
mod test_migrate {
    use std::collections::BTreeMap;

    use schema::annotation::parser::AnnotationParser;
    use schema::ir::table::TableIr;
    use schema::migrate::diff;

    fn snapshot(models: Vec<&str>) -> BTreeMap<String, TableIr> {
        models
            .into_iter()
            .map(|text| {
                let ir = AnnotationParser::parse_text(text).unwrap();
                (ir.table_name.clone(), ir)
            })
            .collect()
    }

    #[test]
    fn test_mixed_change_set_is_mirrored() {
        let from = snapshot(vec![
            "model Users {\n  /// @autonumber\n  id;\n  /// @column @varchar 255\n  email;\n  /// @column @varchar 32\n  phone;\n}",
            "model Sessions {\n  /// @uuid\n  token;\n}",
        ]);
        let to = snapshot(vec![
            // email 变长, phone 删除, nickname 新增
            "model Users {\n  /// @autonumber\n  id;\n  /// @column @varchar 100\n  email;\n  /// @column @varchar 64\n  nickname;\n}",
            // sessions 删除, audit 新增
            "model Audit {\n  /// @autonumber\n  id;\n  /// @column @json @nullable\n  payload;\n}",
        ]);

        let script = diff(&from, &to).unwrap();

        // up: 建 audit, 删 sessions, users 的加列/删列/改列
        assert!(script.up.iter().any(|s| s.starts_with("CREATE TABLE `audit`")));
        assert!(script.up.contains(&"DROP TABLE `sessions`;".to_string()));
        assert!(script
            .up
            .iter()
            .any(|s| s.contains("ADD COLUMN `nickname` VARCHAR(64) NOT NULL")));
        assert!(script
            .up
            .iter()
            .any(|s| s.contains("DROP COLUMN `phone`")));
        // 变更 = 删旧 + 加新
        let drop_email = script
            .up
            .iter()
            .position(|s| s.contains("DROP COLUMN `email`"))
            .unwrap();
        let add_email = script
            .up
            .iter()
            .position(|s| s.contains("ADD COLUMN `email` VARCHAR(100) NOT NULL"))
            .unwrap();
        assert_eq!(add_email, drop_email + 1);

        // down 是 up 的镜像: 重建 sessions, 删 audit, email 回到 255
        assert!(script
            .down
            .iter()
            .any(|s| s.starts_with("CREATE TABLE `sessions`")));
        assert!(script.down.contains(&"DROP TABLE `audit`;".to_string()));
        assert!(script
            .down
            .iter()
            .any(|s| s.contains("ADD COLUMN `email` VARCHAR(255) NOT NULL")));
        assert!(script
            .down
            .iter()
            .any(|s| s.contains("ADD COLUMN `phone` VARCHAR(32) NOT NULL")));

        // up 与 down 数量一致
        assert_eq!(script.up.len(), script.down.len());
    }

    #[test]
    fn test_check_constraint_diff() {
        let from = snapshot(vec![
            "model Orders {\n  /// @autonumber\n  id;\n  /// @column @decimal 10,2\n  total;\n}",
        ]);
        let to = snapshot(vec![
            "model Orders {\n  /// @autonumber\n  id;\n  /// @column @decimal 10,2 @check total >= 0\n  total;\n}",
        ]);

        let script = diff(&from, &to).unwrap();
        assert_eq!(
            script.up,
            vec!["ALTER TABLE `orders` ADD CONSTRAINT `total_check` CHECK (total >= 0);"]
        );
        assert_eq!(
            script.down,
            vec!["ALTER TABLE `orders` DROP CHECK `total_check`;"]
        );
    }
}
