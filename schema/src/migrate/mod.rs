pub mod snapshot;

use std::collections::BTreeMap;

use serde::Serialize;

use common::err::SResult;

use crate::ir::column::ColumnIr;
use crate::ir::index::fulltext_index_name;
use crate::ir::table::TableIr;
use crate::quote_ident;
use crate::reconcile::column_change::CanonicalColumn;
use crate::reconcile::create_table::render_create_table;

/// 手写迁移脚本的素材: 正向与反向语句。
/// down 按 up 动作的逆序排列
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationScript {
    pub up: Vec<String>,
    pub down: Vec<String>,
}

impl MigrationScript {
    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty()
    }
}

/// 一个可逆动作: up 语句与对应的 down 语句
struct Action {
    up: Vec<String>,
    down: Vec<String>,
}

/// 两份 schema 快照 (table → IR) 的双向 diff。
/// 新增表: up 建表, down 删表; 删除表反之;
/// 共有表按列/外键/索引/检查约束独立比较, 变更一律 drop旧 + add新
pub fn diff(from: &BTreeMap<String, TableIr>, to: &BTreeMap<String, TableIr>) -> SResult<MigrationScript> {
    let mut actions: Vec<Action> = Vec::new();

    for (name, table) in to {
        if !from.contains_key(name) {
            actions.push(Action {
                up: vec![render_create_table(table)?],
                down: vec![format!("DROP TABLE {};", quote_ident(name))],
            });
        }
    }

    for (name, table) in from {
        match to.get(name) {
            None => {
                actions.push(Action {
                    up: vec![format!("DROP TABLE {};", quote_ident(name))],
                    down: vec![render_create_table(table)?],
                });
            }
            Some(new_table) => {
                diff_columns(table, new_table, &mut actions);
                diff_checks(table, new_table, &mut actions);
                diff_foreign_keys(table, new_table, &mut actions);
                diff_indexes(table, new_table, &mut actions);
            }
        }
    }

    let mut script = MigrationScript::default();
    for action in &actions {
        script.up.extend(action.up.iter().cloned());
    }
    for action in actions.iter().rev() {
        script.down.extend(action.down.iter().cloned());
    }

    Ok(script)
}

fn add_column_sql(table: &str, column: &ColumnIr) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}{};",
        quote_ident(table),
        quote_ident(&column.name),
        column.render_definition(),
        column.position_clause()
    )
}

fn drop_column_sql(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {};",
        quote_ident(table),
        quote_ident(column)
    )
}

fn diff_columns(old: &TableIr, new: &TableIr, actions: &mut Vec<Action>) {
    let table = &old.table_name;

    for column in new.live_columns() {
        if old.column(&column.name).is_none() {
            actions.push(Action {
                up: vec![add_column_sql(table, column)],
                down: vec![drop_column_sql(table, &column.name)],
            });
        }
    }

    for column in old.live_columns() {
        match new.column(&column.name) {
            None => {
                actions.push(Action {
                    up: vec![drop_column_sql(table, &column.name)],
                    down: vec![add_column_sql(table, column)],
                });
            }
            Some(new_column) => {
                let left = CanonicalColumn::from_ir(column);
                let right = CanonicalColumn::from_ir(new_column);
                if left.differs(&right) {
                    // 变更 = 删旧 + 加新
                    actions.push(Action {
                        up: vec![
                            drop_column_sql(table, &column.name),
                            add_column_sql(table, new_column),
                        ],
                        down: vec![
                            drop_column_sql(table, &new_column.name),
                            add_column_sql(table, column),
                        ],
                    });
                }
            }
        }
    }
}

fn check_name(column: &str) -> String {
    format!("{}_check", column)
}

fn add_check_sql(table: &str, column: &str, expr: &str) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({});",
        quote_ident(table),
        quote_ident(&check_name(column)),
        expr
    )
}

fn drop_check_sql(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CHECK {};",
        quote_ident(table),
        quote_ident(&check_name(column))
    )
}

fn diff_checks(old: &TableIr, new: &TableIr, actions: &mut Vec<Action>) {
    let table = &old.table_name;

    for column in new.live_columns() {
        let new_check = column.check.as_deref();
        let old_check = old.column(&column.name).and_then(|c| c.check.as_deref());

        match (old_check, new_check) {
            (None, Some(expr)) => actions.push(Action {
                up: vec![add_check_sql(table, &column.name, expr)],
                down: vec![drop_check_sql(table, &column.name)],
            }),
            (Some(expr), None) => actions.push(Action {
                up: vec![drop_check_sql(table, &column.name)],
                down: vec![add_check_sql(table, &column.name, expr)],
            }),
            (Some(old_expr), Some(new_expr)) if old_expr != new_expr => {
                actions.push(Action {
                    up: vec![
                        drop_check_sql(table, &column.name),
                        add_check_sql(table, &column.name, new_expr),
                    ],
                    down: vec![
                        drop_check_sql(table, &column.name),
                        add_check_sql(table, &column.name, old_expr),
                    ],
                });
            }
            _ => {}
        }
    }
}

fn add_fk_sql(table: &TableIr, column: &ColumnIr) -> String {
    let foreign = column.foreign.as_ref().unwrap();
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {};",
        quote_ident(&table.table_name),
        quote_ident(&table.foreign_key_name(&column.name)),
        quote_ident(&column.name),
        quote_ident(&foreign.ref_table),
        quote_ident(&foreign.ref_column),
        foreign.on_delete.as_sql(),
        foreign.on_update.as_sql()
    )
}

fn drop_fk_sql(table: &TableIr, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP FOREIGN KEY {};",
        quote_ident(&table.table_name),
        quote_ident(&table.foreign_key_name(column))
    )
}

fn diff_foreign_keys(old: &TableIr, new: &TableIr, actions: &mut Vec<Action>) {
    for (column, _) in new.foreign_keys() {
        let old_fk = old.column(&column.name).and_then(|c| c.foreign.as_ref());
        if old_fk.is_none() {
            actions.push(Action {
                up: vec![add_fk_sql(new, column)],
                down: vec![drop_fk_sql(new, &column.name)],
            });
        }
    }

    for (column, foreign) in old.foreign_keys() {
        match new.column(&column.name).and_then(|c| c.foreign.as_ref()) {
            None => actions.push(Action {
                up: vec![drop_fk_sql(old, &column.name)],
                down: vec![add_fk_sql(old, column)],
            }),
            Some(new_foreign) => {
                if foreign != new_foreign {
                    let new_column = new.column(&column.name).unwrap();
                    actions.push(Action {
                        up: vec![drop_fk_sql(old, &column.name), add_fk_sql(new, new_column)],
                        down: vec![drop_fk_sql(new, &column.name), add_fk_sql(old, column)],
                    });
                }
            }
        }
    }
}

/// name → (列序, unique, fulltext)
fn index_map(table: &TableIr) -> BTreeMap<String, (Vec<String>, bool, bool)> {
    let mut map = BTreeMap::new();

    for index in &table.composite_indexes {
        map.insert(index.name.clone(), (index.columns.clone(), false, false));
    }
    for index in &table.composite_unique_indexes {
        map.insert(index.name.clone(), (index.columns.clone(), true, false));
    }
    for index in table.simple_indexes() {
        map.insert(index.name, (vec![index.column], index.unique, false));
    }
    for column in table.fulltext_columns() {
        map.insert(
            fulltext_index_name(&column.name),
            (vec![column.name.clone()], false, true),
        );
    }

    map
}

fn add_index_sql(table: &str, name: &str, columns: &[String], unique: bool, fulltext: bool) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let keyword = if fulltext {
        "FULLTEXT INDEX"
    } else if unique {
        "UNIQUE INDEX"
    } else {
        "INDEX"
    };
    format!(
        "ALTER TABLE {} ADD {} {} ({});",
        quote_ident(table),
        keyword,
        quote_ident(name),
        quoted.join(", ")
    )
}

fn drop_index_sql(table: &str, name: &str) -> String {
    format!(
        "ALTER TABLE {} DROP INDEX {};",
        quote_ident(table),
        quote_ident(name)
    )
}

fn diff_indexes(old: &TableIr, new: &TableIr, actions: &mut Vec<Action>) {
    let table = &old.table_name;
    let old_indexes = index_map(old);
    let new_indexes = index_map(new);

    for (name, (columns, unique, fulltext)) in &new_indexes {
        if !old_indexes.contains_key(name) {
            actions.push(Action {
                up: vec![add_index_sql(table, name, columns, *unique, *fulltext)],
                down: vec![drop_index_sql(table, name)],
            });
        }
    }

    for (name, (columns, unique, fulltext)) in &old_indexes {
        match new_indexes.get(name) {
            None => actions.push(Action {
                up: vec![drop_index_sql(table, name)],
                down: vec![add_index_sql(table, name, columns, *unique, *fulltext)],
            }),
            Some((new_columns, new_unique, new_fulltext)) => {
                if columns != new_columns || unique != new_unique || fulltext != new_fulltext {
                    actions.push(Action {
                        up: vec![
                            drop_index_sql(table, name),
                            add_index_sql(table, name, new_columns, *new_unique, *new_fulltext),
                        ],
                        down: vec![
                            drop_index_sql(table, name),
                            add_index_sql(table, name, columns, *unique, *fulltext),
                        ],
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use crate::annotation::parser::AnnotationParser;
    use crate::ir::table::TableIr;
    use crate::migrate::diff;

    fn snapshot(models: Vec<&str>) -> BTreeMap<String, TableIr> {
        models
            .into_iter()
            .map(|text| {
                let ir = AnnotationParser::parse_text(text).unwrap();
                (ir.table_name.clone(), ir)
            })
            .collect()
    }

    const USERS: &str =
        "model Users {\n  /// @autonumber\n  id;\n  /// @column @varchar 255\n  email;\n}";

    #[test]
    fn test_identity_is_empty() {
        // P5: differ(A,A) = {up:[], down:[]}
        let a = snapshot(vec![USERS]);
        let script = diff(&a, &a).unwrap();
        assert!(script.is_empty());
    }

    #[test]
    fn test_added_table() {
        let from = snapshot(vec![]);
        let to = snapshot(vec![USERS]);

        let script = diff(&from, &to).unwrap();
        assert_eq!(script.up.len(), 1);
        assert!(script.up[0].starts_with("CREATE TABLE `users`"));
        assert_eq!(script.down, vec!["DROP TABLE `users`;"]);

        // 方向互换后镜像
        let script = diff(&to, &from).unwrap();
        assert_eq!(script.up, vec!["DROP TABLE `users`;"]);
        assert!(script.down[0].starts_with("CREATE TABLE `users`"));
    }

    #[test]
    fn test_column_change_is_drop_add() {
        let from = snapshot(vec![USERS]);
        let to = snapshot(vec![
            "model Users {\n  /// @autonumber\n  id;\n  /// @column @varchar 100\n  email;\n}",
        ]);

        let script = diff(&from, &to).unwrap();
        assert_eq!(
            script.up,
            vec![
                "ALTER TABLE `users` DROP COLUMN `email`;",
                "ALTER TABLE `users` ADD COLUMN `email` VARCHAR(100) NOT NULL;",
            ]
        );
        assert_eq!(
            script.down,
            vec![
                "ALTER TABLE `users` DROP COLUMN `email`;",
                "ALTER TABLE `users` ADD COLUMN `email` VARCHAR(255) NOT NULL;",
            ]
        );
    }

    #[test]
    fn test_down_reverses_up_order() {
        let from = snapshot(vec![USERS]);
        let to = snapshot(vec![
            "model Users {\n  /// @autonumber\n  id;\n  /// @column @varchar 255\n  email;\n  /// @column @int @index\n  age;\n  /// @column @varchar 64\n  city;\n}",
        ]);

        let script = diff(&from, &to).unwrap();
        // up: 两个加列动作 + 一个索引动作
        assert_eq!(script.up.len(), 3);
        assert!(script.up[0].contains("ADD COLUMN `age`"));
        assert!(script.up[1].contains("ADD COLUMN `city`"));
        assert!(script.up[2].contains("ADD INDEX `age_index`"));

        // down 逆序
        assert_eq!(script.down.len(), 3);
        assert!(script.down[0].contains("DROP INDEX `age_index`"));
        assert!(script.down[1].contains("DROP COLUMN `city`"));
        assert!(script.down[2].contains("DROP COLUMN `age`"));
    }

    #[test]
    fn test_fk_change_mirrored() {
        let from = snapshot(vec![
            "model Posts {\n  /// @autonumber\n  id;\n  /// @column @int @unsigned @index\n  /// @foreign users(id)\n  user_id;\n}",
        ]);
        let to = snapshot(vec![
            "model Posts {\n  /// @autonumber\n  id;\n  /// @column @int @unsigned @index\n  /// @foreign users(id) @ondelete CASCADE\n  user_id;\n}",
        ]);

        let script = diff(&from, &to).unwrap();
        assert_eq!(script.up.len(), 2);
        assert!(script.up[0].contains("DROP FOREIGN KEY `fk_posts_user_id`"));
        assert!(script.up[1].contains("ON DELETE CASCADE"));

        assert_eq!(script.down.len(), 2);
        assert!(script.down[0].contains("DROP FOREIGN KEY `fk_posts_user_id`"));
        assert!(script.down[1].contains("ON DELETE RESTRICT"));
    }

    #[test]
    fn test_disjoint_tables_concatenate() {
        // P5: 无共同表时等于 B 的纯增加 + A 的纯删除
        let from = snapshot(vec![USERS]);
        let to = snapshot(vec![
            "model Orders {\n  /// @autonumber\n  id;\n  /// @column @decimal 10,2\n  total;\n}",
        ]);

        let script = diff(&from, &to).unwrap();
        assert_eq!(script.up.len(), 2);
        assert!(script.up[0].starts_with("CREATE TABLE `orders`"));
        assert_eq!(script.up[1], "DROP TABLE `users`;");

        assert_eq!(script.down.len(), 2);
        assert!(script.down[0].starts_with("CREATE TABLE `users`"));
        assert_eq!(script.down[1], "DROP TABLE `orders`;");
    }
}
