use common::err::schema_error::SchemaError;
use common::err::SResult;

use crate::ir::column::{canonical_default, escape_sql_literal};
use crate::ir::index::fulltext_index_name;
use crate::ir::table::TableIr;
use crate::observed::ObservedTable;
use crate::quote_ident;

/// 期望 IR 的 CREATE TABLE。
/// 列两空格缩进; key 子句顺序: 主键, 单列 unique, 单列 key,
/// 复合普通, 复合唯一, 全文, 外键
pub fn render_create_table(ir: &TableIr) -> SResult<String> {
    let mut clauses: Vec<String> = Vec::new();

    for column in ir.live_columns() {
        clauses.push(format!(
            "{} {}",
            quote_ident(&column.name),
            column.render_definition()
        ));
    }

    let primary: Vec<String> = ir
        .primary_key_columns()
        .iter()
        .map(|c| quote_ident(c))
        .collect();
    if !primary.is_empty() {
        clauses.push(format!("PRIMARY KEY ({})", primary.join(", ")));
    }

    for index in ir.simple_indexes() {
        if index.unique {
            clauses.push(format!(
                "UNIQUE KEY {} ({})",
                quote_ident(&index.name),
                quote_ident(&index.column)
            ));
        }
    }
    for index in ir.simple_indexes() {
        if !index.unique {
            clauses.push(format!(
                "KEY {} ({})",
                quote_ident(&index.name),
                quote_ident(&index.column)
            ));
        }
    }

    for index in &ir.composite_indexes {
        clauses.push(format!(
            "KEY {} ({})",
            quote_ident(&index.name),
            quote_columns(&index.columns)
        ));
    }
    for index in &ir.composite_unique_indexes {
        clauses.push(format!(
            "UNIQUE KEY {} ({})",
            quote_ident(&index.name),
            quote_columns(&index.columns)
        ));
    }

    for column in ir.fulltext_columns() {
        clauses.push(format!(
            "FULLTEXT KEY {} ({})",
            quote_ident(&fulltext_index_name(&column.name)),
            quote_ident(&column.name)
        ));
    }

    for (column, foreign) in ir.foreign_keys() {
        clauses.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
            quote_ident(&ir.foreign_key_name(&column.name)),
            quote_ident(&column.name),
            quote_ident(&foreign.ref_table),
            quote_ident(&foreign.ref_column),
            foreign.on_delete.as_sql(),
            foreign.on_update.as_sql()
        ));
    }

    let mut closing = format!(
        "ENGINE={} DEFAULT CHARSET={} COLLATE={}",
        ir.engine, ir.charset, ir.collation
    );
    if let Some(comment) = &ir.table_comment {
        closing.push_str(&format!(" COMMENT='{}'", escape_sql_literal(comment)));
    }
    if let Some(partition) = &ir.partition {
        if !partition.kind.supported_by_generator() {
            return Err(SchemaError::invalid_model(
                &ir.model_name,
                None,
                format!(
                    "partition kind {} is not supported by the DDL generator",
                    partition.kind.as_sql()
                ),
            ));
        }
        closing.push_str(&format!(" {}", partition.render()));
    }

    Ok(format!(
        "CREATE TABLE {} (\n  {}\n) {};",
        quote_ident(&ir.table_name),
        clauses.join(",\n  "),
        closing
    ))
}

/// 从实际表结构再生成 CREATE TABLE, 导出时使用。
/// 回读值原样落盘, 保证 restore 后结构一致
pub fn render_create_table_observed(table: &ObservedTable) -> String {
    let mut clauses: Vec<String> = Vec::new();

    for column in &table.columns {
        let mut definition = format!("{} {}", quote_ident(&column.name), column.column_type);

        if column.nullable {
            definition.push_str(" NULL");
        } else {
            definition.push_str(" NOT NULL");
        }

        if let Some(default) = &column.default {
            definition.push_str(&format!(" DEFAULT {}", canonical_default(default)));
        }

        if column.is_auto_increment() {
            definition.push_str(" AUTO_INCREMENT");
        }

        if !column.comment.is_empty() {
            definition.push_str(&format!(" COMMENT '{}'", escape_sql_literal(&column.comment)));
        }

        clauses.push(definition);
    }

    if !table.primary_key.is_empty() {
        clauses.push(format!(
            "PRIMARY KEY ({})",
            quote_columns(&table.primary_key)
        ));
    }

    for index in &table.indexes {
        let clause = if index.fulltext {
            format!(
                "FULLTEXT KEY {} ({})",
                quote_ident(&index.name),
                quote_columns(&index.columns)
            )
        } else if index.unique {
            format!(
                "UNIQUE KEY {} ({})",
                quote_ident(&index.name),
                quote_columns(&index.columns)
            )
        } else {
            format!(
                "KEY {} ({})",
                quote_ident(&index.name),
                quote_columns(&index.columns)
            )
        };
        clauses.push(clause);
    }

    for foreign in table.foreign_keys.values() {
        clauses.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
            quote_ident(&foreign.constraint_name),
            quote_ident(&foreign.column),
            quote_ident(&foreign.ref_table),
            quote_ident(&foreign.ref_column),
            foreign.on_delete,
            foreign.on_update
        ));
    }

    let mut closing = format!(
        "ENGINE={} DEFAULT CHARSET={} COLLATE={}",
        table.engine, table.charset, table.collation
    );
    if !table.comment.is_empty() {
        closing.push_str(&format!(" COMMENT='{}'", escape_sql_literal(&table.comment)));
    }
    if let Some(partition) = &table.partition {
        closing.push_str(&format!(" {}", partition.render()));
    }

    format!(
        "CREATE TABLE {} (\n  {}\n) {};",
        quote_ident(&table.name),
        clauses.join(",\n  "),
        closing
    )
}

fn quote_columns(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod test {
    use crate::annotation::parser::AnnotationParser;
    use crate::reconcile::create_table::render_create_table;

    #[test]
    fn test_render() {
        let ir = AnnotationParser::parse_text(
            r#"
/// @tablecomment "Accounts"
/// @composite (status, created_at)
model Users {
    /// @autonumber
    id;

    /// @column @varchar 255 @unique
    email;

    /// @column @enum active,disabled @default active @index
    status;

    /// @column @datetime @nullable
    created_at;

    /// @column @int @unsigned @index
    /// @foreign orgs(id) @ondelete SET NULL
    org_id;
}
"#,
        )
        .unwrap();

        let sql = render_create_table(&ir).unwrap();

        let expected = "CREATE TABLE `users` (\n  \
            `id` INT(11) UNSIGNED NOT NULL AUTO_INCREMENT,\n  \
            `email` VARCHAR(255) NOT NULL,\n  \
            `status` ENUM('active','disabled') NOT NULL DEFAULT 'active',\n  \
            `created_at` DATETIME NULL,\n  \
            `org_id` INT(11) UNSIGNED NOT NULL,\n  \
            PRIMARY KEY (`id`),\n  \
            UNIQUE KEY `email_unique` (`email`),\n  \
            KEY `status_index` (`status`),\n  \
            KEY `org_id_index` (`org_id`),\n  \
            KEY `idx_status_created_at` (`status`, `created_at`),\n  \
            CONSTRAINT `fk_users_org_id` FOREIGN KEY (`org_id`) REFERENCES `orgs`(`id`) ON DELETE SET NULL ON UPDATE RESTRICT\n\
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci COMMENT='Accounts';";

        assert_eq!(sql, expected);
    }

    #[test]
    fn test_range_partition_refused() {
        let ir = AnnotationParser::parse_text(
            "/// @partition range(id)\nmodel T {\n  /// @autonumber\n  id;\n}",
        )
        .unwrap();
        assert!(render_create_table(&ir).is_err());
    }

    #[test]
    fn test_hash_partition_clause() {
        let ir = AnnotationParser::parse_text(
            "/// @partition hash(id) 4\nmodel T {\n  /// @autonumber\n  id;\n}",
        )
        .unwrap();
        let sql = render_create_table(&ir).unwrap();
        assert!(sql.ends_with("PARTITION BY HASH(`id`) PARTITIONS 4;"), "{}", sql);
    }
}
