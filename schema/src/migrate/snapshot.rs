use crate::ir::column::{ColumnIr, FkAction, ForeignKeyIr};
use crate::ir::index::CompositeIndex;
use crate::ir::table::TableIr;
use crate::observed::ObservedTable;
use crate::reconcile::column_change::split_column_type;

/// 把实际表结构快照折叠回 IR, 供 IR 对 IR 的 diff 使用。
/// 这就是 "现在的库" 对 "留存 IR" 的那一侧
pub fn observed_to_ir(table: &ObservedTable) -> TableIr {
    let mut ir = TableIr::new(&table.name, &table.name);
    ir.engine = table.engine.clone();
    ir.charset = table.charset.clone();
    ir.collation = table.collation.clone();
    if !table.comment.is_empty() {
        ir.table_comment = Some(table.comment.clone());
    }
    ir.partition = table.partition.clone();

    for observed in &table.columns {
        let (base, args, unsigned) = split_column_type(&observed.column_type);

        let mut column = ColumnIr::named(&observed.name);
        column.sql_type = base;
        column.unsigned = unsigned;
        column.nullable = observed.nullable;
        column.auto_increment = observed.is_auto_increment();
        column.default = observed.default.clone();
        if !observed.comment.is_empty() {
            column.comment = Some(observed.comment.clone());
        }

        if column.is_enum_like() {
            column.values = args
                .as_deref()
                .unwrap_or("")
                .split(',')
                .map(|v| v.trim().trim_matches('\'').to_string())
                .filter(|v| !v.is_empty())
                .collect();
        } else {
            column.length = args;
        }

        column.primary = table.primary_key.contains(&observed.name);

        ir.columns.push(column);
    }

    // 单列索引按命名约定折成列属性, 复合索引原样保留
    for index in &table.indexes {
        if index.fulltext {
            if index.columns.len() == 1 {
                if let Some(column) = column_mut(&mut ir, &index.columns[0]) {
                    column.fulltext = true;
                }
            }
            continue;
        }

        if index.is_composite() {
            let composite = CompositeIndex {
                name: index.name.clone(),
                columns: index.columns.clone(),
            };
            if index.unique {
                ir.composite_unique_indexes.push(composite);
            } else {
                ir.composite_indexes.push(composite);
            }
            continue;
        }

        // 外键的撑腰索引不是模型属性
        if table.foreign_keys.contains_key(&index.name) {
            continue;
        }

        if let Some(column) = column_mut(&mut ir, &index.columns[0]) {
            if index.unique {
                column.unique = true;
            } else {
                column.index = true;
            }
        }
    }

    for foreign in table.foreign_keys.values() {
        if let Some(column) = column_mut(&mut ir, &foreign.column) {
            column.foreign = Some(ForeignKeyIr {
                ref_table: foreign.ref_table.clone(),
                ref_column: foreign.ref_column.clone(),
                on_delete: FkAction::parse(&foreign.on_delete).unwrap_or(FkAction::Restrict),
                on_update: FkAction::parse(&foreign.on_update).unwrap_or(FkAction::Restrict),
            });
        }
    }

    ir
}

fn column_mut<'a>(ir: &'a mut TableIr, name: &str) -> Option<&'a mut ColumnIr> {
    ir.columns.iter_mut().find(|c| c.name == name)
}
