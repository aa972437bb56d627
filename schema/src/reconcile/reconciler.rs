use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use common::err::schema_error::SchemaError;
use common::err::SResult;

use crate::ir::column::{ColumnIr, ForeignKeyIr};
use crate::ir::index::fulltext_index_name;
use crate::ir::table::TableIr;
use crate::observed::table_reader::TableReader;
use crate::observed::{ObservedForeignKey, ObservedIndex, ObservedTable};
use crate::quote_ident;
use crate::reconcile::column_change::{types_match_exactly, CanonicalColumn};
use crate::reconcile::create_table::render_create_table;
use crate::reconcile::plan::{
    DropReason, DroppedColumn, Plan, RenamedColumn, StatementKind,
};
use crate::validate::ensure_valid;

/// 期望 IR 与实际表结构的差异化简器。
/// 产出的语句顺序是契约的一部分: 删列, 孤儿列, 重命名, 加列,
/// 改列, 外键 (先删后加), 复合索引, 复合唯一索引, 单列索引,
/// 全文索引, 最后分区
pub struct Reconciler;

impl Reconciler {
    /// 表不存在时的建表计划。 建表前外键先过一遍实际库校验
    pub fn plan_create(
        desired: &TableIr,
        reader: &mut TableReader,
        drop_existing: bool,
    ) -> SResult<Plan> {
        ensure_valid(desired)?;
        Reconciler::validate_foreign_keys(desired, reader)?;

        let mut plan = Plan::new(&desired.table_name);

        if drop_existing && reader.table_exists(&desired.table_name)? {
            plan.push(
                StatementKind::DropTable,
                &desired.table_name,
                format!("DROP TABLE IF EXISTS {};", quote_ident(&desired.table_name)),
            );
        }

        plan.push(
            StatementKind::CreateTable,
            &desired.table_name,
            render_create_table(desired)?,
        );

        Ok(plan)
    }

    /// 已存在表的最小变更计划。 纯函数, 不触库
    pub fn plan_update(desired: &TableIr, observed: &ObservedTable) -> SResult<Plan> {
        ensure_valid(desired)?;

        if let Some(partition) = &desired.partition {
            if !partition.kind.supported_by_generator() {
                return Err(SchemaError::invalid_model(
                    &desired.model_name,
                    None,
                    format!(
                        "partition kind {} is not supported by the DDL generator",
                        partition.kind.as_sql()
                    ),
                ));
            }
        }

        let mut plan = Plan::new(&desired.table_name);
        let table = quote_ident(&desired.table_name);

        // 重命名的旧列名, 孤儿判定要放过它们
        let rename_old_names: HashSet<&str> = desired
            .live_columns()
            .filter_map(|c| c.rename.as_deref())
            .collect();

        // 1. 显式 @drop
        for column in desired.columns.iter().filter(|c| c.drop) {
            if observed.column(&column.name).is_some() {
                plan.push(
                    StatementKind::DropColumn,
                    &column.name,
                    format!(
                        "ALTER TABLE {} DROP COLUMN {};",
                        table,
                        quote_ident(&column.name)
                    ),
                );
                plan.dropped_columns.push(DroppedColumn {
                    name: column.name.clone(),
                    reason: DropReason::Annotated,
                });
            }
        }

        // 2. 孤儿列: 实际表有, 模型没有, 也不是重命名来源
        for observed_column in &observed.columns {
            let in_ir = desired
                .columns
                .iter()
                .any(|c| c.name == observed_column.name);
            if !in_ir && !rename_old_names.contains(observed_column.name.as_str()) {
                plan.push(
                    StatementKind::DropColumn,
                    &observed_column.name,
                    format!(
                        "ALTER TABLE {} DROP COLUMN {};",
                        table,
                        quote_ident(&observed_column.name)
                    ),
                );
                plan.dropped_columns.push(DroppedColumn {
                    name: observed_column.name.clone(),
                    reason: DropReason::Orphaned,
                });
            }
        }

        // 3. 重命名, 定义变更折叠进 CHANGE
        let mut renamed_new: HashSet<String> = HashSet::new();
        for column in desired.live_columns() {
            let old = match &column.rename {
                Some(old) => old,
                None => continue,
            };
            if observed.column(old).is_some() && observed.column(&column.name).is_none() {
                plan.push(
                    StatementKind::ChangeColumn,
                    &column.name,
                    format!(
                        "ALTER TABLE {} CHANGE {} {} {};",
                        table,
                        quote_ident(old),
                        quote_ident(&column.name),
                        column.render_definition()
                    ),
                );
                plan.renamed_columns.push(RenamedColumn {
                    old: old.clone(),
                    new: column.name.clone(),
                });
                renamed_new.insert(column.name.clone());
            }
        }

        // 4. 加列
        let mut added: HashSet<String> = HashSet::new();
        for column in desired.live_columns() {
            if observed.column(&column.name).is_some() || renamed_new.contains(&column.name) {
                continue;
            }

            plan.push(
                StatementKind::AddColumn,
                &column.name,
                format!(
                    "ALTER TABLE {} ADD COLUMN {} {}{};",
                    table,
                    quote_ident(&column.name),
                    column.render_definition(),
                    column.position_clause()
                ),
            );
            added.insert(column.name.clone());

            if column.fulltext {
                let index_name = fulltext_index_name(&column.name);
                plan.push(
                    StatementKind::AddFulltextIndex,
                    &index_name,
                    format!(
                        "ALTER TABLE {} ADD FULLTEXT INDEX {} ({});",
                        table,
                        quote_ident(&index_name),
                        quote_ident(&column.name)
                    ),
                );
            }
        }

        // 5. 改列, 只在规范定义变化时
        for column in desired.live_columns() {
            if added.contains(&column.name) || renamed_new.contains(&column.name) {
                continue;
            }
            let observed_column = match observed.column(&column.name) {
                Some(c) => c,
                None => continue,
            };

            let left = CanonicalColumn::from_ir(column);
            let right = CanonicalColumn::from_observed(observed_column);
            if left.differs(&right) {
                debug!(
                    "column {} changed: {:?} -> {:?}",
                    column.name, right, left
                );
                plan.push(
                    StatementKind::ModifyColumn,
                    &column.name,
                    format!(
                        "ALTER TABLE {} MODIFY COLUMN {} {};",
                        table,
                        quote_ident(&column.name),
                        column.render_definition()
                    ),
                );
            }
        }

        // 6. 外键, 先删后加
        Reconciler::diff_foreign_keys(desired, observed, &mut plan, &table);

        // 7. 复合普通索引, 复合唯一索引, 单列索引
        let desired_composite: Vec<(String, Vec<String>, bool)> = desired
            .composite_indexes
            .iter()
            .map(|i| (i.name.clone(), i.columns.clone(), false))
            .collect();
        Reconciler::diff_indexes(
            &desired_composite,
            observed.composite_indexes(false),
            &mut plan,
            &table,
        );

        let desired_composite_unique: Vec<(String, Vec<String>, bool)> = desired
            .composite_unique_indexes
            .iter()
            .map(|i| (i.name.clone(), i.columns.clone(), true))
            .collect();
        Reconciler::diff_indexes(
            &desired_composite_unique,
            observed.composite_indexes(true),
            &mut plan,
            &table,
        );

        let desired_simple: Vec<(String, Vec<String>, bool)> = desired
            .simple_indexes()
            .iter()
            .map(|i| (i.name.clone(), vec![i.column.clone()], i.unique))
            .collect();
        // 外键的撑腰索引不参与单列索引对比
        let fk_names: HashSet<String> = observed
            .foreign_keys
            .keys()
            .cloned()
            .chain(
                desired
                    .foreign_keys()
                    .iter()
                    .map(|(c, _)| desired.foreign_key_name(&c.name)),
            )
            .collect();
        let observed_simple: Vec<&ObservedIndex> = observed
            .simple_indexes()
            .into_iter()
            .filter(|i| !fk_names.contains(&i.name))
            .collect();
        Reconciler::diff_indexes(&desired_simple, observed_simple, &mut plan, &table);

        // 8. 全文索引
        Reconciler::diff_fulltext(desired, observed, &added, &mut plan, &table);

        // 9. 分区最后, 因为要重建表
        match (&desired.partition, &observed.partition) {
            (None, Some(_)) => {
                plan.push(
                    StatementKind::RemovePartitioning,
                    &desired.table_name,
                    format!("ALTER TABLE {} REMOVE PARTITIONING;", table),
                );
            }
            (Some(want), None) => {
                plan.push(
                    StatementKind::Partition,
                    &desired.table_name,
                    format!("ALTER TABLE {} {};", table, want.render()),
                );
            }
            (Some(want), Some(have)) => {
                if want.kind != have.kind
                    || want.column != have.column
                    || want.count != have.count
                {
                    plan.push(
                        StatementKind::Partition,
                        &desired.table_name,
                        format!("ALTER TABLE {} {};", table, want.render()),
                    );
                }
            }
            (None, None) => {}
        }

        Ok(plan)
    }

    /// I8 的实际库侧校验: 引用表存在, 引用列存在且有索引, 类型精确一致
    pub fn validate_foreign_keys(desired: &TableIr, reader: &mut TableReader) -> SResult<()> {
        for (column, foreign) in desired.foreign_keys() {
            if !reader.table_exists(&foreign.ref_table)? {
                return Err(SchemaError::SchemaMismatch(format!(
                    "`{}`.`{}` references `{}`.`{}` but table `{}` does not exist",
                    desired.table_name,
                    column.name,
                    foreign.ref_table,
                    foreign.ref_column,
                    foreign.ref_table
                )));
            }

            let referenced_columns = reader.columns(&foreign.ref_table)?;
            let referenced = referenced_columns
                .iter()
                .find(|c| c.name == foreign.ref_column)
                .ok_or_else(|| {
                    SchemaError::SchemaMismatch(format!(
                        "`{}`.`{}` references `{}`.`{}` but the column does not exist",
                        desired.table_name, column.name, foreign.ref_table, foreign.ref_column
                    ))
                })?;

            if !reader.column_indexed(&foreign.ref_table, &foreign.ref_column)? {
                return Err(SchemaError::SchemaMismatch(format!(
                    "`{}`.`{}` references `{}`.`{}` which is not indexed",
                    desired.table_name, column.name, foreign.ref_table, foreign.ref_column
                )));
            }

            if !types_match_exactly(column, referenced) {
                let mut declared = CanonicalColumn::from_ir(column).type_clause;
                if column.unsigned {
                    declared.push_str(" UNSIGNED");
                }
                return Err(SchemaError::SchemaMismatch(format!(
                    "`{}`.`{}` is {} but `{}`.`{}` is {}",
                    desired.table_name,
                    column.name,
                    declared,
                    foreign.ref_table,
                    foreign.ref_column,
                    referenced.column_type
                )));
            }
        }

        Ok(())
    }

    fn diff_foreign_keys(
        desired: &TableIr,
        observed: &ObservedTable,
        plan: &mut Plan,
        table: &str,
    ) {
        let desired_fks: BTreeMap<String, (&ColumnIr, &ForeignKeyIr)> = desired
            .foreign_keys()
            .into_iter()
            .map(|(column, fk)| (desired.foreign_key_name(&column.name), (column, fk)))
            .collect();

        // 删: 实际有而期望没有, 或者定义变了
        for (name, observed_fk) in &observed.foreign_keys {
            let keep = match desired_fks.get(name) {
                Some((column, fk)) => !fk_changed(column, fk, observed_fk),
                None => false,
            };
            if !keep {
                plan.push(
                    StatementKind::DropForeignKey,
                    name,
                    format!("ALTER TABLE {} DROP FOREIGN KEY {};", table, quote_ident(name)),
                );
            }
        }

        // 加: 期望有而实际没有, 或者定义变了
        for (name, (column, fk)) in &desired_fks {
            let missing = match observed.foreign_keys.get(name) {
                Some(observed_fk) => fk_changed(column, fk, observed_fk),
                None => true,
            };
            if missing {
                plan.push(
                    StatementKind::AddForeignKey,
                    name,
                    format!(
                        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {};",
                        table,
                        quote_ident(name),
                        quote_ident(&column.name),
                        quote_ident(&fk.ref_table),
                        quote_ident(&fk.ref_column),
                        fk.on_delete.as_sql(),
                        fk.on_update.as_sql()
                    ),
                );
            }
        }
    }

    /// 一类索引的先删后加。 列序或唯一性变了就重建
    fn diff_indexes(
        desired: &[(String, Vec<String>, bool)],
        observed: Vec<&ObservedIndex>,
        plan: &mut Plan,
        table: &str,
    ) {
        for index in &observed {
            let keep = desired
                .iter()
                .any(|(name, columns, unique)| {
                    name == &index.name && columns == &index.columns && *unique == index.unique
                });
            if !keep {
                plan.push(
                    StatementKind::DropIndex,
                    &index.name,
                    format!("ALTER TABLE {} DROP INDEX {};", table, quote_ident(&index.name)),
                );
            }
        }

        for (name, columns, unique) in desired {
            let exists = observed
                .iter()
                .any(|i| &i.name == name && &i.columns == columns && i.unique == *unique);
            if !exists {
                let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
                let keyword = if *unique { "UNIQUE INDEX" } else { "INDEX" };
                plan.push(
                    StatementKind::AddIndex,
                    name,
                    format!(
                        "ALTER TABLE {} ADD {} {} ({});",
                        table,
                        keyword,
                        quote_ident(name),
                        quoted.join(", ")
                    ),
                );
            }
        }
    }

    fn diff_fulltext(
        desired: &TableIr,
        observed: &ObservedTable,
        added_columns: &HashSet<String>,
        plan: &mut Plan,
        table: &str,
    ) {
        let desired_fulltext: Vec<(String, String)> = desired
            .fulltext_columns()
            .iter()
            .filter(|c| !added_columns.contains(&c.name))
            .map(|c| (fulltext_index_name(&c.name), c.name.clone()))
            .collect();

        for index in observed.fulltext_indexes() {
            let keep = desired_fulltext.iter().any(|(name, column)| {
                name == &index.name && index.columns.len() == 1 && &index.columns[0] == column
            });
            if !keep {
                plan.push(
                    StatementKind::DropFulltextIndex,
                    &index.name,
                    format!("ALTER TABLE {} DROP INDEX {};", table, quote_ident(&index.name)),
                );
            }
        }

        for (name, column) in &desired_fulltext {
            let exists = observed
                .fulltext_indexes()
                .iter()
                .any(|i| &i.name == name && i.columns.len() == 1 && &i.columns[0] == column);
            if !exists {
                plan.push(
                    StatementKind::AddFulltextIndex,
                    name,
                    format!(
                        "ALTER TABLE {} ADD FULLTEXT INDEX {} ({});",
                        table,
                        quote_ident(name),
                        quote_ident(column)
                    ),
                );
            }
        }
    }
}

fn fk_changed(column: &ColumnIr, fk: &ForeignKeyIr, observed: &ObservedForeignKey) -> bool {
    column.name != observed.column
        || !fk.ref_table.eq_ignore_ascii_case(&observed.ref_table)
        || !fk.ref_column.eq_ignore_ascii_case(&observed.ref_column)
        || !fk
            .on_delete
            .as_sql()
            .eq_ignore_ascii_case(&observed.on_delete)
        || !fk
            .on_update
            .as_sql()
            .eq_ignore_ascii_case(&observed.on_update)
}
