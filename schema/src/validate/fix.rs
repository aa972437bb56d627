use crate::ir::column::ColumnIr;
use crate::ir::table::TableIr;
use crate::validate::{CheckKind, SchemaCheck};

/// 把 auto_fixable 的违反项就地补进 IR, 返回每一步修复的描述。
/// 不可自动修复的违反项原样留给调用方
pub fn apply_auto_fixes(ir: &mut TableIr, checks: &[SchemaCheck]) -> Vec<String> {
    let mut applied = Vec::new();

    for check in checks {
        if !check.auto_fixable {
            continue;
        }

        match check.kind {
            CheckKind::NoPrimaryKey => {
                if ir.column("id").is_some() {
                    continue;
                }
                let mut id = ColumnIr::named("id");
                id.sql_type = "INT".to_string();
                id.length = Some("11".to_string());
                id.unsigned = true;
                id.auto_increment = true;
                id.primary = true;
                ir.columns.insert(0, id);
                applied.push("added `id` INT(11) UNSIGNED AUTO_INCREMENT PRIMARY".to_string());
            }

            CheckKind::MissingTimestamps => {
                let name = match &check.property {
                    Some(name) => name.clone(),
                    None => continue,
                };
                if ir.column(&name).is_some() {
                    continue;
                }
                let mut column = ColumnIr::named(&name);
                column.sql_type = "DATETIME".to_string();
                column.nullable = true;
                ir.columns.push(column);
                applied.push(format!("added `{}` DATETIME NULL", name));
            }

            CheckKind::PartitionColumnNotPrimary => {
                let name = match &check.property {
                    Some(name) => name.clone(),
                    None => continue,
                };
                if let Some(column) = ir.columns.iter_mut().find(|c| c.name == name) {
                    if !column.primary {
                        column.primary = true;
                        applied.push(format!("marked `{}` as part of the primary key", name));
                    }
                }
            }

            _ => {}
        }
    }

    applied
}
