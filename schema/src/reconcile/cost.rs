use serde::Serialize;

use common::pretty_util::to_bytes_len_pretty;

use crate::reconcile::plan::{Plan, StatementKind};

/// 大表慢操作的阈值
pub const SLOW_ROW_THRESHOLD: u64 = 100_000;

/// 索引重建的粗略速度, 行/秒 的分母
const INDEX_ROWS_PER_SECOND: u64 = 50_000;

/// 警告分类, 每类至多提示一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CostCategory {
    Index,
    Modify,
    Partition,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostWarning {
    pub category: CostCategory,
    pub message: String,
}

impl StatementKind {
    /// 语句归属的成本分类
    pub fn cost_category(&self) -> Option<CostCategory> {
        match self {
            StatementKind::AddIndex
            | StatementKind::DropIndex
            | StatementKind::AddFulltextIndex
            | StatementKind::DropFulltextIndex => Some(CostCategory::Index),
            StatementKind::ModifyColumn | StatementKind::ChangeColumn => {
                Some(CostCategory::Modify)
            }
            StatementKind::Partition | StatementKind::RemovePartitioning => {
                Some(CostCategory::Partition)
            }
            _ => None,
        }
    }
}

/// 扫一遍计划, 按分类产出至多一条警告。
/// 估算只是提示, 不改变计划本身
pub fn scan(plan: &Plan, row_estimate: u64, byte_size: u64) -> Vec<CostWarning> {
    let mut warnings = Vec::new();

    if row_estimate <= SLOW_ROW_THRESHOLD {
        return warnings;
    }

    for statement in &plan.statements {
        let category = match statement.kind.cost_category() {
            Some(category) => category,
            None => continue,
        };

        if warnings.iter().any(|w: &CostWarning| w.category == category) {
            continue;
        }

        let message = match category {
            CostCategory::Index => {
                let seconds = (row_estimate + INDEX_ROWS_PER_SECOND - 1) / INDEX_ROWS_PER_SECOND;
                format!(
                    "index rebuild on ~{} rows, expect roughly {} seconds - do not interrupt",
                    row_estimate, seconds
                )
            }
            CostCategory::Modify => format!(
                "column change on ~{} rows will rewrite the table and may take a while",
                row_estimate
            ),
            CostCategory::Partition => format!(
                "repartitioning rebuilds the table ({} on disk) - make sure the equivalent temp space is available",
                to_bytes_len_pretty(byte_size as usize)
            ),
        };

        warnings.push(CostWarning { category, message });
    }

    warnings
}

#[cfg(test)]
mod test {
    use crate::reconcile::cost::{scan, CostCategory};
    use crate::reconcile::plan::{Plan, StatementKind};

    fn plan_with(kinds: Vec<StatementKind>) -> Plan {
        let mut plan = Plan::new("events");
        for kind in kinds {
            plan.push(kind, "x", "ALTER TABLE `events` ...;".to_string());
        }
        plan
    }

    #[test]
    fn test_small_table_never_warns() {
        let plan = plan_with(vec![StatementKind::AddIndex, StatementKind::ModifyColumn]);
        assert!(scan(&plan, 99_999, 0).is_empty());
    }

    #[test]
    fn test_one_warning_per_category() {
        let plan = plan_with(vec![
            StatementKind::AddIndex,
            StatementKind::DropIndex,
            StatementKind::ModifyColumn,
            StatementKind::Partition,
        ]);

        let warnings = scan(&plan, 500_000, 2_000_000);
        assert_eq!(warnings.len(), 3);
        assert_eq!(warnings[0].category, CostCategory::Index);
        // ceil(500000/50000) = 10
        assert!(warnings[0].message.contains("10 seconds"));
        assert!(warnings[0].message.contains("do not interrupt"));
        assert_eq!(warnings[1].category, CostCategory::Modify);
        assert_eq!(warnings[2].category, CostCategory::Partition);
    }

    #[test]
    fn test_adds_and_creates_are_cheap() {
        let plan = plan_with(vec![StatementKind::AddColumn, StatementKind::CreateTable]);
        assert!(scan(&plan, 1_000_000, 0).is_empty());
    }
}
