use serde::Serialize;

/// 计划内语句的种类, 也是成本扫描的分类依据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatementKind {
    CreateTable,
    DropTable,

    AddColumn,
    DropColumn,
    /// CHANGE old new, 重命名 (可能同时变更定义)
    ChangeColumn,
    ModifyColumn,

    AddForeignKey,
    DropForeignKey,

    AddIndex,
    DropIndex,
    AddFulltextIndex,
    DropFulltextIndex,

    Partition,
    RemovePartitioning,
}

/// 计划内的一条语句
#[derive(Debug, Clone, Serialize)]
pub struct PlanStatement {
    pub sql: String,
    pub kind: StatementKind,

    /// 作用对象, 列名/索引名/约束名/表名
    pub target: String,
}

/// 被丢弃列的来由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropReason {
    /// 模型里显式 @drop
    Annotated,

    /// 实际表里有而模型里没有
    Orphaned,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::Annotated => "@drop",
            DropReason::Orphaned => "orphaned",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedColumn {
    pub name: String,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenamedColumn {
    pub old: String,
    pub new: String,
}

/// 一次 reconcile 的产物: 有序语句 + 需要确认的删除/重命名清单
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub table: String,
    pub statements: Vec<PlanStatement>,
    pub dropped_columns: Vec<DroppedColumn>,
    pub renamed_columns: Vec<RenamedColumn>,
}

impl Plan {
    pub fn new(table: &str) -> Self {
        Plan {
            table: table.to_string(),
            statements: Vec::new(),
            dropped_columns: Vec::new(),
            renamed_columns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// 需要用户确认才能执行
    pub fn needs_confirmation(&self) -> bool {
        !self.dropped_columns.is_empty() || !self.renamed_columns.is_empty()
    }

    pub fn push(&mut self, kind: StatementKind, target: &str, sql: String) {
        self.statements.push(PlanStatement {
            sql,
            kind,
            target: target.to_string(),
        });
    }

    pub fn sql_lines(&self) -> Vec<&str> {
        self.statements.iter().map(|s| s.sql.as_str()).collect()
    }
}

#[cfg(test)]
mod test {
    use crate::reconcile::plan::{DropReason, Plan, StatementKind};

    #[test]
    fn test_plan() {
        let mut plan = Plan::new("users");
        assert!(plan.is_empty());
        assert!(!plan.needs_confirmation());

        plan.push(
            StatementKind::AddColumn,
            "age",
            "ALTER TABLE `users` ADD COLUMN `age` INT(11) NOT NULL;".to_string(),
        );
        assert_eq!(plan.len(), 1);

        assert_eq!(DropReason::Annotated.as_str(), "@drop");
        assert_eq!(DropReason::Orphaned.as_str(), "orphaned");
    }
}
