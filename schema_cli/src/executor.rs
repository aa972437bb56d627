use std::time::Instant;

use tracing::info;

use common::err::schema_error::SchemaError;
use common::err::SResult;
use common::pretty_util::to_elapsed_pretty;

use connection::conn::connection::IConnection;

use schema::reconcile::cost;
use schema::reconcile::plan::Plan;

use crate::prompt;

/// 预览里单条语句的最大展示长度
const PREVIEW_WIDTH: usize = 100;

/// 计划执行器: 预览, 慢操作警告, 破坏性变更确认, 逐条执行并计时。
/// 任何一条语句失败即中止, 之前的语句保持生效
pub struct PlanExecutor<'a> {
    conn: &'a mut dyn IConnection,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(conn: &'a mut dyn IConnection) -> Self {
        PlanExecutor { conn }
    }

    pub fn execute(
        &mut self,
        plan: &Plan,
        row_estimate: u64,
        byte_size: u64,
        confirm: &mut dyn FnMut(&str) -> bool,
    ) -> SResult<()> {
        if plan.is_empty() {
            prompt::info("no changes");
            return Ok(());
        }

        prompt::line(&format!(
            "plan for `{}` ({} statements):",
            plan.table,
            plan.len()
        ));
        for statement in &plan.statements {
            prompt::info(&truncate(&statement.sql, PREVIEW_WIDTH));
        }

        for warning in cost::scan(plan, row_estimate, byte_size) {
            prompt::warn(&warning.message);
        }

        if plan.needs_confirmation() {
            for dropped in &plan.dropped_columns {
                prompt::warn(&format!(
                    "column `{}` will be dropped ({})",
                    dropped.name,
                    dropped.reason.as_str()
                ));
            }
            for renamed in &plan.renamed_columns {
                prompt::warn(&format!(
                    "column `{}` will be renamed to `{}`",
                    renamed.old, renamed.new
                ));
            }

            if !confirm("apply these changes?") {
                return Err(SchemaError::UserAborted);
            }
        }

        for statement in &plan.statements {
            let started = Instant::now();
            self.conn.exec(statement.sql.clone())?;
            let elapsed = started.elapsed();

            info!(statement = statement.target.as_str(), "executed in {:?}", elapsed);
            prompt::success(&format!(
                "{} ({})",
                truncate(&statement.sql, PREVIEW_WIDTH),
                to_elapsed_pretty(&elapsed)
            ));
        }

        Ok(())
    }
}

fn truncate(sql: &str, width: usize) -> String {
    if sql.chars().count() <= width {
        return sql.to_string();
    }
    let truncated: String = sql.chars().take(width).collect();
    format!("{}…", truncated)
}
