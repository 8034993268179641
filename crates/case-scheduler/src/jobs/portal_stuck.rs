//! Stuck-portal-task reaper (spec §4.7, every 30 min by default): a
//! `PortalTask` left `Pending` for more than 24h almost certainly means the
//! human it was routed to never saw it; flag it so an operator queue can
//! pick it up.

use case_core::{CaseEvent, PortalTaskStatus};
use chrono::Utc;
use tracing::{info, warn};

use crate::context::SchedulerContext;
use crate::error::SchedulerError;

pub async fn run(ctx: &SchedulerContext) -> Result<(), SchedulerError> {
    let now = Utc::now();
    let overdue = ctx.store.overdue_portal_tasks(now, ctx.scheduler_config.portal_stuck_threshold).await?;

    for task in overdue {
        ctx.store.update_portal_task_status(task.id, PortalTaskStatus::Stuck, None).await?;

        let transition_key = format!("portal_stuck:{}", task.id);
        let result = case_runtime::transition::apply_event(
            ctx.store.as_ref(),
            task.case_id,
            CaseEvent::PortalStuck { portal_task_id: task.id },
            &transition_key,
            serde_json::Value::Null,
            false,
        )
        .await;

        match result {
            Ok(()) => {
                info!(case_id = %task.case_id, portal_task_id = %task.id, "portal task marked stuck");
                ctx.scheduler_metrics.increment_portal_tasks_marked_stuck();
            }
            Err(err) => warn!(case_id = %task.case_id, portal_task_id = %task.id, error = %err, "failed to record PORTAL_STUCK"),
        }
    }

    Ok(())
}
