//! Deadline sweep (spec §4.7, daily by default): a case past its
//! `next_due_at` with no active run gets a `deadline_escalation` trigger.
//! The phone-queue escalation after repeated failed followups is owned by
//! the followup-dispatch job (see its `max_followups` branch) — doing it
//! there too would double-fire `CASE_ESCALATED` for the same condition.

use case_runtime::DispatchOutcome;
use chrono::Utc;
use tracing::warn;

use crate::context::SchedulerContext;
use crate::error::SchedulerError;

pub async fn run(ctx: &SchedulerContext) -> Result<(), SchedulerError> {
    let now = Utc::now();
    let past_due = ctx.store.cases_past_due(now).await?;

    for case in past_due {
        let outcome = case_runtime::dispatch(
            &ctx.store,
            &ctx.lock,
            &ctx.executor,
            &ctx.providers,
            ctx.dlq.as_ref(),
            ctx.classifier.as_ref(),
            ctx.thresholds,
            &ctx.safety_policy,
            &ctx.runtime_metrics,
            &ctx.runtime_config,
            case.id,
            case_core::RunTrigger::DeadlineEscalation,
            None,
            None,
        )
        .await;

        match outcome {
            Ok(DispatchOutcome::Dispatched { .. }) => ctx.scheduler_metrics.increment_deadline_escalations_dispatched(),
            Ok(_) => {}
            Err(err) => warn!(case_id = %case.id, error = %err, "deadline sweep: dispatch failed"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use case_core::{AutopilotMode, CaseStatus};
    use case_runtime::SharedStore;
    use case_store::InMemoryCaseStore;

    use super::*;
    use crate::support::{base_case, test_ctx};

    #[tokio::test]
    async fn case_past_due_gets_a_deadline_escalation_run() {
        let store: SharedStore = Arc::new(InMemoryCaseStore::new());
        let now = Utc::now();
        let case = base_case(1, AutopilotMode::Auto, CaseStatus::AwaitingResponse, Some(now - chrono::Duration::days(1)));
        let case_id = store.insert_case(case).await.unwrap();

        let ctx = test_ctx(store.clone()).await;
        run(&ctx).await.unwrap();

        assert_eq!(ctx.scheduler_metrics.snapshot().deadline_escalations_dispatched, 1);
        let active = store.active_run(case_id).await.unwrap();
        assert!(active.is_none(), "auto-executed run should have completed, not stayed active");
    }

    #[tokio::test]
    async fn case_not_past_due_is_skipped() {
        let store: SharedStore = Arc::new(InMemoryCaseStore::new());
        let now = Utc::now();
        let case = base_case(2, AutopilotMode::Auto, CaseStatus::AwaitingResponse, Some(now + chrono::Duration::days(5)));
        store.insert_case(case).await.unwrap();

        let ctx = test_ctx(store.clone()).await;
        run(&ctx).await.unwrap();

        assert_eq!(ctx.scheduler_metrics.snapshot().deadline_escalations_dispatched, 0);
    }
}
