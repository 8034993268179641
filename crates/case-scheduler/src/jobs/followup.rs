//! Followup dispatch (spec §4.7, every 5 min by default): fire a
//! `followup_trigger` run for every due [`FollowupSchedule`], or escalate
//! the case to the phone queue once `max_followups` is reached.

use case_core::{CaseEvent, FollowupSchedule, FollowupStatus};
use case_runtime::DispatchOutcome;
use chrono::Utc;
use tracing::{info, warn};

use crate::context::SchedulerContext;
use crate::error::SchedulerError;

pub async fn run(ctx: &SchedulerContext) -> Result<(), SchedulerError> {
    let now = Utc::now();
    let due = ctx.store.due_followups(now).await?;

    for followup in due {
        if let Err(err) = process_one(ctx, followup, now).await {
            warn!(error = %err, "followup dispatch: sweep step failed");
            ctx.scheduler_metrics.increment_followups_errored();
        }
    }

    Ok(())
}

async fn process_one(ctx: &SchedulerContext, followup: FollowupSchedule, now: chrono::DateTime<Utc>) -> Result<(), SchedulerError> {
    let case_id = followup.case_id;

    if followup.has_reached_max(ctx.scheduler_config.max_followups) {
        let transition_key = format!("followup_max_reached:{case_id}:{}", followup.followup_count);
        let mut maxed = followup;
        maxed.status = FollowupStatus::MaxReached;
        maxed.updated_at = now;
        ctx.store.upsert_followup(maxed).await?;

        case_runtime::transition::apply_event(
            ctx.store.as_ref(),
            case_id,
            CaseEvent::CaseEscalated { reason: "max followups reached without a response".to_owned() },
            &transition_key,
            serde_json::Value::Null,
            false,
        )
        .await
        .map_err(SchedulerError::Runtime)?;

        info!(%case_id, "followup schedule exhausted; escalated to phone queue");
        ctx.scheduler_metrics.increment_followups_escalated();
        return Ok(());
    }

    let scheduled_key = FollowupSchedule::scheduled_key_for(case_id, followup.followup_count, followup.next_followup_date);

    // Claim first so a concurrent scheduler instance sees `processing` and
    // skips this row on its own pass.
    let mut claimed = followup.clone();
    claimed.status = FollowupStatus::Processing;
    claimed.updated_at = now;
    ctx.store.upsert_followup(claimed).await?;

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
        case_id,
        case_core::RunTrigger::FollowupTrigger,
        None,
        Some(scheduled_key),
    )
    .await
    .map_err(SchedulerError::Runtime)?;

    match outcome {
        DispatchOutcome::Dispatched { .. } | DispatchOutcome::ActiveRunExists { .. } => {
            let next_count = followup.followup_count + 1;
            let next_date = now + chrono::Duration::days(ctx.scheduler_config.cadence_days_for(next_count));
            ctx.store
                .upsert_followup(FollowupSchedule {
                    case_id,
                    next_followup_date: next_date,
                    followup_count: next_count,
                    status: FollowupStatus::Scheduled,
                    scheduled_key: None,
                    updated_at: now,
                })
                .await?;
            ctx.scheduler_metrics.increment_followups_dispatched();
        }
        DispatchOutcome::SkippedLocked => {
            // Another worker is mid-run for this case; retry the same row
            // (unchanged count/date) on the next sweep.
            ctx.store.upsert_followup(followup).await?;
        }
        DispatchOutcome::CaseNotFound | DispatchOutcome::AlreadySent => {
            let mut cancelled = followup;
            cancelled.status = FollowupStatus::Cancelled;
            cancelled.updated_at = now;
            ctx.store.upsert_followup(cancelled).await?;
        }
    }

    Ok(())
}
