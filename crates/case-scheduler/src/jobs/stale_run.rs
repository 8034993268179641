//! Stale-run reaper (spec §4.4 step 8 / §4.7, every 30 s by default). The
//! actual reclaim logic lives in [`case_runtime::reap_stale_runs`]; this
//! job is just the timer that calls it and folds the count into our own
//! metrics.

use tracing::info;

use crate::context::SchedulerContext;
use crate::error::SchedulerError;

pub async fn run(ctx: &SchedulerContext) -> Result<(), SchedulerError> {
    let reaped = case_runtime::reap_stale_runs(&ctx.store, &ctx.runtime_metrics, &ctx.runtime_config).await?;
    if reaped > 0 {
        info!(reaped, "stale-run reaper cleaned up abandoned runs");
        ctx.scheduler_metrics.increment_stale_runs_reaped_by(reaped as u64);
    }
    Ok(())
}
