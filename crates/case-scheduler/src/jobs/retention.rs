//! Retention prune (spec §4.7, daily by default): ledger rows older than
//! `ledger_retention` (default 90 days) are deleted. Spec §4.7 also
//! mentions pruning "snapshots older than 30 days", but `CaseSnapshot` in
//! this design is computed on demand from the case/proposal/run rows and
//! is never persisted (see `DESIGN.md`'s "no legacy checkpoint schema"
//! decision) — there is nothing stored to prune.

use tracing::info;

use crate::context::SchedulerContext;
use crate::error::SchedulerError;

pub async fn run(ctx: &SchedulerContext) -> Result<(), SchedulerError> {
    let pruned = ctx.store.prune_ledger(ctx.scheduler_config.ledger_retention).await?;
    if pruned > 0 {
        info!(pruned, "retention prune removed expired ledger rows");
        ctx.scheduler_metrics.add_ledger_rows_pruned(pruned);
    }
    Ok(())
}
