//! The scheduler's run loop: one `tokio::time::interval` per sweep, gated
//! by its own enable flag, selected over a shutdown channel. Each tick additionally
//! takes a leader lease keyed by job name before doing any work, so
//! several scheduler instances can run the same binary without double
//! firing a sweep (spec §9, Open Question #3).

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, warn};

use crate::context::SchedulerContext;
use crate::error::SchedulerError;
use crate::jobs;

pub struct SchedulerProcessor {
    ctx: SchedulerContext,
    shutdown_rx: mpsc::Receiver<()>,
}

impl SchedulerProcessor {
    #[must_use]
    pub fn new(ctx: SchedulerContext) -> (Self, mpsc::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        (Self { ctx, shutdown_rx }, shutdown_tx)
    }

    /// Run every enabled sweep until shutdown is signaled.
    pub async fn run(&mut self) {
        tracing::info!("scheduler starting");

        let config = self.ctx.scheduler_config.clone();
        let mut followup_interval = interval(config.followup_check_interval);
        let mut stale_run_interval = interval(config.stale_run_check_interval);
        let mut portal_stuck_interval = interval(config.portal_stuck_check_interval);
        let mut deadline_interval = interval(config.deadline_check_interval);
        let mut retention_interval = interval(config.retention_check_interval);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    tracing::info!("scheduler received shutdown signal");
                    break;
                }
                _ = followup_interval.tick(), if config.enable_followup_dispatch => {
                    run_leased(&self.ctx, "scheduler:followup_dispatch", config.followup_check_interval, jobs::followup::run(&self.ctx)).await;
                }
                _ = stale_run_interval.tick(), if config.enable_stale_run_reaper => {
                    run_leased(&self.ctx, "scheduler:stale_run_reaper", config.stale_run_check_interval, jobs::stale_run::run(&self.ctx)).await;
                }
                _ = portal_stuck_interval.tick(), if config.enable_portal_stuck_reaper => {
                    run_leased(&self.ctx, "scheduler:portal_stuck_reaper", config.portal_stuck_check_interval, jobs::portal_stuck::run(&self.ctx)).await;
                }
                _ = deadline_interval.tick(), if config.enable_deadline_sweep => {
                    run_leased(&self.ctx, "scheduler:deadline_sweep", config.deadline_check_interval, jobs::deadline::run(&self.ctx)).await;
                }
                _ = retention_interval.tick(), if config.enable_retention_prune => {
                    run_leased(&self.ctx, "scheduler:retention_prune", config.retention_check_interval, jobs::retention::run(&self.ctx)).await;
                }
            }
        }

        tracing::info!("scheduler stopped");
    }

    #[must_use]
    pub fn metrics(&self) -> &crate::metrics::SchedulerMetrics {
        &self.ctx.scheduler_metrics
    }
}

/// Acquire the named leader lease, run `job` if it was granted, then
/// release. A lease held by another instance means this tick is simply
/// skipped — the next interval tick tries again.
async fn run_leased<F>(ctx: &SchedulerContext, job_name: &str, ttl: Duration, job: F)
where
    F: Future<Output = Result<(), SchedulerError>>,
{
    match ctx.lock.try_acquire(job_name, ttl).await {
        Ok(Some(guard)) => {
            if let Err(err) = job.await {
                error!(job = job_name, error = %err, "sweep failed");
                ctx.scheduler_metrics.increment_sweep_errors();
            }
            if let Err(err) = guard.release().await {
                warn!(job = job_name, error = %err, "failed to release scheduler lease (will expire via TTL)");
            }
        }
        Ok(None) => {
            debug!(job = job_name, "scheduler lease held by another instance; skipping this tick");
        }
        Err(err) => {
            error!(job = job_name, error = %err, "failed to acquire scheduler lease");
            ctx.scheduler_metrics.increment_sweep_errors();
        }
    }
}
