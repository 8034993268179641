//! The Scheduler / Cron sweeps (C8): five independent periodic jobs —
//! followup dispatch, stale-run reaper, stuck-portal reaper, deadline
//! sweep, retention prune — each guarded by its own leader lease so
//! multiple scheduler instances can run concurrently without double
//! firing (spec §9, Open Question #3).

pub mod config;
pub mod context;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod processor;
#[cfg(test)]
mod support;

pub use config::SchedulerConfig;
pub use context::SchedulerContext;
pub use error::SchedulerError;
pub use metrics::{SchedulerMetrics, SchedulerMetricsSnapshot};
pub use processor::SchedulerProcessor;
