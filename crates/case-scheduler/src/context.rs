//! Everything a sweep needs to dispatch a run or write to the ledger —
//! the same dependency set [`case_runtime::dispatch`] takes, bundled once
//! so the processor doesn't thread ten arguments through five jobs.

use std::sync::Arc;

use case_executor::{dlq::DeadLetterSink, ProposalExecutor};
use case_pipeline::{Classifier, FeeThresholds, SafetyPolicy};
use case_provider::ProviderRegistry;
use case_runtime::{RuntimeConfig, RuntimeMetrics, SharedLock, SharedStore};

use crate::config::SchedulerConfig;
use crate::metrics::SchedulerMetrics;

pub struct SchedulerContext {
    pub store: SharedStore,
    pub lock: SharedLock,
    /// `Arc`-wrapped (rather than owned, like [`SchedulerConfig`]) because the
    /// host process shares this exact executor, registry, policy, and
    /// counters with its HTTP-triggered dispatch path — the run engine's
    /// metrics are process-global atomics, not per-caller.
    pub executor: Arc<ProposalExecutor>,
    pub providers: Arc<ProviderRegistry>,
    pub dlq: Arc<dyn DeadLetterSink>,
    pub classifier: Arc<dyn Classifier>,
    pub thresholds: FeeThresholds,
    pub safety_policy: Arc<SafetyPolicy>,
    pub runtime_config: RuntimeConfig,
    pub runtime_metrics: Arc<RuntimeMetrics>,
    pub scheduler_config: SchedulerConfig,
    pub scheduler_metrics: Arc<SchedulerMetrics>,
}
