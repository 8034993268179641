//! Test fixtures shared across this crate's `#[cfg(test)]` modules: an
//! in-memory [`DistributedLock`] double (`case-store` ships the Postgres
//! advisory-lock backend only) plus a minimal case builder.

#![cfg(test)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use case_core::{AgencyIdentity, AutopilotMode, Case, CaseId, CaseStatus, SubmissionChannel};
use case_executor::{dlq::DeadLetterQueue, ExecutorConfig, ProposalExecutor};
use case_pipeline::{ClassifierOutput, FeeThresholds, FixedClassifier, SafetyPolicy};
use case_runtime::{RuntimeConfig, RuntimeMetrics, SharedLock, SharedStore};
use case_store::{DistributedLock, LockGuard, StoreError};
use chrono::{DateTime, Utc};

use crate::config::SchedulerConfig;
use crate::context::SchedulerContext;
use crate::metrics::SchedulerMetrics;

#[derive(Default)]
pub(crate) struct InMemoryLock {
    held: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryLock {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn try_acquire(&self, name: &str, _ttl: Duration) -> Result<Option<Box<dyn LockGuard>>, StoreError> {
        let mut held = self.held.lock().expect("lock mutex poisoned");
        if held.insert(name.to_string()) {
            Ok(Some(Box::new(InMemoryLockGuard { name: name.to_string(), held: self.held.clone() })))
        } else {
            Ok(None)
        }
    }

    async fn acquire(&self, name: &str, ttl: Duration, timeout: Duration) -> Result<Box<dyn LockGuard>, StoreError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_acquire(name, ttl).await? {
                return Ok(guard);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(StoreError::Timeout(timeout));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

struct InMemoryLockGuard {
    name: String,
    held: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl LockGuard for InMemoryLockGuard {
    async fn extend(&self, _duration: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        self.held.lock().expect("lock mutex poisoned").remove(&self.name);
        Ok(())
    }

    async fn is_held(&self) -> Result<bool, StoreError> {
        Ok(self.held.lock().expect("lock mutex poisoned").contains(&self.name))
    }
}

pub(crate) fn base_case(id: i64, autopilot_mode: AutopilotMode, status: CaseStatus, next_due_at: Option<DateTime<Utc>>) -> Case {
    let now = Utc::now();
    Case {
        id: CaseId(id),
        submission_channel: SubmissionChannel::Email,
        agency: AgencyIdentity {
            name: "Test Agency".into(),
            jurisdiction: None,
            agency_email: Some("foia@agency.gov".into()),
            portal_url: None,
        },
        requested_records: vec![],
        status,
        substatus: None,
        requires_human: false,
        pause_reason: None,
        next_due_at,
        autopilot_mode,
        constraints: serde_json::Value::Null,
        scope_items: serde_json::Value::Null,
        send_date: None,
        last_response_date: None,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn registry() -> case_provider::ProviderRegistry {
    let mut reg = case_provider::ProviderRegistry::new();
    reg.register(Arc::new(case_provider::LogProvider::new("email")));
    reg.register(Arc::new(case_provider::LogProvider::new("portal")));
    reg
}

/// A [`SchedulerContext`] wired to in-memory doubles, for job-level tests.
pub(crate) async fn test_ctx(store: SharedStore) -> SchedulerContext {
    SchedulerContext {
        store,
        lock: Arc::new(InMemoryLock::new()) as SharedLock,
        executor: Arc::new(ProposalExecutor::new(ExecutorConfig::default())),
        providers: Arc::new(registry()),
        dlq: Arc::new(DeadLetterQueue::new()),
        classifier: Arc::new(FixedClassifier(ClassifierOutput::default())),
        thresholds: FeeThresholds::default(),
        safety_policy: Arc::new(SafetyPolicy::default()),
        runtime_config: RuntimeConfig::default(),
        runtime_metrics: Arc::new(RuntimeMetrics::default()),
        scheduler_config: SchedulerConfig::default(),
        scheduler_metrics: Arc::new(SchedulerMetrics::default()),
    }
}
