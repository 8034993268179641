//! The Run Engine (C4): `dispatch` drives a case from "a trigger fired" to
//! a terminal `RUN_*` event, mirroring the gateway's acquire/evaluate/
//! execute/release shape — claim the advisory lock, create the `Run` row,
//! claim it, run the Decision Pipeline under a live heartbeat, release.

use case_core::{Case, CaseId, Message, RunId, RunTrigger};
use case_executor::{DeadLetterSink, ProposalExecutor};
use case_pipeline::{Classifier, FeeThresholds, SafetyPolicy};
use case_provider::ProviderRegistry;
use case_store::CreateRunOutcome;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::metrics::RuntimeMetrics;
use crate::outcome;
use crate::transition;
use crate::{lock_name_for, SharedLock, SharedStore};

/// What [`dispatch`] actually did with the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A run was claimed and driven to completion (successfully or not —
    /// the terminal `RUN_*` event is what distinguishes the two; see the
    /// ledger, not this enum, for that).
    Dispatched { run_id: RunId },
    /// Another worker held the advisory lock; conceded without creating
    /// any new state.
    SkippedLocked,
    /// A run was already active for this case; this trigger deduplicated
    /// against it (spec §4.4 step 2, invariant I7).
    ActiveRunExists { run_id: RunId },
    CaseNotFound,
    /// The case has already reached a status `create_run` refuses to
    /// dispatch against (e.g. already `sent`).
    AlreadySent,
}

/// Dispatch a trigger for `case_id`. See the module docs for the shape;
/// each numbered step below matches spec §4.4's Run Engine protocol.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(store, lock, executor, providers, dlq, classifier, safety_policy, metrics, config), fields(case_id = %case_id, trigger = ?trigger))]
pub async fn dispatch(
    store: &SharedStore,
    lock: &SharedLock,
    executor: &ProposalExecutor,
    providers: &ProviderRegistry,
    dlq: &dyn DeadLetterSink,
    classifier: &dyn Classifier,
    thresholds: FeeThresholds,
    safety_policy: &SafetyPolicy,
    metrics: &RuntimeMetrics,
    config: &RuntimeConfig,
    case_id: CaseId,
    trigger: RunTrigger,
    triggering_message: Option<&Message>,
    scheduled_key: Option<String>,
) -> Result<DispatchOutcome, RuntimeError> {
    metrics.increment_runs_dispatched();

    // 1. Load the case; bail out on a not-found or terminal case.
    let Some(case) = store.get_case(case_id).await? else {
        return Ok(DispatchOutcome::CaseNotFound);
    };

    // 2-3. Check for (and dedup against) an active run, otherwise insert a
    // new `queued` run row.
    let run = match store
        .create_run(
            case_id,
            trigger,
            triggering_message.map(|m| m.id),
            scheduled_key,
            case.autopilot_mode,
            config.lock_ttl,
        )
        .await?
    {
        CreateRunOutcome::CaseNotFound => return Ok(DispatchOutcome::CaseNotFound),
        CreateRunOutcome::AlreadySent => return Ok(DispatchOutcome::AlreadySent),
        CreateRunOutcome::ActiveRunExists(run) => {
            metrics.increment_runs_active_run_exists();
            return Ok(DispatchOutcome::ActiveRunExists { run_id: run.id });
        }
        CreateRunOutcome::Created(run) => run,
    };
    let run_id = run.id;

    // 4. Acquire the per-case advisory lock before doing any pipeline work.
    let lock_name = lock_name_for(case_id);
    let Some(guard) = lock.try_acquire(&lock_name, config.lock_ttl).await? else {
        info!(%case_id, %run_id, "advisory lock already held; conceding run");
        metrics.increment_runs_skipped_locked();
        return Ok(DispatchOutcome::SkippedLocked);
    };

    let result = run_claimed(
        store,
        executor,
        providers,
        dlq,
        classifier,
        thresholds,
        safety_policy,
        metrics,
        config,
        &case,
        run_id,
        trigger,
        triggering_message,
    )
    .await;

    if let Err(err) = guard.release().await {
        warn!(%case_id, %run_id, error = %err, "failed to release advisory lock (will expire via TTL)");
    }

    result.map(|()| DispatchOutcome::Dispatched { run_id })
}

/// Steps 5-7: claim the run, run the pipeline under a live heartbeat, fold
/// the outcome back into the ledger, and close out with `RUN_COMPLETED` or
/// `RUN_FAILED`.
#[allow(clippy::too_many_arguments)]
async fn run_claimed(
    store: &SharedStore,
    executor: &ProposalExecutor,
    providers: &ProviderRegistry,
    dlq: &dyn DeadLetterSink,
    classifier: &dyn Classifier,
    thresholds: FeeThresholds,
    safety_policy: &SafetyPolicy,
    metrics: &RuntimeMetrics,
    config: &RuntimeConfig,
    case: &Case,
    run_id: RunId,
    trigger: RunTrigger,
    triggering_message: Option<&Message>,
) -> Result<(), RuntimeError> {
    transition::apply_event(
        store.as_ref(),
        case.id,
        case_core::CaseEvent::RunClaimed { run_id },
        &format!("run_claimed:{run_id}"),
        Value::Null,
        false,
    )
    .await?;

    let snapshot = transition::load_snapshot(store.as_ref(), case.id).await?;
    let heartbeat = spawn_heartbeat(store.clone(), run_id, config.heartbeat_interval);

    let pipeline_result =
        case_pipeline::run(&snapshot, run_id, trigger, triggering_message, classifier, thresholds, safety_policy).await;
    heartbeat.abort();

    match pipeline_result {
        Ok(pipeline_outcome) => {
            let applied = outcome::apply(
                store.as_ref(),
                executor,
                providers,
                dlq,
                metrics,
                config,
                case,
                run_id,
                triggering_message.map(|m| m.id),
                None,
                pipeline_outcome,
            )
            .await;

            match applied {
                Ok(()) => {
                    metrics.increment_runs_completed();
                    Ok(())
                }
                Err(err) => {
                    fail_run(store.as_ref(), case.id, run_id, &err).await;
                    metrics.increment_runs_failed();
                    Err(err)
                }
            }
        }
        Err(pipeline_err) => {
            let err = RuntimeError::Pipeline(pipeline_err);
            fail_run(store.as_ref(), case.id, run_id, &err).await;
            metrics.increment_runs_failed();
            Err(err)
        }
    }
}

async fn fail_run(store: &dyn case_store::CaseStore, case_id: CaseId, run_id: RunId, err: &RuntimeError) {
    let result = transition::apply_event(
        store,
        case_id,
        case_core::CaseEvent::RunFailed { run_id, error: err.to_string() },
        &format!("run_failed:{run_id}"),
        Value::Null,
        false,
    )
    .await;
    if let Err(ledger_err) = result {
        warn!(%case_id, %run_id, original_error = %err, ledger_error = %ledger_err, "failed to record RUN_FAILED");
    }
}

/// Step 8 of the Run Engine protocol: reclaim every `running` run whose
/// heartbeat has aged past `config.reap_after`. Called on a timer by the
/// scheduler (spec §4.7's stale-run reaper job, every 30s); safe to run
/// concurrently from multiple workers since each `RUN_STALE_CLEANED` is
/// idempotent on its own `transition_key`.
pub async fn reap_stale_runs(store: &SharedStore, metrics: &RuntimeMetrics, config: &RuntimeConfig) -> Result<usize, RuntimeError> {
    let now = chrono::Utc::now();
    let stale = store.stale_runs(now, config.reap_after).await?;
    let mut reaped = 0usize;

    for run in stale {
        transition::apply_event(
            store.as_ref(),
            run.case_id,
            case_core::CaseEvent::RunStaleCleaned { run_id: run.id },
            &format!("run_stale_cleaned:{}", run.id),
            Value::Null,
            false,
        )
        .await?;
        metrics.increment_runs_stale_reaped();
        reaped += 1;
    }

    Ok(reaped)
}

fn spawn_heartbeat(store: SharedStore, run_id: RunId, interval: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // heartbeat_at was just set by create_run; skip the immediate tick
        loop {
            ticker.tick().await;
            if store.heartbeat_run(run_id).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use case_core::{AutopilotMode, CaseStatus};
    use case_executor::{dlq::DeadLetterQueue, ExecutorConfig};
    use case_pipeline::{ClassifierOutput, FixedClassifier};
    use case_store::InMemoryCaseStore;

    use super::*;
    use crate::support::{base_case, InMemoryLock};

    fn registry() -> ProviderRegistry {
        let mut reg = ProviderRegistry::new();
        reg.register(Arc::new(case_provider::LogProvider::new("email")));
        reg.register(Arc::new(case_provider::LogProvider::new("portal")));
        reg
    }

    #[tokio::test]
    async fn initial_request_auto_executes_and_completes_run() {
        let store: SharedStore = Arc::new(InMemoryCaseStore::new());
        let lock: SharedLock = Arc::new(InMemoryLock::new());
        let case = base_case(1, AutopilotMode::Auto, CaseStatus::ReadyToSend);
        let case_id = store.insert_case(case).await.unwrap();

        let executor = ProposalExecutor::new(ExecutorConfig::default());
        let providers = registry();
        let dlq = DeadLetterQueue::new();
        let classifier = FixedClassifier(ClassifierOutput::default());
        let metrics = RuntimeMetrics::default();
        let config = RuntimeConfig::default();

        let outcome = dispatch(
            &store,
            &lock,
            &executor,
            &providers,
            &dlq,
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
            &metrics,
            &config,
            case_id,
            RunTrigger::InitialRequest,
            None,
            None,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Dispatched { .. }));
        assert_eq!(metrics.snapshot().runs_completed, 1);
        assert_eq!(metrics.snapshot().executions_sent, 1);
        assert!(dlq.is_empty());
    }

    #[tokio::test]
    async fn portal_only_initial_request_gates_for_human_portal_submission() {
        use case_core::SubmissionChannel;

        struct PendingHumanPortal;

        impl case_provider::Provider for PendingHumanPortal {
            fn name(&self) -> &str {
                "portal"
            }

            async fn send(
                &self,
                _message: &case_provider::OutboundMessage,
            ) -> Result<case_provider::SendOutcome, case_provider::ProviderError> {
                Ok(case_provider::SendOutcome::pending_human())
            }

            async fn health_check(&self) -> Result<(), case_provider::ProviderError> {
                Ok(())
            }
        }

        let store: SharedStore = Arc::new(InMemoryCaseStore::new());
        let lock: SharedLock = Arc::new(InMemoryLock::new());
        let mut case = base_case(4, AutopilotMode::Auto, CaseStatus::ReadyToSend);
        case.submission_channel = SubmissionChannel::Portal;
        case.agency.agency_email = None;
        case.agency.portal_url = Some("https://foia.example.gov/portal".to_string());
        let case_id = store.insert_case(case).await.unwrap();

        let executor = ProposalExecutor::new(ExecutorConfig::default());
        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(PendingHumanPortal));
        let dlq = DeadLetterQueue::new();
        let classifier = FixedClassifier(ClassifierOutput::default());
        let metrics = RuntimeMetrics::default();
        let config = RuntimeConfig::default();

        let outcome = dispatch(
            &store,
            &lock,
            &executor,
            &providers,
            &dlq,
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
            &metrics,
            &config,
            case_id,
            RunTrigger::InitialRequest,
            None,
            None,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Dispatched { .. }));

        let snapshot = crate::transition::load_snapshot(store.as_ref(), case_id).await.unwrap();
        assert_eq!(snapshot.case.status, CaseStatus::PortalInProgress);
        let proposal = snapshot.active_proposal().expect("portal submission should leave an active proposal");
        assert_eq!(proposal.action_type, case_core::ActionType::SubmitPortal);
        assert_eq!(proposal.status, case_core::ProposalStatus::PendingPortal);
        assert_eq!(snapshot.portal_tasks.len(), 1);
        assert_eq!(snapshot.portal_tasks[0].proposal_id, Some(proposal.id));
    }

    #[tokio::test]
    async fn dispatch_against_unknown_case_reports_not_found() {
        let store: SharedStore = Arc::new(InMemoryCaseStore::new());
        let lock: SharedLock = Arc::new(InMemoryLock::new());
        let executor = ProposalExecutor::new(ExecutorConfig::default());
        let providers = registry();
        let dlq = DeadLetterQueue::new();
        let classifier = FixedClassifier(ClassifierOutput::default());
        let metrics = RuntimeMetrics::default();
        let config = RuntimeConfig::default();

        let outcome = dispatch(
            &store,
            &lock,
            &executor,
            &providers,
            &dlq,
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
            &metrics,
            &config,
            CaseId(999),
            RunTrigger::InitialRequest,
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome, DispatchOutcome::CaseNotFound);
    }

    #[tokio::test]
    async fn second_trigger_while_active_run_exists_deduplicates() {
        let store: SharedStore = Arc::new(InMemoryCaseStore::new());
        let lock: SharedLock = Arc::new(InMemoryLock::new());
        let case = base_case(2, AutopilotMode::Auto, CaseStatus::AwaitingResponse);
        let case_id = store.insert_case(case).await.unwrap();

        // A run is already active (simulating a concurrent in-flight dispatch).
        store
            .create_run(case_id, RunTrigger::InboundMessage, None, None, AutopilotMode::Auto, RuntimeConfig::default().lock_ttl)
            .await
            .unwrap();

        let executor = ProposalExecutor::new(ExecutorConfig::default());
        let providers = registry();
        let dlq = DeadLetterQueue::new();
        let classifier = FixedClassifier(ClassifierOutput::default());
        let metrics = RuntimeMetrics::default();
        let config = RuntimeConfig::default();

        let outcome = dispatch(
            &store,
            &lock,
            &executor,
            &providers,
            &dlq,
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
            &metrics,
            &config,
            case_id,
            RunTrigger::InboundMessage,
            None,
            None,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, DispatchOutcome::ActiveRunExists { .. }));
        assert_eq!(metrics.snapshot().runs_active_run_exists, 1);
    }

}
