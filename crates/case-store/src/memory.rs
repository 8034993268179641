//! An in-memory [`CaseStore`] implementation. Not durable, not sharded —
//! the fixture `case-runtime` and `case-pipeline` unit tests build on, and
//! a single-replica store backend for local development.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use case_core::{
    AutopilotMode, Case, CaseEvent, CaseId, CaseSnapshot, Execution, ExecutionId, ExecutionStatus,
    FollowupSchedule, Message, MessageId, Mutations, Patch, PortalTask, PortalTaskId,
    PortalTaskStatus, Projection, Proposal, ProposalId, ProposalStatus, Run, RunId, RunStatus,
    RunTrigger,
};

use crate::error::StoreError;
use crate::store::{
    CaseStore, CaseTransaction, CreateRunOutcome, LedgerInsertOutcome, NewExecution, NewMessage,
    NewProposal,
};

#[derive(Default)]
struct LedgerRow {
    transition_key: String,
    projection: Projection,
}

#[derive(Default)]
struct MemoryState {
    next_case_id: i64,
    cases: HashMap<CaseId, Case>,
    messages: HashMap<MessageId, Message>,
    provider_message_index: HashMap<String, MessageId>,
    runs: HashMap<RunId, Run>,
    proposals: HashMap<ProposalId, Proposal>,
    proposal_key_index: HashMap<String, ProposalId>,
    executions: HashMap<ExecutionId, Execution>,
    execution_keys: std::collections::HashSet<String>,
    portal_tasks: HashMap<PortalTaskId, PortalTask>,
    followups: HashMap<CaseId, FollowupSchedule>,
    ledger: HashMap<(CaseId, String), LedgerRow>,
}

/// In-memory implementation of [`CaseStore`], safe to share across tasks via
/// `Arc`. `case-pipeline`/`case-runtime` unit tests construct one per test.
#[derive(Clone, Default)]
pub struct InMemoryCaseStore {
    state: Arc<Mutex<MemoryState>>,
    case_locks: Arc<Mutex<HashMap<CaseId, Arc<Mutex<()>>>>>,
}

impl InMemoryCaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn case_lock(&self, case_id: CaseId) -> Arc<Mutex<()>> {
        let mut locks = self.case_locks.lock().await;
        locks.entry(case_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    async fn snapshot_of(&self, case_id: CaseId) -> Result<CaseSnapshot, StoreError> {
        let state = self.state.lock().await;
        let case = state.cases.get(&case_id).cloned().ok_or(StoreError::CaseNotFound(case_id))?;
        let active_run = state
            .runs
            .values()
            .find(|r| r.case_id == case_id && r.status.is_active())
            .cloned();
        let proposals = state.proposals.values().filter(|p| p.case_id == case_id).cloned().collect();
        let portal_tasks = state.portal_tasks.values().filter(|t| t.case_id == case_id).cloned().collect();
        let followup = state.followups.get(&case_id).cloned();
        Ok(CaseSnapshot { case, active_run, proposals, portal_tasks, followup })
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn insert_case(&self, mut case: Case) -> Result<CaseId, StoreError> {
        let mut state = self.state.lock().await;
        state.next_case_id += 1;
        let id = CaseId(state.next_case_id);
        case.id = id;
        state.cases.insert(id, case);
        Ok(id)
    }

    async fn get_case(&self, id: CaseId) -> Result<Option<Case>, StoreError> {
        Ok(self.state.lock().await.cases.get(&id).cloned())
    }

    async fn begin_transition(&self, case_id: CaseId) -> Result<Box<dyn CaseTransaction>, StoreError> {
        let lock = self.case_lock(case_id).await;
        let guard = lock.lock_owned().await;
        let snapshot = self.snapshot_of(case_id).await?;
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            case_id,
            snapshot,
            pending: None,
            _guard: guard,
        }))
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(pmid) = &message.provider_message_id {
            if let Some(existing_id) = state.provider_message_index.get(pmid) {
                return Ok(state.messages[existing_id].clone());
            }
        }
        let id = MessageId::new();
        let record = Message {
            id,
            case_id: message.case_id,
            direction: message.direction,
            provider_message_id: message.provider_message_id.clone(),
            subject: message.subject,
            body: message.body,
            headers: message.headers,
            created_at: Utc::now(),
            processed_at: None,
            processed_run_id: None,
        };
        if let Some(pmid) = message.provider_message_id {
            state.provider_message_index.insert(pmid, id);
        }
        state.messages.insert(id, record.clone());
        Ok(record)
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        Ok(self.state.lock().await.messages.get(&id).cloned())
    }

    async fn mark_message_processed(&self, id: MessageId, run_id: RunId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(msg) = state.messages.get_mut(&id) {
            msg.processed_at = Some(Utc::now());
            msg.processed_run_id = Some(run_id);
        }
        Ok(())
    }

    async fn active_run(&self, case_id: CaseId) -> Result<Option<Run>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.runs.values().find(|r| r.case_id == case_id && r.status.is_active()).cloned())
    }

    async fn create_run(
        &self,
        case_id: CaseId,
        trigger: RunTrigger,
        triggering_message_id: Option<MessageId>,
        scheduled_key: Option<String>,
        autopilot_mode: AutopilotMode,
        lock_ttl: Duration,
    ) -> Result<CreateRunOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let Some(case) = state.cases.get(&case_id).cloned() else {
            return Ok(CreateRunOutcome::CaseNotFound);
        };
        if case.status.is_terminal() {
            return Ok(CreateRunOutcome::AlreadySent);
        }
        if let Some(existing) = state.runs.values().find(|r| r.case_id == case_id && r.status.is_active()).cloned() {
            return Ok(CreateRunOutcome::ActiveRunExists(existing));
        }
        let now = Utc::now();
        let run = Run {
            id: RunId::new(),
            case_id,
            trigger,
            triggering_message_id,
            scheduled_key,
            status: RunStatus::Queued,
            autopilot_mode,
            started_at: None,
            ended_at: None,
            heartbeat_at: now,
            lock_expires_at: Some(now + chrono::Duration::from_std(lock_ttl).unwrap_or_default()),
            created_at: now,
        };
        state.runs.insert(run.id, run.clone());
        Ok(CreateRunOutcome::Created(run))
    }

    async fn heartbeat_run(&self, run_id: RunId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(run) = state.runs.get_mut(&run_id) {
            run.heartbeat_at = Utc::now();
        }
        Ok(())
    }

    async fn stale_runs(&self, now: DateTime<Utc>, reap_after: Duration) -> Result<Vec<Run>, StoreError> {
        let reap_after = chrono::Duration::from_std(reap_after).unwrap_or_default();
        let state = self.state.lock().await;
        Ok(state.runs.values().filter(|r| r.is_stale(now, reap_after)).cloned().collect())
    }

    async fn upsert_proposal(&self, proposal: NewProposal) -> Result<Proposal, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(existing_id) = state.proposal_key_index.get(&proposal.proposal_key).copied() {
            let existing = state.proposals.get_mut(&existing_id).expect("indexed proposal exists");
            existing.draft_subject = proposal.draft_subject;
            existing.draft_body = proposal.draft_body;
            existing.reasoning = proposal.reasoning;
            existing.confidence = proposal.confidence;
            existing.risk_flags = proposal.risk_flags;
            existing.warnings = proposal.warnings;
            existing.can_auto_execute = proposal.can_auto_execute;
            existing.requires_human = proposal.requires_human;
            existing.pause_reason = proposal.pause_reason;
            existing.status = proposal.status;
            existing.pipeline_state = proposal.pipeline_state;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let record = Proposal {
            id: ProposalId::new(),
            case_id: proposal.case_id,
            run_id: proposal.run_id,
            proposal_key: proposal.proposal_key.clone(),
            execution_key: None,
            action_type: proposal.action_type,
            trigger_message_id: proposal.trigger_message_id,
            draft_subject: proposal.draft_subject,
            draft_body: proposal.draft_body,
            reasoning: proposal.reasoning,
            confidence: proposal.confidence,
            risk_flags: proposal.risk_flags,
            warnings: proposal.warnings,
            can_auto_execute: proposal.can_auto_execute,
            requires_human: proposal.requires_human,
            pause_reason: proposal.pause_reason,
            status: proposal.status,
            human_decision: None,
            pipeline_state: proposal.pipeline_state,
            created_at: now,
            updated_at: now,
        };
        state.proposal_key_index.insert(proposal.proposal_key, record.id);
        state.proposals.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<Proposal>, StoreError> {
        Ok(self.state.lock().await.proposals.get(&id).cloned())
    }

    async fn claim_execution(&self, proposal_id: ProposalId, execution_key: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(proposal) = state.proposals.get_mut(&proposal_id) else {
            return Ok(false);
        };
        if proposal.execution_key.is_some()
            || matches!(proposal.status, ProposalStatus::Executed | ProposalStatus::Blocked)
        {
            return Ok(false);
        }
        proposal.execution_key = Some(execution_key.to_string());
        Ok(true)
    }

    async fn create_execution(&self, execution: NewExecution) -> Result<Execution, StoreError> {
        let mut state = self.state.lock().await;
        if !state.execution_keys.insert(execution.execution_key.clone()) {
            return Err(StoreError::Conflict(format!(
                "execution_key {} already exists",
                execution.execution_key
            )));
        }
        let now = Utc::now();
        let record = Execution {
            id: ExecutionId::new(),
            case_id: execution.case_id,
            proposal_id: execution.proposal_id,
            run_id: execution.run_id,
            execution_key: execution.execution_key,
            action_type: execution.action_type,
            status: ExecutionStatus::Queued,
            provider: execution.provider,
            provider_message_id: None,
            error: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.executions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_execution_status(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        provider_message_id: Option<String>,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(exec) = state.executions.get_mut(&id) {
            exec.status = status;
            if provider_message_id.is_some() {
                exec.provider_message_id = provider_message_id;
            }
            if error.is_some() {
                exec.error = error;
                exec.retry_count += 1;
            }
            exec.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn recent_execution_count(&self, case_id: CaseId, within: Duration) -> Result<u32, StoreError> {
        let within = chrono::Duration::from_std(within).unwrap_or_default();
        let cutoff = Utc::now() - within;
        let state = self.state.lock().await;
        Ok(state.executions.values().filter(|e| e.case_id == case_id && e.created_at >= cutoff).count() as u32)
    }

    async fn create_portal_task(&self, task: PortalTask) -> Result<PortalTask, StoreError> {
        let mut state = self.state.lock().await;
        state.portal_tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_portal_task_status(
        &self,
        id: PortalTaskId,
        status: PortalTaskStatus,
        confirmation_number: Option<String>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(task) = state.portal_tasks.get_mut(&id) {
            task.status = status;
            if confirmation_number.is_some() {
                task.confirmation_number = confirmation_number;
            }
            task.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn overdue_portal_tasks(&self, now: DateTime<Utc>, threshold: Duration) -> Result<Vec<PortalTask>, StoreError> {
        let threshold = chrono::Duration::from_std(threshold).unwrap_or_default();
        let state = self.state.lock().await;
        Ok(state.portal_tasks.values().filter(|t| t.is_overdue(now, threshold)).cloned().collect())
    }

    async fn get_followup(&self, case_id: CaseId) -> Result<Option<FollowupSchedule>, StoreError> {
        Ok(self.state.lock().await.followups.get(&case_id).cloned())
    }

    async fn upsert_followup(&self, followup: FollowupSchedule) -> Result<FollowupSchedule, StoreError> {
        let mut state = self.state.lock().await;
        state.followups.insert(followup.case_id, followup.clone());
        Ok(followup)
    }

    async fn due_followups(&self, now: DateTime<Utc>) -> Result<Vec<FollowupSchedule>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.followups.values().filter(|f| f.is_due(now)).cloned().collect())
    }

    async fn cases_past_due(&self, now: DateTime<Utc>) -> Result<Vec<Case>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .cases
            .values()
            .filter(|c| {
                c.next_due_at.is_some_and(|d| d < now)
                    && !state.runs.values().any(|r| r.case_id == c.id && r.status.is_active())
            })
            .cloned()
            .collect())
    }

    async fn prune_ledger(&self, older_than: Duration) -> Result<u64, StoreError> {
        // The in-memory ledger carries no timestamp column beyond what is
        // embedded in `Projection`; this test double treats retention prune
        // as a no-op and leaves it to the Postgres-backed store to exercise
        // for real. Exists so callers can depend on the trait uniformly.
        let _ = older_than;
        Ok(0)
    }
}

struct PendingTransition {
    transition_key: String,
    event: CaseEvent,
    context: Value,
    mutations: Option<Mutations>,
}

struct InMemoryTransaction {
    store: InMemoryCaseStore,
    case_id: CaseId,
    snapshot: CaseSnapshot,
    pending: Option<PendingTransition>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl CaseTransaction for InMemoryTransaction {
    fn snapshot(&self) -> &CaseSnapshot {
        &self.snapshot
    }

    async fn insert_ledger_row(
        &mut self,
        event: &CaseEvent,
        transition_key: &str,
        context: Value,
    ) -> Result<LedgerInsertOutcome, StoreError> {
        let state = self.store.state.lock().await;
        if let Some(row) = state.ledger.get(&(self.case_id, transition_key.to_string())) {
            return Ok(LedgerInsertOutcome::AlreadyApplied(row.projection.clone()));
        }
        drop(state);
        self.pending = Some(PendingTransition {
            transition_key: transition_key.to_string(),
            event: event.clone(),
            context,
            mutations: None,
        });
        Ok(LedgerInsertOutcome::Inserted)
    }

    async fn apply_mutations(&mut self, mutations: &Mutations) -> Result<(), StoreError> {
        let pending = self.pending.as_mut().expect("insert_ledger_row must precede apply_mutations");
        pending.mutations = Some(mutations.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>, projection: &Projection) -> Result<(), StoreError> {
        let Some(pending) = self.pending else {
            return Ok(());
        };
        let Some(mutations) = pending.mutations else {
            return Ok(());
        };
        let mut state = self.store.state.lock().await;

        state.ledger.insert(
            (self.case_id, pending.transition_key.clone()),
            LedgerRow { transition_key: pending.transition_key, projection: projection.clone() },
        );
        let _ = pending.event;
        let _ = pending.context;

        apply_case_mutation(&mut state, self.case_id, &mutations);
        apply_run_mutations(&mut state, self.case_id, &mutations);
        apply_proposal_mutations(&mut state, self.case_id, &mutations);
        apply_execution_mutations(&mut state, &mutations);
        apply_portal_task_mutations(&mut state, &mutations);
        apply_followup_mutation(&mut state, self.case_id, &mutations);
        Ok(())
    }
}

fn apply_case_mutation(state: &mut MemoryState, case_id: CaseId, m: &Mutations) {
    let Some(case) = state.cases.get_mut(&case_id) else { return };
    if let Patch::Set(v) = m.case.status {
        case.status = v;
    }
    if let Patch::Set(v) = m.case.substatus.clone() {
        case.substatus = v;
    }
    if let Patch::Set(v) = m.case.requires_human {
        case.requires_human = v;
    }
    if let Patch::Set(v) = m.case.pause_reason {
        case.pause_reason = v;
    }
    if let Patch::Set(v) = m.case.next_due_at {
        case.next_due_at = v;
    }
    if let Patch::Set(v) = m.case.send_date {
        case.send_date = v;
    }
    if let Patch::Set(v) = m.case.last_response_date {
        case.last_response_date = v;
    }
    case.updated_at = Utc::now();
}

fn apply_run_mutations(state: &mut MemoryState, case_id: CaseId, m: &Mutations) {
    for rm in &m.runs {
        if let Some(run) = state.runs.get_mut(&rm.run_id) {
            if let Patch::Set(v) = rm.status {
                run.status = v;
            }
            if let Patch::Set(v) = rm.ended_at {
                run.ended_at = Some(v);
            }
        }
    }
    if let Some(keep) = m.agent_runs_cancel_others {
        let ids: Vec<RunId> = state
            .runs
            .values()
            .filter(|r| r.case_id == case_id && r.id != keep && r.status.is_active())
            .map(|r| r.id)
            .collect();
        for id in ids {
            if let Some(run) = state.runs.get_mut(&id) {
                run.status = RunStatus::Cancelled;
                run.ended_at = Some(Utc::now());
            }
        }
    }
}

fn apply_proposal_mutations(state: &mut MemoryState, case_id: CaseId, m: &Mutations) {
    let explicit: std::collections::HashSet<ProposalId> = m.proposals.iter().map(|p| p.proposal_id).collect();
    for pm in &m.proposals {
        if let Some(p) = state.proposals.get_mut(&pm.proposal_id) {
            if let Patch::Set(v) = pm.status {
                p.status = v;
            }
            p.updated_at = Utc::now();
        }
    }
    if m.proposals_dismiss_all {
        let ids: Vec<ProposalId> = state
            .proposals
            .values()
            .filter(|p| p.case_id == case_id && p.status.is_active() && !explicit.contains(&p.id))
            .map(|p| p.id)
            .collect();
        for id in ids {
            if let Some(p) = state.proposals.get_mut(&id) {
                p.status = ProposalStatus::Dismissed;
                p.updated_at = Utc::now();
            }
        }
    } else if m.proposals_dismiss_portal {
        let ids: Vec<ProposalId> = state
            .proposals
            .values()
            .filter(|p| {
                p.case_id == case_id && p.status == ProposalStatus::PendingPortal && !explicit.contains(&p.id)
            })
            .map(|p| p.id)
            .collect();
        for id in ids {
            if let Some(p) = state.proposals.get_mut(&id) {
                p.status = ProposalStatus::Dismissed;
                p.updated_at = Utc::now();
            }
        }
    }
}

fn apply_execution_mutations(state: &mut MemoryState, m: &Mutations) {
    for em in &m.executions {
        if let Some(e) = state.executions.get_mut(&em.execution_id) {
            if let Patch::Set(v) = em.status {
                e.status = v;
            }
            if let Patch::Set(v) = em.provider_message_id.clone() {
                e.provider_message_id = v;
            }
            if let Patch::Set(v) = em.error.clone() {
                e.error = v;
            }
            e.updated_at = Utc::now();
        }
    }
}

fn apply_portal_task_mutations(state: &mut MemoryState, m: &Mutations) {
    for tm in &m.portal_tasks {
        if let Some(t) = state.portal_tasks.get_mut(&tm.portal_task_id) {
            if let Patch::Set(v) = tm.status {
                t.status = v;
            }
            if let Patch::Set(v) = tm.confirmation_number.clone() {
                t.confirmation_number = v;
            }
            t.updated_at = Utc::now();
        }
    }
}

fn apply_followup_mutation(state: &mut MemoryState, case_id: CaseId, m: &Mutations) {
    let Some(fm) = &m.followup else { return };
    if let Some(followup) = state.followups.get_mut(&case_id) {
        if let Patch::Set(v) = fm.status {
            followup.status = v;
        }
        followup.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_core::{AgencyIdentity, CaseStatus, SubmissionChannel};

    fn sample_case() -> Case {
        let now = Utc::now();
        Case {
            id: CaseId(0),
            submission_channel: SubmissionChannel::Email,
            agency: AgencyIdentity {
                name: "Agency".into(),
                jurisdiction: None,
                agency_email: Some("foia@agency.gov".into()),
                portal_url: None,
            },
            requested_records: vec![],
            status: CaseStatus::ReadyToSend,
            substatus: None,
            requires_human: false,
            pause_reason: None,
            next_due_at: None,
            autopilot_mode: AutopilotMode::Auto,
            constraints: Value::Null,
            scope_items: Value::Null,
            send_date: None,
            last_response_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_run_then_second_call_returns_active_run_exists() {
        let store = InMemoryCaseStore::new();
        let id = store.insert_case(sample_case()).await.unwrap();
        let first = store
            .create_run(id, RunTrigger::InitialRequest, None, None, AutopilotMode::Auto, Duration::from_secs(120))
            .await
            .unwrap();
        assert!(matches!(first, CreateRunOutcome::Created(_)));
        let second = store
            .create_run(id, RunTrigger::InitialRequest, None, None, AutopilotMode::Auto, Duration::from_secs(120))
            .await
            .unwrap();
        assert!(matches!(second, CreateRunOutcome::ActiveRunExists(_)));
    }

    #[tokio::test]
    async fn duplicate_webhook_message_dedups_on_provider_id() {
        let store = InMemoryCaseStore::new();
        let id = store.insert_case(sample_case()).await.unwrap();
        let new_msg = || NewMessage {
            case_id: id,
            direction: case_core::MessageDirection::Inbound,
            provider_message_id: Some("prov-1".into()),
            subject: None,
            body: "hi".into(),
            headers: case_core::ThreadHeaders::default(),
        };
        let a = store.insert_message(new_msg()).await.unwrap();
        let b = store.insert_message(new_msg()).await.unwrap();
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn claim_execution_is_single_use() {
        let store = InMemoryCaseStore::new();
        let case_id = store.insert_case(sample_case()).await.unwrap();
        let run = match store
            .create_run(case_id, RunTrigger::InitialRequest, None, None, AutopilotMode::Auto, Duration::from_secs(120))
            .await
            .unwrap()
        {
            CreateRunOutcome::Created(r) => r,
            _ => unreachable!(),
        };
        let proposal = store
            .upsert_proposal(NewProposal {
                case_id,
                run_id: run.id,
                proposal_key: "k1".into(),
                action_type: case_core::ActionType::SendInitialRequest,
                trigger_message_id: None,
                draft_subject: None,
                draft_body: None,
                reasoning: vec![],
                confidence: None,
                risk_flags: vec![],
                warnings: vec![],
                can_auto_execute: true,
                requires_human: false,
                pause_reason: None,
                status: ProposalStatus::Approved,
                pipeline_state: None,
            })
            .await
            .unwrap();
        assert!(store.claim_execution(proposal.id, "exec-1").await.unwrap());
        assert!(!store.claim_execution(proposal.id, "exec-2").await.unwrap());
    }

    #[tokio::test]
    async fn transition_replay_returns_prior_projection() {
        let store = InMemoryCaseStore::new();
        let case_id = store.insert_case(sample_case()).await.unwrap();
        let mut txn = store.begin_transition(case_id).await.unwrap();
        let event = CaseEvent::CaseSent;
        let outcome = txn.insert_ledger_row(&event, "tk-1", Value::Null).await.unwrap();
        assert!(matches!(outcome, LedgerInsertOutcome::Inserted));
        let mut mutations = Mutations::default();
        mutations.case.status = Patch::Set(CaseStatus::Sent);
        txn.apply_mutations(&mutations).await.unwrap();
        let projection = Projection {
            case_status: CaseStatus::Sent,
            requires_human: false,
            pause_reason: None,
            active_run_id: None,
            active_proposal_id: None,
            last_action_type: None,
        };
        txn.commit(&projection).await.unwrap();

        let mut txn2 = store.begin_transition(case_id).await.unwrap();
        let outcome2 = txn2.insert_ledger_row(&event, "tk-1", Value::Null).await.unwrap();
        match outcome2 {
            LedgerInsertOutcome::AlreadyApplied(p) => assert_eq!(p.case_status, CaseStatus::Sent),
            LedgerInsertOutcome::Inserted => panic!("expected replay"),
        }
    }
}
