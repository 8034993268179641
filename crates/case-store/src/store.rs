use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use case_core::{
    AutopilotMode, Case, CaseEvent, CaseId, CaseSnapshot, Execution, ExecutionId, ExecutionStatus,
    FollowupSchedule, Message, MessageDirection, MessageId, PortalTask, PortalTaskId,
    PortalTaskStatus, Proposal, ProposalId, ProviderKind, Run, RunId, RunTrigger, ThreadHeaders,
};

use crate::error::StoreError;

/// Payload for [`CaseStore::insert_message`]. `id`/`created_at` are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub case_id: CaseId,
    pub direction: MessageDirection,
    pub provider_message_id: Option<String>,
    pub subject: Option<String>,
    pub body: String,
    pub headers: ThreadHeaders,
}

/// Payload for [`CaseStore::upsert_proposal`].
#[derive(Debug, Clone)]
pub struct NewProposal {
    pub case_id: CaseId,
    pub run_id: RunId,
    pub proposal_key: String,
    pub action_type: case_core::ActionType,
    pub trigger_message_id: Option<MessageId>,
    pub draft_subject: Option<String>,
    pub draft_body: Option<String>,
    pub reasoning: Vec<String>,
    pub confidence: Option<f64>,
    pub risk_flags: Vec<String>,
    pub warnings: Vec<String>,
    pub can_auto_execute: bool,
    pub requires_human: bool,
    pub pause_reason: Option<case_core::PauseReason>,
    pub status: case_core::ProposalStatus,
    pub pipeline_state: Option<Value>,
}

/// Payload for [`CaseStore::create_execution`].
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub case_id: CaseId,
    pub proposal_id: ProposalId,
    pub run_id: RunId,
    pub execution_key: String,
    pub action_type: case_core::ActionType,
    pub provider: ProviderKind,
}

/// Outcome of [`CaseStore::create_run`] — mirrors the Run Engine contract
/// in spec §4.4.
#[derive(Debug)]
pub enum CreateRunOutcome {
    Created(Run),
    ActiveRunExists(Run),
    CaseNotFound,
    AlreadySent,
}

/// The result of inserting a ledger row during a transition: either the
/// event is new, or a duplicate `transition_key` was found, in which case
/// the caller must treat the whole transition as a no-op and return the
/// prior projection (spec §4.2, invariant P5).
#[derive(Debug)]
pub enum LedgerInsertOutcome {
    Inserted,
    AlreadyApplied(case_core::Projection),
}

/// An open Runtime Transition (C3): a single database transaction that has
/// already loaded the case `FOR UPDATE`. Created by [`CaseStore::begin_transition`].
///
/// The call sequence a correct caller always follows is:
/// `insert_ledger_row` (bail out on `AlreadyApplied`) → `apply_mutations` →
/// `commit`. Dropping without calling `commit` rolls the whole transaction
/// back, so a node that returns an error partway through never leaves
/// partial writes (spec §4.2: "either all mutations persist ... or none do").
#[async_trait]
pub trait CaseTransaction: Send {
    fn snapshot(&self) -> &CaseSnapshot;

    async fn insert_ledger_row(
        &mut self,
        event: &CaseEvent,
        transition_key: &str,
        context: Value,
    ) -> Result<LedgerInsertOutcome, StoreError>;

    async fn apply_mutations(&mut self, mutations: &case_core::Mutations) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>, projection: &case_core::Projection) -> Result<(), StoreError>;
}

/// The durable record of cases, messages, proposals, runs, executions,
/// portal tasks, followups, and the event ledger (component C1).
#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn insert_case(&self, case: Case) -> Result<CaseId, StoreError>;

    async fn get_case(&self, id: CaseId) -> Result<Option<Case>, StoreError>;

    /// Loads the case `FOR UPDATE` and opens a transaction scoped to a
    /// single reducer application.
    async fn begin_transition(&self, case_id: CaseId) -> Result<Box<dyn CaseTransaction>, StoreError>;

    /// Idempotent on `provider_message_id`: re-delivering the same webhook
    /// payload returns the existing row rather than inserting a duplicate
    /// (spec §8 round-trip law).
    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Look up a previously-inserted message by id — used by the run-inbound
    /// entrypoint, which only receives a `messageId` and must load the body
    /// a prior webhook ingestion already committed.
    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError>;

    async fn mark_message_processed(&self, id: MessageId, run_id: RunId) -> Result<(), StoreError>;

    async fn active_run(&self, case_id: CaseId) -> Result<Option<Run>, StoreError>;

    /// Implements the Run Engine dispatch protocol steps 1-3 (spec §4.4):
    /// loads the case, checks for an existing active run, and inserts a new
    /// `Run` row with `status = queued` only if none exists.
    async fn create_run(
        &self,
        case_id: CaseId,
        trigger: RunTrigger,
        triggering_message_id: Option<MessageId>,
        scheduled_key: Option<String>,
        autopilot_mode: AutopilotMode,
        lock_ttl: Duration,
    ) -> Result<CreateRunOutcome, StoreError>;

    async fn heartbeat_run(&self, run_id: RunId) -> Result<(), StoreError>;

    /// Runs with `status = running` whose heartbeat has aged past
    /// `reap_after` — input to the stale-run reaper.
    async fn stale_runs(&self, now: DateTime<Utc>, reap_after: Duration) -> Result<Vec<Run>, StoreError>;

    /// `UPDATE ... SET ... WHERE proposal_key = ? ON CONFLICT DO UPDATE` —
    /// merges drafts emitted by retries of the same run/action (spec §4.5).
    async fn upsert_proposal(&self, proposal: NewProposal) -> Result<Proposal, StoreError>;

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<Proposal>, StoreError>;

    /// `UPDATE proposals SET execution_key = :key WHERE id = :id AND
    /// execution_key IS NULL AND status NOT IN (EXECUTED, BLOCKED)` —
    /// returns `true` only when exactly one row updated (invariant I6).
    async fn claim_execution(&self, proposal_id: ProposalId, execution_key: &str) -> Result<bool, StoreError>;

    async fn create_execution(&self, execution: NewExecution) -> Result<Execution, StoreError>;

    async fn update_execution_status(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        provider_message_id: Option<String>,
        error: Option<String>,
    ) -> Result<(), StoreError>;

    /// Executions for `case_id` created within the trailing hour, used by
    /// the executor's outbound rate limit (spec §4.6).
    async fn recent_execution_count(&self, case_id: CaseId, within: Duration) -> Result<u32, StoreError>;

    async fn create_portal_task(&self, task: PortalTask) -> Result<PortalTask, StoreError>;

    async fn update_portal_task_status(
        &self,
        id: PortalTaskId,
        status: PortalTaskStatus,
        confirmation_number: Option<String>,
    ) -> Result<(), StoreError>;

    async fn overdue_portal_tasks(&self, now: DateTime<Utc>, threshold: Duration) -> Result<Vec<PortalTask>, StoreError>;

    async fn get_followup(&self, case_id: CaseId) -> Result<Option<FollowupSchedule>, StoreError>;

    async fn upsert_followup(&self, followup: FollowupSchedule) -> Result<FollowupSchedule, StoreError>;

    async fn due_followups(&self, now: DateTime<Utc>) -> Result<Vec<FollowupSchedule>, StoreError>;

    /// Cases with `next_due_at < now` and no active run (spec §4.7 deadline sweep).
    async fn cases_past_due(&self, now: DateTime<Utc>) -> Result<Vec<Case>, StoreError>;

    /// Deletes ledger rows older than `older_than`. Returns the count
    /// removed (spec §4.7 retention prune).
    async fn prune_ledger(&self, older_than: Duration) -> Result<u64, StoreError>;
}
