//! Request/response DTOs for the HTTP surface. Entity types
//! ([`case_core::Run`], [`case_core::Proposal`]) are returned as-is — they
//! already derive [`utoipa::ToSchema`] under `case-core`'s `openapi`
//! feature — these are only the shapes that don't exist upstream.

use case_core::{AutopilotMode, MessageId, RunId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub correlation_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunInitialRequest {
    #[serde(default)]
    pub autopilot_mode: Option<AutopilotMode>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunInboundRequest {
    pub message_id: Uuid,
    #[serde(default)]
    pub autopilot_mode: Option<AutopilotMode>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchAck {
    pub run_id: RunId,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResult {
    Dispatched { run_id: RunId },
    ActiveRunExists { run_id: RunId },
    SkippedLocked,
    AlreadySent,
    /// The webhook delivery carries a `provider_message_id` already marked
    /// processed by an earlier delivery; the replay was not re-dispatched.
    AlreadyProcessed,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionRequest {
    pub action: case_core::DecisionAction,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Who made the decision. The HTTP surface has no caller-identity
    /// concept of its own, so this is taken verbatim from the request
    /// body and defaults to `"operator"` when omitted.
    #[serde(default)]
    pub decided_by: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionResponse {
    pub run_id: RunId,
}

/// Inbound message payload an email/portal webhook relay posts.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookInboundRequest {
    pub case_id: i64,
    /// Provider-native message id, used for idempotent ingestion —
    /// resubmitting the same webhook body is a no-op.
    #[serde(default)]
    pub provider_message_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookInboundResponse {
    pub message_id: MessageId,
    pub dispatch: DispatchResult,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RuntimeMetricsResponse {
    pub runs_dispatched: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub runs_skipped_locked: u64,
    pub runs_active_run_exists: u64,
    pub runs_stale_reaped: u64,
    pub executions_sent: u64,
    pub executions_skipped: u64,
    pub executions_failed: u64,
    pub executions_rate_limited: u64,
}

impl From<case_runtime::RuntimeMetricsSnapshot> for RuntimeMetricsResponse {
    fn from(s: case_runtime::RuntimeMetricsSnapshot) -> Self {
        Self {
            runs_dispatched: s.runs_dispatched,
            runs_completed: s.runs_completed,
            runs_failed: s.runs_failed,
            runs_skipped_locked: s.runs_skipped_locked,
            runs_active_run_exists: s.runs_active_run_exists,
            runs_stale_reaped: s.runs_stale_reaped,
            executions_sent: s.executions_sent,
            executions_skipped: s.executions_skipped,
            executions_failed: s.executions_failed,
            executions_rate_limited: s.executions_rate_limited,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SchedulerMetricsResponse {
    pub followups_dispatched: u64,
    pub followups_escalated: u64,
    pub followups_errored: u64,
    pub stale_runs_reaped: u64,
    pub portal_tasks_marked_stuck: u64,
    pub deadline_escalations_dispatched: u64,
    pub ledger_rows_pruned: u64,
    pub sweep_errors: u64,
}

impl From<case_scheduler::SchedulerMetricsSnapshot> for SchedulerMetricsResponse {
    fn from(s: case_scheduler::SchedulerMetricsSnapshot) -> Self {
        Self {
            followups_dispatched: s.followups_dispatched,
            followups_escalated: s.followups_escalated,
            followups_errored: s.followups_errored,
            stale_runs_reaped: s.stale_runs_reaped,
            portal_tasks_marked_stuck: s.portal_tasks_marked_stuck,
            deadline_escalations_dispatched: s.deadline_escalations_dispatched,
            ledger_rows_pruned: s.ledger_rows_pruned,
            sweep_errors: s.sweep_errors,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub runtime: RuntimeMetricsResponse,
    pub scheduler: SchedulerMetricsResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DlqEntryResponse {
    pub queue_name: String,
    pub job_id: String,
    pub case_id: Option<i64>,
    pub error: String,
    pub attempt_count: u32,
    pub resolution: Option<String>,
}

impl From<case_executor::dlq::DeadLetterEntry> for DlqEntryResponse {
    fn from(e: case_executor::dlq::DeadLetterEntry) -> Self {
        Self {
            queue_name: e.queue_name,
            job_id: e.job_id,
            case_id: e.case_id.map(|id| id.0),
            error: e.error,
            attempt_count: e.attempt_count,
            resolution: e.resolution,
        }
    }
}
