use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};

use case_core::{
    AutopilotMode, Case, CaseEvent, CaseId, CaseSnapshot, CaseStatus, Execution, ExecutionId,
    ExecutionStatus, FollowupSchedule, FollowupStatus, Message, MessageDirection, MessageId,
    Mutations, PauseReason, PortalTask, PortalTaskId, PortalTaskStatus, Projection, Proposal,
    ProposalId, Run, RunId, RunStatus, RunTrigger, ThreadHeaders,
};
use case_store::store::{CreateRunOutcome, LedgerInsertOutcome, NewExecution, NewMessage, NewProposal};
use case_store::{CaseStore, CaseTransaction, StoreError};

use crate::config::PostgresConfig;
use crate::migrations;

/// Build `PgConnectOptions` from a [`PostgresConfig`], applying SSL settings
/// when configured.
pub(crate) fn build_connect_options(
    config: &PostgresConfig,
) -> Result<sqlx::postgres::PgConnectOptions, StoreError> {
    let mut options: sqlx::postgres::PgConnectOptions = config
        .url
        .parse()
        .map_err(|e: sqlx::Error| StoreError::Connection(e.to_string()))?;

    if let Some(ref mode) = config.ssl_mode {
        let ssl_mode = match mode.as_str() {
            "disable" => sqlx::postgres::PgSslMode::Disable,
            "prefer" => sqlx::postgres::PgSslMode::Prefer,
            "require" => sqlx::postgres::PgSslMode::Require,
            "verify-ca" => sqlx::postgres::PgSslMode::VerifyCa,
            "verify-full" => sqlx::postgres::PgSslMode::VerifyFull,
            other => {
                return Err(StoreError::Connection(format!("unknown ssl_mode: {other}")));
            }
        };
        options = options.ssl_mode(ssl_mode);
    }

    if let Some(ref path) = config.ssl_root_cert {
        options = options.ssl_root_cert(path);
    }

    if let Some(ref path) = config.ssl_cert {
        options = options.ssl_client_cert(path);
    }

    if let Some(ref path) = config.ssl_key {
        options = options.ssl_client_key(path);
    }

    Ok(options)
}

/// Serializes a case-core status enum to its wire tag (e.g. `CaseStatus::Sent`
/// becomes `"sent"`). Every enum stored in a `TEXT` column is a plain C-like
/// enum with a derived `Serialize`, so this never produces anything but a
/// JSON string.
fn tag_of<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        other => unreachable!("status enum serialized to non-string JSON: {other:?}"),
    }
}

/// Inverse of [`tag_of`] — maps a `TEXT` column value back to its enum,
/// failing loudly if the stored tag is no longer a valid variant.
fn from_tag<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_value(Value::String(raw.to_owned()))
        .map_err(|e| StoreError::Backend(format!("invalid {column} value {raw:?}: {e}")))
}

fn opt_tag<T: Serialize>(value: Option<&T>) -> Option<String> {
    value.map(tag_of)
}

fn from_opt_tag<T: DeserializeOwned>(column: &str, raw: Option<String>) -> Result<Option<T>, StoreError> {
    raw.map(|s| from_tag(column, &s)).transpose()
}

fn row_to_case(row: &PgRow) -> Result<Case, StoreError> {
    let status_raw: String = row.try_get("status").map_err(|e| StoreError::Backend(e.to_string()))?;
    let pause_reason_raw: Option<String> =
        row.try_get("pause_reason").map_err(|e| StoreError::Backend(e.to_string()))?;
    let channel_raw: String = row
        .try_get("submission_channel")
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let autopilot_raw: String =
        row.try_get("autopilot_mode").map_err(|e| StoreError::Backend(e.to_string()))?;
    let requested_records: Value =
        row.try_get("requested_records").map_err(|e| StoreError::Backend(e.to_string()))?;

    Ok(Case {
        id: CaseId(row.try_get("id").map_err(|e| StoreError::Backend(e.to_string()))?),
        submission_channel: from_tag("submission_channel", &channel_raw)?,
        agency: case_core::AgencyIdentity {
            name: row.try_get("agency_name").map_err(|e| StoreError::Backend(e.to_string()))?,
            jurisdiction: row
                .try_get("agency_jurisdiction")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            agency_email: row.try_get("agency_email").map_err(|e| StoreError::Backend(e.to_string()))?,
            portal_url: row
                .try_get("agency_portal_url")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
        },
        requested_records: serde_json::from_value(requested_records).unwrap_or_default(),
        status: from_tag("status", &status_raw)?,
        substatus: row.try_get("substatus").map_err(|e| StoreError::Backend(e.to_string()))?,
        requires_human: row.try_get("requires_human").map_err(|e| StoreError::Backend(e.to_string()))?,
        pause_reason: from_opt_tag::<PauseReason>("pause_reason", pause_reason_raw)?,
        next_due_at: row.try_get("next_due_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        autopilot_mode: from_tag("autopilot_mode", &autopilot_raw)?,
        constraints: row.try_get("constraints").map_err(|e| StoreError::Backend(e.to_string()))?,
        scope_items: row.try_get("scope_items").map_err(|e| StoreError::Backend(e.to_string()))?,
        send_date: row.try_get("send_date").map_err(|e| StoreError::Backend(e.to_string()))?,
        last_response_date: row
            .try_get("last_response_date")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|e| StoreError::Backend(e.to_string()))?,
    })
}

fn row_to_message(row: &PgRow) -> Result<Message, StoreError> {
    let direction_raw: String = row.try_get("direction").map_err(|e| StoreError::Backend(e.to_string()))?;
    let references: Value =
        row.try_get("header_references").map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(Message {
        id: MessageId(row.try_get("id").map_err(|e| StoreError::Backend(e.to_string()))?),
        case_id: CaseId(row.try_get("case_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        direction: from_tag("direction", &direction_raw)?,
        provider_message_id: row
            .try_get("provider_message_id")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        subject: row.try_get("subject").map_err(|e| StoreError::Backend(e.to_string()))?,
        body: row.try_get("body").map_err(|e| StoreError::Backend(e.to_string()))?,
        headers: ThreadHeaders {
            message_id: row
                .try_get("header_message_id")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            in_reply_to: row
                .try_get("header_in_reply_to")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            references: serde_json::from_value(references).unwrap_or_default(),
        },
        created_at: row.try_get("created_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        processed_at: row.try_get("processed_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        processed_run_id: row
            .try_get::<Option<uuid::Uuid>, _>("processed_run_id")
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .map(RunId),
    })
}

fn row_to_run(row: &PgRow) -> Result<Run, StoreError> {
    let trigger_raw: String = row.try_get("trigger").map_err(|e| StoreError::Backend(e.to_string()))?;
    let status_raw: String = row.try_get("status").map_err(|e| StoreError::Backend(e.to_string()))?;
    let autopilot_raw: String =
        row.try_get("autopilot_mode").map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(Run {
        id: RunId(row.try_get("id").map_err(|e| StoreError::Backend(e.to_string()))?),
        case_id: CaseId(row.try_get("case_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        trigger: from_tag("trigger", &trigger_raw)?,
        triggering_message_id: row
            .try_get::<Option<uuid::Uuid>, _>("triggering_message_id")
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .map(MessageId),
        scheduled_key: row.try_get("scheduled_key").map_err(|e| StoreError::Backend(e.to_string()))?,
        status: from_tag("status", &status_raw)?,
        autopilot_mode: from_tag("autopilot_mode", &autopilot_raw)?,
        started_at: row.try_get("started_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        ended_at: row.try_get("ended_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        heartbeat_at: row.try_get("heartbeat_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        lock_expires_at: row
            .try_get("lock_expires_at")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(|e| StoreError::Backend(e.to_string()))?,
    })
}

fn row_to_proposal(row: &PgRow) -> Result<Proposal, StoreError> {
    let action_type_raw: String = row.try_get("action_type").map_err(|e| StoreError::Backend(e.to_string()))?;
    let status_raw: String = row.try_get("status").map_err(|e| StoreError::Backend(e.to_string()))?;
    let pause_reason_raw: Option<String> =
        row.try_get("pause_reason").map_err(|e| StoreError::Backend(e.to_string()))?;
    let reasoning: Value = row.try_get("reasoning").map_err(|e| StoreError::Backend(e.to_string()))?;
    let risk_flags: Value = row.try_get("risk_flags").map_err(|e| StoreError::Backend(e.to_string()))?;
    let warnings: Value = row.try_get("warnings").map_err(|e| StoreError::Backend(e.to_string()))?;
    let human_decision: Option<Value> =
        row.try_get("human_decision").map_err(|e| StoreError::Backend(e.to_string()))?;

    Ok(Proposal {
        id: ProposalId(row.try_get("id").map_err(|e| StoreError::Backend(e.to_string()))?),
        case_id: CaseId(row.try_get("case_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        run_id: RunId(row.try_get("run_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        proposal_key: row.try_get("proposal_key").map_err(|e| StoreError::Backend(e.to_string()))?,
        execution_key: row.try_get("execution_key").map_err(|e| StoreError::Backend(e.to_string()))?,
        action_type: from_tag("action_type", &action_type_raw)?,
        trigger_message_id: row
            .try_get::<Option<uuid::Uuid>, _>("trigger_message_id")
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .map(MessageId),
        draft_subject: row.try_get("draft_subject").map_err(|e| StoreError::Backend(e.to_string()))?,
        draft_body: row.try_get("draft_body").map_err(|e| StoreError::Backend(e.to_string()))?,
        reasoning: serde_json::from_value(reasoning).unwrap_or_default(),
        confidence: row.try_get("confidence").map_err(|e| StoreError::Backend(e.to_string()))?,
        risk_flags: serde_json::from_value(risk_flags).unwrap_or_default(),
        warnings: serde_json::from_value(warnings).unwrap_or_default(),
        can_auto_execute: row.try_get("can_auto_execute").map_err(|e| StoreError::Backend(e.to_string()))?,
        requires_human: row.try_get("requires_human").map_err(|e| StoreError::Backend(e.to_string()))?,
        pause_reason: from_opt_tag::<PauseReason>("pause_reason", pause_reason_raw)?,
        status: from_tag("status", &status_raw)?,
        human_decision: human_decision
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::Serialization)?,
        pipeline_state: row.try_get("pipeline_state").map_err(|e| StoreError::Backend(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|e| StoreError::Backend(e.to_string()))?,
    })
}

fn row_to_execution(row: &PgRow) -> Result<Execution, StoreError> {
    let action_type_raw: String = row.try_get("action_type").map_err(|e| StoreError::Backend(e.to_string()))?;
    let status_raw: String = row.try_get("status").map_err(|e| StoreError::Backend(e.to_string()))?;
    let provider_raw: String = row.try_get("provider").map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(Execution {
        id: ExecutionId(row.try_get("id").map_err(|e| StoreError::Backend(e.to_string()))?),
        case_id: CaseId(row.try_get("case_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        proposal_id: ProposalId(row.try_get("proposal_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        run_id: RunId(row.try_get("run_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        execution_key: row.try_get("execution_key").map_err(|e| StoreError::Backend(e.to_string()))?,
        action_type: from_tag("action_type", &action_type_raw)?,
        status: from_tag("status", &status_raw)?,
        provider: from_tag("provider", &provider_raw)?,
        provider_message_id: row
            .try_get("provider_message_id")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        error: row.try_get("error").map_err(|e| StoreError::Backend(e.to_string()))?,
        retry_count: row
            .try_get::<i32, _>("retry_count")
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .try_into()
            .unwrap_or(0),
        created_at: row.try_get("created_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|e| StoreError::Backend(e.to_string()))?,
    })
}

fn row_to_portal_task(row: &PgRow) -> Result<PortalTask, StoreError> {
    let status_raw: String = row.try_get("status").map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(PortalTask {
        id: PortalTaskId(row.try_get("id").map_err(|e| StoreError::Backend(e.to_string()))?),
        case_id: CaseId(row.try_get("case_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        proposal_id: row
            .try_get::<Option<uuid::Uuid>, _>("proposal_id")
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .map(ProposalId),
        execution_id: row
            .try_get::<Option<uuid::Uuid>, _>("execution_id")
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .map(ExecutionId),
        portal_url: row.try_get("portal_url").map_err(|e| StoreError::Backend(e.to_string()))?,
        content: row.try_get("content").map_err(|e| StoreError::Backend(e.to_string()))?,
        instructions: row.try_get("instructions").map_err(|e| StoreError::Backend(e.to_string()))?,
        status: from_tag("status", &status_raw)?,
        assignee: row.try_get("assignee").map_err(|e| StoreError::Backend(e.to_string()))?,
        confirmation_number: row
            .try_get("confirmation_number")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        created_at: row.try_get("created_at").map_err(|e| StoreError::Backend(e.to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|e| StoreError::Backend(e.to_string()))?,
    })
}

fn row_to_followup(row: &PgRow) -> Result<FollowupSchedule, StoreError> {
    let status_raw: String = row.try_get("status").map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(FollowupSchedule {
        case_id: CaseId(row.try_get("case_id").map_err(|e| StoreError::Backend(e.to_string()))?),
        next_followup_date: row
            .try_get("next_followup_date")
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        followup_count: row
            .try_get::<i32, _>("followup_count")
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .try_into()
            .unwrap_or(0),
        status: from_tag("status", &status_raw)?,
        scheduled_key: row.try_get("scheduled_key").map_err(|e| StoreError::Backend(e.to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|e| StoreError::Backend(e.to_string()))?,
    })
}

/// `PostgreSQL`-backed implementation of [`CaseStore`] and [`CaseTransaction`].
///
/// Every mutating operation that touches more than one row (`create_run`,
/// the transition commit path) relies on `SELECT ... FOR UPDATE` against the
/// `cases` row to serialize concurrent writers for the same case — the same
/// "one case, one in-flight writer" invariant the in-memory store gets from
/// its per-case `tokio::sync::Mutex`.
pub struct PostgresCaseStore {
    pool: PgPool,
}

impl PostgresCaseStore {
    /// Create a new `PostgresCaseStore` from the provided configuration.
    ///
    /// Connects to `PostgreSQL`, creates the connection pool, and runs
    /// migrations to ensure the required tables exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if pool creation fails, or
    /// [`StoreError::Backend`] if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        let connect_options = build_connect_options(&config)?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        migrations::run_migrations(&pool).await.map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Create a `PostgresCaseStore` from an existing pool, sharing it with a
    /// [`crate::lock::PostgresDistributedLock`].
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}

const RUN_ACTIVE_STATUSES: [&str; 5] = ["created", "queued", "running", "paused", "waiting"];
const PROPOSAL_ACTIVE_STATUSES: [&str; 4] =
    ["PENDING_APPROVAL", "BLOCKED", "DECISION_RECEIVED", "PENDING_PORTAL"];

#[async_trait]
impl CaseStore for PostgresCaseStore {
    async fn insert_case(&self, case: Case) -> Result<CaseId, StoreError> {
        let row = sqlx::query(
            "INSERT INTO cases (
                submission_channel, agency_name, agency_jurisdiction, agency_email,
                agency_portal_url, requested_records, status, substatus, requires_human,
                pause_reason, next_due_at, autopilot_mode, constraints, scope_items,
                send_date, last_response_date, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
            RETURNING id",
        )
        .bind(tag_of(&case.submission_channel))
        .bind(&case.agency.name)
        .bind(&case.agency.jurisdiction)
        .bind(&case.agency.agency_email)
        .bind(&case.agency.portal_url)
        .bind(serde_json::to_value(&case.requested_records).map_err(StoreError::Serialization)?)
        .bind(tag_of(&case.status))
        .bind(&case.substatus)
        .bind(case.requires_human)
        .bind(opt_tag(case.pause_reason.as_ref()))
        .bind(case.next_due_at)
        .bind(tag_of(&case.autopilot_mode))
        .bind(&case.constraints)
        .bind(&case.scope_items)
        .bind(case.send_date)
        .bind(case.last_response_date)
        .bind(case.created_at)
        .bind(case.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(CaseId(row.try_get("id").map_err(|e| StoreError::Backend(e.to_string()))?))
    }

    async fn get_case(&self, id: CaseId) -> Result<Option<Case>, StoreError> {
        let row = sqlx::query("SELECT * FROM cases WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.as_ref().map(row_to_case).transpose()
    }

    async fn begin_transition(&self, case_id: CaseId) -> Result<Box<dyn CaseTransaction>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| StoreError::Backend(e.to_string()))?;

        let case_row = sqlx::query("SELECT * FROM cases WHERE id = $1 FOR UPDATE")
            .bind(case_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let Some(case_row) = case_row else {
            return Err(StoreError::CaseNotFound(case_id));
        };
        let case = row_to_case(&case_row)?;

        let run_row = sqlx::query("SELECT * FROM agent_runs WHERE case_id = $1 AND status = ANY($2) LIMIT 1")
            .bind(case_id.0)
            .bind(&RUN_ACTIVE_STATUSES[..])
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let active_run = run_row.as_ref().map(row_to_run).transpose()?;

        let proposal_rows = sqlx::query("SELECT * FROM proposals WHERE case_id = $1")
            .bind(case_id.0)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let proposals = proposal_rows.iter().map(row_to_proposal).collect::<Result<Vec<_>, _>>()?;

        let portal_rows = sqlx::query("SELECT * FROM portal_tasks WHERE case_id = $1")
            .bind(case_id.0)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let portal_tasks = portal_rows.iter().map(row_to_portal_task).collect::<Result<Vec<_>, _>>()?;

        let followup_row = sqlx::query("SELECT * FROM follow_up_schedule WHERE case_id = $1")
            .bind(case_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let followup = followup_row.as_ref().map(row_to_followup).transpose()?;

        let snapshot = CaseSnapshot { case, active_run, proposals, portal_tasks, followup };

        Ok(Box::new(PostgresTransaction {
            tx: Some(tx),
            case_id,
            snapshot,
            pending: None,
        }))
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        if let Some(ref provider_id) = message.provider_message_id {
            let existing = sqlx::query("SELECT * FROM messages WHERE provider_message_id = $1")
                .bind(provider_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            if let Some(row) = existing {
                return row_to_message(&row);
            }
        }

        let id = MessageId::new();
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO messages (
                id, case_id, direction, provider_message_id, subject, body,
                header_message_id, header_in_reply_to, header_references, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            RETURNING *",
        )
        .bind(id.0)
        .bind(message.case_id.0)
        .bind(tag_of(&message.direction))
        .bind(&message.provider_message_id)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(&message.headers.message_id)
        .bind(&message.headers.in_reply_to)
        .bind(serde_json::to_value(&message.headers.references).map_err(StoreError::Serialization)?)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        row_to_message(&row)
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.as_ref().map(row_to_message).transpose()
    }

    async fn mark_message_processed(&self, id: MessageId, run_id: RunId) -> Result<(), StoreError> {
        sqlx::query("UPDATE messages SET processed_at = NOW(), processed_run_id = $1 WHERE id = $2")
            .bind(run_id.0)
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn active_run(&self, case_id: CaseId) -> Result<Option<Run>, StoreError> {
        let row = sqlx::query("SELECT * FROM agent_runs WHERE case_id = $1 AND status = ANY($2) LIMIT 1")
            .bind(case_id.0)
            .bind(&RUN_ACTIVE_STATUSES[..])
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.as_ref().map(row_to_run).transpose()
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
        let mut tx = self.pool.begin().await.map_err(|e| StoreError::Backend(e.to_string()))?;

        let case_row = sqlx::query("SELECT * FROM cases WHERE id = $1 FOR UPDATE")
            .bind(case_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let Some(case_row) = case_row else {
            return Ok(CreateRunOutcome::CaseNotFound);
        };
        let case = row_to_case(&case_row)?;
        if case.status.is_terminal() {
            return Ok(CreateRunOutcome::AlreadySent);
        }

        let existing_row = sqlx::query("SELECT * FROM agent_runs WHERE case_id = $1 AND status = ANY($2) LIMIT 1")
            .bind(case_id.0)
            .bind(&RUN_ACTIVE_STATUSES[..])
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if let Some(row) = existing_row {
            return Ok(CreateRunOutcome::ActiveRunExists(row_to_run(&row)?));
        }

        let id = RunId::new();
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO agent_runs (
                id, case_id, trigger, triggering_message_id, scheduled_key, status,
                autopilot_mode, heartbeat_at, lock_expires_at, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            RETURNING *",
        )
        .bind(id.0)
        .bind(case_id.0)
        .bind(tag_of(&trigger))
        .bind(triggering_message_id.map(|m| m.0))
        .bind(&scheduled_key)
        .bind(tag_of(&RunStatus::Queued))
        .bind(tag_of(&autopilot_mode))
        .bind(now)
        .bind(now + lock_ttl)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        let run = row_to_run(&row)?;

        tx.commit().await.map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(CreateRunOutcome::Created(run))
    }

    async fn heartbeat_run(&self, run_id: RunId) -> Result<(), StoreError> {
        sqlx::query("UPDATE agent_runs SET heartbeat_at = NOW() WHERE id = $1")
            .bind(run_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn stale_runs(&self, now: DateTime<Utc>, reap_after: Duration) -> Result<Vec<Run>, StoreError> {
        let cutoff = now - chrono::Duration::from_std(reap_after).unwrap_or(chrono::Duration::zero());
        let rows = sqlx::query("SELECT * FROM agent_runs WHERE status = $1 AND heartbeat_at <= $2")
            .bind(tag_of(&RunStatus::Running))
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(row_to_run).collect()
    }

    async fn upsert_proposal(&self, proposal: NewProposal) -> Result<Proposal, StoreError> {
        let existing = sqlx::query("SELECT * FROM proposals WHERE proposal_key = $1")
            .bind(&proposal.proposal_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(row) = existing {
            let id: uuid::Uuid = row.try_get("id").map_err(|e| StoreError::Backend(e.to_string()))?;
            let updated = sqlx::query(
                "UPDATE proposals SET
                    draft_subject = $1, draft_body = $2, reasoning = $3, confidence = $4,
                    risk_flags = $5, warnings = $6, can_auto_execute = $7, requires_human = $8,
                    pause_reason = $9, status = $10, pipeline_state = $11, updated_at = NOW()
                 WHERE id = $12
                 RETURNING *",
            )
            .bind(&proposal.draft_subject)
            .bind(&proposal.draft_body)
            .bind(serde_json::to_value(&proposal.reasoning).map_err(StoreError::Serialization)?)
            .bind(proposal.confidence)
            .bind(serde_json::to_value(&proposal.risk_flags).map_err(StoreError::Serialization)?)
            .bind(serde_json::to_value(&proposal.warnings).map_err(StoreError::Serialization)?)
            .bind(proposal.can_auto_execute)
            .bind(proposal.requires_human)
            .bind(opt_tag(proposal.pause_reason.as_ref()))
            .bind(tag_of(&proposal.status))
            .bind(&proposal.pipeline_state)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
            return row_to_proposal(&updated);
        }

        let id = ProposalId::new();
        let row = sqlx::query(
            "INSERT INTO proposals (
                id, case_id, run_id, proposal_key, action_type, trigger_message_id,
                draft_subject, draft_body, reasoning, confidence, risk_flags, warnings,
                can_auto_execute, requires_human, pause_reason, status, pipeline_state,
                created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,NOW(),NOW())
            RETURNING *",
        )
        .bind(id.0)
        .bind(proposal.case_id.0)
        .bind(proposal.run_id.0)
        .bind(&proposal.proposal_key)
        .bind(tag_of(&proposal.action_type))
        .bind(proposal.trigger_message_id.map(|m| m.0))
        .bind(&proposal.draft_subject)
        .bind(&proposal.draft_body)
        .bind(serde_json::to_value(&proposal.reasoning).map_err(StoreError::Serialization)?)
        .bind(proposal.confidence)
        .bind(serde_json::to_value(&proposal.risk_flags).map_err(StoreError::Serialization)?)
        .bind(serde_json::to_value(&proposal.warnings).map_err(StoreError::Serialization)?)
        .bind(proposal.can_auto_execute)
        .bind(proposal.requires_human)
        .bind(opt_tag(proposal.pause_reason.as_ref()))
        .bind(tag_of(&proposal.status))
        .bind(&proposal.pipeline_state)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        row_to_proposal(&row)
    }

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<Proposal>, StoreError> {
        let row = sqlx::query("SELECT * FROM proposals WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.as_ref().map(row_to_proposal).transpose()
    }

    async fn claim_execution(&self, proposal_id: ProposalId, execution_key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE proposals SET execution_key = $1
             WHERE id = $2 AND execution_key IS NULL AND status NOT IN ('EXECUTED', 'BLOCKED')",
        )
        .bind(execution_key)
        .bind(proposal_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_execution(&self, execution: NewExecution) -> Result<Execution, StoreError> {
        let id = ExecutionId::new();
        let row = sqlx::query(
            "INSERT INTO executions (
                id, case_id, proposal_id, run_id, execution_key, action_type, status, provider,
                retry_count, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,0,NOW(),NOW())
            RETURNING *",
        )
        .bind(id.0)
        .bind(execution.case_id.0)
        .bind(execution.proposal_id.0)
        .bind(execution.run_id.0)
        .bind(&execution.execution_key)
        .bind(tag_of(&execution.action_type))
        .bind(tag_of(&ExecutionStatus::Queued))
        .bind(tag_of(&execution.provider))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return StoreError::Conflict(execution.execution_key.clone());
                }
            }
            StoreError::Backend(e.to_string())
        })?;

        row_to_execution(&row)
    }

    async fn update_execution_status(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        provider_message_id: Option<String>,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE executions SET updated_at = NOW(), status = ");
        qb.push_bind(tag_of(&status));
        if let Some(pmid) = provider_message_id {
            qb.push(", provider_message_id = ").push_bind(pmid);
        }
        if let Some(err) = error {
            qb.push(", error = ").push_bind(err).push(", retry_count = retry_count + 1");
        }
        qb.push(" WHERE id = ").push_bind(id.0);
        qb.build().execute(&self.pool).await.map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn recent_execution_count(&self, case_id: CaseId, within: Duration) -> Result<u32, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(within).unwrap_or(chrono::Duration::zero());
        let row = sqlx::query("SELECT COUNT(*) AS n FROM executions WHERE case_id = $1 AND created_at >= $2")
            .bind(case_id.0)
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(u32::try_from(n).unwrap_or(u32::MAX))
    }

    async fn create_portal_task(&self, task: PortalTask) -> Result<PortalTask, StoreError> {
        let row = sqlx::query(
            "INSERT INTO portal_tasks (
                id, case_id, proposal_id, execution_id, portal_url, content, instructions,
                status, assignee, confirmation_number, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            RETURNING *",
        )
        .bind(task.id.0)
        .bind(task.case_id.0)
        .bind(task.proposal_id.map(|p| p.0))
        .bind(task.execution_id.map(|e| e.0))
        .bind(&task.portal_url)
        .bind(&task.content)
        .bind(&task.instructions)
        .bind(tag_of(&task.status))
        .bind(&task.assignee)
        .bind(&task.confirmation_number)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        row_to_portal_task(&row)
    }

    async fn update_portal_task_status(
        &self,
        id: PortalTaskId,
        status: PortalTaskStatus,
        confirmation_number: Option<String>,
    ) -> Result<(), StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE portal_tasks SET updated_at = NOW(), status = ");
        qb.push_bind(tag_of(&status));
        if let Some(number) = confirmation_number {
            qb.push(", confirmation_number = ").push_bind(number);
        }
        qb.push(" WHERE id = ").push_bind(id.0);
        qb.build().execute(&self.pool).await.map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn overdue_portal_tasks(&self, now: DateTime<Utc>, threshold: Duration) -> Result<Vec<PortalTask>, StoreError> {
        let cutoff = now - chrono::Duration::from_std(threshold).unwrap_or(chrono::Duration::zero());
        let rows = sqlx::query("SELECT * FROM portal_tasks WHERE status = $1 AND created_at <= $2")
            .bind(tag_of(&PortalTaskStatus::Pending))
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(row_to_portal_task).collect()
    }

    async fn get_followup(&self, case_id: CaseId) -> Result<Option<FollowupSchedule>, StoreError> {
        let row = sqlx::query("SELECT * FROM follow_up_schedule WHERE case_id = $1")
            .bind(case_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        row.as_ref().map(row_to_followup).transpose()
    }

    async fn upsert_followup(&self, followup: FollowupSchedule) -> Result<FollowupSchedule, StoreError> {
        let row = sqlx::query(
            "INSERT INTO follow_up_schedule (case_id, next_followup_date, followup_count, status, scheduled_key, updated_at)
             VALUES ($1,$2,$3,$4,$5,NOW())
             ON CONFLICT (case_id) DO UPDATE SET
                next_followup_date = EXCLUDED.next_followup_date,
                followup_count = EXCLUDED.followup_count,
                status = EXCLUDED.status,
                scheduled_key = EXCLUDED.scheduled_key,
                updated_at = NOW()
             RETURNING *",
        )
        .bind(followup.case_id.0)
        .bind(followup.next_followup_date)
        .bind(i32::try_from(followup.followup_count).unwrap_or(i32::MAX))
        .bind(tag_of(&followup.status))
        .bind(&followup.scheduled_key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        row_to_followup(&row)
    }

    async fn due_followups(&self, now: DateTime<Utc>) -> Result<Vec<FollowupSchedule>, StoreError> {
        let rows = sqlx::query("SELECT * FROM follow_up_schedule WHERE status = $1 AND next_followup_date <= $2")
            .bind(tag_of(&FollowupStatus::Scheduled))
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(row_to_followup).collect()
    }

    async fn cases_past_due(&self, now: DateTime<Utc>) -> Result<Vec<Case>, StoreError> {
        let rows = sqlx::query(
            "SELECT c.* FROM cases c
             WHERE c.next_due_at IS NOT NULL AND c.next_due_at < $1
             AND NOT EXISTS (
                SELECT 1 FROM agent_runs r WHERE r.case_id = c.id AND r.status = ANY($2)
             )",
        )
        .bind(now)
        .bind(&RUN_ACTIVE_STATUSES[..])
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.iter().map(row_to_case).collect()
    }

    async fn prune_ledger(&self, older_than: Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::zero());
        let result = sqlx::query("DELETE FROM case_event_ledger WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

/// A pending ledger write, buffered in memory until [`CaseTransaction::commit`]
/// so the `INSERT` and every mutation apply inside one round trip.
struct PendingTransition {
    transition_key: String,
    event: CaseEvent,
    context: Value,
    mutations: Option<Mutations>,
}

struct PostgresTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
    case_id: CaseId,
    snapshot: CaseSnapshot,
    pending: Option<PendingTransition>,
}

#[async_trait]
impl CaseTransaction for PostgresTransaction {
    fn snapshot(&self) -> &CaseSnapshot {
        &self.snapshot
    }

    async fn insert_ledger_row(
        &mut self,
        event: &CaseEvent,
        transition_key: &str,
        context: Value,
    ) -> Result<LedgerInsertOutcome, StoreError> {
        let tx = self.tx.as_mut().expect("transaction already consumed");
        let existing = sqlx::query("SELECT projection FROM case_event_ledger WHERE case_id = $1 AND transition_key = $2")
            .bind(self.case_id.0)
            .bind(transition_key)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(row) = existing {
            let projection_raw: Value = row.try_get("projection").map_err(|e| StoreError::Backend(e.to_string()))?;
            let projection: Projection = serde_json::from_value(projection_raw).map_err(StoreError::Serialization)?;
            return Ok(LedgerInsertOutcome::AlreadyApplied(projection));
        }

        self.pending = Some(PendingTransition {
            transition_key: transition_key.to_owned(),
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

    async fn commit(mut self: Box<Self>, projection: &Projection) -> Result<(), StoreError> {
        let Some(mut tx) = self.tx.take() else {
            return Ok(());
        };
        let Some(pending) = self.pending.take() else {
            tx.rollback().await.map_err(|e| StoreError::Backend(e.to_string()))?;
            return Ok(());
        };
        let Some(mutations) = pending.mutations else {
            tx.rollback().await.map_err(|e| StoreError::Backend(e.to_string()))?;
            return Ok(());
        };

        let mutations_applied = serde_json::to_value(&mutations).map_err(StoreError::Serialization)?;
        let projection_value = serde_json::to_value(projection).map_err(StoreError::Serialization)?;

        sqlx::query(
            "INSERT INTO case_event_ledger (case_id, event_kind, transition_key, context, mutations_applied, projection)
             VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(self.case_id.0)
        .bind(pending.event.kind())
        .bind(&pending.transition_key)
        .bind(&pending.context)
        .bind(&mutations_applied)
        .bind(&projection_value)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        apply_case_mutation(&mut tx, self.case_id, &mutations.case).await?;
        apply_run_mutations(&mut tx, self.case_id, &mutations).await?;
        apply_proposal_mutations(&mut tx, self.case_id, &mutations).await?;
        apply_execution_mutations(&mut tx, &mutations).await?;
        apply_portal_task_mutations(&mut tx, &mutations).await?;
        apply_followup_mutation(&mut tx, self.case_id, &mutations).await?;

        tx.commit().await.map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

async fn apply_case_mutation(
    conn: &mut PgConnection,
    case_id: CaseId,
    m: &case_core::CaseMutation,
) -> Result<(), StoreError> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE cases SET updated_at = NOW()");
    if let Some(v) = m.status.into_option() {
        qb.push(", status = ").push_bind(tag_of(&v));
    }
    if let Some(v) = m.substatus.clone().into_option() {
        qb.push(", substatus = ").push_bind(v);
    }
    if let Some(v) = m.requires_human.into_option() {
        qb.push(", requires_human = ").push_bind(v);
    }
    if let Some(v) = m.pause_reason.into_option() {
        qb.push(", pause_reason = ").push_bind(opt_tag(v.as_ref()));
    }
    if let Some(v) = m.next_due_at.into_option() {
        qb.push(", next_due_at = ").push_bind(v);
    }
    if let Some(v) = m.send_date.into_option() {
        qb.push(", send_date = ").push_bind(v);
    }
    if let Some(v) = m.last_response_date.into_option() {
        qb.push(", last_response_date = ").push_bind(v);
    }
    qb.push(" WHERE id = ").push_bind(case_id.0);
    qb.build().execute(&mut *conn).await.map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(())
}

async fn apply_run_mutations(conn: &mut PgConnection, case_id: CaseId, mutations: &Mutations) -> Result<(), StoreError> {
    for run_mutation in &mutations.runs {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE agent_runs SET ");
        let mut touched = false;
        if let Some(status) = run_mutation.status.into_option() {
            qb.push("status = ").push_bind(tag_of(&status));
            touched = true;
        }
        if let Some(ended_at) = run_mutation.ended_at.into_option() {
            if touched {
                qb.push(", ");
            }
            qb.push("ended_at = ").push_bind(ended_at);
            touched = true;
        }
        if !touched {
            continue;
        }
        qb.push(" WHERE id = ").push_bind(run_mutation.run_id.0);
        qb.build().execute(&mut *conn).await.map_err(|e| StoreError::Backend(e.to_string()))?;
    }

    if let Some(keep_run_id) = mutations.agent_runs_cancel_others {
        sqlx::query(
            "UPDATE agent_runs SET status = $1, ended_at = NOW()
             WHERE case_id = $2 AND id <> $3 AND status = ANY($4)",
        )
        .bind(tag_of(&RunStatus::Cancelled))
        .bind(case_id.0)
        .bind(keep_run_id.0)
        .bind(&RUN_ACTIVE_STATUSES[..])
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    }

    Ok(())
}

async fn apply_proposal_mutations(conn: &mut PgConnection, case_id: CaseId, mutations: &Mutations) -> Result<(), StoreError> {
    let mut explicit = Vec::with_capacity(mutations.proposals.len());
    for proposal_mutation in &mutations.proposals {
        explicit.push(proposal_mutation.proposal_id.0);
        if let Some(status) = proposal_mutation.status.into_option() {
            sqlx::query("UPDATE proposals SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(tag_of(&status))
                .bind(proposal_mutation.proposal_id.0)
                .execute(&mut *conn)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
    }

    if mutations.proposals_dismiss_all {
        sqlx::query(
            "UPDATE proposals SET status = 'DISMISSED', updated_at = NOW()
             WHERE case_id = $1 AND status = ANY($2) AND NOT (id = ANY($3))",
        )
        .bind(case_id.0)
        .bind(&PROPOSAL_ACTIVE_STATUSES[..])
        .bind(&explicit[..])
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    } else if mutations.proposals_dismiss_portal {
        sqlx::query(
            "UPDATE proposals SET status = 'DISMISSED', updated_at = NOW()
             WHERE case_id = $1 AND status = 'PENDING_PORTAL' AND NOT (id = ANY($2))",
        )
        .bind(case_id.0)
        .bind(&explicit[..])
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    }

    Ok(())
}

async fn apply_execution_mutations(conn: &mut PgConnection, mutations: &Mutations) -> Result<(), StoreError> {
    for execution_mutation in &mutations.executions {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE executions SET updated_at = NOW()");
        if let Some(status) = execution_mutation.status.into_option() {
            qb.push(", status = ").push_bind(tag_of(&status));
        }
        if let Some(pmid) = execution_mutation.provider_message_id.clone().into_option() {
            qb.push(", provider_message_id = ").push_bind(pmid);
        }
        if let Some(err) = execution_mutation.error.clone().into_option() {
            qb.push(", error = ").push_bind(err);
        }
        qb.push(" WHERE id = ").push_bind(execution_mutation.execution_id.0);
        qb.build().execute(&mut *conn).await.map_err(|e| StoreError::Backend(e.to_string()))?;
    }
    Ok(())
}

async fn apply_portal_task_mutations(conn: &mut PgConnection, mutations: &Mutations) -> Result<(), StoreError> {
    for task_mutation in &mutations.portal_tasks {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE portal_tasks SET updated_at = NOW()");
        if let Some(status) = task_mutation.status.into_option() {
            qb.push(", status = ").push_bind(tag_of(&status));
        }
        if let Some(number) = task_mutation.confirmation_number.clone().into_option() {
            qb.push(", confirmation_number = ").push_bind(number);
        }
        qb.push(" WHERE id = ").push_bind(task_mutation.portal_task_id.0);
        qb.build().execute(&mut *conn).await.map_err(|e| StoreError::Backend(e.to_string()))?;
    }
    Ok(())
}

async fn apply_followup_mutation(conn: &mut PgConnection, case_id: CaseId, mutations: &Mutations) -> Result<(), StoreError> {
    let Some(followup_mutation) = &mutations.followup else {
        return Ok(());
    };
    let Some(status) = followup_mutation.status.into_option() else {
        return Ok(());
    };
    sqlx::query("UPDATE follow_up_schedule SET status = $1, updated_at = NOW() WHERE case_id = $2")
        .bind(tag_of(&status))
        .bind(case_id.0)
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssl_mode_parses_known_values() {
        let config = PostgresConfig { ssl_mode: Some("require".to_string()), ..PostgresConfig::default() };
        assert!(build_connect_options(&config).is_ok());
    }

    #[test]
    fn ssl_mode_rejects_unknown_values() {
        let config = PostgresConfig { ssl_mode: Some("bogus".to_string()), ..PostgresConfig::default() };
        assert!(build_connect_options(&config).is_err());
    }

    #[test]
    fn tag_of_matches_serde_rename() {
        assert_eq!(tag_of(&CaseStatus::NeedsHumanReview), "needs_human_review");
        assert_eq!(tag_of(&ExecutionStatus::PendingHuman), "PENDING_HUMAN");
    }

    #[test]
    fn from_tag_round_trips() {
        let status: CaseStatus = from_tag("status", "awaiting_response").unwrap();
        assert_eq!(status, CaseStatus::AwaitingResponse);
        assert!(from_tag::<CaseStatus>("status", "not_a_status").is_err());
    }
}
