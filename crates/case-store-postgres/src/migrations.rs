use sqlx::PgPool;

/// Run database migrations, creating the domain tables if they do not exist.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS cases (
            id BIGSERIAL PRIMARY KEY,
            submission_channel TEXT NOT NULL,
            agency_name TEXT NOT NULL,
            agency_jurisdiction TEXT,
            agency_email TEXT,
            agency_portal_url TEXT,
            requested_records JSONB NOT NULL DEFAULT '[]',
            status TEXT NOT NULL,
            substatus TEXT,
            requires_human BOOLEAN NOT NULL DEFAULT FALSE,
            pause_reason TEXT,
            next_due_at TIMESTAMPTZ,
            autopilot_mode TEXT NOT NULL,
            constraints JSONB NOT NULL DEFAULT 'null',
            scope_items JSONB NOT NULL DEFAULT 'null',
            send_date TIMESTAMPTZ,
            last_response_date TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id UUID PRIMARY KEY,
            case_id BIGINT NOT NULL REFERENCES cases(id),
            direction TEXT NOT NULL,
            provider_message_id TEXT,
            subject TEXT,
            body TEXT NOT NULL,
            header_message_id TEXT,
            header_in_reply_to TEXT,
            header_references JSONB NOT NULL DEFAULT '[]',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            processed_at TIMESTAMPTZ,
            processed_run_id UUID
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS messages_provider_message_id_idx
         ON messages (provider_message_id) WHERE provider_message_id IS NOT NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS messages_case_id_idx ON messages (case_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS agent_runs (
            id UUID PRIMARY KEY,
            case_id BIGINT NOT NULL REFERENCES cases(id),
            trigger TEXT NOT NULL,
            triggering_message_id UUID,
            scheduled_key TEXT,
            status TEXT NOT NULL,
            autopilot_mode TEXT NOT NULL,
            started_at TIMESTAMPTZ,
            ended_at TIMESTAMPTZ,
            heartbeat_at TIMESTAMPTZ NOT NULL,
            lock_expires_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    // Invariant I4/I7: at most one active run per case.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS agent_runs_active_idx ON agent_runs (case_id)
         WHERE status IN ('created', 'queued', 'running', 'paused', 'waiting')",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS agent_runs_scheduled_key_idx ON agent_runs (scheduled_key)
         WHERE scheduled_key IS NOT NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS proposals (
            id UUID PRIMARY KEY,
            case_id BIGINT NOT NULL REFERENCES cases(id),
            run_id UUID NOT NULL,
            proposal_key TEXT NOT NULL UNIQUE,
            execution_key TEXT,
            action_type TEXT NOT NULL,
            trigger_message_id UUID,
            draft_subject TEXT,
            draft_body TEXT,
            reasoning JSONB NOT NULL DEFAULT '[]',
            confidence DOUBLE PRECISION,
            risk_flags JSONB NOT NULL DEFAULT '[]',
            warnings JSONB NOT NULL DEFAULT '[]',
            can_auto_execute BOOLEAN NOT NULL,
            requires_human BOOLEAN NOT NULL,
            pause_reason TEXT,
            status TEXT NOT NULL,
            human_decision JSONB,
            pipeline_state JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    // Invariant I5/P2: at most one active proposal per case.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS proposals_active_idx ON proposals (case_id)
         WHERE status IN ('PENDING_APPROVAL', 'BLOCKED', 'DECISION_RECEIVED', 'PENDING_PORTAL')",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS proposals_case_id_idx ON proposals (case_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS executions (
            id UUID PRIMARY KEY,
            case_id BIGINT NOT NULL REFERENCES cases(id),
            proposal_id UUID NOT NULL,
            run_id UUID NOT NULL,
            execution_key TEXT NOT NULL UNIQUE,
            action_type TEXT NOT NULL,
            status TEXT NOT NULL,
            provider TEXT NOT NULL,
            provider_message_id TEXT,
            error TEXT,
            retry_count INT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS executions_case_id_idx ON executions (case_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS portal_tasks (
            id UUID PRIMARY KEY,
            case_id BIGINT NOT NULL REFERENCES cases(id),
            proposal_id UUID,
            execution_id UUID,
            portal_url TEXT NOT NULL,
            content TEXT,
            instructions TEXT,
            status TEXT NOT NULL,
            assignee TEXT,
            confirmation_number TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS portal_tasks_case_id_idx ON portal_tasks (case_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS follow_up_schedule (
            case_id BIGINT PRIMARY KEY REFERENCES cases(id),
            next_followup_date TIMESTAMPTZ NOT NULL,
            followup_count INT NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            scheduled_key TEXT,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS case_event_ledger (
            id BIGSERIAL PRIMARY KEY,
            case_id BIGINT NOT NULL REFERENCES cases(id),
            event_kind TEXT NOT NULL,
            transition_key TEXT NOT NULL,
            context JSONB NOT NULL DEFAULT 'null',
            mutations_applied JSONB NOT NULL DEFAULT 'null',
            projection JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (case_id, transition_key)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS case_event_ledger_created_at_idx ON case_event_ledger (created_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS dead_letter_queue (
            id BIGSERIAL PRIMARY KEY,
            queue_name TEXT NOT NULL,
            job_id TEXT NOT NULL,
            case_id BIGINT,
            job_data JSONB NOT NULL,
            error TEXT NOT NULL,
            attempt_count INT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            resolution TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS locks (
            name TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
