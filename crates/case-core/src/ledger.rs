//! The [`EventLedgerRow`] entity: append-only audit of runtime transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::CaseId;

/// One row per applied (or replayed) runtime transition. `transition_key` is
/// unique per `(case_id, transition_key)` — the mechanism backing idempotent
/// replay (spec §4.2, invariant P5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EventLedgerRow {
    pub id: i64,
    pub case_id: CaseId,
    pub event_kind: String,
    pub transition_key: String,
    pub context: Value,
    pub mutations_applied: Value,
    pub projection: Value,
    pub created_at: DateTime<Utc>,
}
