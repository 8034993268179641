//! The [`Message`] entity: inbound or outbound communication on a case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CaseId, MessageId, RunId};

/// Direction of a message relative to the case owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// RFC-5322 threading headers used to derive thread affiliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ThreadHeaders {
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
}

/// A single inbound or outbound communication attached to a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    pub id: MessageId,
    pub case_id: CaseId,
    pub direction: MessageDirection,
    /// Unique per provider when present; the dedup key for webhook replay.
    pub provider_message_id: Option<String>,
    pub subject: Option<String>,
    pub body: String,
    pub headers: ThreadHeaders,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_run_id: Option<RunId>,
}

impl Message {
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}
