//! Identifier newtypes shared across every case-runtime crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A case's integer identifier (assigned by the store on insert).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct CaseId(pub i64);

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! newtype_uuid {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        #[cfg_attr(feature = "openapi", schema(value_type = String))]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh, time-ordered identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

newtype_uuid!(MessageId, "Identifies a single inbound or outbound message.");
newtype_uuid!(RunId, "Identifies a single Decision Pipeline invocation.");
newtype_uuid!(ProposalId, "Identifies a decision artifact recommending a next action.");
newtype_uuid!(ExecutionId, "Identifies a single side-effect attempt.");
newtype_uuid!(PortalTaskId, "Identifies a human portal-submission work item.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_id_display() {
        assert_eq!(CaseId(42).to_string(), "42");
    }

    #[test]
    fn uuid_newtype_roundtrip() {
        let id = RunId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn uuid_newtype_are_distinct() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
