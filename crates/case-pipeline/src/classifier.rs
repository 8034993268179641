//! The `classify_inbound` node's external collaborator (spec §1: "The LLM
//! service ... abstracted as pluggable callable").
//!
//! `case-pipeline` never talks to an LLM directly; callers inject a
//! [`Classifier`] implementation (a thin HTTP/gRPC client in production, a
//! fixed-output stub in tests).

use async_trait::async_trait;
use case_core::{Classification, DenialSubtype};

/// What the `classify_inbound` node needs to route.
#[derive(Debug, Clone)]
pub struct ClassifierInput<'a> {
    pub message_body: &'a str,
    pub message_subject: Option<&'a str>,
}

/// The classifier's normalized output (spec §4.3's implicit classifier
/// contract, and the literal shape used in spec §8's end-to-end scenarios).
#[derive(Debug, Clone)]
pub struct ClassifierOutput {
    pub requires_response: bool,
    pub classification: Classification,
    pub denial_subtype: Option<DenialSubtype>,
    pub fee_amount: Option<i64>,
    pub portal_url: Option<String>,
    pub key_points: Vec<String>,
}

impl Default for ClassifierOutput {
    /// Per spec §7: an unreachable classifier degrades to `UNKNOWN`, which
    /// `decide_next_action` has no explicit route for and therefore falls
    /// through to gating the case for human review.
    fn default() -> Self {
        Self {
            requires_response: true,
            classification: Classification::Unknown,
            denial_subtype: None,
            fee_amount: None,
            portal_url: None,
            key_points: Vec::new(),
        }
    }
}

/// External classification collaborator.
///
/// Per spec §7: "external classifier failures fall back to a conservative
/// default classification (`UNKNOWN` → gate for human), never block
/// pipeline completion" — callers that cannot reach their classifier should
/// return `Ok` with [`Classification::Unknown`] rather than propagate an
/// error, unless the failure is itself the thing under test.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, input: ClassifierInput<'_>) -> ClassifierOutput;
}

/// A classifier that always returns a fixed output — used in tests and as
/// a documentation fixture.
pub struct FixedClassifier(pub ClassifierOutput);

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _input: ClassifierInput<'_>) -> ClassifierOutput {
        self.0.clone()
    }
}
