//! The Decision Pipeline (C5): classifies an inbound message (or an
//! initial-request trigger), routes to a next action, drafts it, checks it
//! for safety, and decides whether it can be auto-executed or must be
//! gated for a human.
//!
//! This crate performs no I/O of its own — `case-runtime` loads the
//! [`case_core::CaseSnapshot`] and persists the result; the only external
//! collaborator is the injected [`Classifier`].

pub mod classifier;
pub mod draft;
pub mod error;
pub mod gating;
pub mod pipeline;
pub mod routing;
pub mod safety;
pub mod state;

pub use classifier::{Classifier, ClassifierInput, ClassifierOutput, FixedClassifier};
pub use error::PipelineError;
pub use gating::{gate_or_execute, GateDecision};
pub use pipeline::{resume, run, PipelineOutcome, PortalTaskIntent, ProposalDraft};
pub use routing::{decide_next_action, FeeThresholds};
pub use safety::SafetyPolicy;
pub use state::PipelineState;
