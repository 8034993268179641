//! [`PipelineState`]: the append-annotated struct threaded through every
//! node of the Decision Pipeline (spec §4.3).
//!
//! The source's workflow library gives each field its own reducer (append
//! for lists, overwrite for scalars, `undefined` preserves prior value).
//! That reduces here to a plain struct plus the setter/pusher methods below
//! — there is no separate "merge" step because every node already owns
//! `&mut PipelineState` and calls the method that encodes its field's rule.

use case_core::{
    ActionType, AutopilotMode, CaseId, Classification, DenialSubtype, MessageId, PauseReason,
    RunId, RunTrigger,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The pipeline's working state. Persisted verbatim (as `pipeline_state` on
/// the gated [`case_core::Proposal`]) so a `resume` run can rehydrate it and
/// re-enter the graph at `draft_response` or `execute_action` (spec §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub case_id: CaseId,
    pub run_id: RunId,
    pub trigger: RunTrigger,
    pub triggering_message_id: Option<MessageId>,
    pub autopilot_mode: AutopilotMode,

    // --- classify_inbound output (scalars: last-write-wins) ---
    pub requires_response: bool,
    pub classification: Option<Classification>,
    pub denial_subtype: Option<DenialSubtype>,
    pub fee_amount: Option<i64>,
    pub portal_url: Option<String>,
    pub key_points: Vec<String>,

    // --- update_constraints output ---
    pub prior_agency_research: bool,
    pub constraints: Value,
    pub scope_items: Value,

    // --- decide_next_action output ---
    pub action_type: ActionType,
    /// Set when routing forces a gate outside the action's static policy
    /// table (fee tier, medium denial strength) — spec §4.3 steps 8 & 10.
    pub forced_gate: bool,
    pub action_pause_reason: Option<PauseReason>,

    // --- draft_response output ---
    pub draft_subject: Option<String>,
    pub draft_body: Option<String>,
    pub adjustment_instruction: Option<String>,
    pub confidence: Option<f64>,

    // --- safety_check output ---
    pub risk_flags: Vec<String>,
    pub warnings: Vec<String>,

    // --- append-only annotations (spec §4.3) ---
    pub reasoning: Vec<String>,
    pub logs: Vec<String>,
    pub errors: Vec<String>,

    pub is_complete: bool,
}

impl PipelineState {
    #[must_use]
    pub fn new(
        case_id: CaseId,
        run_id: RunId,
        trigger: RunTrigger,
        triggering_message_id: Option<MessageId>,
        autopilot_mode: AutopilotMode,
    ) -> Self {
        Self {
            case_id,
            run_id,
            trigger,
            triggering_message_id,
            autopilot_mode,
            requires_response: true,
            classification: None,
            denial_subtype: None,
            fee_amount: None,
            portal_url: None,
            key_points: Vec::new(),
            prior_agency_research: false,
            constraints: Value::Null,
            scope_items: Value::Null,
            action_type: ActionType::None,
            forced_gate: false,
            action_pause_reason: None,
            draft_subject: None,
            draft_body: None,
            adjustment_instruction: None,
            confidence: None,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            reasoning: Vec::new(),
            logs: Vec::new(),
            errors: Vec::new(),
            is_complete: false,
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(message.into());
    }

    pub fn reason(&mut self, message: impl Into<String>) {
        self.reasoning.push(message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Serialize for checkpointing onto a gated proposal.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized (infallible in
    /// practice — every field is plain data — but propagated rather than
    /// unwrapped so a future field addition cannot panic in production).
    pub fn checkpoint(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Rehydrate a checkpointed state from a proposal's `pipeline_state`
    /// column.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` does not match the current schema.
    pub fn from_checkpoint(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
