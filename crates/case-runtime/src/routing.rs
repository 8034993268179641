//! Maps an [`ActionType`] onto the provider (if any) that carries it out,
//! and builds the [`OutboundMessage`] a provider needs to attempt a send.
//!
//! `ResearchAgency`, `CloseCase`, `Escalate`, and `NONE` perform no
//! outbound send — `case_core::execution::ProviderKind::None` already
//! exists to model exactly this, so these route straight to a `Skipped`
//! execution row instead of a provider call.

use case_core::{ActionType, Case, CaseEvent, Proposal, ProviderKind, ThreadHeaders};

use case_provider::OutboundMessage;

/// Which provider, if any, carries out `action_type`.
#[must_use]
pub fn provider_kind_for(action_type: ActionType) -> ProviderKind {
    match action_type {
        ActionType::SubmitPortal => ProviderKind::Portal,
        ActionType::ResearchAgency | ActionType::CloseCase | ActionType::Escalate | ActionType::None => {
            ProviderKind::None
        }
        _ => ProviderKind::Email,
    }
}

/// Whether `action_type` needs an outbound send at all (and is therefore
/// subject to the outbound rate limit, spec §4.6).
#[must_use]
pub fn needs_provider(action_type: ActionType) -> bool {
    provider_kind_for(action_type) != ProviderKind::None
}

/// The registry name a [`ProviderKind`] resolves to.
#[must_use]
pub fn provider_name_for(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Email => "email",
        ProviderKind::Portal => "portal",
        ProviderKind::None => "none",
    }
}

/// A case-level event some providerless action types emit in addition to
/// `PROPOSAL_EXECUTED`, once their (internal) execution completes.
#[must_use]
pub fn terminal_event_for(action_type: ActionType) -> Option<CaseEvent> {
    match action_type {
        ActionType::CloseCase => Some(CaseEvent::CaseCompleted),
        ActionType::Escalate => Some(CaseEvent::CaseEscalated {
            reason: "escalated by the decision pipeline".to_string(),
        }),
        ActionType::ResearchAgency => Some(CaseEvent::CaseWrongAgency),
        _ => None,
    }
}

/// Build the provider-facing message from a claimed proposal.
#[must_use]
pub fn build_outbound_message(case: &Case, proposal: &Proposal, execution_key: &str) -> OutboundMessage {
    OutboundMessage {
        case_id: case.id,
        proposal_id: proposal.id,
        execution_key: execution_key.to_string(),
        action_type: proposal.action_type,
        recipient_email: case.agency.agency_email.clone(),
        portal_url: case.agency.portal_url.clone(),
        subject: proposal.draft_subject.clone(),
        body: proposal.draft_body.clone(),
        thread_headers: ThreadHeaders::default(),
    }
}
