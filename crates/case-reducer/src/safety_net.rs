use case_core::{CaseMutation, CaseStatus, FollowupMutation, FollowupStatus, Mutations, Patch};

/// Applies the safety nets from spec §4.1, after the per-event logic has
/// already run. These are deliberately the *last* thing that touches
/// `mutations.case` and `mutations.followup` so that a reducer branch can
/// never accidentally leave the case in a state that violates invariant I2.
///
/// `resulting_status` / `resulting_requires_human` / `resulting_pause_reason`
/// are the values the case row will have *after* `mutations.case` is
/// applied — i.e. the explicit per-event mutation if set, else the
/// snapshot's current value. Passing them in (rather than re-deriving them
/// here) keeps this function a pure, total function of its arguments.
pub fn apply(
    mutations: &mut Mutations,
    resulting_status: CaseStatus,
    resulting_requires_human: bool,
    resulting_pause_reason: Option<case_core::PauseReason>,
    was_review_before: bool,
) {
    apply_review_set_net(mutations, resulting_status, resulting_requires_human, resulting_pause_reason);
    apply_followup_alignment(mutations, resulting_status, was_review_before);
    apply_proposal_alignment(mutations, resulting_status);
}

fn apply_review_set_net(
    mutations: &mut Mutations,
    resulting_status: CaseStatus,
    resulting_requires_human: bool,
    resulting_pause_reason: Option<case_core::PauseReason>,
) {
    let CaseMutation { requires_human, pause_reason, .. } = &mut mutations.case;

    if resulting_status.is_review() {
        // "Force UNSPECIFIED" / "force true" only when the reducer left the
        // field untouched — an explicit reducer value always wins (spec
        // §4.1 tie-break: "reducer wins if non-empty").
        if !requires_human.is_set() && !resulting_requires_human {
            *requires_human = Patch::Set(true);
        }
        if !pause_reason.is_set() && resulting_pause_reason.is_none() {
            *pause_reason = Patch::Set(Some(case_core::PauseReason::Unspecified));
        }
    } else if resulting_requires_human || resulting_pause_reason.is_some() {
        // Leaving the review set: clear both flags unconditionally.
        *requires_human = Patch::Set(false);
        *pause_reason = Patch::Set(None);
    }
}

fn apply_followup_alignment(mutations: &mut Mutations, resulting_status: CaseStatus, was_review_before: bool) {
    if mutations.followup.is_some() {
        // Explicit per-event followup mutation wins.
        return;
    }
    if resulting_status.is_terminal() {
        mutations.followup = Some(FollowupMutation { status: Patch::Set(FollowupStatus::Cancelled) });
    } else if resulting_status.is_review() {
        mutations.followup = Some(FollowupMutation { status: Patch::Set(FollowupStatus::Paused) });
    } else if was_review_before {
        // Leaving review back into active work: nothing in spec requires
        // auto-resuming followups here; the scheduler re-derives the next
        // followup date from the case's own fields on its next sweep.
    }
}

fn apply_proposal_alignment(mutations: &mut Mutations, resulting_status: CaseStatus) {
    if resulting_status.dismisses_proposals() {
        mutations.proposals_dismiss_all = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_core::PauseReason;

    #[test]
    fn forces_requires_human_when_unset_in_review_status() {
        let mut m = Mutations::default();
        apply(&mut m, CaseStatus::NeedsHumanReview, false, None, false);
        assert_eq!(m.case.requires_human, Patch::Set(true));
        assert_eq!(m.case.pause_reason, Patch::Set(Some(PauseReason::Unspecified)));
    }

    #[test]
    fn reducer_explicit_pause_reason_wins() {
        let mut m = Mutations::default();
        m.case.pause_reason = Patch::Set(Some(PauseReason::FeeQuote));
        apply(&mut m, CaseStatus::NeedsHumanFeeApproval, true, Some(PauseReason::FeeQuote), false);
        assert_eq!(m.case.pause_reason, Patch::Set(Some(PauseReason::FeeQuote)));
    }

    #[test]
    fn clears_flags_when_leaving_review_set() {
        let mut m = Mutations::default();
        apply(&mut m, CaseStatus::Completed, true, Some(PauseReason::Denial), true);
        assert_eq!(m.case.requires_human, Patch::Set(false));
        assert_eq!(m.case.pause_reason, Patch::Set(None));
    }

    #[test]
    fn terminal_status_cancels_followups() {
        let mut m = Mutations::default();
        apply(&mut m, CaseStatus::Completed, false, None, false);
        assert!(matches!(
            m.followup,
            Some(FollowupMutation { status: Patch::Set(FollowupStatus::Cancelled) })
        ));
    }

    #[test]
    fn dismisses_proposals_on_sent() {
        let mut m = Mutations::default();
        apply(&mut m, CaseStatus::Sent, false, None, false);
        assert!(m.proposals_dismiss_all);
    }
}
