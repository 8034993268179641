//! `safety_check` — per-action forbidden-phrase and word-limit tables
//! (spec §4.3, §6 configuration). Inspects the draft without mutating it;
//! any risk flag forces gating downstream regardless of autopilot mode.

use std::collections::HashMap;

use case_core::ActionType;

/// Default word limit applied to an action with no specific entry.
const DEFAULT_WORD_LIMIT: usize = 400;

/// Phrases that must never appear in an outbound draft, grouped by the
/// action type they apply to (some phrases — e.g. admissions of legal
/// liability — apply to every action and are checked unconditionally).
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    forbidden_phrases: HashMap<ActionType, Vec<String>>,
    universal_forbidden_phrases: Vec<String>,
    word_limits: HashMap<ActionType, usize>,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        let mut forbidden_phrases = HashMap::new();
        forbidden_phrases.insert(
            ActionType::SendRebuttal,
            vec!["we will sue".to_string(), "this is illegal".to_string()],
        );
        forbidden_phrases.insert(
            ActionType::Escalate,
            vec!["you will be reported".to_string()],
        );
        forbidden_phrases.insert(
            ActionType::NegotiateFee,
            vec!["we refuse to pay".to_string()],
        );

        let mut word_limits = HashMap::new();
        word_limits.insert(ActionType::SendClarification, 200);
        word_limits.insert(ActionType::SendRebuttal, 500);
        word_limits.insert(ActionType::RespondPartialApproval, 300);

        Self {
            forbidden_phrases,
            universal_forbidden_phrases: vec![
                "admit fault".to_string(),
                "off the record".to_string(),
            ],
            word_limits,
        }
    }
}

impl SafetyPolicy {
    fn word_limit(&self, action_type: ActionType) -> usize {
        self.word_limits.get(&action_type).copied().unwrap_or(DEFAULT_WORD_LIMIT)
    }

    /// Scan a draft body for this action's forbidden phrases and word
    /// limit. Returns `(risk_flags, warnings)` — risk flags force gating;
    /// warnings are informational only.
    #[must_use]
    pub fn check(&self, action_type: ActionType, draft_body: &str) -> (Vec<String>, Vec<String>) {
        let lower = draft_body.to_lowercase();
        let mut risk_flags = Vec::new();
        let mut warnings = Vec::new();

        for phrase in self.universal_forbidden_phrases.iter().chain(
            self.forbidden_phrases.get(&action_type).into_iter().flatten(),
        ) {
            if lower.contains(phrase.as_str()) {
                risk_flags.push(format!("forbidden phrase: \"{phrase}\""));
            }
        }

        let word_count = draft_body.split_whitespace().count();
        let limit = self.word_limit(action_type);
        if word_count > limit {
            warnings.push(format!("draft exceeds word limit ({word_count} > {limit})"));
        }

        (risk_flags, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_phrase_produces_risk_flag() {
        let policy = SafetyPolicy::default();
        let (flags, _) = policy.check(ActionType::SendRebuttal, "We will sue if you do not comply.");
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn universal_phrase_applies_to_any_action() {
        let policy = SafetyPolicy::default();
        let (flags, _) = policy.check(ActionType::SendFollowup, "Let's keep this off the record.");
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn clean_draft_has_no_flags() {
        let policy = SafetyPolicy::default();
        let (flags, warnings) = policy.check(ActionType::SendFollowup, "Following up on our request.");
        assert!(flags.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn over_limit_draft_warns_but_does_not_gate() {
        let policy = SafetyPolicy::default();
        let long_body = "word ".repeat(250);
        let (flags, warnings) = policy.check(ActionType::SendClarification, &long_body);
        assert!(flags.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
