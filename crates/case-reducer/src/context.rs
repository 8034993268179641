use chrono::{DateTime, Utc};

/// The reducer's context parameter. Everything in here must be supplied by
/// the caller (the Runtime Transition) — the reducer never reads a clock or
/// any other ambient source itself, which is what keeps it pure and
/// directly unit-testable.
#[derive(Debug, Clone, Copy)]
pub struct ReducerContext {
    pub now: DateTime<Utc>,
    /// Set by the caller when a transient-provider-error event
    /// (`EMAIL_FAILED` / `PORTAL_FAILED` / `PORTAL_TIMED_OUT`) is being
    /// applied after the executor has exhausted its retry budget.
    pub retries_exhausted: bool,
}

impl ReducerContext {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now, retries_exhausted: false }
    }

    #[must_use]
    pub fn with_retries_exhausted(mut self, exhausted: bool) -> Self {
        self.retries_exhausted = exhausted;
        self
    }
}
