//! The Runtime Transition (C3): apply a single [`CaseEvent`] through one
//! database transaction — ledger row first, then the reducer's mutations,
//! then commit. A duplicate `transition_key` short-circuits to the prior
//! projection without touching the reducer at all (spec §4.2, invariant P5).

use case_core::{CaseEvent, CaseId, CaseSnapshot, Projection};
use case_reducer::ReducerContext;
use case_store::{CaseStore, LedgerInsertOutcome};
use chrono::Utc;
use serde_json::Value;

use crate::error::RuntimeError;

/// Apply `event` against `case_id` under `transition_key`. `retries_exhausted`
/// feeds the reducer context so that gate-only-after-retries events
/// (`EMAIL_FAILED`, `PORTAL_FAILED`, `PORTAL_TIMED_OUT`) know whether this is
/// the terminal attempt.
pub async fn apply_event(
    store: &dyn CaseStore,
    case_id: CaseId,
    event: CaseEvent,
    transition_key: &str,
    context: Value,
    retries_exhausted: bool,
) -> Result<Projection, RuntimeError> {
    let mut tx = store.begin_transition(case_id).await?;

    match tx.insert_ledger_row(&event, transition_key, context).await? {
        LedgerInsertOutcome::AlreadyApplied(projection) => return Ok(projection),
        LedgerInsertOutcome::Inserted => {}
    }

    let ctx = ReducerContext::new(Utc::now()).with_retries_exhausted(retries_exhausted);
    let (mutations, projection) = case_reducer::reduce(tx.snapshot(), &event, ctx)?;

    tx.apply_mutations(&mutations).await?;
    tx.commit(&projection).await?;

    Ok(projection)
}

/// Read the current snapshot for `case_id`.
///
/// `CaseStore` has no standalone read path — every snapshot read goes
/// through a `FOR UPDATE` transaction — so this opens one purely to read
/// and lets it roll back unused on drop.
pub async fn load_snapshot(store: &dyn CaseStore, case_id: CaseId) -> Result<CaseSnapshot, RuntimeError> {
    let tx = store.begin_transition(case_id).await?;
    Ok(tx.snapshot().clone())
}
