//! One-candidate-at-a-time evaluation
//!
//! Also the per-chunk body of every parallel worker.

use tracing::{trace, warn};

use super::buckets::ActionBuckets;
use crate::action::CandidateAction;
use crate::equivalence::{DeltaCapacity, EquivalenceKey, KeyKind, WorldView};
use crate::error::InterpreterError;
use crate::interpreter::{GameInterpreter, has_marker};
use crate::state::GameState;

/// Per-candidate evaluation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProbeOptions {
    pub key_kind: KeyKind,
    pub capacity: DeltaCapacity,
    pub pickup_marker: String,
}

/// Run each candidate from `reference` and bucket the effective ones.
///
/// The interpreter is restored to `reference` before every candidate and
/// once more at the end.
pub(crate) fn evaluate_chunk<I: GameInterpreter + ?Sized>(
    interp: &mut I,
    reference: &GameState,
    candidates: &[CandidateAction],
    opts: &ProbeOptions,
) -> Result<ActionBuckets, InterpreterError> {
    interp.set_state(reference)?;
    let base_score = interp.score();
    let before = WorldView::capture(&*interp);
    let mut buckets = ActionBuckets::new();

    for candidate in candidates {
        let text = candidate.text();
        interp.set_state(reference)?;
        let outcome = interp.step(text)?;
        if interp.halted() {
            warn!(action = text, "interpreter halted, resetting and skipping candidate");
            interp.reset()?;
            continue;
        }
        let effective = outcome.score != base_score || outcome.done || interp.world_changed();
        if !effective {
            trace!(action = text, "no effect");
            continue;
        }
        if has_marker(&outcome.observation, &opts.pickup_marker) {
            trace!(action = text, "implicit pickup, skipped");
            continue;
        }
        let after = WorldView::capture(&*interp);
        let key = EquivalenceKey::compute(opts.key_kind, &before, &after, opts.capacity);
        trace!(action = text, "effective");
        buckets.insert(key, candidate.clone());
    }

    interp.set_state(reference)?;
    Ok(buckets)
}
