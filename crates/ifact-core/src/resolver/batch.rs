//! Single bulk interpreter call

use std::collections::HashMap;

use super::buckets::ActionBuckets;
use crate::action::CandidateAction;
use crate::equivalence::EquivalenceKey;
use crate::error::InterpreterError;
use crate::interpreter::GameInterpreter;
use crate::state::GameState;

/// Hand the whole candidate list to
/// [`GameInterpreter::filter_candidates`] and bucket the hits by digest.
pub(crate) fn evaluate_batch<I: GameInterpreter + ?Sized>(
    interp: &mut I,
    reference: &GameState,
    candidates: &[CandidateAction],
    pickup_marker: &str,
) -> Result<ActionBuckets, InterpreterError> {
    let texts: Vec<String> = candidates.iter().map(|c| c.text().to_string()).collect();
    let hits = interp.filter_candidates(reference, &texts, pickup_marker)?;

    // First occurrence wins so structured candidates keep their metadata.
    let mut by_text: HashMap<&str, &CandidateAction> = HashMap::new();
    for candidate in candidates {
        by_text.entry(candidate.text()).or_insert(candidate);
    }

    let mut buckets = ActionBuckets::new();
    for hit in hits {
        let action = by_text
            .get(hit.text.as_str())
            .map_or_else(|| CandidateAction::Text(hit.text.clone()), |c| (*c).clone());
        buckets.insert(EquivalenceKey::WorldDigest(hit.digest), action);
    }
    Ok(buckets)
}
