//! Action validity resolution
//!
//! Given a reference snapshot and a list of candidate commands, find the
//! candidates that actually change the world and group them by the world
//! state they produce. Every candidate runs from the same reference:
//!
//! 1. restore the reference;
//! 2. execute the candidate;
//! 3. on an interpreter halt, reset and discard it;
//! 4. it is effective if the score changed, the episode ended or the
//!    interpreter raised its world-changed flag;
//! 5. effective candidates whose response shows an implicit pickup are
//!    discarded anyway;
//! 6. the rest are bucketed by [`EquivalenceKey`](crate::equivalence::EquivalenceKey).
//!
//! The three [`Strategy`] variants differ only in where this loop runs.
//! They agree on [`canonical_actions`], which depend only on verb text.

mod batch;
mod buckets;
mod parallel;
mod sequential;

use std::marker::PhantomData;
use std::time::Instant;

use strum::Display;
use tracing::{debug, debug_span, trace};

pub use buckets::ActionBuckets;
pub use parallel::WorkerPool;

use crate::action::CandidateAction;
use crate::config::{ResolverConfig, Strategy};
use crate::error::ResolveError;
use crate::interpreter::GameInterpreter;
use crate::rom::RomImage;
use crate::state::GameState;
use crate::verbs::VerbFrequencyOracle;
use sequential::ProbeOptions;

/// Where the resolver is in its per-call lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Executing candidates
    Probing,
    /// Back at the reference snapshot
    Restored,
    /// The reference state was terminal; nothing was executed
    Done,
}

/// Resolves candidate actions against interpreters of type `I`.
///
/// Owns the lazily created worker pool for [`Strategy::Parallel`]; the pool
/// is reused across calls and torn down when the resolver is dropped.
pub struct ActionValidityResolver<I> {
    config: ResolverConfig,
    rom: RomImage,
    seed: Option<i64>,
    pool: Option<WorkerPool>,
    phase: SessionPhase,
    _interp: PhantomData<fn() -> I>,
}

impl<I> core::fmt::Debug for ActionValidityResolver<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActionValidityResolver")
            .field("config", &self.config)
            .field("rom", &self.rom.hash())
            .field("seed", &self.seed)
            .field("workers", &self.pool.as_ref().map(WorkerPool::len))
            .field("phase", &self.phase)
            .finish()
    }
}

impl<I: GameInterpreter + 'static> ActionValidityResolver<I> {
    /// `rom` and `seed` are what parallel workers load their interpreters
    /// from; they must match the caller's interpreter.
    pub fn new(config: ResolverConfig, rom: RomImage, seed: Option<i64>) -> Self {
        Self {
            config,
            rom,
            seed,
            pool: None,
            phase: SessionPhase::Idle,
            _interp: PhantomData,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the worker pool has been spawned
    pub fn has_pool(&self) -> bool {
        self.pool.is_some()
    }

    /// Stop and join the worker pool, if any. It is respawned on demand.
    pub fn shutdown(&mut self) {
        self.pool = None;
    }

    /// Bucket the effective `candidates` by resulting world state.
    ///
    /// `interp` is left at `reference` on success; on error it is restored
    /// when possible. A terminal or halted reference yields no buckets
    /// without executing anything.
    pub fn resolve(
        &mut self,
        interp: &mut I,
        reference: &GameState,
        candidates: &[CandidateAction],
    ) -> Result<ActionBuckets, ResolveError> {
        self.set_phase(SessionPhase::Idle);
        interp.set_state(reference)?;
        if interp.game_over() || interp.victory() || interp.halted() {
            debug!(candidates = candidates.len(), "reference state is terminal, skipping resolution");
            self.set_phase(SessionPhase::Done);
            return Ok(ActionBuckets::new());
        }

        let strategy = self.config.strategy;
        let span = debug_span!("resolve", %strategy);
        let _guard = span.enter();
        let started = Instant::now();

        self.set_phase(SessionPhase::Probing);
        let result = self.dispatch(interp, reference, candidates);
        let restored = interp.set_state(reference);
        self.set_phase(SessionPhase::Restored);

        let buckets = result?;
        restored?;
        debug!(
            candidates = candidates.len(),
            buckets = buckets.len(),
            effective = buckets.action_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resolved candidate actions"
        );
        self.set_phase(SessionPhase::Idle);
        Ok(buckets)
    }

    fn dispatch(
        &mut self,
        interp: &mut I,
        reference: &GameState,
        candidates: &[CandidateAction],
    ) -> Result<ActionBuckets, ResolveError> {
        match self.config.strategy {
            Strategy::Sequential => Ok(sequential::evaluate_chunk(
                interp,
                reference,
                candidates,
                &self.probe_options(),
            )?),
            Strategy::Batch => Ok(batch::evaluate_batch(
                interp,
                reference,
                candidates,
                &self.config.pickup_marker,
            )?),
            Strategy::Parallel => {
                if candidates.is_empty() {
                    return Ok(ActionBuckets::new());
                }
                let result = self.pool()?.resolve(reference, candidates);
                if matches!(result, Err(ResolveError::WorkerCrashed { .. })) {
                    // Respawn on the next call rather than reuse a broken pool.
                    self.pool = None;
                }
                result
            }
        }
    }

    fn pool(&mut self) -> Result<&WorkerPool, ResolveError> {
        let pool = match self.pool.take() {
            Some(pool) => pool,
            None => WorkerPool::spawn::<I>(self.config.workers, &self.rom, self.seed, self.probe_options())?,
        };
        Ok(self.pool.insert(pool))
    }

    fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            key_kind: self.config.key_kind,
            capacity: self.config.delta_capacity,
            pickup_marker: self.config.pickup_marker.clone(),
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            trace!(from = %self.phase, to = %phase, "resolver phase");
            self.phase = phase;
        }
    }
}

/// One representative per bucket: the action whose head verb players use
/// most, earliest on ties.
pub fn canonical_actions<K>(
    buckets: &ActionBuckets<K>,
    oracle: &dyn VerbFrequencyOracle,
) -> Vec<CandidateAction>
where
    K: Clone + Eq + std::hash::Hash,
{
    buckets
        .iter()
        .filter_map(|(_, actions)| {
            let mut best: Option<(&CandidateAction, u64)> = None;
            for action in actions {
                let count = oracle.lookup(action.text(), None);
                if best.is_none_or(|(_, top)| count > top) {
                    best = Some((action, count));
                }
            }
            best.map(|(action, _)| action.clone())
        })
        .collect()
}
