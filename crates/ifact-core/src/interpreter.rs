//! The game interpreter seam
//!
//! Everything the resolver knows about a story goes through
//! [`GameInterpreter`]: execute a command, snapshot and restore, and
//! introspect the object tree, dictionary and status flags. Implementations
//! are single-threaded and owned by exactly one caller at a time; the
//! parallel strategy loads one instance per worker instead of sharing.

use crate::equivalence::{WorldDigest, digest_world};
use crate::error::InterpreterError;
use crate::rom::RomImage;
use crate::state::GameState;
use crate::world::{DictionaryWord, ObjectNum, WorldObject, children};

/// Result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Text printed in response
    pub observation: String,
    /// Score after the command
    pub score: i32,
    /// The episode ended (victory or defeat)
    pub done: bool,
}

/// One effective candidate reported by [`GameInterpreter::filter_candidates`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchHit {
    pub text: String,
    /// Digest of the world right after the candidate ran
    pub digest: WorldDigest,
}

/// Opaque stateful story interpreter.
///
/// Status queries (`world_changed`, `game_over`, `victory`, `halted`)
/// describe the most recent `step`, or the snapshot after `set_state`.
pub trait GameInterpreter {
    /// Load a ROM. `seed` fixes the interpreter RNG; `None` seeds randomly.
    fn load(rom: &RomImage, seed: Option<i64>) -> Result<Self, InterpreterError>
    where
        Self: Sized;

    /// Whether this interpreter fully supports the ROM's title
    fn is_supported(rom: &RomImage) -> bool
    where
        Self: Sized;

    /// Restart the story, returning the intro text
    fn reset(&mut self) -> Result<String, InterpreterError>;

    /// Execute one command
    fn step(&mut self, command: &str) -> Result<StepOutcome, InterpreterError>;

    fn get_state(&self) -> GameState;

    /// Overwrite all live state from `state`
    fn set_state(&mut self, state: &GameState) -> Result<(), InterpreterError>;

    /// Object table indexed by object number; entry 0 is the null object.
    ///
    /// With `clean`, known wandering objects are detached so their movement
    /// does not register as a world change.
    fn world_objects(&self, clean: bool) -> Vec<WorldObject>;

    fn dictionary(&self) -> Vec<DictionaryWord>;

    /// Number of leading characters the parser recognises
    fn max_word_length(&self) -> usize;

    /// Title-specific memory bytes that track state outside the object tree
    fn special_ram(&self) -> Vec<u8>;

    /// Digest of the cleaned object tree and special RAM
    fn world_state_hash(&self) -> WorldDigest {
        digest_world(&self.world_objects(true), &self.special_ram())
    }

    fn world_changed(&self) -> bool;

    fn game_over(&self) -> bool;

    fn victory(&self) -> bool;

    /// The interpreter stopped and must be reset before further use
    fn halted(&self) -> bool;

    fn score(&self) -> i32;

    fn moves(&self) -> u32;

    fn max_score(&self) -> i32;

    fn player_object_num(&self) -> ObjectNum;

    /// The object directly containing the player
    fn player_location(&self) -> Option<WorldObject> {
        let player = self.player_object_num();
        let mut objects = self.world_objects(false);
        let parent = objects.get(usize::from(player))?.parent;
        if parent == 0 || usize::from(parent) >= objects.len() {
            return None;
        }
        Some(objects.swap_remove(usize::from(parent)))
    }

    /// Objects carried by the player
    fn inventory(&self) -> Vec<WorldObject> {
        let objects = self.world_objects(false);
        children(self.player_object_num(), &objects)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Run every candidate from `reference` and report the effective ones.
    ///
    /// A candidate is effective when the score changes, the episode ends or
    /// the world-changed flag is raised; responses containing a non-empty
    /// `pickup_marker` are dropped. Halted candidates reset the interpreter
    /// and are skipped. The interpreter is left at `reference`.
    ///
    /// Interpreters that can do this in one native call should override it.
    fn filter_candidates(
        &mut self,
        reference: &GameState,
        candidates: &[String],
        pickup_marker: &str,
    ) -> Result<Vec<BatchHit>, InterpreterError> {
        self.set_state(reference)?;
        let base_score = self.score();
        let mut hits = Vec::new();
        for text in candidates {
            self.set_state(reference)?;
            let outcome = self.step(text)?;
            if self.halted() {
                self.reset()?;
                continue;
            }
            let effective = outcome.score != base_score || outcome.done || self.world_changed();
            if effective && !has_marker(&outcome.observation, pickup_marker) {
                hits.push(BatchHit {
                    text: text.clone(),
                    digest: self.world_state_hash(),
                });
            }
        }
        self.set_state(reference)?;
        Ok(hits)
    }
}

/// Whether `observation` carries a non-empty side-effect marker
pub fn has_marker(observation: &str, marker: &str) -> bool {
    !marker.is_empty() && observation.contains(marker)
}
