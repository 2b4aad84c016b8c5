//! ifact-core: valid-action discovery for interactive fiction
//!
//! Given an opaque, snapshot-able story interpreter, this crate finds which
//! commands actually change the world from the current state, and collapses
//! commands with identical effects into one canonical action. The result is
//! a small, de-duplicated action space for automated play.
//!
//! The interpreter itself is external, behind [`GameInterpreter`].

pub mod action;
pub mod bindings;
pub mod config;
pub mod equivalence;
pub mod error;
pub mod generator;
pub mod interpreter;
pub mod lexicon;
pub mod objects;
pub mod resolver;
pub mod rom;
pub mod session;
pub mod state;
pub mod verbs;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{CandidateAction, TemplateAction, VocabId};
pub use bindings::{Bindings, BindingsRegistry};
pub use config::{DEFAULT_PICKUP_MARKER, ResolverConfig, SessionConfig, Strategy};
pub use equivalence::{
    DeltaCapacity, EquivalenceKey, KeyKind, WorldDelta, WorldDigest, WorldView, digest_world,
};
pub use error::{ConfigError, GeneratorError, InterpreterError, ResolveError};
pub use generator::TemplateActionGenerator;
pub use interpreter::{BatchHit, GameInterpreter, StepOutcome};
pub use objects::{
    InteractiveObjectIdentifier, ObjectDescriptor, ObjectGroups, ObjectSource, ObjectTagger,
    PartOfSpeech,
};
pub use resolver::{ActionBuckets, ActionValidityResolver, SessionPhase, canonical_actions};
pub use rom::{RomCache, RomImage, Title};
pub use session::Session;
pub use state::{ChangeFlags, GameState, Registers};
pub use verbs::{VerbCounts, VerbFrequencyOracle};
pub use world::{DictionaryWord, ObjectNum, WordFlags, WorldObject};
