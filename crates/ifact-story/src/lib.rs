//! ifact-story: an in-process story interpreter
//!
//! [`StoryMachine`] implements [`ifact_core::GameInterpreter`] for small
//! JSON story ROMs: rooms and exits, containers, scoring, victory and
//! defeat rooms, wandering characters, special-RAM switches and words that
//! halt the interpreter. It is what the resolver is exercised against
//! end to end.
//!
//! The bundled `nine05` story is a short demo title together with its
//! bindings and a verb usage table.

pub mod machine;
pub mod parser;
pub mod story;

use ifact_core::{Bindings, BindingsRegistry, ConfigError, RomImage, Title, VerbCounts, VerbFrequencyOracle};

pub use machine::StoryMachine;
pub use parser::{Command, ParseError, Parser, Verb};
pub use story::{ItemAttrs, Story, StoryDef, StoryError};

/// The demo story ROM
pub const NINE05: &str = include_str!("fixtures/nine05.json");

/// Bindings record for [`NINE05`]
pub const NINE05_BINDINGS: &str = include_str!("fixtures/nine05.bindings.json");

/// Verb usage counts matching the demo grammar
pub const VERB_COUNTS: &str = include_str!("fixtures/verbs.json");

pub fn nine05_rom() -> RomImage {
    RomImage::from_bytes(NINE05.as_bytes().to_vec())
}

pub fn nine05_bindings() -> Result<Bindings, ConfigError> {
    Ok(serde_json::from_str(NINE05_BINDINGS)?)
}

pub fn verb_counts() -> Result<VerbCounts, ConfigError> {
    VerbCounts::from_json(VERB_COUNTS)
}

/// Registry holding the demo bindings under the demo ROM's hash.
pub fn nine05_registry() -> Result<BindingsRegistry, ConfigError> {
    let mut registry = BindingsRegistry::new();
    registry.insert(nine05_rom().hash(), nine05_bindings()?)?;
    Ok(registry)
}

pub fn nine05_title(oracle: &dyn VerbFrequencyOracle) -> Result<Title, ConfigError> {
    Title::new(nine05_rom(), &nine05_registry()?, oracle)
}
