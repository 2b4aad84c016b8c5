//! Sessions
//!
//! A [`Session`] owns one interpreter for one title and wires the
//! identifier, generator and resolver into [`Session::get_valid_actions`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::action::CandidateAction;
use crate::bindings::Bindings;
use crate::config::SessionConfig;
use crate::error::{InterpreterError, ResolveError};
use crate::interpreter::{GameInterpreter, StepOutcome};
use crate::objects::{InteractiveObjectIdentifier, ObjectGroups};
use crate::resolver::{ActionBuckets, ActionValidityResolver, canonical_actions};
use crate::rom::Title;
use crate::state::GameState;
use crate::verbs::VerbFrequencyOracle;

pub struct Session<I: GameInterpreter + 'static> {
    interp: I,
    title: Arc<Title>,
    oracle: Arc<dyn VerbFrequencyOracle + Send + Sync>,
    resolver: ActionValidityResolver<I>,
    identifier: InteractiveObjectIdentifier,
    config: SessionConfig,
    seed: Option<i64>,
    supported: bool,
}

impl<I: GameInterpreter + 'static> Session<I> {
    /// Load `title` into a fresh interpreter.
    ///
    /// The seed is taken from the config, then the title's bindings; with
    /// neither the interpreter seeds itself.
    pub fn new(
        title: Arc<Title>,
        oracle: Arc<dyn VerbFrequencyOracle + Send + Sync>,
        config: SessionConfig,
    ) -> Result<Self, InterpreterError> {
        let seed = config.seed.or(title.bindings.seed);
        let interp = I::load(&title.rom, seed)?;
        let supported = I::is_supported(&title.rom);
        if !supported {
            warn!(title = title.name(), "title is not fully supported");
        }
        let resolver = ActionValidityResolver::new(config.resolver.clone(), title.rom.clone(), seed);
        Ok(Self {
            interp,
            title,
            oracle,
            resolver,
            identifier: InteractiveObjectIdentifier::new(),
            config,
            seed,
            supported,
        })
    }

    /// Replace the prose tagger used for object identification.
    pub fn with_identifier(mut self, identifier: InteractiveObjectIdentifier) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn interpreter(&self) -> &I {
        &self.interp
    }

    pub fn interpreter_mut(&mut self) -> &mut I {
        &mut self.interp
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn bindings(&self) -> &Bindings {
        &self.title.bindings
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn seed(&self) -> Option<i64> {
        self.seed
    }

    pub fn resolver(&self) -> &ActionValidityResolver<I> {
        &self.resolver
    }

    pub fn is_fully_supported(&self) -> bool {
        self.supported
    }

    pub fn reset(&mut self) -> Result<String, InterpreterError> {
        self.interp.reset()
    }

    pub fn step(&mut self, action: &str) -> Result<StepOutcome, InterpreterError> {
        self.interp.step(action)
    }

    pub fn get_state(&self) -> GameState {
        self.interp.get_state()
    }

    pub fn set_state(&mut self, state: &GameState) -> Result<(), InterpreterError> {
        self.interp.set_state(state)
    }

    /// The title's winning command sequence.
    pub fn walkthrough(&self) -> Vec<String> {
        if !self.supported {
            warn!(title = self.title.name(), "no walkthrough for unsupported title");
            return Vec::new();
        }
        self.title
            .bindings
            .walkthrough_actions()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Group the objects around the player by their examine response.
    pub fn identify_interactive_objects(
        &mut self,
        observation: Option<&str>,
    ) -> Result<ObjectGroups, InterpreterError> {
        self.identifier
            .identify(&mut self.interp, observation, self.config.use_object_tree)
    }

    /// Bucket `candidates` from the current state.
    pub fn resolve(&mut self, candidates: &[CandidateAction]) -> Result<ActionBuckets, ResolveError> {
        let reference = self.interp.get_state();
        self.resolver.resolve(&mut self.interp, &reference, candidates)
    }

    /// One canonical action per distinct effect available from the current
    /// state. Empty (with a warning) for titles that are not fully
    /// supported.
    pub fn get_valid_actions(&mut self) -> Result<Vec<String>, ResolveError> {
        if !self.supported {
            warn!(title = self.title.name(), "unable to find valid actions in an unsupported title");
            return Ok(Vec::new());
        }
        let groups = self.identify_interactive_objects(None)?;
        let names = groups.best_names();
        let candidates: Vec<CandidateAction> = self
            .title
            .generator
            .generate_actions(&names)
            .into_iter()
            .map(CandidateAction::Text)
            .collect();
        debug!(objects = names.len(), candidates = candidates.len(), "generated candidates");
        let buckets = self.resolve(&candidates)?;
        Ok(canonical_actions(&buckets, self.oracle.as_ref())
            .into_iter()
            .map(|a| a.text().to_string())
            .collect())
    }

    /// An independent session primed to the current state.
    ///
    /// The copy loads its own interpreter and gets its own resolver (and
    /// worker pool); only the read-only title data is shared.
    pub fn copy(&self) -> Result<Self, InterpreterError> {
        let mut interp = I::load(&self.title.rom, self.seed)?;
        interp.set_state(&self.interp.get_state())?;
        Ok(Self {
            interp,
            title: Arc::clone(&self.title),
            oracle: Arc::clone(&self.oracle),
            resolver: ActionValidityResolver::new(
                self.config.resolver.clone(),
                self.title.rom.clone(),
                self.seed,
            ),
            identifier: self.identifier.clone(),
            config: self.config.clone(),
            seed: self.seed,
            supported: self.supported,
        })
    }
}
