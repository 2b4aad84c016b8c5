//! Error types
//!
//! Configuration problems fail fast at construction, interpreter problems
//! surface from individual calls, and resolution errors wrap both plus the
//! failure modes of the worker pool. Interpreter halts are not errors: the
//! resolver recovers from them by resetting and discarding the candidate.

use thiserror::Error;

/// Problems with per-title configuration data or config files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No bindings for story with content hash {hash}")]
    UnknownTitle { hash: String },

    #[error("Grammar binding for '{title}' is missing")]
    MissingGrammar { title: String },

    #[error("Malformed template '{template}' in grammar for '{title}': {reason}")]
    MalformedTemplate {
        title: String,
        template: String,
        reason: String,
    },

    #[error("Invalid max_word_length {value} for '{title}'")]
    InvalidWordLength { title: String, value: usize },
}

/// Failures reported by a game interpreter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    #[error("Story could not be loaded: {0}")]
    Load(String),

    #[error("Snapshot does not fit this interpreter: {0}")]
    IncompatibleState(String),

    #[error("Command cannot be encoded for the interpreter: {0:?}")]
    InvalidCommand(String),
}

/// Failures while generating structured template actions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("Expected one vocabulary id per object: {objects} objects, {ids} ids")]
    IdCountMismatch { objects: usize, ids: usize },
}

/// Failures of a valid-action resolution call
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Interpreter(#[from] InterpreterError),

    #[error("Worker {worker} crashed while resolving its chunk")]
    WorkerCrashed { worker: usize },

    #[error("Worker {worker} failed: {source}")]
    WorkerFailed {
        worker: usize,
        #[source]
        source: InterpreterError,
    },

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
