//! Resolver and session configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::equivalence::{DeltaCapacity, KeyKind};
use crate::error::ConfigError;

/// Response text marking an implicit pickup
pub const DEFAULT_PICKUP_MARKER: &str = "(Taken)";

/// How candidates are executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One candidate at a time on the caller's interpreter
    Sequential,
    /// One bulk interpreter call for the whole list
    Batch,
    /// Contiguous chunks on a pool of worker interpreters
    #[default]
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub strategy: Strategy,
    /// Worker count for [`Strategy::Parallel`]
    pub workers: usize,
    /// Bucket key for the sequential and parallel strategies; batch always
    /// buckets by digest
    pub key_kind: KeyKind,
    pub delta_capacity: DeltaCapacity,
    pub pickup_marker: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            key_kind: KeyKind::default(),
            delta_capacity: DeltaCapacity::default(),
            pickup_marker: DEFAULT_PICKUP_MARKER.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn with_strategy(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub resolver: ResolverConfig,
    /// Also mine object names from the object tree
    pub use_object_tree: bool,
    /// Overrides the title's seed
    pub seed: Option<i64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            use_object_tree: true,
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
