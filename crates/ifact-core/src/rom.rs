//! ROM images and the title cache
//!
//! Loading a title means reading the ROM, hashing it, finding its bindings
//! and preprocessing its grammar. [`RomCache`] keeps the results per path so
//! repeated sessions over the same story share them.
//!
//! Eviction policy: none. Entries live until [`RomCache::evict`] or
//! [`RomCache::clear`] is called; sessions already holding a [`Title`] keep
//! it alive through their `Arc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::bindings::{Bindings, BindingsRegistry};
use crate::error::ConfigError;
use crate::generator::TemplateActionGenerator;
use crate::verbs::VerbFrequencyOracle;

/// Read-only story bytes, shared between every interpreter loaded from them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomImage {
    path: Option<PathBuf>,
    bytes: Arc<[u8]>,
    hash: String,
}

impl RomImage {
    /// Wrap in-memory ROM bytes.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let hash = hex::encode(Sha256::digest(&bytes));
        Self {
            path: None,
            bytes,
            hash,
        }
    }

    /// Read a ROM file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mut rom = Self::from_bytes(bytes);
        rom.path = Some(path.to_path_buf());
        Ok(rom)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// SHA-256 of the bytes, lowercase hex
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Whether two images share the same byte buffer
    pub fn shares_bytes(&self, other: &RomImage) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

/// Everything derived from a ROM that sessions share read-only.
#[derive(Debug)]
pub struct Title {
    pub rom: RomImage,
    pub bindings: Arc<Bindings>,
    pub generator: Arc<TemplateActionGenerator>,
}

impl Title {
    /// Resolve bindings for `rom` and build its generator.
    pub fn new(
        rom: RomImage,
        registry: &BindingsRegistry,
        oracle: &dyn VerbFrequencyOracle,
    ) -> Result<Self, ConfigError> {
        let bindings = registry.lookup(rom.hash())?.clone();
        let generator = TemplateActionGenerator::new(&bindings, oracle)?;
        Ok(Self {
            rom,
            bindings: Arc::new(bindings),
            generator: Arc::new(generator),
        })
    }

    pub fn name(&self) -> &str {
        &self.bindings.name
    }
}

/// Unbounded per-path cache of loaded titles.
pub struct RomCache {
    registry: BindingsRegistry,
    oracle: Arc<dyn VerbFrequencyOracle + Send + Sync>,
    titles: HashMap<PathBuf, Arc<Title>>,
}

impl RomCache {
    pub fn new(registry: BindingsRegistry, oracle: Arc<dyn VerbFrequencyOracle + Send + Sync>) -> Self {
        Self {
            registry,
            oracle,
            titles: HashMap::new(),
        }
    }

    /// Load (or fetch the cached) title at `path`.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<Title>, ConfigError> {
        let key = std::fs::canonicalize(path.as_ref())?;
        if let Some(title) = self.titles.get(&key) {
            return Ok(Arc::clone(title));
        }
        let rom = RomImage::load(&key)?;
        let title = Arc::new(Title::new(rom, &self.registry, self.oracle.as_ref())?);
        debug!(path = %key.display(), title = title.name(), "cached title");
        self.titles.insert(key, Arc::clone(&title));
        Ok(title)
    }

    /// Drop the cached entry for `path`, returning whether one existed.
    pub fn evict<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let key = std::fs::canonicalize(path.as_ref()).unwrap_or_else(|_| path.as_ref().to_path_buf());
        self.titles.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.titles.clear();
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn registry(&self) -> &BindingsRegistry {
        &self.registry
    }

    pub fn oracle(&self) -> Arc<dyn VerbFrequencyOracle + Send + Sync> {
        Arc::clone(&self.oracle)
    }
}
