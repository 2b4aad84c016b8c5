//! Per-title bindings
//!
//! Grammar, vocabulary limits and walkthrough for each supported story,
//! keyed by the content hash of its ROM.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration data for one title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    /// Short title name, e.g. `zork1`
    pub name: String,
    /// ROM file name
    pub rom: String,
    /// Seed the title is known to be deterministic under
    #[serde(default)]
    pub seed: Option<i64>,
    /// Number of leading characters the parser looks at
    pub max_word_length: usize,
    /// `;`-separated action templates with `OBJ` placeholders
    #[serde(default)]
    pub grammar: String,
    /// `/`-separated winning command sequence
    #[serde(default)]
    pub walkthrough: String,
    /// `/`-separated minimal action set
    #[serde(default)]
    pub minimal_actions: String,
}

impl Bindings {
    /// Reject bindings no generator can be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_word_length == 0 {
            return Err(ConfigError::InvalidWordLength {
                title: self.name.clone(),
                value: self.max_word_length,
            });
        }
        if self.grammar_templates().is_empty() {
            return Err(ConfigError::MissingGrammar {
                title: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Non-empty grammar templates in definition order.
    pub fn grammar_templates(&self) -> Vec<&str> {
        split_list(&self.grammar, ';')
    }

    pub fn walkthrough_actions(&self) -> Vec<&str> {
        split_list(&self.walkthrough, '/')
    }

    pub fn minimal_action_list(&self) -> Vec<&str> {
        split_list(&self.minimal_actions, '/')
    }
}

fn split_list(list: &str, sep: char) -> Vec<&str> {
    list.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// All known bindings, keyed by SHA-256 hex digest of the ROM bytes.
#[derive(Debug, Clone, Default)]
pub struct BindingsRegistry {
    by_hash: HashMap<String, Bindings>,
}

impl BindingsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object `{ "<rom sha256>": { bindings }, ... }`.
    ///
    /// Every entry is validated; one bad title rejects the whole file.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let by_hash: HashMap<String, Bindings> = serde_json::from_str(json)?;
        for bindings in by_hash.values() {
            bindings.validate()?;
        }
        let by_hash = by_hash
            .into_iter()
            .map(|(hash, b)| (hash.to_lowercase(), b))
            .collect();
        Ok(Self { by_hash })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Register bindings for a ROM hash, replacing any previous entry.
    pub fn insert(&mut self, hash: impl Into<String>, bindings: Bindings) -> Result<(), ConfigError> {
        bindings.validate()?;
        self.by_hash.insert(hash.into().to_lowercase(), bindings);
        Ok(())
    }

    pub fn get(&self, hash: &str) -> Option<&Bindings> {
        self.by_hash.get(&hash.to_lowercase())
    }

    /// Bindings for a ROM hash, or [`ConfigError::UnknownTitle`].
    pub fn lookup(&self, hash: &str) -> Result<&Bindings, ConfigError> {
        self.get(hash).ok_or_else(|| ConfigError::UnknownTitle {
            hash: hash.to_string(),
        })
    }

    pub fn by_name(&self, name: &str) -> Option<&Bindings> {
        self.by_hash.values().find(|b| b.name == name)
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nine05() -> Bindings {
        Bindings {
            name: "905".into(),
            rom: "905.z5".into(),
            seed: None,
            max_word_length: 9,
            grammar: "answer/pick up OBJ;open OBJ; ;take OBJ".into(),
            walkthrough: "answer phone/stand/s/remove watch".into(),
            minimal_actions: String::new(),
        }
    }

    #[test]
    fn test_grammar_split_skips_blanks() {
        assert_eq!(nine05().grammar_templates(), vec!["answer/pick up OBJ", "open OBJ", "take OBJ"]);
    }

    #[test]
    fn test_walkthrough_split() {
        assert_eq!(nine05().walkthrough_actions(), vec!["answer phone", "stand", "s", "remove watch"]);
        assert!(nine05().minimal_action_list().is_empty());
    }

    #[test]
    fn test_validate_rejects_missing_grammar() {
        let mut b = nine05();
        b.grammar = " ; ".into();
        assert!(matches!(b.validate(), Err(ConfigError::MissingGrammar { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_word_length() {
        let mut b = nine05();
        b.max_word_length = 0;
        assert!(matches!(b.validate(), Err(ConfigError::InvalidWordLength { value: 0, .. })));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = BindingsRegistry::new();
        registry.insert("ABCD", nine05()).unwrap();
        assert_eq!(registry.lookup("abcd").unwrap().name, "905");
        assert!(registry.by_name("905").is_some());
        assert!(matches!(registry.lookup("ffff"), Err(ConfigError::UnknownTitle { .. })));
    }

    #[test]
    fn test_registry_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        let json = serde_json::json!({ "00ff": nine05() }).to_string();
        std::fs::write(&path, json).unwrap();
        let registry = BindingsRegistry::load_from_file(&path).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("00FF").map(|b| b.max_word_length), Some(9));
    }
}
