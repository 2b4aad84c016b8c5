//! Verb usage frequencies
//!
//! A corpus of human play transcripts tells us how often players type each
//! verb. The counts are only ever used as a tie-break score: to pick one
//! alternative out of `get/take/carry`, and to pick one canonical action out
//! of a bucket of equivalent ones.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

/// Corpus-based usage-count lookup for verbs.
pub trait VerbFrequencyOracle {
    /// Usage count of `verb`.
    ///
    /// Only the first word of `verb` is considered, case-insensitively.
    /// When `max_len` is given and the verb is exactly that long it may be a
    /// parser-truncated word, so counts of every corpus verb sharing it as a
    /// prefix are summed.
    fn lookup(&self, verb: &str, max_len: Option<usize>) -> u64;
}

/// First word of an action, lowercased.
pub fn head_verb(action: &str) -> String {
    action
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Verb usage counts loaded from a JSON object `{ "verb": count, ... }`.
#[derive(Debug, Clone, Default)]
pub struct VerbCounts {
    counts: HashMap<String, u64>,
}

impl VerbCounts {
    pub fn new(counts: HashMap<String, u64>) -> Self {
        let counts = counts
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self { counts }
    }

    /// Parse counts from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let counts: HashMap<String, u64> = serde_json::from_str(json)?;
        Ok(Self::new(counts))
    }

    /// Load counts from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl VerbFrequencyOracle for VerbCounts {
    fn lookup(&self, verb: &str, max_len: Option<usize>) -> u64 {
        let verb = head_verb(verb);
        if max_len.is_some_and(|len| verb.chars().count() == len) {
            return self
                .counts
                .iter()
                .filter(|(k, _)| k.starts_with(&verb))
                .map(|(_, v)| *v)
                .sum();
        }
        self.counts.get(&verb).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> VerbCounts {
        VerbCounts::from_json(
            r#"{"take": 8909, "jump": 786, "extinguish": 40, "exting": 2, "Get": 1200}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_exact_lookup() {
        let oracle = counts();
        assert_eq!(oracle.lookup("take", None), 8909);
        assert_eq!(oracle.lookup("jump", None), 786);
        assert_eq!(oracle.lookup("frobnicate", None), 0);
    }

    #[test]
    fn test_lookup_uses_head_word_case_insensitively() {
        let oracle = counts();
        assert_eq!(oracle.lookup("  TAKE the lamp ", None), 8909);
        assert_eq!(oracle.lookup("get", None), 1200);
    }

    #[test]
    fn test_prefix_aggregation_at_max_len() {
        let oracle = counts();
        assert_eq!(oracle.lookup("exting", Some(6)), 42);
        // Shorter than max_len: exact only
        assert_eq!(oracle.lookup("take", Some(6)), 8909);
    }

    #[test]
    fn test_head_verb() {
        assert_eq!(head_verb("Open Wallet"), "open");
        assert_eq!(head_verb(""), "");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verbs.json");
        std::fs::write(&path, r#"{"open": 10}"#).unwrap();
        let oracle = VerbCounts::load_from_file(&path).unwrap();
        assert_eq!(oracle.len(), 1);
        assert_eq!(oracle.lookup("open", None), 10);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(
            VerbCounts::from_json("[1, 2]"),
            Err(ConfigError::Serialization(_))
        ));
    }
}
