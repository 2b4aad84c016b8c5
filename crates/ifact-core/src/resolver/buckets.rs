//! Equivalence buckets

use std::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::action::CandidateAction;
use crate::equivalence::EquivalenceKey;

/// Effective actions grouped by the world state they lead to.
///
/// Buckets keep first-insertion order, actions inside a bucket keep their
/// insertion order, and an action text lands in at most one bucket.
#[derive(Debug, Clone)]
pub struct ActionBuckets<K = EquivalenceKey> {
    index: HashMap<K, usize>,
    buckets: Vec<(K, Vec<CandidateAction>)>,
    members: HashSet<String>,
}

impl<K> Default for ActionBuckets<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            buckets: Vec::new(),
            members: HashSet::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> ActionBuckets<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `action` under `key`. Returns false when the action text is
    /// already bucketed.
    pub fn insert(&mut self, key: K, action: CandidateAction) -> bool {
        if self.members.contains(action.text()) {
            return false;
        }
        self.members.insert(action.text().to_string());
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.buckets.push((key.clone(), Vec::new()));
                self.index.insert(key, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        self.buckets[slot].1.push(action);
        true
    }

    /// Union `other` into `self`, bucket by bucket.
    pub fn merge(&mut self, other: ActionBuckets<K>) {
        for (key, actions) in other.buckets {
            for action in actions {
                self.insert(key.clone(), action);
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&[CandidateAction]> {
        self.index.get(key).map(|&slot| self.buckets[slot].1.as_slice())
    }

    /// Key of the bucket holding `text`
    pub fn bucket_of(&self, text: &str) -> Option<&K> {
        if !self.members.contains(text) {
            return None;
        }
        self.buckets
            .iter()
            .find(|(_, actions)| actions.iter().any(|a| a.text() == text))
            .map(|(key, _)| key)
    }

    pub fn contains_action(&self, text: &str) -> bool {
        self.members.contains(text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[CandidateAction])> {
        self.buckets.iter().map(|(k, a)| (k, a.as_slice()))
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of bucketed actions across all buckets
    pub fn action_count(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_groups_and_dedups() {
        let mut buckets: ActionBuckets<u8> = ActionBuckets::new();
        assert!(buckets.insert(1, "open wallet".into()));
        assert!(buckets.insert(2, "take keys".into()));
        assert!(buckets.insert(1, "unzip wallet".into()));
        assert!(!buckets.insert(1, "open wallet".into()));
        assert!(!buckets.insert(2, "open wallet".into()));

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets.action_count(), 3);
        let texts: Vec<&str> = buckets.get(&1).unwrap().iter().map(|a| a.text()).collect();
        assert_eq!(texts, vec!["open wallet", "unzip wallet"]);
        assert_eq!(buckets.bucket_of("take keys"), Some(&2));
        assert_eq!(buckets.bucket_of("north"), None);
    }

    #[test]
    fn test_merge_unions_identical_keys() {
        let mut a: ActionBuckets<u8> = ActionBuckets::new();
        a.insert(1, "open wallet".into());
        let mut b: ActionBuckets<u8> = ActionBuckets::new();
        b.insert(1, "unzip wallet".into());
        b.insert(3, "jump".into());
        a.merge(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.get(&1).map(<[_]>::len), Some(2));
        let keys: Vec<u8> = a.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 3]);
    }
}
