//! Interactive object identification
//!
//! Finds the names the parser accepts for objects around the player, by
//! probing the interpreter from one reference snapshot:
//!
//! 1. tag nouns and adjectives in the given observation, and in the
//!    responses to `look` and `inventory`;
//! 2. optionally add names from the object tree around the player;
//! 3. drop single words the dictionary does not know;
//! 4. `examine` each remaining name once and drop those the parser rejects;
//! 5. group names by their examine response, since one object often
//!    answers to several synonyms.
//!
//! Every probe starts from the reference snapshot and the interpreter is
//! restored to it before returning, so repeated calls give the same groups.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, trace, warn};

use crate::error::InterpreterError;
use crate::interpreter::GameInterpreter;
use crate::lexicon::{clean, recognized};
use crate::state::GameState;
use crate::world::{DictionaryWord, WordFlags, subtree, truncate_word};

/// Name of the wildcard group
pub const WILDCARD: &str = "all";

/// Grammatical role of a candidate name.
///
/// Variants are ordered alphabetically so descriptor ordering matches the
/// textual ordering of their labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
pub enum PartOfSpeech {
    Adj,
    Noun,
    Propn,
}

/// Where a candidate name was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
pub enum ObjectSource {
    #[strum(serialize = "INV")]
    Inventory,
    #[strum(serialize = "LOC")]
    Location,
    #[strum(serialize = "OBJTREE")]
    ObjectTree,
    #[strum(serialize = "OBS")]
    Observation,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub name: String,
    pub pos: PartOfSpeech,
    pub source: ObjectSource,
}

impl ObjectDescriptor {
    pub fn new(name: impl Into<String>, pos: PartOfSpeech, source: ObjectSource) -> Self {
        Self {
            name: name.into(),
            pos,
            source,
        }
    }

    /// Display-name preference: shorter, nouns over proper names over
    /// adjectives, object-tree names over prose-derived ones.
    pub fn name_score(&self) -> i64 {
        let mut score = -(self.name.chars().count() as i64);
        score += match self.pos {
            PartOfSpeech::Noun => 100,
            PartOfSpeech::Propn => 50,
            PartOfSpeech::Adj => 0,
        };
        if self.source == ObjectSource::ObjectTree {
            score += 10;
        }
        score
    }
}

/// Extracts candidate object words from prose.
pub trait ObjectTagger {
    /// `(lowercase word, role)` pairs found in `text`
    fn tag(&self, text: &str) -> Vec<(String, PartOfSpeech)>;
}

/// Tags words by their part-of-speech flags in the parser dictionary.
#[derive(Debug, Clone, Default)]
pub struct DictionaryTagger {
    flags: HashMap<String, WordFlags>,
    max_word_length: usize,
}

impl DictionaryTagger {
    pub fn new(dictionary: &[DictionaryWord], max_word_length: usize) -> Self {
        let mut flags: HashMap<String, WordFlags> = HashMap::new();
        for entry in dictionary {
            *flags.entry(entry.word.to_lowercase()).or_default() |= entry.flags;
        }
        Self {
            flags,
            max_word_length,
        }
    }
}

impl ObjectTagger for DictionaryTagger {
    fn tag(&self, text: &str) -> Vec<(String, PartOfSpeech)> {
        let mut out = Vec::new();
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let word = word.to_lowercase();
            let Some(flags) = self.flags.get(truncate_word(&word, self.max_word_length)) else {
                continue;
            };
            if flags.contains(WordFlags::NOUN) {
                out.push((word, PartOfSpeech::Noun));
            } else if flags.contains(WordFlags::ADJ) {
                out.push((word, PartOfSpeech::Adj));
            }
        }
        out
    }
}

/// Examine response -> every descriptor answering with it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectGroups(BTreeMap<String, BTreeSet<ObjectDescriptor>>);

impl ObjectGroups {
    pub fn get(&self, description: &str) -> Option<&BTreeSet<ObjectDescriptor>> {
        self.0.get(description)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<ObjectDescriptor>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any group contains `name`
    pub fn contains_name(&self, name: &str) -> bool {
        self.0.values().flatten().any(|d| d.name == name)
    }

    /// One display name per group, the highest-scoring descriptor
    /// (earliest on ties).
    pub fn best_names(&self) -> Vec<String> {
        self.0
            .values()
            .filter_map(|group| {
                group
                    .iter()
                    .fold(None::<&ObjectDescriptor>, |best, d| match best {
                        Some(b) if b.name_score() >= d.name_score() => Some(b),
                        _ => Some(d),
                    })
                    .map(|d| d.name.clone())
            })
            .collect()
    }

    fn insert(&mut self, description: String, descriptor: ObjectDescriptor) {
        self.0.entry(description).or_default().insert(descriptor);
    }
}

#[derive(Clone, Default)]
pub struct InteractiveObjectIdentifier {
    tagger: Option<Arc<dyn ObjectTagger + Send + Sync>>,
}

impl core::fmt::Debug for InteractiveObjectIdentifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InteractiveObjectIdentifier")
            .field("custom_tagger", &self.tagger.is_some())
            .finish()
    }
}

impl InteractiveObjectIdentifier {
    /// Identifier tagging prose with the interpreter's dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier with a custom prose tagger.
    pub fn with_tagger(tagger: Arc<dyn ObjectTagger + Send + Sync>) -> Self {
        Self { tagger: Some(tagger) }
    }

    /// Group the interactive objects visible from the current state.
    ///
    /// The interpreter is back at its starting snapshot on return, also
    /// when a probe fails.
    pub fn identify<I: GameInterpreter + ?Sized>(
        &self,
        interp: &mut I,
        observation: Option<&str>,
        use_object_tree: bool,
    ) -> Result<ObjectGroups, InterpreterError> {
        let state = interp.get_state();
        let result = self.probe_all(interp, &state, observation, use_object_tree);
        interp.set_state(&state)?;
        result
    }

    fn probe_all<I: GameInterpreter + ?Sized>(
        &self,
        interp: &mut I,
        state: &GameState,
        observation: Option<&str>,
        use_object_tree: bool,
    ) -> Result<ObjectGroups, InterpreterError> {
        let max_len = interp.max_word_length();
        let dictionary = interp.dictionary();
        let fallback;
        let tagger: &dyn ObjectTagger = match &self.tagger {
            Some(tagger) => tagger.as_ref(),
            None => {
                fallback = DictionaryTagger::new(&dictionary, max_len);
                &fallback
            }
        };

        let mut candidates: BTreeSet<ObjectDescriptor> = BTreeSet::new();
        let mut add_tagged = |text: &str, source: ObjectSource| {
            for (name, pos) in tagger.tag(text) {
                candidates.insert(ObjectDescriptor::new(name, pos, source));
            }
        };

        if let Some(obs) = observation.filter(|o| !o.is_empty()) {
            add_tagged(obs, ObjectSource::Observation);
        }
        let look = probe(interp, state, "look")?;
        add_tagged(&look, ObjectSource::Location);
        let inventory = probe(interp, state, "inventory")?;
        add_tagged(&inventory, ObjectSource::Inventory);
        interp.set_state(state)?;

        if use_object_tree {
            candidates.extend(object_tree_names(interp));
        }

        let known: HashSet<String> = dictionary.iter().map(|w| w.word.to_lowercase()).collect();
        candidates.retain(|d| {
            d.name.split_whitespace().count() > 1 || known.contains(truncate_word(&d.name, max_len))
        });

        let mut groups = ObjectGroups::default();
        let mut examined: HashMap<String, String> = HashMap::new();
        let mut halting: HashSet<String> = HashSet::new();
        for descriptor in candidates {
            if halting.contains(&descriptor.name) {
                continue;
            }
            let description = match examined.get(&descriptor.name) {
                Some(text) => text.clone(),
                None => {
                    let text = probe(interp, state, &format!("examine {}", descriptor.name))?;
                    if interp.halted() {
                        warn!(name = %descriptor.name, "interpreter halted on examine, resetting and skipping name");
                        interp.reset()?;
                        halting.insert(descriptor.name);
                        continue;
                    }
                    examined.insert(descriptor.name.clone(), text.clone());
                    text
                }
            };
            if recognized(&description) {
                trace!(name = %descriptor.name, "examinable");
                groups.insert(description, descriptor);
            }
        }
        groups.0.insert(
            WILDCARD.to_string(),
            BTreeSet::from([ObjectDescriptor::new(
                WILDCARD,
                PartOfSpeech::Noun,
                ObjectSource::Location,
            )]),
        );
        debug!(groups = groups.len(), examined = examined.len(), "identified interactive objects");
        Ok(groups)
    }
}

/// Restore `state`, run `command`, return the cleaned response.
fn probe<I: GameInterpreter + ?Sized>(
    interp: &mut I,
    state: &GameState,
    command: &str,
) -> Result<String, InterpreterError> {
    interp.set_state(state)?;
    Ok(clean(&interp.step(command)?.observation))
}

/// Names of every object around the player, excluding the player itself.
///
/// The full name counts as a proper name; for multi-word names the last
/// word is also the noun and the leading words adjectives.
fn object_tree_names<I: GameInterpreter + ?Sized>(interp: &I) -> Vec<ObjectDescriptor> {
    let Some(location) = interp.player_location() else {
        return Vec::new();
    };
    let player = interp.player_object_num();
    let objects = interp.world_objects(false);
    let mut out = Vec::new();
    for obj in subtree(location.child, &objects) {
        if obj.num == player {
            continue;
        }
        let name = obj.name.to_lowercase();
        let words: Vec<&str> = name.split_whitespace().collect();
        out.push(ObjectDescriptor::new(name.clone(), PartOfSpeech::Propn, ObjectSource::ObjectTree));
        if let [leading @ .., last] = words.as_slice()
            && !leading.is_empty()
        {
            out.extend(
                leading
                    .iter()
                    .map(|w| ObjectDescriptor::new(*w, PartOfSpeech::Adj, ObjectSource::ObjectTree)),
            );
            out.push(ObjectDescriptor::new(*last, PartOfSpeech::Noun, ObjectSource::ObjectTree));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockInterpreter;

    fn dictionary() -> Vec<DictionaryWord> {
        vec![
            DictionaryWord::new("brass", WordFlags::ADJ),
            DictionaryWord::new("lanter", WordFlags::NOUN),
            DictionaryWord::new("lamp", WordFlags::NOUN),
            DictionaryWord::new("take", WordFlags::VERB),
            DictionaryWord::new("mailbo", WordFlags::NOUN),
        ]
    }

    #[test]
    fn test_dictionary_tagger() {
        let tagger = DictionaryTagger::new(&dictionary(), 6);
        let tags = tagger.tag("Take the brass lantern from the Mailbox.");
        assert_eq!(
            tags,
            vec![
                ("brass".to_string(), PartOfSpeech::Adj),
                ("lantern".to_string(), PartOfSpeech::Noun),
                ("mailbox".to_string(), PartOfSpeech::Noun),
            ]
        );
    }

    #[test]
    fn test_halting_examine_is_skipped() {
        let mut interp = MockInterpreter::new();
        let before = interp.get_state();
        let groups = InteractiveObjectIdentifier::new()
            .identify(&mut interp, Some("A dragon guards the leather wallet."), false)
            .unwrap();
        assert!(!groups.contains_name("dragon"));
        assert!(groups.get("").is_none());
        assert!(groups.contains_name("wallet"));
        assert!(!interp.halted());
        assert_eq!(interp.get_state(), before);
    }

    #[test]
    fn test_descriptor_ordering_is_textual() {
        let a = ObjectDescriptor::new("lamp", PartOfSpeech::Adj, ObjectSource::Observation);
        let b = ObjectDescriptor::new("lamp", PartOfSpeech::Noun, ObjectSource::Inventory);
        assert!(a < b);
        assert_eq!(ObjectSource::ObjectTree.to_string(), "OBJTREE");
        assert_eq!(PartOfSpeech::Propn.to_string(), "PROPN");
    }

    #[test]
    fn test_best_names_prefers_short_nouns() {
        let mut groups = ObjectGroups::default();
        let desc = "A battery-powered brass lantern.".to_string();
        groups.insert(desc.clone(), ObjectDescriptor::new("brass", PartOfSpeech::Adj, ObjectSource::Location));
        groups.insert(desc.clone(), ObjectDescriptor::new("lantern", PartOfSpeech::Noun, ObjectSource::Location));
        groups.insert(desc.clone(), ObjectDescriptor::new("lamp", PartOfSpeech::Noun, ObjectSource::Location));
        groups.insert(desc, ObjectDescriptor::new("brass lantern", PartOfSpeech::Propn, ObjectSource::ObjectTree));
        assert_eq!(groups.best_names(), vec!["lamp".to_string()]);
    }

    #[test]
    fn test_best_names_object_tree_bonus() {
        let mut groups = ObjectGroups::default();
        groups.insert("x".into(), ObjectDescriptor::new("keys", PartOfSpeech::Noun, ObjectSource::Location));
        groups.insert("x".into(), ObjectDescriptor::new("keys", PartOfSpeech::Noun, ObjectSource::ObjectTree));
        let best = groups.get("x").and_then(|g| g.iter().max_by_key(|d| d.name_score()));
        assert_eq!(best.map(|d| d.source), Some(ObjectSource::ObjectTree));
        assert_eq!(groups.best_names(), vec!["keys".to_string()]);
    }
}
