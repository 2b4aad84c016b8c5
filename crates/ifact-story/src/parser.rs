//! Command parser
//!
//! Turns a player command into a [`Command`]. Words are matched on their
//! first `max_word_length` characters, the way story-file dictionaries
//! store them.

use std::collections::BTreeMap;

use ifact_core::lexicon::unabbreviate;
use ifact_core::world::truncate_word;
use ifact_core::{DictionaryWord, WordFlags};
use strum::Display;

use crate::story::Story;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Verb {
    Look,
    Inventory,
    Examine,
    Take,
    Drop,
    Open,
    Close,
    Put,
    Push,
    Read,
    Wear,
    Wait,
    Go,
    Score,
    Version,
}

const VERB_WORDS: &[(&str, Verb)] = &[
    ("look", Verb::Look),
    ("inventory", Verb::Inventory),
    ("examine", Verb::Examine),
    ("take", Verb::Take),
    ("get", Verb::Take),
    ("pick", Verb::Take),
    ("drop", Verb::Drop),
    ("open", Verb::Open),
    ("unzip", Verb::Open),
    ("close", Verb::Close),
    ("shut", Verb::Close),
    ("put", Verb::Put),
    ("insert", Verb::Put),
    ("push", Verb::Push),
    ("press", Verb::Push),
    ("read", Verb::Read),
    ("wear", Verb::Wear),
    ("wait", Verb::Wait),
    ("go", Verb::Go),
    ("walk", Verb::Go),
    ("score", Verb::Score),
    ("version", Verb::Version),
];

pub const DIRECTIONS: &[&str] = &[
    "north", "south", "east", "west", "northeast", "northwest", "southeast", "southwest", "up",
    "down", "enter", "exit",
];

const ARTICLES: &[&str] = &["the", "a", "an", "some"];
const PREPOSITIONS: &[&str] = &["in", "into", "inside", "on", "up"];
pub const ALL: &str = "all";

/// Words naming one object, adjectives first
pub type NounPhrase = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Verb with no object
    Bare(Verb),
    /// Verb applied to one object
    Object(Verb, NounPhrase),
    TakeAll,
    Put { item: NounPhrase, into: NounPhrase },
    Go(String),
    /// A word that stops the interpreter
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownWord(String),
    NotAVerb,
    MissingObject(Verb),
    /// Words left over after a complete command
    Unexpected,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "I beg your pardon?"),
            Self::UnknownWord(word) => write!(f, "I don't know the word \"{word}\"."),
            Self::NotAVerb => write!(f, "That's not a verb I recognise."),
            Self::MissingObject(verb) => write!(f, "What do you want to {verb}?"),
            Self::Unexpected => write!(f, "That sentence isn't one I recognize."),
        }
    }
}

/// Word table built once per story.
#[derive(Debug, Clone)]
pub struct Parser {
    max_len: usize,
    /// Truncated word -> flags
    words: BTreeMap<String, WordFlags>,
    verbs: Vec<(String, Verb)>,
    directions: Vec<(String, String)>,
    halt_words: Vec<String>,
}

impl Parser {
    pub fn new(story: &Story) -> Self {
        let max_len = story.def.max_word_length;
        let cut = |w: &str| truncate_word(&w.to_lowercase(), max_len).to_string();
        let mut words: BTreeMap<String, WordFlags> = BTreeMap::new();
        let mut add = |w: &str, flags: WordFlags| {
            *words.entry(cut(w)).or_default() |= flags;
        };

        for (word, _) in VERB_WORDS {
            let flags = if matches!(*word, "score" | "version") {
                WordFlags::VERB | WordFlags::META
            } else {
                WordFlags::VERB
            };
            add(word, flags);
        }
        for dir in DIRECTIONS {
            add(dir, WordFlags::DIR);
        }
        for prep in PREPOSITIONS {
            add(prep, WordFlags::PREP);
        }
        for article in ARTICLES {
            add(article, WordFlags::SPECIAL);
        }
        add(ALL, WordFlags::NOUN | WordFlags::SPECIAL);
        for room in &story.def.rooms {
            for word in room.name.split_whitespace() {
                add(word, WordFlags::NOUN);
            }
        }
        for item in &story.def.items {
            for noun in &item.nouns {
                let plural = noun.ends_with('s');
                add(noun, if plural { WordFlags::NOUN | WordFlags::PLURAL } else { WordFlags::NOUN });
            }
            for adj in &item.adjectives {
                add(adj, WordFlags::ADJ);
            }
        }
        for word in &story.def.halt_words {
            add(word, WordFlags::VERB | WordFlags::META);
        }

        Self {
            max_len,
            verbs: VERB_WORDS.iter().map(|(w, v)| (cut(w), *v)).collect(),
            directions: DIRECTIONS.iter().map(|d| (cut(d), d.to_string())).collect(),
            halt_words: story.def.halt_words.iter().map(|w| cut(w)).collect(),
            words,
        }
    }

    pub fn max_word_length(&self) -> usize {
        self.max_len
    }

    /// Truncate a word the way the dictionary stores it
    pub fn cut(&self, word: &str) -> String {
        truncate_word(word, self.max_len).to_string()
    }

    pub fn dictionary(&self) -> Vec<DictionaryWord> {
        self.words
            .iter()
            .map(|(word, flags)| DictionaryWord::new(word.clone(), *flags))
            .collect()
    }

    pub fn parse(&self, input: &str) -> Result<Command, ParseError> {
        let expanded = unabbreviate(input);
        let mut tokens: Vec<String> = Vec::new();
        for raw in expanded.split_whitespace() {
            let word = raw.trim_matches(|c: char| c == '.' || c == ',' || c == '!' || c == '?');
            if word.is_empty() {
                continue;
            }
            let cut = self.cut(word);
            if !self.words.contains_key(&cut) {
                return Err(ParseError::UnknownWord(word.to_string()));
            }
            if !ARTICLES.contains(&word) {
                tokens.push(cut);
            }
        }
        let Some((head, rest)) = tokens.split_first() else {
            return Err(ParseError::Empty);
        };

        if self.halt_words.contains(head) {
            return Ok(Command::Halt);
        }
        if let Some(dir) = self.direction(head) {
            return if rest.is_empty() { Ok(Command::Go(dir)) } else { Err(ParseError::Unexpected) };
        }
        let verb = self
            .verbs
            .iter()
            .find(|(w, _)| w == head)
            .map(|(_, v)| *v)
            .ok_or(ParseError::NotAVerb)?;
        let rest = match (verb, rest.first().map(String::as_str)) {
            // "pick up X"
            (Verb::Take, Some("up")) => &rest[1..],
            _ => rest,
        };

        match verb {
            Verb::Look | Verb::Inventory | Verb::Wait | Verb::Score | Verb::Version => {
                if rest.is_empty() { Ok(Command::Bare(verb)) } else { Err(ParseError::Unexpected) }
            }
            Verb::Go => match rest {
                [dir] => self.direction(dir).map(Command::Go).ok_or(ParseError::Unexpected),
                [] => Err(ParseError::MissingObject(verb)),
                _ => Err(ParseError::Unexpected),
            },
            Verb::Take if rest.len() == 1 && rest[0] == ALL => Ok(Command::TakeAll),
            Verb::Put => {
                let split = rest
                    .iter()
                    .position(|w| PREPOSITIONS.iter().any(|p| self.cut(p) == *w))
                    .ok_or(ParseError::MissingObject(verb))?;
                let (item, into) = (&rest[..split], &rest[split + 1..]);
                if item.is_empty() || into.is_empty() {
                    return Err(ParseError::MissingObject(verb));
                }
                Ok(Command::Put {
                    item: item.to_vec(),
                    into: into.to_vec(),
                })
            }
            _ if rest.is_empty() => Err(ParseError::MissingObject(verb)),
            _ => Ok(Command::Object(verb, rest.to_vec())),
        }
    }

    fn direction(&self, word: &str) -> Option<String> {
        self.directions
            .iter()
            .find(|(cut, _)| cut == word)
            .map(|(_, full)| full.clone())
    }
}
