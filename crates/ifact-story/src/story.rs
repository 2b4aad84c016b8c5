//! Story ROM format
//!
//! A story ROM is a JSON document describing rooms, items and exits. It is
//! parsed once per load into an immutable [`Story`] that every machine
//! loaded from the same bytes refers to.

use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;
use ifact_core::{InterpreterError, ObjectNum};
use serde::{Deserialize, Serialize};
use thiserror::Error;

bitflags! {
    /// Item attributes. Bit `n` is object attribute `n`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ItemAttrs: u32 {
        const TAKEABLE = 1 << 0;
        const CONTAINER = 1 << 1;
        const OPENABLE = 1 << 2;
        const OPEN = 1 << 3;
        const VISITED = 1 << 4;
        const SCORED = 1 << 5;
        const WEARABLE = 1 << 6;
        const WORN = 1 << 7;
        /// Contents can be seen while closed
        const TRANSPARENT = 1 << 8;
    }
}

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Story JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate id '{0}'")]
    DuplicateId(String),

    #[error("Story has more than {max} objects")]
    TooManyObjects { max: usize },

    #[error("Unknown room '{0}'")]
    UnknownRoom(String),

    #[error("Unknown location '{location}' for item '{item}'")]
    UnknownLocation { item: String, location: String },

    #[error("Special RAM index {index} out of range for item '{item}'")]
    SwitchOutOfRange { item: String, index: usize },
}

impl From<StoryError> for InterpreterError {
    fn from(err: StoryError) -> Self {
        InterpreterError::Load(err.to_string())
    }
}

/// Where an exit leads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExitDef {
    To { to: String },
    Blocked { blocked: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Direction word -> exit
    #[serde(default)]
    pub exits: BTreeMap<String, ExitDef>,
    /// Entering wins the game
    #[serde(default)]
    pub goal: bool,
    /// Entering ends the game
    #[serde(default)]
    pub deadly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    /// Short name as printed
    pub name: String,
    pub nouns: Vec<String>,
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Room id, item id, or `player`
    pub location: String,
    #[serde(default)]
    pub attributes: ItemAttrs,
    /// Awarded on first pickup
    #[serde(default)]
    pub points: u8,
    /// Text shown by `read`
    #[serde(default)]
    pub text: Option<String>,
    /// Special RAM byte toggled by `push`
    #[serde(default)]
    pub switch: Option<usize>,
    /// Moves between rooms on its own
    #[serde(default)]
    pub wanders: bool,
}

/// The JSON document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDef {
    pub title: String,
    pub max_word_length: usize,
    #[serde(default)]
    pub max_score: i16,
    #[serde(default)]
    pub intro: String,
    pub start: String,
    pub rooms: Vec<RoomDef>,
    #[serde(default)]
    pub items: Vec<ItemDef>,
    /// Words that stop the interpreter
    #[serde(default)]
    pub halt_words: Vec<String>,
    /// Number of special RAM bytes
    #[serde(default)]
    pub special_ram: usize,
    #[serde(default = "default_supported")]
    pub supported: bool,
}

fn default_supported() -> bool {
    true
}

pub const PLAYER: ObjectNum = 1;

/// A parsed story with ids resolved to object numbers.
///
/// Object 1 is the player, then one object per room, then one per item.
#[derive(Debug, Clone)]
pub struct Story {
    pub def: StoryDef,
    pub start: ObjectNum,
    /// Initial parent of every object, indexed by object number
    pub initial_parents: Vec<ObjectNum>,
    /// Exits per room object: direction -> target object or blocked message
    pub exits: HashMap<ObjectNum, BTreeMap<String, Exit>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    To(ObjectNum),
    Blocked(String),
}

impl Story {
    pub fn parse(bytes: &[u8]) -> Result<Self, StoryError> {
        let def: StoryDef = serde_json::from_slice(bytes)?;
        Self::compile(def)
    }

    pub fn compile(def: StoryDef) -> Result<Self, StoryError> {
        let mut ids: HashMap<&str, ObjectNum> = HashMap::new();
        ids.insert("player", PLAYER);
        let room_count = def.rooms.len();
        for (i, id) in def
            .rooms
            .iter()
            .map(|r| r.id.as_str())
            .chain(def.items.iter().map(|it| it.id.as_str()))
            .enumerate()
        {
            let num = ObjectNum::try_from(i + 2).map_err(|_| StoryError::TooManyObjects {
                max: usize::from(ObjectNum::MAX) - 1,
            })?;
            if ids.insert(id, num).is_some() {
                return Err(StoryError::DuplicateId(id.to_string()));
            }
        }
        let room_num = |id: &str| -> Result<ObjectNum, StoryError> {
            ids.get(id)
                .copied()
                .filter(|n| (2..2 + room_count).contains(&usize::from(*n)))
                .ok_or_else(|| StoryError::UnknownRoom(id.to_string()))
        };

        let start = room_num(&def.start)?;
        let mut initial_parents = vec![0, start];
        initial_parents.extend(std::iter::repeat_n(0, room_count));
        for item in &def.items {
            let parent = ids.get(item.location.as_str()).copied().ok_or_else(|| {
                StoryError::UnknownLocation {
                    item: item.id.clone(),
                    location: item.location.clone(),
                }
            })?;
            if let Some(index) = item.switch
                && index >= def.special_ram
            {
                return Err(StoryError::SwitchOutOfRange {
                    item: item.id.clone(),
                    index,
                });
            }
            initial_parents.push(parent);
        }

        let mut exits = HashMap::new();
        for room in &def.rooms {
            let mut table = BTreeMap::new();
            for (dir, exit) in &room.exits {
                let exit = match exit {
                    ExitDef::To { to } => Exit::To(room_num(to)?),
                    ExitDef::Blocked { blocked } => Exit::Blocked(blocked.clone()),
                };
                table.insert(dir.to_lowercase(), exit);
            }
            exits.insert(room_num(&room.id)?, table);
        }

        Ok(Self {
            def,
            start,
            initial_parents,
            exits,
        })
    }

    /// Objects including the player, excluding the null object
    pub fn object_count(&self) -> usize {
        self.initial_parents.len() - 1
    }

    pub fn is_room(&self, num: ObjectNum) -> bool {
        (2..2 + self.def.rooms.len()).contains(&usize::from(num))
    }

    pub fn room(&self, num: ObjectNum) -> Option<&RoomDef> {
        self.is_room(num)
            .then(|| self.def.rooms.get(usize::from(num) - 2))
            .flatten()
    }

    pub fn item(&self, num: ObjectNum) -> Option<&ItemDef> {
        let first = 2 + self.def.rooms.len();
        usize::from(num)
            .checked_sub(first)
            .and_then(|i| self.def.items.get(i))
    }

    /// Item object numbers in ascending order
    pub fn item_nums(&self) -> impl Iterator<Item = ObjectNum> + '_ {
        let first = 2 + self.def.rooms.len();
        (first..first + self.def.items.len()).filter_map(|n| ObjectNum::try_from(n).ok())
    }

    /// Printed name of any object
    pub fn name(&self, num: ObjectNum) -> &str {
        if num == PLAYER {
            return "yourself";
        }
        if let Some(room) = self.room(num) {
            return &room.name;
        }
        self.item(num).map_or("", |item| item.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NINE05;

    #[test]
    fn test_fixture_compiles() {
        let story = Story::parse(NINE05.as_bytes()).unwrap();
        assert_eq!(story.def.title, "nine05");
        assert_eq!(story.initial_parents[usize::from(PLAYER)], story.start);
        assert_eq!(story.name(PLAYER), "yourself");
        assert!(story.is_room(story.start));
        let wallet = story.item_nums().find(|n| story.name(*n) == "leather wallet").unwrap();
        let keys = story.item_nums().find(|n| story.name(*n) == "keys").unwrap();
        assert_eq!(story.initial_parents[usize::from(keys)], wallet);
    }

    #[test]
    fn test_attributes_parse_from_flag_names() {
        let item: ItemDef = serde_json::from_str(
            r#"{"id": "box", "name": "box", "nouns": ["box"], "location": "hall",
                "attributes": "CONTAINER | OPENABLE"}"#,
        )
        .unwrap();
        assert_eq!(item.attributes, ItemAttrs::CONTAINER | ItemAttrs::OPENABLE);
    }

    #[test]
    fn test_unknown_room_rejected() {
        let json = r#"{"title": "t", "max_word_length": 6, "start": "nowhere", "rooms": []}"#;
        assert!(matches!(Story::parse(json.as_bytes()), Err(StoryError::UnknownRoom(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let json = r#"{"title": "t", "max_word_length": 6, "start": "hall",
            "rooms": [{"id": "hall", "name": "Hall"}],
            "items": [{"id": "hall", "name": "hall", "nouns": ["hall"], "location": "hall"}]}"#;
        assert!(matches!(Story::parse(json.as_bytes()), Err(StoryError::DuplicateId(_))));
    }

    #[test]
    fn test_switch_must_fit_special_ram() {
        let json = r#"{"title": "t", "max_word_length": 6, "start": "hall",
            "rooms": [{"id": "hall", "name": "Hall"}],
            "items": [{"id": "b", "name": "button", "nouns": ["button"], "location": "hall", "switch": 0}]}"#;
        assert!(matches!(
            Story::parse(json.as_bytes()),
            Err(StoryError::SwitchOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn test_load_error_converts() {
        let err: InterpreterError = StoryError::UnknownRoom("x".into()).into();
        assert!(matches!(err, InterpreterError::Load(msg) if msg.contains("x")));
    }
}
