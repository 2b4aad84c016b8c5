//! World introspection types
//!
//! The object tree and parser dictionary as reported by an interpreter.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Object number inside the story's object table (0 = no object)
pub type ObjectNum = u16;

/// Number of attribute bits every object carries
pub const ATTRIBUTE_COUNT: u8 = 32;

/// One node of the world object tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldObject {
    pub num: ObjectNum,
    /// Short name
    pub name: String,
    pub parent: ObjectNum,
    pub sibling: ObjectNum,
    pub child: ObjectNum,
    /// 32 attribute bits, attribute 0 being the high bit of byte 0
    pub attributes: [u8; 4],
    /// Property id -> raw property bytes
    pub properties: BTreeMap<u8, Vec<u8>>,
}

impl WorldObject {
    /// Object with no links, attributes or properties.
    pub fn new(num: ObjectNum, name: impl Into<String>) -> Self {
        Self {
            num,
            name: name.into(),
            parent: 0,
            sibling: 0,
            child: 0,
            attributes: [0; 4],
            properties: BTreeMap::new(),
        }
    }

    /// Test an attribute bit
    pub fn has_attr(&self, attr: u8) -> bool {
        if attr >= ATTRIBUTE_COUNT {
            return false;
        }
        let byte = self.attributes[usize::from(attr / 8)];
        byte & (0x80 >> (attr % 8)) != 0
    }

    /// Set or clear an attribute bit
    pub fn set_attr(&mut self, attr: u8, value: bool) {
        if attr >= ATTRIBUTE_COUNT {
            return;
        }
        let mask = 0x80 >> (attr % 8);
        let byte = &mut self.attributes[usize::from(attr / 8)];
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Attribute numbers that are set, ascending
    pub fn attrs(&self) -> impl Iterator<Item = u8> + '_ {
        (0..ATTRIBUTE_COUNT).filter(|&a| self.has_attr(a))
    }
}

impl core::fmt::Display for WorldObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let attrs: Vec<String> = self.attrs().map(|a| a.to_string()).collect();
        let props: Vec<String> = self.properties.keys().map(|k| k.to_string()).collect();
        write!(
            f,
            "Obj{}: {} Parent{} Sibling{} Child{} Attributes [{}] Properties [{}]",
            self.num,
            self.name,
            self.parent,
            self.sibling,
            self.child,
            attrs.join(", "),
            props.join(", ")
        )
    }
}

/// Collect the subtree rooted at `root`: the node, then its children, then
/// its siblings, recursively.
///
/// `objects` is indexed by object number (index 0 is the null object).
/// Out-of-range numbers and self-links terminate the walk.
pub fn subtree(root: ObjectNum, objects: &[WorldObject]) -> Vec<&WorldObject> {
    let mut out = Vec::new();
    let mut pending = vec![root];
    // Explicit stack instead of recursion; children are visited before siblings.
    while let Some(num) = pending.pop() {
        if num == 0 || usize::from(num) >= objects.len() || out.len() > objects.len() {
            continue;
        }
        let obj = &objects[usize::from(num)];
        out.push(obj);
        if obj.sibling != num {
            pending.push(obj.sibling);
        }
        if obj.child != num {
            pending.push(obj.child);
        }
    }
    out
}

/// Direct children of `parent`, following the child/sibling chain.
pub fn children(parent: ObjectNum, objects: &[WorldObject]) -> Vec<&WorldObject> {
    let mut out = Vec::new();
    let Some(first) = objects.get(usize::from(parent)).map(|p| p.child) else {
        return out;
    };
    let mut next = first;
    while next != 0 && out.len() < objects.len() {
        let Some(obj) = objects.get(usize::from(next)) else {
            break;
        };
        out.push(obj);
        next = obj.sibling;
    }
    out
}

bitflags! {
    /// Part-of-speech flags of a dictionary entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WordFlags: u8 {
        const NOUN = 0x01;
        const VERB = 0x02;
        const PREP = 0x04;
        const META = 0x08;
        const PLURAL = 0x10;
        const DIR = 0x20;
        const ADJ = 0x40;
        const SPECIAL = 0x80;
    }
}

/// One entry of the parser dictionary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DictionaryWord {
    /// The word as stored, already truncated to the parser's word length
    pub word: String,
    pub flags: WordFlags,
}

impl DictionaryWord {
    pub fn new(word: impl Into<String>, flags: WordFlags) -> Self {
        Self {
            word: word.into(),
            flags,
        }
    }

    /// Human-readable part-of-speech labels
    pub fn pos(&self) -> Vec<&'static str> {
        const LABELS: [(WordFlags, &str); 8] = [
            (WordFlags::NOUN, "noun"),
            (WordFlags::VERB, "verb"),
            (WordFlags::PREP, "prep"),
            (WordFlags::META, "meta"),
            (WordFlags::PLURAL, "plural"),
            (WordFlags::DIR, "dir"),
            (WordFlags::ADJ, "adj"),
            (WordFlags::SPECIAL, "special"),
        ];
        LABELS
            .iter()
            .filter(|(flag, _)| self.flags.contains(*flag))
            .map(|(_, label)| *label)
            .collect()
    }
}

/// Truncate a word to the parser's recognised length (character-wise).
pub fn truncate_word(word: &str, max_len: usize) -> &str {
    match word.char_indices().nth(max_len) {
        Some((idx, _)) => &word[..idx],
        None => word,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<WorldObject> {
        // 0: null, 1: room, 2: player (in room), 3: mailbox (in room), 4: leaflet (in mailbox)
        let mut objs: Vec<WorldObject> = (0..5).map(|n| WorldObject::new(n, format!("o{n}"))).collect();
        objs[1].child = 2;
        objs[2].parent = 1;
        objs[2].sibling = 3;
        objs[3].parent = 1;
        objs[3].child = 4;
        objs[4].parent = 3;
        objs
    }

    #[test]
    fn test_attribute_bits() {
        let mut obj = WorldObject::new(1, "lamp");
        obj.set_attr(0, true);
        obj.set_attr(9, true);
        obj.set_attr(31, true);
        assert_eq!(obj.attributes, [0x80, 0x40, 0x00, 0x01]);
        assert_eq!(obj.attrs().collect::<Vec<_>>(), vec![0, 9, 31]);
        obj.set_attr(9, false);
        assert!(!obj.has_attr(9));
        assert!(!obj.has_attr(40));
    }

    #[test]
    fn test_subtree_visits_children_before_siblings() {
        let objs = tree();
        let nums: Vec<ObjectNum> = subtree(2, &objs).iter().map(|o| o.num).collect();
        assert_eq!(nums, vec![2, 3, 4]);
    }

    #[test]
    fn test_subtree_out_of_range() {
        let objs = tree();
        assert!(subtree(0, &objs).is_empty());
        assert!(subtree(99, &objs).is_empty());
    }

    #[test]
    fn test_children_follows_sibling_chain() {
        let objs = tree();
        let nums: Vec<ObjectNum> = children(1, &objs).iter().map(|o| o.num).collect();
        assert_eq!(nums, vec![2, 3]);
    }

    #[test]
    fn test_dictionary_pos_labels() {
        let word = DictionaryWord::new("brass", WordFlags::NOUN | WordFlags::ADJ);
        assert_eq!(word.pos(), vec!["noun", "adj"]);
    }

    #[test]
    fn test_truncate_word() {
        assert_eq!(truncate_word("northeast", 6), "northe");
        assert_eq!(truncate_word("keys", 6), "keys");
    }

    #[test]
    fn test_display_format() {
        let mut obj = WorldObject::new(4, "cretin");
        obj.parent = 180;
        obj.set_attr(7, true);
        obj.properties.insert(18, vec![1]);
        assert_eq!(
            obj.to_string(),
            "Obj4: cretin Parent180 Sibling0 Child0 Attributes [7] Properties [18]"
        );
    }
}
