//! Fixed word lists and response patterns shared by every title.

use std::sync::LazyLock;

use regex::Regex;

/// Head words of commands that manipulate the session rather than the
/// world (save, restore, quit, score, ...). Templates starting with one of
/// these are never generated.
pub const ILLEGAL_ACTIONS: &[&str] = &[
    "license", "licence", "lisense", "lisence", "copyright", "terms", "eula", "info",
    "tutorial", "changes", "daemons", "messages", "actions", "normal", "win", "lose",
    "quotes", "replay", "recording", "hint", "menu", "walkthru", "walkthrou", "manual",
    "purloin", "trace", "about", "clue", "nouns", "places", "objects", "long", "short",
    "notify", "die", "noscript", "full", "fullscore", "credit", "credits", "help", "super",
    "save", "versio", "verbos", "brief", "restar", "restor", "again", "$ve", "verify",
    "version", "verbose", "transcrip", "tw-print", "showme", "showverb", "showheap",
    "superbrie", "script", "restore", "restart", "quit", "q", "random", "responses",
    "max_scor", "score", "endofobje", "comma,", ".", ",", "unscri", "gonear",
];

/// Actions applicable to almost any title.
pub const BASIC_ACTIONS: &[&str] = &[
    "north", "south", "west", "east", "northwest", "southwest", "northeast", "southeast",
    "up", "down", "enter", "exit", "take all",
];

/// Single-word commands that usually leave the world untouched.
pub const NO_EFFECT_ACTIONS: &[&str] = &["examine", "x", "look", "l", "i", "inventory", "gaze"];

/// Long diagonal directions and their abbreviations.
pub const DIAGONAL_ABBREVIATIONS: &[(&str, &str)] = &[
    ("northeast", "ne"),
    ("northwest", "nw"),
    ("southeast", "se"),
    ("southwest", "sw"),
];

/// Titles whose parser only understands abbreviated diagonal directions.
pub const ABBREVIATED_DIRECTION_TITLES: &[&str] = &["enchanter", "spellbrkr"];

/// Common command abbreviations.
pub const ABBREVIATIONS: &[(&str, &str)] = &[
    ("n", "north"),
    ("s", "south"),
    ("w", "west"),
    ("e", "east"),
    ("d", "down"),
    ("u", "up"),
    ("g", "again"),
    ("l", "look"),
    ("i", "inventory"),
    ("z", "wait"),
    ("y", "yes"),
    ("x", "examine"),
    ("q", "quit"),
    ("t", "talk"),
    ("ne", "northeast"),
    ("nw", "northwest"),
    ("se", "southeast"),
    ("sw", "southwest"),
];

const UNRECOGNIZED: &[&str] = &[
    r"That's not a verb I recognise",
    r#"I don't know the word "(\w+)\.?""#,
    r#"You used the word "(\w+)" in a way that I don't understand"#,
    r#"You can't see any "?(.*)"? here!*"#,
    r#"This story doesn't know the word "(\w+)\.?""#,
    r#"This story doesn't recognize the word "(\w+)\.?""#,
    r#"The word "(\w+)" isn't in the vocabulary that you can use"#,
    r#"You don't need to use the word "(\w+)" to finish this story"#,
    r#"You don't need to use the word "(\w+)" to complete this story"#,
    r#"Sorry, but the word "(\w+)" is not in the vocabulary you can use"#,
    r#"Sorry, but this story doesn't recognize the word "(\w+)\.?""#,
    r"It's not clear what you're referring to.",
    r"There seems to be a noun missing in that sentence!",
    r"That sentence isn't one I recognize",
    r"What do you want to examine?",
    r"You can't see any such thing",
    r"That's not something you need to refer to in the course of this game",
];

/// Responses meaning the parser did not understand the last command.
///
/// Covers the common library messages; titles with custom parser replies
/// may slip through.
static UNRECOGNIZED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    UNRECOGNIZED
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Whether a response indicates the last command was parsed.
///
/// Only ungrammatical or unknown-word commands are detected; a recognised
/// command may still have failed in the world.
pub fn recognized(response: &str) -> bool {
    // Patterns are unanchored and `.` stops at newlines, so test line by line.
    !response
        .lines()
        .any(|line| UNRECOGNIZED_PATTERNS.iter().any(|p| p.is_match(line)))
}

/// Compact a response: newlines, `*` and `-` become spaces, then trim.
pub fn clean(text: &str) -> String {
    text.replace(['\n', '*', '-'], " ").trim().to_string()
}

/// Expand abbreviated words, e.g. `x sewer` -> `examine sewer`.
pub fn unabbreviate(action: &str) -> String {
    action
        .trim()
        .to_lowercase()
        .split_whitespace()
        .map(|w| {
            ABBREVIATIONS
                .iter()
                .find(|(short, _)| *short == w)
                .map_or(w, |(_, long)| long)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_illegal(head: &str) -> bool {
    ILLEGAL_ACTIONS.contains(&head)
}

pub fn is_no_effect(head: &str) -> bool {
    NO_EFFECT_ACTIONS.contains(&head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(UNRECOGNIZED_PATTERNS.len(), UNRECOGNIZED.len());
    }

    #[test]
    fn test_recognized() {
        assert!(!recognized("I don't know the word \"Azerbijan\"."));
        assert!(!recognized("You can't see any such thing."));
        assert!(!recognized("What do you want to examine?"));
        assert!(recognized("The vines block your way."));
        assert!(recognized("It's a brown leather wallet."));
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("*This string\nneeds a good clean.--\n\n*"), "This string needs a good clean.");
    }

    #[test]
    fn test_unabbreviate() {
        assert_eq!(unabbreviate("nw"), "northwest");
        assert_eq!(unabbreviate("x sewer"), "examine sewer");
        assert_eq!(unabbreviate("  Take  Lamp "), "take lamp");
    }

    #[test]
    fn test_word_lists() {
        assert!(is_illegal("save"));
        assert!(is_illegal("quit"));
        assert!(!is_illegal("take"));
        assert!(is_no_effect("look"));
        assert!(!is_no_effect("open"));
    }
}
