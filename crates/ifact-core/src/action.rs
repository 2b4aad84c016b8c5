//! Candidate actions

use serde::{Deserialize, Serialize};

/// Vocabulary id of an object word, as used by downstream indexing
pub type VocabId = u16;

/// A template instantiation that remembers how it was generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateAction {
    /// The concrete command
    pub text: String,
    /// Index of the originating template in the generator
    pub template_id: usize,
    /// Vocabulary ids substituted into the holes, in hole order
    pub object_ids: Vec<VocabId>,
}

impl TemplateAction {
    pub fn new(text: impl Into<String>, template_id: usize, object_ids: Vec<VocabId>) -> Self {
        Self {
            text: text.into(),
            template_id,
            object_ids,
        }
    }
}

impl core::fmt::Display for TemplateAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A command to try against the interpreter.
///
/// The resolver only looks at [`CandidateAction::text`]; the structured form
/// rides along so callers can map results back to templates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateAction {
    Text(String),
    Template(TemplateAction),
}

impl CandidateAction {
    pub fn text(&self) -> &str {
        match self {
            CandidateAction::Text(text) => text,
            CandidateAction::Template(action) => &action.text,
        }
    }

    pub fn template(&self) -> Option<&TemplateAction> {
        match self {
            CandidateAction::Text(_) => None,
            CandidateAction::Template(action) => Some(action),
        }
    }
}

impl core::fmt::Display for CandidateAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.text())
    }
}

impl From<String> for CandidateAction {
    fn from(text: String) -> Self {
        CandidateAction::Text(text)
    }
}

impl From<&str> for CandidateAction {
    fn from(text: &str) -> Self {
        CandidateAction::Text(text.to_string())
    }
}

impl From<TemplateAction> for CandidateAction {
    fn from(action: TemplateAction) -> Self {
        CandidateAction::Template(action)
    }
}
