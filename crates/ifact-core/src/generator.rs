//! Template action generator
//!
//! Expands a title's grammar templates (`open OBJ`, `put OBJ in OBJ`, ...)
//! with object names into concrete candidate commands.

use tracing::debug;

use crate::action::{TemplateAction, VocabId};
use crate::bindings::Bindings;
use crate::error::{ConfigError, GeneratorError};
use crate::lexicon::{
    ABBREVIATED_DIRECTION_TITLES, BASIC_ACTIONS, DIAGONAL_ABBREVIATIONS, is_illegal, is_no_effect,
};
use crate::verbs::{VerbFrequencyOracle, head_verb};

/// Object placeholder token
pub const HOLE: &str = "OBJ";

/// Maximum number of placeholders per template
pub const MAX_HOLES: usize = 2;

/// A preprocessed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
    holes: usize,
}

impl Template {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn holes(&self) -> usize {
        self.holes
    }

    fn fill(&self, objects: &[&str]) -> String {
        objects
            .iter()
            .fold(self.text.clone(), |text, obj| text.replacen(HOLE, obj, 1))
    }
}

#[derive(Debug, Clone)]
pub struct TemplateActionGenerator {
    title: String,
    templates: Vec<Template>,
}

impl TemplateActionGenerator {
    /// Build from a title's bindings: its grammar, then the basic actions,
    /// then title-specific direction fixes.
    pub fn new(bindings: &Bindings, oracle: &dyn VerbFrequencyOracle) -> Result<Self, ConfigError> {
        bindings.validate()?;
        let mut generator = Self::from_templates(
            &bindings.name,
            &bindings.grammar_templates(),
            bindings.max_word_length,
            oracle,
        )?;
        generator
            .templates
            .extend(BASIC_ACTIONS.iter().map(|a| Template {
                text: (*a).to_string(),
                holes: 0,
            }));
        if ABBREVIATED_DIRECTION_TITLES.contains(&bindings.name.as_str()) {
            generator
                .templates
                .retain(|t| !DIAGONAL_ABBREVIATIONS.iter().any(|(long, _)| t.text == *long));
            generator
                .templates
                .extend(DIAGONAL_ABBREVIATIONS.iter().map(|(_, short)| Template {
                    text: (*short).to_string(),
                    holes: 0,
                }));
        }
        debug!(title = %bindings.name, templates = generator.templates.len(), "built action generator");
        Ok(generator)
    }

    /// Build from raw templates only, without the basic actions.
    pub fn from_templates<S: AsRef<str>>(
        title: &str,
        templates: &[S],
        max_word_length: usize,
        oracle: &dyn VerbFrequencyOracle,
    ) -> Result<Self, ConfigError> {
        let mut out = Vec::with_capacity(templates.len());
        for raw in templates {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            if let Some(template) = preprocess(title, raw, max_word_length, oracle)? {
                out.push(template);
            }
        }
        Ok(Self {
            title: title.to_string(),
            templates: out,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Every instantiation of every template with `objects`.
    ///
    /// Two-hole templates get every ordered pair of distinct objects, outer
    /// loop over the first hole.
    pub fn generate_actions<S: AsRef<str>>(&self, objects: &[S]) -> Vec<String> {
        let objects: Vec<&str> = objects.iter().map(AsRef::as_ref).collect();
        let mut actions = Vec::new();
        for template in &self.templates {
            match template.holes {
                0 => actions.push(template.text.clone()),
                1 => actions.extend(objects.iter().map(|o| template.fill(&[*o]))),
                _ => {
                    for first in &objects {
                        for second in objects.iter().filter(|o| *o != first) {
                            actions.push(template.fill(&[*first, *second]));
                        }
                    }
                }
            }
        }
        actions
    }

    /// Like [`generate_actions`](Self::generate_actions), also recording
    /// the template index and the vocabulary ids of the substituted objects.
    pub fn generate_template_actions<S: AsRef<str>>(
        &self,
        objects: &[S],
        object_ids: &[VocabId],
    ) -> Result<Vec<TemplateAction>, GeneratorError> {
        if objects.len() != object_ids.len() {
            return Err(GeneratorError::IdCountMismatch {
                objects: objects.len(),
                ids: object_ids.len(),
            });
        }
        let named: Vec<(&str, VocabId)> = objects
            .iter()
            .map(AsRef::as_ref)
            .zip(object_ids.iter().copied())
            .collect();
        let mut actions = Vec::new();
        for (idx, template) in self.templates.iter().enumerate() {
            match template.holes {
                0 => actions.push(TemplateAction::new(template.text.clone(), idx, vec![])),
                1 => actions.extend(
                    named
                        .iter()
                        .map(|(o, id)| TemplateAction::new(template.fill(&[*o]), idx, vec![*id])),
                ),
                _ => {
                    for (first, first_id) in &named {
                        for (second, second_id) in named.iter().filter(|(o, _)| o != first) {
                            actions.push(TemplateAction::new(
                                template.fill(&[*first, *second]),
                                idx,
                                vec![*first_id, *second_id],
                            ));
                        }
                    }
                }
            }
        }
        Ok(actions)
    }
}

/// Resolve verb alternatives, then drop meta and no-effect templates.
fn preprocess(
    title: &str,
    raw: &str,
    max_word_length: usize,
    oracle: &dyn VerbFrequencyOracle,
) -> Result<Option<Template>, ConfigError> {
    let malformed = |reason: &str| ConfigError::MalformedTemplate {
        title: title.to_string(),
        template: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut words = Vec::new();
    for token in raw.split_whitespace() {
        if !token.contains('/') {
            words.push(token.to_string());
            continue;
        }
        let alternatives: Vec<&str> = token.split('/').collect();
        if alternatives.iter().any(|a| a.is_empty()) {
            return Err(malformed("empty verb alternative"));
        }
        // Ties keep the first alternative listed.
        let mut best = alternatives[0];
        let mut best_count = oracle.lookup(best, Some(max_word_length));
        for alt in &alternatives[1..] {
            let count = oracle.lookup(alt, Some(max_word_length));
            if count > best_count {
                best = *alt;
                best_count = count;
            }
        }
        words.push(best.to_string());
    }

    let holes = words.iter().filter(|w| *w == HOLE).count();
    if holes > MAX_HOLES {
        return Err(malformed("more than two object placeholders"));
    }

    let text = words.join(" ");
    let head = head_verb(&text);
    if is_illegal(&head) || (words.len() == 1 && is_no_effect(&head)) {
        return Ok(None);
    }
    Ok(Some(Template { text, holes }))
}
