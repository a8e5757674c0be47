//! Static intent corpus
//!
//! The corpus is loaded once at startup and never mutated. Intents are
//! addressed both by position (the classifier's output index) and by tag.

pub mod lexicon;

pub use lexicon::{Lexicon, RoutingTables, SynonymTable};

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_INTENTS: &str = include_str!("../../data/intents.json");

/// Errors raised while loading or validating the corpus and lexicon.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid intents JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid lexicon TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Corpus contains no intents")]
    Empty,

    #[error("Intent at position {0} has an empty tag")]
    EmptyTag(usize),

    #[error("Duplicate intent tag: {0}")]
    DuplicateTag(String),

    #[error("Intent '{0}' has no patterns")]
    NoPatterns(String),

    #[error("Intent '{0}' has no responses")]
    NoResponses(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub tag: String,
    pub patterns: Vec<String>,
    pub responses: Vec<String>,
}

impl Intent {
    /// Uniform random pick among the canned responses.
    pub fn pick_response(&self) -> &str {
        self.responses
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Validated, ordered set of intents.
#[derive(Debug, Clone)]
pub struct IntentSet {
    intents: Vec<Intent>,
}

#[derive(Deserialize)]
struct IntentFile {
    intents: Vec<Intent>,
}

impl IntentSet {
    pub fn new(intents: Vec<Intent>) -> Result<Self, CorpusError> {
        if intents.is_empty() {
            return Err(CorpusError::Empty);
        }

        let mut seen = HashSet::new();
        for (index, intent) in intents.iter().enumerate() {
            if intent.tag.trim().is_empty() {
                return Err(CorpusError::EmptyTag(index));
            }
            if !seen.insert(intent.tag.as_str()) {
                return Err(CorpusError::DuplicateTag(intent.tag.clone()));
            }
            if intent.patterns.is_empty() {
                return Err(CorpusError::NoPatterns(intent.tag.clone()));
            }
            if intent.responses.is_empty() {
                return Err(CorpusError::NoResponses(intent.tag.clone()));
            }
        }

        Ok(Self { intents })
    }

    pub fn from_json(raw: &str) -> Result<Self, CorpusError> {
        let file: IntentFile = serde_json::from_str(raw)?;
        Self::new(file.intents)
    }

    pub fn from_path(path: &Path) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// The built-in Vietnamese corpus.
    pub fn builtin() -> Result<Self, CorpusError> {
        Self::from_json(DEFAULT_INTENTS)
    }

    /// Load from `path` when given, otherwise the built-in corpus.
    pub fn load(path: Option<&Path>) -> Result<Self, CorpusError> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::builtin(),
        }
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Intent> {
        self.intents.get(index)
    }

    pub fn by_tag(&self, tag: &str) -> Option<&Intent> {
        self.intents.iter().find(|i| i.tag == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.intents.iter().map(|i| i.tag.as_str()).collect()
    }

    /// Total number of patterns across all intents.
    pub fn pattern_count(&self) -> usize {
        self.intents.iter().map(|i| i.patterns.len()).sum()
    }
}
