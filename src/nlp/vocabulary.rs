use std::collections::HashMap;

use super::tokenize;
use crate::intents::{IntentSet, SynonymTable};

/// Ordered, de-duplicated token list. A token's position is its feature index.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from every pattern in the corpus, in corpus order, injecting
    /// synonym tokens right after the token (or phrase) that implies them.
    pub fn build(intents: &IntentSet, synonyms: &SynonymTable) -> Self {
        let mut vocab = Self::empty();
        let max_phrase = synonyms.max_phrase_len();

        for intent in intents.iter() {
            for pattern in &intent.patterns {
                let tokens = tokenize(pattern);
                for (pos, token) in tokens.iter().enumerate() {
                    vocab.insert(token);

                    // Phrases ending at this token, shortest first
                    for len in 1..=max_phrase.min(pos + 1) {
                        let phrase = tokens[pos + 1 - len..=pos].join(" ");
                        for implied in synonyms.implied(&phrase) {
                            vocab.insert(implied);
                        }
                    }
                }
            }
        }

        vocab
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Self::empty();
        for t in tokens {
            vocab.insert(&t.as_ref().to_lowercase());
        }
        vocab
    }

    fn empty() -> Self {
        Self {
            tokens: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn insert(&mut self, token: &str) {
        if !self.index.contains_key(token) {
            self.index.insert(token.to_string(), self.tokens.len());
            self.tokens.push(token.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn position(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}
