//! Language-specific lookup tables: vocabulary synonyms and routing keyword sets.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::CorpusError;

const DEFAULT_LEXICON: &str = include_str!("../../data/lexicon.toml");

/// Fixed synonym injections for the vocabulary builder.
///
/// Keys are lowercase tokens or space-separated token phrases. When a key
/// occurs in a training pattern, its values are added to the vocabulary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SynonymTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl SynonymTable {
    pub fn new(entries: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| {
                    (
                        k.to_lowercase(),
                        v.into_iter().map(|t| t.to_lowercase()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Tokens implied by `key`, if any.
    pub fn implied(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Longest key length in tokens.
    pub fn max_phrase_len(&self) -> usize {
        self.entries
            .keys()
            .map(|k| k.split_whitespace().count())
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Keyword sets consulted by the routing policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutingTables {
    #[serde(default)]
    pub basic_intents: Vec<String>,
    #[serde(default)]
    pub complex_markers: Vec<String>,
    #[serde(default)]
    pub special_terms: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lexicon {
    #[serde(default)]
    pub synonyms: SynonymTable,
    #[serde(default)]
    pub routing: RoutingTables,
}

impl Lexicon {
    pub fn from_toml(raw: &str) -> Result<Self, CorpusError> {
        let mut lexicon: Lexicon = toml::from_str(raw)?;
        // Matching is case-insensitive; normalize once here.
        lexicon.synonyms = SynonymTable::new(lexicon.synonyms.entries);
        for list in [
            &mut lexicon.routing.complex_markers,
            &mut lexicon.routing.special_terms,
        ] {
            for s in list.iter_mut() {
                *s = s.to_lowercase();
            }
        }
        Ok(lexicon)
    }

    pub fn builtin() -> Result<Self, CorpusError> {
        Self::from_toml(DEFAULT_LEXICON)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, CorpusError> {
        match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|source| CorpusError::Io {
                    path: p.display().to_string(),
                    source,
                })?;
                Self::from_toml(&raw)
            }
            None => Self::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lexicon() {
        let lexicon = Lexicon::builtin().unwrap();
        assert_eq!(lexicon.synonyms.implied("xin"), ["làm"]);
        assert_eq!(lexicon.synonyms.implied("tạm biệt"), ["bye", "goodbye"]);
        assert!(lexicon.synonyms.implied("unknown").is_empty());
        assert_eq!(lexicon.synonyms.max_phrase_len(), 2);
        assert_eq!(lexicon.routing.basic_intents, ["greeting", "goodbye", "thanks"]);
        assert!(lexicon.routing.complex_markers.iter().any(|m| m == "tại sao"));
        assert!(lexicon.routing.special_terms.iter().any(|t| t == "lập trình"));
    }

    #[test]
    fn test_lexicon_is_lowercased() {
        let lexicon = Lexicon::from_toml(
            r#"
            [synonyms]
            "Chào" = ["HI"]

            [routing]
            complex_markers = ["Tại Sao"]
            "#,
        )
        .unwrap();
        assert_eq!(lexicon.synonyms.implied("chào"), ["hi"]);
        assert_eq!(lexicon.routing.complex_markers, ["tại sao"]);
        assert!(lexicon.routing.special_terms.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        assert!(matches!(
            Lexicon::from_toml("[routing\nbasic_intents = 3"),
            Err(CorpusError::Toml(_))
        ));
    }
}
