//! Text features for the intent classifier
//!
//! - `tokenize` - lowercase Unicode word segmentation shared by training and inference
//! - `Vocabulary` - ordered token set built from the corpus
//! - `FeatureVector` - binary bag-of-words presence vector

mod vectorizer;
mod vocabulary;

pub use vectorizer::{vectorize, FeatureVector};
pub use vocabulary::Vocabulary;

use unicode_segmentation::UnicodeSegmentation;

/// Lowercase the text and split it into words on whitespace and punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .unicode_words()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_vietnamese_words_whole() {
        assert_eq!(tokenize("Xin chào!"), vec!["xin", "chào"]);
        assert_eq!(tokenize("Bạn là ai?"), vec!["bạn", "là", "ai"]);
        assert_eq!(tokenize("ơi  Tạm biệt, nhé"), vec!["ơi", "tạm", "biệt", "nhé"]);
    }

    #[test]
    fn test_tokenize_empty_and_punctuation() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("?!... ").is_empty());
    }
}
