use super::{tokenize, Vocabulary};

/// Binary presence vector; one entry per vocabulary token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector {
    bits: Vec<u8>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Number of vocabulary tokens present in the input.
    pub fn active(&self) -> usize {
        self.bits.iter().filter(|b| **b == 1).count()
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.bits.iter().map(|b| f32::from(*b)).collect()
    }
}

/// Map `text` onto `vocabulary`. Out-of-vocabulary input yields an all-zero vector.
pub fn vectorize(text: &str, vocabulary: &Vocabulary) -> FeatureVector {
    let mut bits = vec![0u8; vocabulary.len()];
    for token in tokenize(text) {
        if let Some(pos) = vocabulary.position(&token) {
            bits[pos] = 1;
        }
    }
    FeatureVector { bits }
}
