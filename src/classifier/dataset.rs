use crate::intents::IntentSet;
use crate::nlp::{vectorize, Vocabulary};

/// Filler word prepended to each pattern as an extra training variant.
pub const FILLER_PREFIX: &str = "ơi ";

/// Row-major feature matrix plus class labels.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub features: Vec<f32>,
    pub labels: Vec<u32>,
    pub input_size: usize,
    pub classes: usize,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn push(&mut self, row: Vec<f32>, label: u32) {
        self.features.extend(row);
        self.labels.push(label);
    }
}

/// Every pattern contributes three samples: as written, with a trailing `?`,
/// and with the filler prefix.
pub fn augment(intents: &IntentSet, vocabulary: &Vocabulary) -> TrainingSet {
    let mut set = TrainingSet {
        features: Vec::with_capacity(intents.pattern_count() * 3 * vocabulary.len()),
        labels: Vec::with_capacity(intents.pattern_count() * 3),
        input_size: vocabulary.len(),
        classes: intents.len(),
    };

    for (index, intent) in intents.iter().enumerate() {
        let label = index as u32;
        for pattern in &intent.patterns {
            let variants = [
                pattern.clone(),
                format!("{pattern}?"),
                format!("{FILLER_PREFIX}{pattern}"),
            ];
            for variant in &variants {
                set.push(vectorize(variant, vocabulary).to_f32(), label);
            }
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intents::Lexicon;

    #[test]
    fn test_three_variants_per_pattern() {
        let intents = IntentSet::builtin().unwrap();
        let lexicon = Lexicon::builtin().unwrap();
        let vocab = Vocabulary::build(&intents, &lexicon.synonyms);
        let set = augment(&intents, &vocab);

        assert_eq!(set.len(), intents.pattern_count() * 3);
        assert_eq!(set.features.len(), set.len() * vocab.len());
        assert_eq!(set.classes, 8);
        assert_eq!(set.input_size, vocab.len());
        assert!(set.labels.iter().all(|l| (*l as usize) < set.classes));
    }

    #[test]
    fn test_labels_follow_corpus_order() {
        let intents = IntentSet::builtin().unwrap();
        let vocab = Vocabulary::build(&intents, &Lexicon::builtin().unwrap().synonyms);
        let set = augment(&intents, &vocab);

        let greeting_samples = intents.get(0).unwrap().patterns.len() * 3;
        assert!(set.labels[..greeting_samples].iter().all(|l| *l == 0));
        assert_eq!(set.labels[greeting_samples], 1);
    }
}
