//! Intent classifier
//!
//! Trained once at process start from the augmented corpus; never persisted
//! and never updated online. The engine talks to it only through
//! [`IntentClassifier`], so a freshly trained network and a fixed test double
//! are interchangeable.

mod dataset;
mod network;

pub use dataset::{augment, TrainingSet, FILLER_PREFIX};
pub use network::{train, FeedForwardClassifier, TrainingOptions, TrainingReport};

use std::sync::Arc;

use crate::intents::{IntentSet, Lexicon};
use crate::nlp::{vectorize, FeatureVector, Vocabulary};

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Vocabulary is empty; nothing to train on")]
    EmptyVocabulary,

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("Training produced a non-finite loss at epoch {0}")]
    Diverged(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Feature vector has {got} entries, classifier expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Inference failed: {0}")]
    Inference(#[from] candle_core::Error),
}

/// Probability distribution over intents, in corpus order.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    probabilities: Vec<f32>,
}

impl Prediction {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self { probabilities }
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Index of the most probable intent. Ties resolve to the lowest index.
    pub fn top_index(&self) -> usize {
        self.probabilities
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, &p)| {
                if p > best.1 { (i, p) } else { best }
            })
            .0
    }

    pub fn confidence(&self) -> f32 {
        self.probabilities.get(self.top_index()).copied().unwrap_or(0.0)
    }
}

/// Maps a feature vector to a distribution over intents. Must not mutate itself.
pub trait IntentClassifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError>;

    /// Number of inputs the classifier expects.
    fn input_size(&self) -> usize;

    /// Number of intents it distinguishes.
    fn output_size(&self) -> usize;
}

/// A classifier together with the vocabulary its inputs are bound to.
pub struct TrainedModel {
    vocabulary: Vocabulary,
    classifier: Arc<dyn IntentClassifier>,
    report: Option<TrainingReport>,
}

impl TrainedModel {
    pub fn new(vocabulary: Vocabulary, classifier: Arc<dyn IntentClassifier>) -> Self {
        Self {
            vocabulary,
            classifier,
            report: None,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    /// Vectorize `text` against this model's own vocabulary and classify it.
    pub fn classify(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let features = vectorize(text, &self.vocabulary);
        if features.len() != self.classifier.input_size() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.classifier.input_size(),
                got: features.len(),
            });
        }
        self.classifier.predict(&features)
    }
}

/// Build the vocabulary, augment the corpus, and fit a fresh network.
pub fn train_model(
    intents: &IntentSet,
    lexicon: &Lexicon,
    options: &TrainingOptions,
) -> Result<TrainedModel, TrainError> {
    let vocabulary = Vocabulary::build(intents, &lexicon.synonyms);
    let data = augment(intents, &vocabulary);
    let (classifier, report) = train(&data, options)?;

    Ok(TrainedModel {
        vocabulary,
        classifier: Arc::new(classifier),
        report: Some(report),
    })
}
