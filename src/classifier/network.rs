//! Feed-forward intent network on candle
//!
//! Dense(|V| -> 128, ReLU) -> Dropout -> Dense(128 -> 64, ReLU) -> Dense(64 -> |I|),
//! trained with Adam on categorical cross-entropy. Softmax is applied at inference.

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{linear, loss, ops, AdamW, Dropout, Linear, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::time::Instant;

use super::{ClassifierError, IntentClassifier, Prediction, TrainError, TrainingSet};
use crate::config::ChatbotConfig;
use crate::nlp::FeatureVector;

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Fraction of shuffled samples held out for validation metrics.
    pub validation_split: f32,
    pub dropout: f32,
    pub hidden_units: (usize, usize),
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 16,
            learning_rate: 0.001,
            validation_split: 0.1,
            dropout: 0.2,
            hidden_units: (128, 64),
        }
    }
}

impl TrainingOptions {
    pub fn from_config(config: &ChatbotConfig) -> Self {
        Self {
            epochs: config.train_epochs.max(1),
            batch_size: config.train_batch_size.max(1),
            learning_rate: config.train_learning_rate,
            validation_split: config.train_validation_split.clamp(0.0, 0.5),
            dropout: config.train_dropout.clamp(0.0, 0.9),
            ..Self::default()
        }
    }
}

/// Summary of a finished training run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    pub samples: usize,
    pub validation_samples: usize,
    pub epochs: usize,
    pub final_loss: f32,
    pub train_accuracy: f32,
    pub validation_accuracy: Option<f32>,
    pub elapsed_ms: u128,
}

struct FeedForward {
    hidden: Linear,
    dropout: Dropout,
    projection: Linear,
    output: Linear,
}

impl FeedForward {
    fn new(
        vb: VarBuilder,
        input: usize,
        hidden: (usize, usize),
        output: usize,
        dropout: f32,
    ) -> candle_core::Result<Self> {
        Ok(Self {
            hidden: linear(input, hidden.0, vb.pp("hidden"))?,
            dropout: Dropout::new(dropout),
            projection: linear(hidden.0, hidden.1, vb.pp("projection"))?,
            output: linear(hidden.1, output, vb.pp("output"))?,
        })
    }

    /// Raw logits. Dropout is active only while training.
    fn forward(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let xs = self.hidden.forward(xs)?.relu()?;
        let xs = self.dropout.forward(&xs, train)?;
        let xs = self.projection.forward(&xs)?.relu()?;
        self.output.forward(&xs)
    }
}

/// Trained network. Inference only; weights are frozen after `train` returns.
pub struct FeedForwardClassifier {
    net: FeedForward,
    device: Device,
    input_size: usize,
    output_size: usize,
}

impl IntentClassifier for FeedForwardClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        if features.len() != self.input_size {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.input_size,
                got: features.len(),
            });
        }

        let xs = Tensor::from_vec(features.to_f32(), (1, self.input_size), &self.device)?;
        let logits = self.net.forward(&xs, false)?;
        let probs = ops::softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()?;
        Ok(Prediction::new(probs))
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }
}

/// Fit a fresh network to `data`. One-shot; every call starts from random weights.
pub fn train(
    data: &TrainingSet,
    options: &TrainingOptions,
) -> Result<(FeedForwardClassifier, TrainingReport), TrainError> {
    if data.input_size == 0 || data.is_empty() {
        return Err(TrainError::EmptyVocabulary);
    }

    let started = Instant::now();
    let device = Device::Cpu;
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let net = FeedForward::new(
        vb,
        data.input_size,
        options.hidden_units,
        data.classes,
        options.dropout,
    )?;

    let xs = Tensor::from_slice(&data.features, (data.len(), data.input_size), &device)?;
    let ys = Tensor::from_slice(&data.labels, data.len(), &device)?;

    let mut rng = rand::rng();
    let mut order: Vec<u32> = (0..data.len() as u32).collect();
    order.shuffle(&mut rng);

    let held_out = ((data.len() as f32) * options.validation_split).floor() as usize;
    let held_out = held_out.min(data.len().saturating_sub(1));
    let (mut train_idx, valid_idx) = {
        let (t, v) = order.split_at(data.len() - held_out);
        (t.to_vec(), v.to_vec())
    };

    let params = ParamsAdamW {
        lr: options.learning_rate,
        weight_decay: 0.0,
        ..Default::default()
    };
    let mut optimizer = AdamW::new(varmap.all_vars(), params)?;

    let mut final_loss = f32::NAN;
    for epoch in 1..=options.epochs {
        train_idx.shuffle(&mut rng);

        let mut epoch_loss = 0.0f32;
        let mut batches = 0usize;
        for batch in train_idx.chunks(options.batch_size) {
            let ids = Tensor::from_slice(batch, batch.len(), &device)?;
            let bx = xs.index_select(&ids, 0)?;
            let by = ys.index_select(&ids, 0)?;

            let logits = net.forward(&bx, true)?;
            let batch_loss = loss::cross_entropy(&logits, &by)?;
            optimizer.backward_step(&batch_loss)?;

            epoch_loss += batch_loss.to_scalar::<f32>()?;
            batches += 1;
        }

        final_loss = epoch_loss / batches.max(1) as f32;
        if !final_loss.is_finite() {
            return Err(TrainError::Diverged(epoch));
        }
        tracing::debug!(epoch, loss = final_loss, "training epoch finished");
    }

    let train_accuracy = accuracy(&net, &xs, &ys, &train_idx, &device)?;
    let validation_accuracy = if valid_idx.is_empty() {
        None
    } else {
        Some(accuracy(&net, &xs, &ys, &valid_idx, &device)?)
    };

    let report = TrainingReport {
        samples: train_idx.len(),
        validation_samples: valid_idx.len(),
        epochs: options.epochs,
        final_loss,
        train_accuracy,
        validation_accuracy,
        elapsed_ms: started.elapsed().as_millis(),
    };

    let classifier = FeedForwardClassifier {
        net,
        device,
        input_size: data.input_size,
        output_size: data.classes,
    };

    Ok((classifier, report))
}

fn accuracy(
    net: &FeedForward,
    xs: &Tensor,
    ys: &Tensor,
    idx: &[u32],
    device: &Device,
) -> candle_core::Result<f32> {
    let ids = Tensor::from_slice(idx, idx.len(), device)?;
    let logits = net.forward(&xs.index_select(&ids, 0)?, false)?;
    let predicted = logits.argmax(D::Minus1)?;
    let correct = predicted
        .eq(&ys.index_select(&ids, 0)?)?
        .to_dtype(DType::F32)?
        .sum_all()?
        .to_scalar::<f32>()?;
    Ok(correct / idx.len() as f32)
}
