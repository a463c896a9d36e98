//! Multinomial logistic-regression classifier over TF-IDF vectors.

use rand::rngs::StdRng;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TrainError {
    #[error("Empty training set")]
    EmptySet,
    #[error("Mismatched training inputs ({vectors}) and labels ({labels})")]
    Mismatched { vectors: usize, labels: usize },
    #[error("No classes available for training")]
    NoClasses,
    #[error("Inconsistent feature row length (expected {expected}, got {got})")]
    InconsistentRows { expected: usize, got: usize },
}

/// Hyperparameters for the seeded mini-batch SGD fit.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f32,
    pub l2: f32,
    pub batch_size: usize,
    pub seed: u64,
    pub balance_classes: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 120,
            learning_rate: 0.5,
            l2: 1e-4,
            batch_size: 32,
            seed: 42,
            balance_classes: true,
        }
    }
}

/// Softmax with the usual max-shift for numeric stability.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![1.0 / logits.len().max(1) as f32; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Trained softmax classifier: flat row-major weights plus per-class
/// bias and training-set prior frequencies.
///
/// Prediction is total. A vector the vocabulary recognised nothing of
/// (all zeros) is answered with the highest-prior class at its prior
/// frequency rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    pub n_classes: usize,
    pub dimension: usize,
    /// `n_classes * dimension`, class-major.
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
    /// Fraction of the training set carrying each class.
    pub priors: Vec<f32>,
}

impl SoftmaxClassifier {
    /// Fit by mini-batch gradient descent with L2 regularisation and
    /// optional inverse-frequency class weighting. Deterministic for a
    /// fixed seed.
    pub fn fit(
        x: &[Vec<f32>],
        y: &[usize],
        n_classes: usize,
        options: &TrainOptions,
    ) -> Result<Self, TrainError> {
        if x.is_empty() || y.is_empty() {
            return Err(TrainError::EmptySet);
        }
        if x.len() != y.len() {
            return Err(TrainError::Mismatched {
                vectors: x.len(),
                labels: y.len(),
            });
        }
        if n_classes == 0 {
            return Err(TrainError::NoClasses);
        }
        let dim = x[0].len();
        for row in x {
            if row.len() != dim {
                return Err(TrainError::InconsistentRows {
                    expected: dim,
                    got: row.len(),
                });
            }
        }

        let mut priors = vec![0.0f32; n_classes];
        for &label in y {
            if label < n_classes {
                priors[label] += 1.0;
            }
        }
        let total: f32 = priors.iter().sum();
        if total > 0.0 {
            for p in &mut priors {
                *p /= total;
            }
        }

        let class_weights: Vec<f32> = if options.balance_classes {
            priors
                .iter()
                .map(|&p| if p == 0.0 { 0.0 } else { 1.0 / (n_classes as f32 * p) })
                .collect()
        } else {
            vec![1.0; n_classes]
        };

        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut weights = vec![0.0f32; n_classes * dim];
        let mut bias = vec![0.0f32; n_classes];
        for w in &mut weights {
            *w = (rng.random::<f32>() - 0.5) * 0.01;
        }

        let mut indices: Vec<usize> = (0..x.len()).collect();
        let batch_size = options.batch_size.max(1);
        let lr = options.learning_rate;
        let l2 = options.l2.max(0.0);

        for _epoch in 0..options.epochs {
            indices.shuffle(&mut rng);
            for chunk in indices.chunks(batch_size) {
                let mut grad_w = vec![0.0f32; weights.len()];
                let mut grad_b = vec![0.0f32; bias.len()];
                let mut batch_weight = 0.0f32;
                for &idx in chunk {
                    let row = &x[idx];
                    let label = y[idx];
                    if label >= n_classes {
                        continue;
                    }
                    let weight = class_weights[label];
                    if weight == 0.0 {
                        continue;
                    }
                    let mut logits = vec![0.0f32; n_classes];
                    for c in 0..n_classes {
                        let base = c * dim;
                        let mut sum = bias[c];
                        for i in 0..dim {
                            sum += weights[base + i] * row[i];
                        }
                        logits[c] = sum;
                    }
                    let probs = softmax(&logits);
                    for c in 0..n_classes {
                        let diff = probs[c] - if c == label { 1.0 } else { 0.0 };
                        let base = c * dim;
                        for i in 0..dim {
                            grad_w[base + i] += diff * row[i] * weight;
                        }
                        grad_b[c] += diff * weight;
                    }
                    batch_weight += weight;
                }
                if batch_weight == 0.0 {
                    continue;
                }
                let inv = 1.0 / batch_weight;
                for c in 0..n_classes {
                    let base = c * dim;
                    for i in 0..dim {
                        let idx = base + i;
                        weights[idx] -= lr * (grad_w[idx] * inv + l2 * weights[idx]);
                    }
                    bias[c] -= lr * grad_b[c] * inv;
                }
            }
        }

        Ok(SoftmaxClassifier {
            n_classes,
            dimension: dim,
            weights,
            bias,
            priors,
        })
    }

    /// Class probabilities for a single vector.
    pub fn predict_proba(&self, vector: &[f32]) -> Vec<f32> {
        if vector.len() != self.dimension || self.n_classes == 0 {
            return self.priors.clone();
        }
        let mut logits = vec![0.0f32; self.n_classes];
        for c in 0..self.n_classes {
            let base = c * self.dimension;
            let mut sum = self.bias[c];
            for i in 0..self.dimension {
                sum += self.weights[base + i] * vector[i];
            }
            logits[c] = sum;
        }
        softmax(&logits)
    }

    /// Best class index and its confidence.
    ///
    /// An all-zero vector means nothing in the description was
    /// recognised; the answer is then the most frequent training class at
    /// its prior frequency.
    pub fn predict(&self, vector: &[f32]) -> (usize, f32) {
        if vector.iter().all(|&v| v == 0.0) {
            return argmax(&self.priors);
        }
        argmax(&self.predict_proba(vector))
    }

    /// Structural consistency check, used when loading from disk.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_classes == 0 {
            return Err("classifier has no classes".to_string());
        }
        if self.weights.len() != self.n_classes * self.dimension {
            return Err("weights length mismatch".to_string());
        }
        if self.bias.len() != self.n_classes {
            return Err("bias length mismatch".to_string());
        }
        if self.priors.len() != self.n_classes {
            return Err("priors length mismatch".to_string());
        }
        Ok(())
    }
}

fn argmax(values: &[f32]) -> (usize, f32) {
    let mut best = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = idx;
        }
    }
    (best, best_val.max(0.0))
}
