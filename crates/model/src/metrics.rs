//! Held-out evaluation metrics.

use serde::{Deserialize, Serialize};

/// Confusion matrix for a `K`-class classifier, row-major
/// (`truth * K + predicted`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub n_classes: usize,
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Precision/recall/F1 for a single class.
#[derive(Debug, Clone)]
pub struct PerClassStats {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    /// Number of held-out examples whose true class this is.
    pub support: u32,
}

pub fn per_class_stats(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        stats.push(PerClassStats {
            precision,
            recall,
            f1,
            support,
        });
    }
    stats
}

/// Fraction of held-out examples predicted exactly right.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let mut correct = 0u64;
    let mut total = 0u64;
    for truth in 0..cm.n_classes {
        for predicted in 0..cm.n_classes {
            let v = cm.get(truth, predicted) as u64;
            total += v;
            if truth == predicted {
                correct += v;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        correct as f32 / total as f32
    }
}

/// Unweighted mean of per-class F1.
///
/// Classes with no held-out examples are left out of the average
/// entirely: they neither score 0 nor dilute the denominator. Returns
/// `None` when no class has any held-out support.
pub fn macro_f1(cm: &ConfusionMatrix) -> Option<f32> {
    let scored: Vec<f32> = per_class_stats(cm)
        .iter()
        .filter(|s| s.support > 0)
        .map(|s| s.f1)
        .collect();
    if scored.is_empty() {
        return None;
    }
    Some(scored.iter().sum::<f32>() / scored.len() as f32)
}
