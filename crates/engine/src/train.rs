//! The train → evaluate → publish cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use digero_core::{normalize, CategoryLabel, EngineConfig, TrainingSample};
use digero_model::{
    accuracy, macro_f1, ConfusionMatrix, EvaluationReport, ModelArtifact, SoftmaxClassifier,
    TrainOptions, Vectorizer,
};
use digero_store::ModelStore;

use crate::engine::EngineError;

/// Outcome reported to whoever triggered a retrain, mirroring the shape
/// corrections get back. Metric fields are absent when nothing was
/// trained or no held-out slice could be formed.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub trained: bool,
    /// Samples used in the published fit.
    pub samples: usize,
    /// Known categories at the time of the run (the registry snapshot,
    /// not just the labels the classifier saw).
    pub labels: Vec<CategoryLabel>,
    pub accuracy: Option<f32>,
    pub macro_f1: Option<f32>,
    pub heldout_samples: usize,
    pub saved_to: Option<String>,
}

impl TrainingSummary {
    pub(crate) fn skipped(samples: usize, labels: Vec<CategoryLabel>) -> Self {
        TrainingSummary {
            trained: false,
            samples,
            labels,
            accuracy: None,
            macro_f1: None,
            heldout_samples: 0,
            saved_to: None,
        }
    }

    pub(crate) fn published(
        artifact: &ModelArtifact,
        labels: Vec<CategoryLabel>,
        saved_to: &Path,
    ) -> Self {
        TrainingSummary {
            trained: true,
            samples: artifact.evaluation.training_samples,
            labels,
            accuracy: artifact.evaluation.accuracy,
            macro_f1: artifact.evaluation.macro_f1,
            heldout_samples: artifact.evaluation.heldout_samples,
            saved_to: Some(saved_to.display().to_string()),
        }
    }
}

pub(crate) enum TrainOutcome {
    /// Preconditions unmet; nothing changed.
    Skipped { samples: usize },
    Published {
        artifact: Arc<ModelArtifact>,
        saved_to: PathBuf,
    },
}

/// Deterministic stratified split.
///
/// Per label, samples ordered by `recorded_at` (insertion order breaking
/// ties): the first `floor(n * train_fraction)`, clamped so both sides
/// are non-empty, go to training and the rest are held out. A label with a
/// single sample trains on it and contributes nothing to the held-out
/// slice.
pub(crate) fn stratified_split(
    samples: &[TrainingSample],
    train_fraction: f32,
) -> (Vec<usize>, Vec<usize>) {
    let mut groups: Vec<(&CategoryLabel, Vec<usize>)> = Vec::new();
    for (idx, sample) in samples.iter().enumerate() {
        match groups.iter_mut().find(|(label, _)| *label == &sample.label) {
            Some((_, indices)) => indices.push(idx),
            None => groups.push((&sample.label, vec![idx])),
        }
    }

    let mut train = Vec::new();
    let mut heldout = Vec::new();
    for (_, mut indices) in groups {
        indices.sort_by_key(|&i| samples[i].recorded_at);
        let n = indices.len();
        if n < 2 {
            train.extend(indices);
            continue;
        }
        let cut = ((n as f32 * train_fraction).floor() as usize).clamp(1, n - 1);
        train.extend_from_slice(&indices[..cut]);
        heldout.extend_from_slice(&indices[cut..]);
    }
    (train, heldout)
}

fn train_options(config: &EngineConfig) -> TrainOptions {
    TrainOptions {
        epochs: config.epochs,
        learning_rate: config.learning_rate,
        l2: config.l2,
        batch_size: config.batch_size,
        seed: config.seed,
        balance_classes: config.balance_classes,
    }
}

/// One full training cycle: precondition check, stratified fit, held-out
/// evaluation, full-corpus refit, atomic publish.
///
/// Evaluation is informational: the artifact is published even when its
/// metrics are poor. The published classifier is refit on the entire
/// corpus so the held-out samples are not wasted on the final model.
pub(crate) async fn run_cycle(
    samples: &[TrainingSample],
    config: &EngineConfig,
    model_store: &ModelStore,
) -> Result<TrainOutcome, EngineError> {
    if samples.len() < config.min_training_samples {
        return Ok(TrainOutcome::Skipped {
            samples: samples.len(),
        });
    }

    // Class indices in first-appearance order keeps runs reproducible.
    let mut classes: Vec<CategoryLabel> = Vec::new();
    let y: Vec<usize> = samples
        .iter()
        .map(|s| match classes.iter().position(|c| c == &s.label) {
            Some(i) => i,
            None => {
                classes.push(s.label.clone());
                classes.len() - 1
            }
        })
        .collect();
    let docs: Vec<Vec<String>> = samples.iter().map(|s| normalize(&s.description)).collect();
    let options = train_options(config);

    let (train_idx, heldout_idx) = stratified_split(samples, config.train_fraction);
    let (acc, mf1) = if heldout_idx.is_empty() {
        (None, None)
    } else {
        let train_docs: Vec<Vec<String>> = train_idx.iter().map(|&i| docs[i].clone()).collect();
        let y_train: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
        let eval_vectorizer = Vectorizer::fit(&train_docs, config.max_vocabulary);
        let x_train: Vec<Vec<f32>> = train_docs.iter().map(|d| eval_vectorizer.apply(d)).collect();
        let eval_classifier =
            SoftmaxClassifier::fit(&x_train, &y_train, classes.len(), &options)?;

        let mut cm = ConfusionMatrix::new(classes.len());
        for &i in &heldout_idx {
            let vector = eval_vectorizer.apply(&docs[i]);
            let (predicted, _) = eval_classifier.predict(&vector);
            cm.add(y[i], predicted);
        }
        (Some(accuracy(&cm)), macro_f1(&cm))
    };

    let vectorizer = Vectorizer::fit(&docs, config.max_vocabulary);
    let x_full: Vec<Vec<f32>> = docs.iter().map(|d| vectorizer.apply(d)).collect();
    let classifier = SoftmaxClassifier::fit(&x_full, &y, classes.len(), &options)?;

    let version = model_store.latest_version().await?.unwrap_or(0) + 1;
    let artifact = ModelArtifact {
        version,
        vectorizer,
        classifier,
        labels: classes.clone(),
        trained_at: Utc::now(),
        evaluation: EvaluationReport {
            training_samples: samples.len(),
            heldout_samples: heldout_idx.len(),
            accuracy: acc,
            macro_f1: mf1,
            labels: classes,
        },
    };
    let saved_to = model_store.publish(&artifact).await?;
    if let Err(e) = model_store.prune(config.keep_artifacts).await {
        tracing::warn!("Failed to prune old model artifacts: {e}");
    }

    tracing::info!(
        version,
        samples = artifact.evaluation.training_samples,
        heldout = artifact.evaluation.heldout_samples,
        "Published model artifact"
    );

    Ok(TrainOutcome::Published {
        artifact: Arc::new(artifact),
        saved_to,
    })
}
