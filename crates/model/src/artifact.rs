use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use digero_core::CategoryLabel;

use crate::classifier::SoftmaxClassifier;
use crate::vectorizer::Vectorizer;

/// Metrics attached to an artifact at publish time. Informational: a
/// model is published regardless of how it scored, and the caller judges
/// whether to keep trusting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub training_samples: usize,
    pub heldout_samples: usize,
    /// `None` when no held-out slice could be formed.
    pub accuracy: Option<f32>,
    pub macro_f1: Option<f32>,
    pub labels: Vec<CategoryLabel>,
}

/// One immutable trained model version: frozen vocabulary, classifier
/// parameters, the label set snapshot they were trained against, and the
/// evaluation that accompanied the publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u64,
    pub vectorizer: Vectorizer,
    pub classifier: SoftmaxClassifier,
    /// Classifier class index → category label.
    pub labels: Vec<CategoryLabel>,
    pub trained_at: DateTime<Utc>,
    pub evaluation: EvaluationReport,
}

impl ModelArtifact {
    /// Predict from an already-normalised token sequence. Total: the
    /// worst case is the training set's most frequent label at its prior
    /// frequency.
    pub fn predict_tokens(&self, tokens: &[String]) -> (CategoryLabel, f32) {
        let vector = self.vectorizer.apply(tokens);
        let (class_idx, confidence) = self.classifier.predict(&vector);
        let label = self
            .labels
            .get(class_idx)
            .cloned()
            .unwrap_or_else(CategoryLabel::uncategorized);
        (label, confidence)
    }

    /// Consistency check for artifacts read back from disk. A mangled
    /// file must surface as a load error, never as an index panic at
    /// prediction time.
    pub fn validate(&self) -> Result<(), String> {
        self.classifier.validate()?;
        if self.labels.len() != self.classifier.n_classes {
            return Err(format!(
                "label set size {} does not match classifier classes {}",
                self.labels.len(),
                self.classifier.n_classes
            ));
        }
        if self.vectorizer.dimension() != self.classifier.dimension {
            return Err(format!(
                "vocabulary dimension {} does not match classifier dimension {}",
                self.vectorizer.dimension(),
                self.classifier.dimension
            ));
        }
        Ok(())
    }
}
