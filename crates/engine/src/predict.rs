//! The read path: description in, (label, confidence) out.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;

use digero_core::{normalize, CategoryLabel};

use crate::active::ActiveModel;
use crate::rules::KeywordRuleEngine;

/// Where an answer came from, most authoritative first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// The user corrected this exact (normalised) description before.
    Override,
    /// The active model answered at or above the confidence threshold.
    Model,
    /// A keyword rule matched.
    Rules,
    /// Nothing applied; the universal fallback.
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: CategoryLabel,
    pub confidence: f32,
    pub source: PredictionSource,
}

/// A collaborator-owned transaction, as seen at this boundary.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub id: i64,
    pub description: String,
    pub label: Option<CategoryLabel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryChange {
    pub id: i64,
    pub label: CategoryLabel,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecategorizeSummary {
    /// Transactions whose label would change.
    pub updated: usize,
    /// Transactions considered.
    pub total: usize,
    /// The changed assignments, for the caller to persist.
    pub changes: Vec<CategoryChange>,
}

/// Answers predictions against whatever model is currently active.
///
/// Every path is total: the worst possible answer is
/// `("Uncategorized", 0.0)`, never an error. Reads never block on
/// training: the active-model handle is the only shared state and is
/// touched just long enough to clone an `Arc`.
pub struct PredictionService {
    active: ActiveModel,
    rules: KeywordRuleEngine,
    overrides: RwLock<HashMap<String, CategoryLabel>>,
    confidence_threshold: f32,
}

impl PredictionService {
    pub fn new(
        active: ActiveModel,
        rules: KeywordRuleEngine,
        overrides: HashMap<String, CategoryLabel>,
        confidence_threshold: f32,
    ) -> Self {
        Self {
            active,
            rules,
            overrides: RwLock::new(overrides),
            confidence_threshold,
        }
    }

    pub fn active(&self) -> &ActiveModel {
        &self.active
    }

    /// Override → model → keyword rules → `Uncategorized`.
    pub fn predict(&self, description: &str) -> Prediction {
        let tokens = normalize(description);
        let key = tokens.join(" ");

        if !key.is_empty() {
            let overrides = match self.overrides.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(label) = overrides.get(&key) {
                return Prediction {
                    label: label.clone(),
                    confidence: 1.0,
                    source: PredictionSource::Override,
                };
            }
        }

        if let Some(artifact) = self.active.current() {
            let (label, confidence) = artifact.predict_tokens(&tokens);
            if confidence >= self.confidence_threshold {
                return Prediction {
                    label,
                    confidence,
                    source: PredictionSource::Model,
                };
            }
        }

        if let Some(category) = self.rules.find_category(description) {
            return Prediction {
                label: CategoryLabel::new(category),
                confidence: 0.0,
                source: PredictionSource::Rules,
            };
        }

        Prediction {
            label: CategoryLabel::uncategorized(),
            confidence: 0.0,
            source: PredictionSource::Fallback,
        }
    }

    /// Re-run prediction over a batch of stored transactions and report
    /// which would change. An unlabeled transaction that predicts as
    /// `Uncategorized` is not counted as a change.
    pub fn bulk_recategorize(&self, records: &[TransactionRecord]) -> RecategorizeSummary {
        let mut changes = Vec::new();
        for record in records {
            let prediction = self.predict(&record.description);
            let changed = match &record.label {
                Some(current) => *current != prediction.label,
                None => !prediction.label.is_uncategorized(),
            };
            if changed {
                changes.push(CategoryChange {
                    id: record.id,
                    label: prediction.label,
                    confidence: prediction.confidence,
                });
            }
        }
        RecategorizeSummary {
            updated: changes.len(),
            total: records.len(),
            changes,
        }
    }

    /// Pin a normalised description to a corrected label. Returns a
    /// snapshot of the whole map for persistence.
    pub(crate) fn record_override(
        &self,
        key: String,
        label: CategoryLabel,
    ) -> HashMap<String, CategoryLabel> {
        let mut overrides = match self.overrides.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        overrides.insert(key, label);
        overrides.clone()
    }
}
