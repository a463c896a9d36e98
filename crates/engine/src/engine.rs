//! The categorization engine facade: one handle owning the read path,
//! the correction path, and the retrain lifecycle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use digero_core::{normalized_key, CategoryLabel, CategoryRegistry, EngineConfig};
use digero_model::TrainError;
use digero_store::{
    append_training_sample, count_training_samples, create_db, get_training_samples,
    load_overrides, save_overrides, DbPool, ModelStore, StoreError,
};

use crate::active::ActiveModel;
use crate::predict::{Prediction, PredictionService, RecategorizeSummary, TransactionRecord};
use crate::rules::KeywordRuleEngine;
use crate::train::{run_cycle, TrainOutcome, TrainingSummary};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Sample log error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Train(#[from] TrainError),
}

/// Snapshot of the engine's model state, for status endpoints and CLIs.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub trained: bool,
    pub version: Option<u64>,
    pub trained_at: Option<DateTime<Utc>>,
    /// Labels the active model can emit.
    pub model_labels: Vec<CategoryLabel>,
    /// Every category the registry knows, including ones newer than the
    /// active model.
    pub categories: Vec<CategoryLabel>,
}

struct EngineInner {
    config: EngineConfig,
    db: DbPool,
    model_store: ModelStore,
    predictor: PredictionService,
    active: ActiveModel,
    registry: RwLock<CategoryRegistry>,
    overrides_path: PathBuf,
    /// Serialises train cycles: one writer at a time, later triggers
    /// queue behind the lock instead of racing to publish.
    train_lock: tokio::sync::Mutex<()>,
    /// Corrections since the last successful publish.
    pending: AtomicUsize,
}

/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct CategorizationEngine {
    inner: Arc<EngineInner>,
}

impl CategorizationEngine {
    /// Open (or initialise) an engine rooted at `data_dir`.
    ///
    /// Layout: `samples.db` (correction log), `models/` (versioned
    /// artifacts), `overrides.json`, optional `rules.toml` replacing the
    /// stock keyword table. A missing or corrupt latest artifact leaves
    /// the engine in no-model mode (fallback-only predictions) rather
    /// than failing the open.
    pub async fn open(data_dir: &Path, config: EngineConfig) -> Result<Self, EngineError> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db = create_db(&data_dir.join("samples.db")).await?;
        let model_store = ModelStore::new(data_dir.join("models"));
        let overrides_path = data_dir.join("overrides.json");
        let overrides = load_overrides(&overrides_path).await?;

        let rules = match tokio::fs::read_to_string(data_dir.join("rules.toml")).await {
            Ok(content) => KeywordRuleEngine::from_toml(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unparseable rules.toml: {e}");
                KeywordRuleEngine::stock()
            }),
            Err(_) => KeywordRuleEngine::stock(),
        };

        let active = ActiveModel::empty();
        match model_store.load_latest().await {
            Ok(artifact) => active.swap(Arc::new(artifact)),
            Err(StoreError::NotFound(_)) => {}
            Err(e) => {
                tracing::warn!("Could not load latest model, serving fallback only: {e}");
            }
        }

        let mut registry = CategoryRegistry::with_defaults();
        if let Some(artifact) = active.current() {
            for label in &artifact.labels {
                registry.ensure(label.as_str());
            }
        }
        for sample in get_training_samples(&db).await? {
            registry.ensure(sample.label.as_str());
        }

        let predictor = PredictionService::new(
            active.clone(),
            rules,
            overrides,
            config.confidence_threshold,
        );

        Ok(CategorizationEngine {
            inner: Arc::new(EngineInner {
                config,
                db,
                model_store,
                predictor,
                active,
                registry: RwLock::new(registry),
                overrides_path,
                train_lock: tokio::sync::Mutex::new(()),
                pending: AtomicUsize::new(0),
            }),
        })
    }

    /// Categorise a description against the currently active model.
    /// Never blocks on training and never fails.
    pub fn predict(&self, description: &str) -> Prediction {
        self.inner.predictor.predict(description)
    }

    /// Record a user correction and, when due, retrain.
    ///
    /// The correction is durably appended (and its override pinned)
    /// before any training is attempted; a skipped or failed retrain
    /// never rolls it back.
    pub async fn record_correction(
        &self,
        description: &str,
        label: &str,
    ) -> Result<TrainingSummary, EngineError> {
        let canonical = self.ensure_label(label);
        append_training_sample(&self.inner.db, description, &canonical).await?;

        let key = normalized_key(description);
        if !key.is_empty() {
            let snapshot = self.inner.predictor.record_override(key, canonical);
            if let Err(e) = save_overrides(&self.inner.overrides_path, &snapshot).await {
                tracing::warn!("Failed to persist description overrides: {e}");
            }
        }

        let pending = self.inner.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if pending < self.inner.config.retrain_min_new_samples {
            let samples = count_training_samples(&self.inner.db).await?;
            return Ok(TrainingSummary::skipped(
                samples as usize,
                self.categories(),
            ));
        }

        self.train_cycle().await
    }

    /// Operator-requested retrain from the whole correction log,
    /// ignoring the debounce.
    pub async fn retrain(&self) -> Result<TrainingSummary, EngineError> {
        self.train_cycle().await
    }

    /// Retrain on a background task; corrections and predictions proceed
    /// while it runs, and the summary arrives when it completes.
    pub fn spawn_retrain(&self) -> tokio::task::JoinHandle<Result<TrainingSummary, EngineError>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.retrain().await })
    }

    /// Re-run prediction for a batch of stored transactions.
    pub fn bulk_recategorize(&self, records: &[TransactionRecord]) -> RecategorizeSummary {
        self.inner.predictor.bulk_recategorize(records)
    }

    pub fn status(&self) -> EngineStatus {
        let artifact = self.inner.active.current();
        EngineStatus {
            trained: artifact.is_some(),
            version: artifact.as_ref().map(|a| a.version),
            trained_at: artifact.as_ref().map(|a| a.trained_at),
            model_labels: artifact.map(|a| a.labels.clone()).unwrap_or_default(),
            categories: self.categories(),
        }
    }

    /// All known categories, including ones the active model predates.
    pub fn categories(&self) -> Vec<CategoryLabel> {
        match self.inner.registry.read() {
            Ok(guard) => guard.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }

    /// The shared active-model handle (one slot per engine instance).
    pub fn active_model(&self) -> &ActiveModel {
        &self.inner.active
    }

    fn ensure_label(&self, label: &str) -> CategoryLabel {
        match self.inner.registry.write() {
            Ok(mut guard) => guard.ensure(label),
            Err(poisoned) => poisoned.into_inner().ensure(label),
        }
    }

    async fn train_cycle(&self) -> Result<TrainingSummary, EngineError> {
        let _guard = self.inner.train_lock.lock().await;
        let samples = get_training_samples(&self.inner.db).await?;
        let labels = self.categories();
        match run_cycle(&samples, &self.inner.config, &self.inner.model_store).await? {
            TrainOutcome::Skipped { samples } => Ok(TrainingSummary::skipped(samples, labels)),
            TrainOutcome::Published { artifact, saved_to } => {
                self.inner.active.swap(artifact.clone());
                self.inner.pending.store(0, Ordering::SeqCst);
                Ok(TrainingSummary::published(&artifact, labels, &saved_to))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::PredictionSource;

    async fn engine_in(dir: &Path) -> CategorizationEngine {
        CategorizationEngine::open(dir, EngineConfig::default())
            .await
            .unwrap()
    }

    fn contains_label(labels: &[CategoryLabel], name: &str) -> bool {
        labels.iter().any(|l| l.as_str() == name)
    }

    #[tokio::test]
    async fn cold_start_predicts_uncategorized() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path()).await;
        let prediction = engine.predict("anything at all 123");
        assert!(prediction.label.is_uncategorized());
        assert_eq!(prediction.confidence, 0.0);
        assert!(!engine.status().trained);
    }

    #[tokio::test]
    async fn first_correction_is_recorded_but_skips_training() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path()).await;
        let summary = engine
            .record_correction("grocery mart #4", "Groceries")
            .await
            .unwrap();
        assert!(!summary.trained);
        assert_eq!(summary.samples, 1);
        assert!(summary.accuracy.is_none());
        assert!(summary.saved_to.is_none());
        // The correction itself still sticks.
        assert!(contains_label(&engine.categories(), "Groceries"));
        let prediction = engine.predict("grocery mart #4");
        assert_eq!(prediction.label.as_str(), "Groceries");
        assert_eq!(prediction.source, PredictionSource::Override);
    }

    #[tokio::test]
    async fn three_corrections_train_and_generalise() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path()).await;
        engine
            .record_correction("grocery mart #4", "Groceries")
            .await
            .unwrap();
        engine
            .record_correction("grocery mart #9", "Groceries")
            .await
            .unwrap();
        let summary = engine
            .record_correction("taxi ride", "Transportation")
            .await
            .unwrap();

        assert!(summary.trained);
        assert_eq!(summary.samples, 3);
        assert!(contains_label(&summary.labels, "Groceries"));
        assert!(contains_label(&summary.labels, "Transportation"));
        assert!(contains_label(&summary.labels, "Uncategorized"));
        assert!(summary.saved_to.is_some());

        let prediction = engine.predict("grocery mart #12");
        assert_eq!(prediction.label.as_str(), "Groceries");
        assert!(prediction.confidence > 0.5);
    }

    #[tokio::test]
    async fn model_generalises_beyond_exact_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path()).await;
        engine
            .record_correction("grocery mart #4", "Groceries")
            .await
            .unwrap();
        engine
            .record_correction("grocery store #9", "Groceries")
            .await
            .unwrap();
        engine
            .record_correction("taxi ride", "Transportation")
            .await
            .unwrap();

        // Distinct normalised key, so the override map cannot answer.
        let prediction = engine.predict("grocery outlet mart");
        assert_eq!(prediction.source, PredictionSource::Model);
        assert_eq!(prediction.label.as_str(), "Groceries");
        assert!(prediction.confidence > 0.5);
    }

    #[tokio::test]
    async fn debounce_defers_training_until_enough_new_samples() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            retrain_min_new_samples: 3,
            ..EngineConfig::default()
        };
        let engine = CategorizationEngine::open(dir.path(), config).await.unwrap();

        let s1 = engine.record_correction("grocery mart #4", "Groceries").await.unwrap();
        let s2 = engine.record_correction("grocery mart #9", "Groceries").await.unwrap();
        assert!(!s1.trained);
        assert!(!s2.trained);
        assert!(!engine.status().trained);

        let s3 = engine.record_correction("taxi ride", "Transportation").await.unwrap();
        assert!(s3.trained);
        assert_eq!(s3.samples, 3);
    }

    #[tokio::test]
    async fn bulk_retrain_ignores_debounce() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            retrain_min_new_samples: 100,
            ..EngineConfig::default()
        };
        let engine = CategorizationEngine::open(dir.path(), config).await.unwrap();
        engine.record_correction("grocery mart #4", "Groceries").await.unwrap();
        engine.record_correction("taxi ride", "Transportation").await.unwrap();
        assert!(!engine.status().trained);

        let summary = engine.retrain().await.unwrap();
        assert!(summary.trained);
        assert_eq!(summary.samples, 2);
        assert_eq!(engine.status().version, Some(1));
    }

    #[tokio::test]
    async fn bulk_recategorize_reports_changed_counts() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path()).await;
        engine.record_correction("grocery mart #4", "Groceries").await.unwrap();
        engine.record_correction("grocery mart #9", "Groceries").await.unwrap();
        engine.record_correction("taxi ride", "Transportation").await.unwrap();

        let mut records = Vec::new();
        for id in 0..3 {
            records.push(TransactionRecord {
                id,
                description: format!("GROCERY MART #{}", 100 + id),
                label: Some(CategoryLabel::uncategorized()),
            });
        }
        for id in 3..10 {
            records.push(TransactionRecord {
                id,
                description: "taxi ride".to_string(),
                label: Some(CategoryLabel::new("Transportation")),
            });
        }
        let summary = engine.bulk_recategorize(&records);
        assert_eq!(summary.total, 10);
        assert_eq!(summary.updated, 3);
    }

    #[tokio::test]
    async fn reopened_engine_restores_the_published_model() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = engine_in(dir.path()).await;
            engine.record_correction("grocery mart #4", "Groceries").await.unwrap();
            engine.record_correction("grocery mart #9", "Groceries").await.unwrap();
            engine.record_correction("taxi ride", "Transportation").await.unwrap();
            assert!(engine.status().trained);
        }

        let engine = engine_in(dir.path()).await;
        let status = engine.status();
        assert!(status.trained);
        assert!(status.version.is_some());
        let prediction = engine.predict("grocery mart #12");
        assert_eq!(prediction.label.as_str(), "Groceries");
    }

    #[tokio::test]
    async fn corrupt_artifact_degrades_to_fallback_mode() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        tokio::fs::create_dir_all(&models).await.unwrap();
        tokio::fs::write(models.join("model-v1.json"), b"not a model")
            .await
            .unwrap();

        let engine = engine_in(dir.path()).await;
        assert!(!engine.status().trained);
        let prediction = engine.predict("some merchant 42");
        assert!(prediction.label.is_uncategorized());
        assert_eq!(prediction.confidence, 0.0);
    }

    #[tokio::test]
    async fn correction_with_new_label_registers_it() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path()).await;
        assert!(!contains_label(&engine.categories(), "Pet Care"));
        engine.record_correction("vet clinic visit", "Pet Care").await.unwrap();
        assert!(contains_label(&engine.categories(), "Pet Care"));
        // Case variant resolves to the same canonical label.
        engine.record_correction("another vet bill", "pet care").await.unwrap();
        let categories = engine.categories();
        assert_eq!(
            categories.iter().filter(|l| l.as_str().eq_ignore_ascii_case("pet care")).count(),
            1
        );
    }

    #[tokio::test]
    async fn background_retrain_publishes_without_blocking_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_in(dir.path()).await;
        engine.record_correction("grocery mart #4", "Groceries").await.unwrap();
        engine.record_correction("taxi ride", "Transportation").await.unwrap();

        let handle = engine.spawn_retrain();
        // Predictions keep working while training runs.
        let _ = engine.predict("grocery mart #4");
        let summary = handle.await.unwrap().unwrap();
        assert!(summary.trained);
        assert!(engine.status().trained);
    }
}
