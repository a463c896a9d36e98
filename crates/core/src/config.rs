use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine tuning knobs, all overridable from a TOML file.
///
/// The defaults favour responsiveness on small personal datasets: retrain
/// on every correction, trust the model whenever it answers at all
/// (`confidence_threshold = 0.0`). Deployments with heavy correction
/// volume can raise `retrain_min_new_samples` to debounce retraining.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model predictions below this probability fall through to the
    /// keyword rules and then to `Uncategorized`.
    pub confidence_threshold: f32,
    /// Fewer total samples than this skips training entirely.
    pub min_training_samples: usize,
    /// Per-label share of samples used for fitting; the rest is held out
    /// for evaluation.
    pub train_fraction: f32,
    /// Vocabulary cap for the vectorizer.
    pub max_vocabulary: usize,
    /// Corrections accumulated since the last publish before an
    /// incremental retrain is attempted.
    pub retrain_min_new_samples: usize,
    /// Artifact versions retained on disk after a publish.
    pub keep_artifacts: usize,
    // Classifier hyperparameters.
    pub epochs: usize,
    pub learning_rate: f32,
    pub l2: f32,
    pub batch_size: usize,
    pub seed: u64,
    pub balance_classes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            confidence_threshold: 0.0,
            min_training_samples: 2,
            train_fraction: 0.8,
            max_vocabulary: 4096,
            retrain_min_new_samples: 1,
            keep_artifacts: 3,
            epochs: 120,
            learning_rate: 0.5,
            l2: 1e-4,
            batch_size: 32,
            seed: 42,
            balance_classes: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_retrain_on_every_correction() {
        let config = EngineConfig::default();
        assert_eq!(config.retrain_min_new_samples, 1);
        assert_eq!(config.confidence_threshold, 0.0);
        assert_eq!(config.min_training_samples, 2);
    }

    #[test]
    fn toml_overrides_subset_of_fields() {
        let config = EngineConfig::from_toml(
            "confidence_threshold = 0.58\nretrain_min_new_samples = 25\n",
        )
        .unwrap();
        assert_eq!(config.confidence_threshold, 0.58);
        assert_eq!(config.retrain_min_new_samples, 25);
        // Untouched fields keep their defaults.
        assert_eq!(config.train_fraction, 0.8);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(EngineConfig::from_toml("confidence_threshold = [").is_err());
    }
}
