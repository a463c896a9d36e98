use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::CategoryLabel;

/// A single (description, label) correction, the unit of ground truth.
///
/// Immutable once recorded. Repeated corrections for the same description
/// are kept as distinct samples on purpose: repetition raises that
/// example's effective weight in later training runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSample {
    pub description: String,
    pub label: CategoryLabel,
    pub recorded_at: DateTime<Utc>,
}

impl TrainingSample {
    pub fn new(description: &str, label: CategoryLabel) -> Self {
        TrainingSample {
            description: description.to_string(),
            label,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_keeps_description_verbatim() {
        let sample = TrainingSample::new("Grocery Mart #4", CategoryLabel::new("Groceries"));
        assert_eq!(sample.description, "Grocery Mart #4");
        assert_eq!(sample.label.as_str(), "Groceries");
    }
}
