pub mod active;
pub mod engine;
pub mod predict;
pub mod rules;
pub mod train;

pub use active::ActiveModel;
pub use engine::{CategorizationEngine, EngineError, EngineStatus};
pub use predict::{
    CategoryChange, Prediction, PredictionService, PredictionSource, RecategorizeSummary,
    TransactionRecord,
};
pub use rules::{FallbackRule, KeywordRuleEngine, RuleMatchType};
pub use train::TrainingSummary;
