pub mod category;
pub mod config;
pub mod sample;
pub mod text;

pub use category::{CategoryLabel, CategoryRegistry, DEFAULT_CATEGORIES, UNCATEGORIZED};
pub use config::{ConfigError, EngineConfig};
pub use sample::TrainingSample;
pub use text::{normalize, normalized_key};
