pub mod artifacts;
pub mod db;
pub mod overrides;

pub use artifacts::{ModelStore, StoreError};
pub use db::{
    append_training_sample, count_training_samples, create_db, create_db_in_memory,
    get_training_samples, DbPool,
};
pub use overrides::{load_overrides, save_overrides};
