pub mod artifact;
pub mod classifier;
pub mod metrics;
pub mod vectorizer;

pub use artifact::{EvaluationReport, ModelArtifact};
pub use classifier::{softmax, SoftmaxClassifier, TrainError, TrainOptions};
pub use metrics::{accuracy, macro_f1, per_class_stats, ConfusionMatrix, PerClassStats};
pub use vectorizer::Vectorizer;
