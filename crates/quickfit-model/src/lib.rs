//! Tabular random-forest fitting, evaluation, and persistence.
//!
//! Wraps `smartcore`'s random-forest classifier and regressor behind a
//! task-typed [`TrainedModel`], with typed [`Hyperparameters`], weighted
//! classification and regression metrics, permutation feature importance,
//! a seeded train/test split, and versioned bincode model files.

mod data;
mod error;
mod importance;
mod metrics;
mod model;
mod params;
mod serialize;
mod split;
mod task;

pub use data::{FeatureMatrix, Target};
pub use error::ModelError;
pub use importance::{FeatureImportance, DEFAULT_IMPORTANCE_REPEATS};
pub use metrics::{ClassMetrics, ClassificationScores, ConfusionMatrix, RegressionScores, Scores};
pub use model::TrainedModel;
pub use params::Hyperparameters;
pub use split::{SplitIndices, TrainTestSplit};
pub use task::{TaskType, CLASSIFICATION_MAX_DISTINCT};
