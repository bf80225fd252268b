use std::path::PathBuf;

use crate::task::TaskType;

/// Errors from model configuration, fitting, evaluation, and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when a task type string is not one of the known tags.
    #[error("unknown task type \"{value}\" (expected classification, regression, or clustering)")]
    UnknownTaskType {
        /// The unrecognized input.
        value: String,
    },

    /// Returned when fitting is requested for a task no model supports.
    #[error("unsupported task type: {task}")]
    UnsupportedTask {
        /// The requested task type.
        task: TaskType,
    },

    /// Returned when a hyperparameter name is not recognized.
    #[error("unrecognized option \"{name}\" (expected one of: {expected})")]
    UnrecognizedOption {
        /// The unrecognized option name.
        name: String,
        /// Comma-separated list of recognized option names.
        expected: &'static str,
    },

    /// Returned when a hyperparameter value cannot be parsed.
    #[error("invalid value \"{value}\" for option \"{name}\"")]
    InvalidOptionValue {
        /// The option name.
        name: String,
        /// The raw value that failed to parse.
        value: String,
    },

    /// Returned when a hyperparameter is not written as `key=value`.
    #[error("malformed option \"{raw}\": expected key=value")]
    MalformedOption {
        /// The raw option text.
        raw: String,
    },

    /// Returned when the ensemble size is zero or exceeds what the library accepts.
    #[error("n_estimators must be in [1, {max}], got {n_trees}")]
    InvalidTreeCount {
        /// The invalid ensemble size.
        n_trees: usize,
        /// The largest accepted ensemble size.
        max: usize,
    },

    /// Returned when the test fraction is not strictly between 0 and 1.
    #[error("test_size must be in (0.0, 1.0), got {test_size}")]
    InvalidTestSize {
        /// The invalid fraction.
        test_size: f64,
    },

    /// Returned when the split would leave the train or test partition empty.
    #[error("cannot split {n_samples} samples with test_size {test_size}: a partition would be empty")]
    SplitTooSmall {
        /// Number of samples available.
        n_samples: usize,
        /// Requested test fraction.
        test_size: f64,
    },

    /// Returned when a dataset has zero samples.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when a dataset has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a row has a different number of features than the names.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature \"{feature}\"")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// Name of the offending feature column.
        feature: String,
    },

    /// Returned when feature and target lengths differ.
    #[error("{n_samples} feature rows but {n_targets} target values")]
    TargetLengthMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of target values.
        n_targets: usize,
    },

    /// Returned when a target of the wrong kind is supplied for a task.
    #[error("{task} requires {expected} targets")]
    TargetKindMismatch {
        /// The task being fit or evaluated.
        task: TaskType,
        /// The target kind the task needs.
        expected: &'static str,
    },

    /// Returned when prediction input has a different width than the fitted model.
    #[error("prediction input has {got} features, model was fit on {expected}")]
    PredictionFeatureMismatch {
        /// The number of features the model was fit on.
        expected: usize,
        /// The number of features in the prediction input.
        got: usize,
    },

    /// Returned when the underlying library rejects the data during fitting.
    #[error("model fit failed: {reason}")]
    Fit {
        /// Message from the model library.
        reason: String,
    },

    /// Returned when the underlying library fails during prediction.
    #[error("prediction failed: {reason}")]
    Predict {
        /// Message from the model library.
        reason: String,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}
