use quickfit_io::IoError;
use quickfit_model::ModelError;

/// Errors from preprocessing, recording, and running experiments.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    /// Dataset loading or artifact writing failed.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Model configuration, fitting, evaluation, or persistence failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Returned when the requested target column is not in the dataset.
    #[error("target column \"{column}\" not found (available: {available})")]
    MissingTargetColumn {
        /// The requested column name.
        column: String,
        /// Comma-separated column names present in the dataset.
        available: String,
    },

    /// Returned when the dataset has no columns besides the target.
    #[error("no feature columns besides target \"{target}\"")]
    NoFeatureColumns {
        /// The target column name.
        target: String,
    },

    /// Returned when a numeric feature cell is missing.
    #[error("missing value in feature column \"{column}\" at row {row}")]
    MissingFeatureValue {
        /// The feature column name.
        column: String,
        /// Zero-based row index after empty-row removal.
        row: usize,
    },

    /// Returned when a target cell is missing.
    #[error("missing value in target column \"{column}\" at row {row}")]
    MissingTargetValue {
        /// The target column name.
        column: String,
        /// Zero-based row index within the encoded partition.
        row: usize,
    },

    /// Returned when regression is requested on a non-numeric target.
    #[error("regression requires a numeric target, but column \"{column}\" is categorical")]
    NonNumericTarget {
        /// The target column name.
        column: String,
    },
}
