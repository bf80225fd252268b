//! Prediction task kinds and the distinct-value detection heuristic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Largest distinct-target-value count still treated as classification.
pub const CLASSIFICATION_MAX_DISTINCT: usize = 10;

/// The kind of prediction problem, governing model choice and metric set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Predict a discrete class label.
    Classification,
    /// Predict a continuous value.
    Regression,
    /// Declared for parity with the task vocabulary; no model fits it.
    Clustering,
}

impl TaskType {
    /// Guess the task from the number of distinct target values.
    ///
    /// At most [`CLASSIFICATION_MAX_DISTINCT`] distinct values means
    /// classification, anything more means regression. A numeric-coded
    /// categorical target with many levels reads as regression, and a
    /// continuous target with few observed values reads as classification.
    #[must_use]
    pub fn detect(n_distinct: usize) -> Self {
        if n_distinct <= CLASSIFICATION_MAX_DISTINCT {
            Self::Classification
        } else {
            Self::Regression
        }
    }

    /// Return the lowercase tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Regression => "regression",
            Self::Clustering => "clustering",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classification" => Ok(Self::Classification),
            "regression" => Ok(Self::Regression),
            "clustering" => Ok(Self::Clustering),
            _ => Err(ModelError::UnknownTaskType {
                value: s.to_string(),
            }),
        }
    }
}
