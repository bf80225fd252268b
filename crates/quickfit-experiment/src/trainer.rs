//! Fixed-configuration classifier trainer: last column is the label.

use std::fs;
use std::path::Path;

use quickfit_io::{IoError, TableReader};
use quickfit_model::{Hyperparameters, ModelError, Scores, TaskType, TrainTestSplit};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::ExperimentError;
use crate::error_chain;
use crate::pipeline::DEFAULT_TEST_SIZE;
use crate::preprocess::{encode_target, one_hot};

const SEED: u64 = 42;
const N_ESTIMATORS: usize = 100;

/// Output of [`train_standalone`], printed as untagged JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrainerReport {
    /// Held-out metrics, weighted by class support.
    Trained {
        /// Fraction of correct predictions.
        accuracy: f64,
        /// Weighted precision.
        precision: f64,
        /// Weighted recall.
        recall: f64,
        /// Weighted F1.
        f1_score: f64,
        /// Size of the written model file.
        model_size_bytes: u64,
    },
    /// The dataset could not be read.
    Failed {
        /// `Failed to load dataset: <reason>`.
        error: String,
    },
}

/// Train a 100-tree random-forest classifier on `dataset` and write it to `output`.
///
/// The last column is the label and every other column a feature. If any
/// feature is categorical, all categorical features are one-hot encoded
/// keeping every level. The model file's parent directories are created as
/// needed; nothing else is written.
///
/// A dataset that cannot be loaded yields [`TrainerReport::Failed`].
///
/// # Errors
///
/// Failures after loading (encoding, splitting, fitting, writing) are
/// returned as [`ExperimentError`].
#[instrument(skip_all, fields(dataset = %dataset.display(), output = %output.display()))]
pub fn train_standalone(dataset: &Path, output: &Path) -> Result<TrainerReport, ExperimentError> {
    let mut table = match TableReader::new(dataset).read() {
        Ok(table) => table,
        Err(e) => {
            let error = format!("Failed to load dataset: {}", error_chain(&e));
            warn!(%error, "dataset load failed");
            return Ok(TrainerReport::Failed { error });
        }
    };

    let label = table.pop_column().ok_or(ExperimentError::NoFeatureColumns {
        target: String::new(),
    })?;
    if table.n_columns() == 0 {
        return Err(ExperimentError::NoFeatureColumns {
            target: label.name().to_string(),
        });
    }
    let features = one_hot(table.columns(), false)?;
    let target = encode_target(&label, TaskType::Classification)?;

    let split = TrainTestSplit::new(DEFAULT_TEST_SIZE)?
        .with_seed(SEED)
        .split(features.n_samples())?;
    let x_train = features.select_rows(&split.train);
    let y_train = target.select(&split.train);

    let model = Hyperparameters::default()
        .with_n_estimators(N_ESTIMATORS)
        .with_random_state(SEED)
        .fit(TaskType::Classification, &x_train, &y_train)?;

    let scores = model.evaluate(&features.select_rows(&split.test), &target.select(&split.test))?;
    let Scores::Classification(scores) = scores else {
        return Err(ModelError::TargetKindMismatch {
            task: TaskType::Classification,
            expected: "label",
        }
        .into());
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::OutputDirCreate {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let model_size_bytes = model.save(output)?;
    info!(accuracy = scores.accuracy, model_size_bytes, "standalone model trained");

    Ok(TrainerReport::Trained {
        accuracy: scores.accuracy,
        precision: scores.precision,
        recall: scores.recall,
        f1_score: scores.f1,
        model_size_bytes,
    })
}
