//! Load → preprocess → split → resolve task → train → evaluate → persist.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use quickfit_io::{Column, TableReader};
use quickfit_model::{Hyperparameters, TaskType, TrainTestSplit};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::ExperimentError;
use crate::error_chain;
use crate::preprocess::encode_target;
use crate::recorder::{ExperimentRecorder, DEFAULT_MODEL_FILE, DEFAULT_RESULTS_FILE};

/// Held-out fraction when none is given.
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Output root when none is given.
pub const DEFAULT_OUTPUT_DIR: &str = "data/experiments";

/// Pipeline stage, reported alongside a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Option parsing and output directory creation.
    Initialize,
    /// CSV reading.
    Load,
    /// Row cleanup and feature encoding.
    Preprocess,
    /// Train/test partitioning.
    Split,
    /// Choosing the task type and encoding the target for it.
    ResolveTask,
    /// Model fitting and importance scoring.
    Train,
    /// Held-out scoring.
    Evaluate,
    /// Writing the model and results files.
    Persist,
}

impl Stage {
    /// Return the snake_case stage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Load => "load",
            Self::Preprocess => "preprocess",
            Self::Split => "split",
            Self::ResolveTask => "resolve_task",
            Self::Train => "train",
            Self::Evaluate => "evaluate",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for one pipeline run.
///
/// Values are checked when the run reaches the stage that uses them, so a
/// bad option surfaces as a [`RunReport::Error`] rather than a panic.
#[derive(Debug, Clone)]
pub struct RunConfig {
    data: PathBuf,
    target: String,
    experiment_id: String,
    task_type: Option<TaskType>,
    test_size: f64,
    output_dir: PathBuf,
    params: Vec<String>,
    seed: u64,
}

impl RunConfig {
    /// Create a config with default split, output directory, and hyperparameters.
    pub fn new(
        data: impl Into<PathBuf>,
        target: impl Into<String>,
        experiment_id: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            target: target.into(),
            experiment_id: experiment_id.into(),
            task_type: None,
            test_size: DEFAULT_TEST_SIZE,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            params: Vec::new(),
            seed: 42,
        }
    }

    /// Force a task type instead of detecting it from the target.
    #[must_use]
    pub fn with_task_type(mut self, task_type: Option<TaskType>) -> Self {
        self.task_type = task_type;
        self
    }

    /// Set the held-out fraction.
    #[must_use]
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Set the directory experiments are written under.
    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Set hyperparameters as `key=value` pairs.
    #[must_use]
    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    /// Set the split shuffle seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the dataset path.
    #[must_use]
    pub fn data(&self) -> &Path {
        &self.data
    }

    /// Return the experiment id.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Return the target column name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Return the output root.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Outcome of [`run_pipeline`], printed as JSON tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunReport {
    /// Every stage completed.
    Success {
        /// Experiment identifier.
        experiment_id: String,
        /// Task the model was trained for.
        task_type: TaskType,
        /// Held-out metrics by name.
        metrics: BTreeMap<String, f64>,
        /// Where the model was written.
        model_path: PathBuf,
        /// Where the results document was written.
        results_path: PathBuf,
        /// Permutation importance by feature name.
        feature_importances: BTreeMap<String, f64>,
    },
    /// A stage failed; later stages did not run.
    Error {
        /// Experiment identifier as given.
        experiment_id: String,
        /// The failing stage.
        stage: Stage,
        /// The error and its causes.
        error: String,
    },
}

impl RunReport {
    /// Whether the run completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

struct StageFailure {
    stage: Stage,
    source: ExperimentError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageFailure>;
}

impl<T, E: Into<ExperimentError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, StageFailure> {
        self.map_err(|e| StageFailure {
            stage,
            source: e.into(),
        })
    }
}

/// Run every stage for `config`, converting the first failure into a
/// [`RunReport::Error`]. Artifacts written before a failure are left in place.
#[instrument(skip_all, fields(experiment = %config.experiment_id, data = %config.data.display()))]
pub fn run_pipeline(config: &RunConfig) -> RunReport {
    match execute(config) {
        Ok(report) => report,
        Err(failure) => {
            let message = error_chain(&failure.source);
            error!(stage = %failure.stage, error = %message, "pipeline failed");
            RunReport::Error {
                experiment_id: config.experiment_id.clone(),
                stage: failure.stage,
                error: message,
            }
        }
    }
}

fn execute(config: &RunConfig) -> Result<RunReport, StageFailure> {
    let params = Hyperparameters::from_pairs(&config.params).at(Stage::Initialize)?;
    let mut recorder =
        ExperimentRecorder::initialize(&config.experiment_id, &config.output_dir).at(Stage::Initialize)?;

    let table = TableReader::new(&config.data).read().at(Stage::Load)?;

    let prepared = ExperimentRecorder::preprocess(table, &config.target).at(Stage::Preprocess)?;
    info!(
        n_samples = prepared.features.n_samples(),
        n_features = prepared.features.n_features(),
        "preprocessed"
    );

    let split = TrainTestSplit::new(config.test_size)
        .and_then(|s| s.with_seed(config.seed).split(prepared.features.n_samples()))
        .at(Stage::Split)?;
    let x_train = prepared.features.select_rows(&split.train);
    let x_test = prepared.features.select_rows(&split.test);
    let y_train_raw = prepared.target.data().select(&split.train);
    let y_test_raw = prepared.target.data().select(&split.test);
    info!(n_train = split.train.len(), n_test = split.test.len(), "split");

    let task = config
        .task_type
        .unwrap_or_else(|| ExperimentRecorder::detect_task_type(&y_train_raw));
    info!(task = %task, explicit = config.task_type.is_some(), "task resolved");

    let target_name = prepared.target.name();
    let y_train = encode_target(&Column::new(target_name, y_train_raw), task).at(Stage::ResolveTask)?;
    let y_test = encode_target(&Column::new(target_name, y_test_raw), task).at(Stage::ResolveTask)?;

    let model = recorder.train(&x_train, &y_train, task, &params).at(Stage::Train)?;
    let metrics = recorder.evaluate(&model, &x_test, &y_test).at(Stage::Evaluate)?;

    let model_path = recorder.persist_model(&model, DEFAULT_MODEL_FILE).at(Stage::Persist)?;
    let results_path = recorder.persist_results(DEFAULT_RESULTS_FILE).at(Stage::Persist)?;
    info!(model = %model_path.display(), results = %results_path.display(), "experiment complete");

    Ok(RunReport::Success {
        experiment_id: recorder.experiment_id().to_string(),
        task_type: task,
        metrics,
        model_path,
        results_path,
        feature_importances: recorder
            .feature_importances()
            .iter()
            .map(|f| (f.name.clone(), f.importance))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Stage::ResolveTask).unwrap(), "\"resolve_task\"");
        assert_eq!(Stage::Persist.to_string(), "persist");
    }

    #[test]
    fn error_report_is_status_tagged() {
        let report = RunReport::Error {
            experiment_id: "e1".into(),
            stage: Stage::Load,
            error: "file not found: x.csv".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["stage"], "load");
        assert_eq!(json["experiment_id"], "e1");
        assert!(!report.is_success());
    }

    #[test]
    fn config_defaults() {
        let c = RunConfig::new("d.csv", "y", "e");
        assert_eq!(c.test_size, DEFAULT_TEST_SIZE);
        assert_eq!(c.output_dir(), Path::new(DEFAULT_OUTPUT_DIR));
        assert_eq!(c.task_type, None);
        assert_eq!(c.seed, 42);
    }

    #[test]
    fn unknown_param_fails_before_directory_creation() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = RunConfig::new("missing.csv", "y", "p")
            .with_output_dir(dir.path())
            .with_params(vec!["depth=3".into()]);
        let RunReport::Error { stage, error, .. } = run_pipeline(&config) else {
            panic!("expected failure");
        };
        assert_eq!(stage, Stage::Initialize);
        assert!(error.contains("depth"), "{error}");
        assert!(!dir.path().join("p").exists());
    }
}
