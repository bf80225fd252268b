//! Per-experiment state: trained models, metric series, and feature importances.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use quickfit_io::{ColumnData, ExperimentName, ResultWriter, Table};
use quickfit_model::{
    FeatureImportance, FeatureMatrix, Hyperparameters, Scores, Target, TaskType, TrainedModel,
    DEFAULT_IMPORTANCE_REPEATS,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ExperimentError;
use crate::preprocess::{self, Preprocessed};

/// File name used for the persisted model.
pub const DEFAULT_MODEL_FILE: &str = "model.pkl";

/// File name used for the results document.
pub const DEFAULT_RESULTS_FILE: &str = "results.json";

/// One logged metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Step index within the metric's series.
    pub step: usize,
    /// Logged value.
    pub value: f64,
}

/// Contents of `results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    /// Experiment identifier.
    pub experiment_id: String,
    /// Time the document was written.
    pub timestamp: DateTime<Utc>,
    /// Metric series by name.
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
    /// Importance by feature name.
    pub feature_importances: BTreeMap<String, f64>,
    /// Task types with a trained model.
    pub models: Vec<String>,
}

/// Accumulates one experiment's state and writes it under
/// `{output_dir}/{experiment_id}/`.
///
/// Models are kept per task type; training again for the same task
/// replaces the earlier model and its importances. Metric series only grow.
#[derive(Debug)]
pub struct ExperimentRecorder {
    writer: ResultWriter,
    models: BTreeMap<TaskType, Arc<TrainedModel>>,
    metrics: BTreeMap<String, Vec<MetricPoint>>,
    feature_importances: Vec<FeatureImportance>,
}

impl ExperimentRecorder {
    /// Validate `experiment_id` and create its output directory.
    ///
    /// # Errors
    ///
    /// Returns [`ExperimentError::Io`] for an invalid id or when the
    /// directory cannot be created.
    pub fn initialize(experiment_id: &str, output_dir: &Path) -> Result<Self, ExperimentError> {
        let name = ExperimentName::new(experiment_id)?;
        let writer = ResultWriter::new(output_dir, name)?;
        info!(experiment = experiment_id, dir = %writer.dir().display(), "experiment initialized");
        Ok(Self {
            writer,
            models: BTreeMap::new(),
            metrics: BTreeMap::new(),
            feature_importances: Vec::new(),
        })
    }

    /// Return the experiment id.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        self.writer.experiment().as_str()
    }

    /// Return the experiment output directory.
    #[must_use]
    pub fn experiment_dir(&self) -> &Path {
        self.writer.dir()
    }

    /// Return all metric series.
    #[must_use]
    pub fn metrics(&self) -> &BTreeMap<String, Vec<MetricPoint>> {
        &self.metrics
    }

    /// Return the model trained for `task`, if any.
    #[must_use]
    pub fn model(&self, task: TaskType) -> Option<&Arc<TrainedModel>> {
        self.models.get(&task)
    }

    /// Return the importances of the most recently trained model.
    #[must_use]
    pub fn feature_importances(&self) -> &[FeatureImportance] {
        &self.feature_importances
    }

    /// Append `value` to the series `name`.
    ///
    /// Without an explicit `step`, the value is stepped at the current
    /// length of that series.
    pub fn log_metric(&mut self, name: &str, value: f64, step: Option<usize>) {
        let series = self.metrics.entry(name.to_string()).or_default();
        let step = step.unwrap_or(series.len());
        series.push(MetricPoint { step, value });
        info!(metric = name, value, step, "metric logged");
    }

    /// Classify a target column by its number of distinct values.
    #[must_use]
    pub fn detect_task_type(target: &ColumnData) -> TaskType {
        TaskType::detect(target.n_distinct())
    }

    /// Split `table` into a one-hot feature matrix and the raw target column.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ExperimentError::MissingTargetColumn`] | `target_column` is absent |
    /// | [`ExperimentError::NoFeatureColumns`] | only the target remains |
    /// | [`ExperimentError::MissingFeatureValue`] | a numeric feature cell is missing |
    pub fn preprocess(table: Table, target_column: &str) -> Result<Preprocessed, ExperimentError> {
        preprocess::preprocess(table, target_column)
    }

    /// Fit a model for `task`, then record it and its permutation importances
    /// on the training data.
    ///
    /// # Errors
    ///
    /// Propagates [`ModelError`](quickfit_model::ModelError)s from fitting
    /// and importance scoring, including `UnsupportedTask` for clustering.
    #[instrument(skip_all, fields(experiment = %self.writer.experiment(), task = %task))]
    pub fn train(
        &mut self,
        features: &FeatureMatrix,
        target: &Target,
        task: TaskType,
        params: &Hyperparameters,
    ) -> Result<Arc<TrainedModel>, ExperimentError> {
        let model = Arc::new(params.fit(task, features, target)?);
        let importances = model.feature_importances(
            features,
            target,
            DEFAULT_IMPORTANCE_REPEATS,
            params.random_state(),
        )?;

        self.models.insert(task, Arc::clone(&model));
        self.feature_importances = importances;
        info!(n_features = model.n_features(), "model trained");
        Ok(model)
    }

    /// Score `model` on held-out data and log each metric.
    ///
    /// Classification yields `accuracy`, `precision`, `recall`, `f1`;
    /// regression yields `mse`, `mae`, `r2`.
    ///
    /// # Errors
    ///
    /// Propagates prediction and scoring errors.
    #[instrument(skip_all, fields(task = %model.task(), n_samples = features.n_samples()))]
    pub fn evaluate(
        &mut self,
        model: &TrainedModel,
        features: &FeatureMatrix,
        target: &Target,
    ) -> Result<BTreeMap<String, f64>, ExperimentError> {
        let scores: Scores = model.evaluate(features, target)?;
        let mut out = BTreeMap::new();
        for (name, value) in scores.entries() {
            self.log_metric(name, value, None);
            out.insert(name.to_string(), value);
        }
        Ok(out)
    }

    /// Write `model` to `filename` in the experiment directory.
    ///
    /// # Errors
    ///
    /// Propagates serialization and write errors.
    pub fn persist_model(&self, model: &TrainedModel, filename: &str) -> Result<PathBuf, ExperimentError> {
        let path = self.writer.path_for(filename);
        model.save(&path)?;
        Ok(path)
    }

    /// Read a model written by [`ExperimentRecorder::persist_model`].
    ///
    /// # Errors
    ///
    /// Propagates read, decode, and format-version errors.
    pub fn load_model(path: &Path) -> Result<TrainedModel, ExperimentError> {
        Ok(TrainedModel::load(path)?)
    }

    /// Snapshot the recorded state as a results document stamped now.
    #[must_use]
    pub fn results(&self) -> ResultsDocument {
        ResultsDocument {
            experiment_id: self.experiment_id().to_string(),
            timestamp: Utc::now(),
            metrics: self.metrics.clone(),
            feature_importances: self
                .feature_importances
                .iter()
                .map(|f| (f.name.clone(), f.importance))
                .collect(),
            models: self.models.keys().map(|t| t.as_str().to_string()).collect(),
        }
    }

    /// Write the results document to `filename` in the experiment directory.
    ///
    /// # Errors
    ///
    /// Returns [`ExperimentError::Io`] if the file cannot be written.
    pub fn persist_results(&self, filename: &str) -> Result<PathBuf, ExperimentError> {
        Ok(self.writer.write_json(filename, &self.results())?)
    }
}
