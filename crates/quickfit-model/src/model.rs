//! Task-bound random-forest models backed by smartcore.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::{debug, info, instrument};

use crate::data::{FeatureMatrix, Target};
use crate::error::ModelError;
use crate::importance::{permutation_importance, FeatureImportance};
use crate::metrics::Scores;
use crate::params::Hyperparameters;
use crate::task::TaskType;

type Classifier = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;
type Regressor = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Serialize, Deserialize)]
enum Forest {
    /// `classes[i]` is the label predicted for class index `i`.
    Classifier { model: Classifier, classes: Vec<String> },
    /// A training target with one class; smartcore needs at least two.
    SingleClass { class: String },
    Regressor { model: Regressor },
}

/// A fitted random forest bound to the task it was trained for.
///
/// Remembers the feature names it was fit on and, for classification, the
/// class labels, so predictions come back as [`Target`] values in the same
/// vocabulary as the training target.
#[derive(Serialize, Deserialize)]
pub struct TrainedModel {
    task: TaskType,
    feature_names: Vec<String>,
    params: Hyperparameters,
    forest: Forest,
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("task", &self.task)
            .field("n_features", &self.feature_names.len())
            .field("classes", &self.classes())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl TrainedModel {
    /// Return the task this model was fit for.
    #[must_use]
    pub fn task(&self) -> TaskType {
        self.task
    }

    /// Return the feature names seen during fitting.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the number of features seen during fitting.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the hyperparameters the model was fit with.
    #[must_use]
    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    /// Return the class labels, or `None` for a regressor.
    #[must_use]
    pub fn classes(&self) -> Option<&[String]> {
        match &self.forest {
            Forest::Classifier { classes, .. } => Some(classes),
            Forest::SingleClass { class } => Some(std::slice::from_ref(class)),
            Forest::Regressor { .. } => None,
        }
    }

    /// Predict targets for every row of `features`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::PredictionFeatureMismatch`] | width differs from the fitted width |
    /// | [`ModelError::EmptyDataset`] | zero rows |
    /// | [`ModelError::Predict`] | the forest library fails |
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Target, ModelError> {
        if features.n_features() != self.n_features() {
            return Err(ModelError::PredictionFeatureMismatch {
                expected: self.n_features(),
                got: features.n_features(),
            });
        }
        if features.n_samples() == 0 {
            return Err(ModelError::EmptyDataset);
        }
        match &self.forest {
            Forest::Classifier { model, classes } => {
                let x = features.to_dense().map_err(predict_err)?;
                let indices = model.predict(&x).map_err(predict_err)?;
                let labels = indices
                    .into_iter()
                    .map(|i| classes.get(i as usize).cloned().unwrap_or_default())
                    .collect();
                Ok(Target::Labels(labels))
            }
            Forest::SingleClass { class } => {
                Ok(Target::Labels(vec![class.clone(); features.n_samples()]))
            }
            Forest::Regressor { model } => {
                let x = features.to_dense().map_err(predict_err)?;
                Ok(Target::Values(model.predict(&x).map_err(predict_err)?))
            }
        }
    }

    /// Predict on `features` and score against `target` with the task's metric set.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`TrainedModel::predict`] and [`Scores::compute`].
    pub fn evaluate(&self, features: &FeatureMatrix, target: &Target) -> Result<Scores, ModelError> {
        let predicted = self.predict(features)?;
        Scores::compute(self.task, target, &predicted)
    }

    /// Single headline score: accuracy for classification, R² for regression.
    pub(crate) fn score(&self, features: &FeatureMatrix, target: &Target) -> Result<f64, ModelError> {
        Ok(match self.evaluate(features, target)? {
            Scores::Classification(s) => s.accuracy,
            Scores::Regression(s) => s.r2,
        })
    }

    /// Permutation feature importance on the given data.
    ///
    /// Each feature's importance is the mean drop in [`TrainedModel`]'s
    /// headline score (accuracy or R²) when that feature's column is
    /// shuffled, over `repeats` seeded shuffles. Sorted most important first.
    ///
    /// # Errors
    ///
    /// Propagates prediction and scoring errors.
    pub fn feature_importances(
        &self,
        features: &FeatureMatrix,
        target: &Target,
        repeats: usize,
        seed: u64,
    ) -> Result<Vec<FeatureImportance>, ModelError> {
        permutation_importance(self, features, target, repeats, seed)
    }
}

fn fit_err(e: Failed) -> ModelError {
    ModelError::Fit {
        reason: e.to_string(),
    }
}

fn predict_err(e: Failed) -> ModelError {
    ModelError::Predict {
        reason: e.to_string(),
    }
}

/// Fit a forest for `task`.
#[instrument(skip_all, fields(task = %task, n_samples = features.n_samples(), n_trees = params.n_estimators))]
pub(crate) fn fit(
    params: &Hyperparameters,
    task: TaskType,
    features: &FeatureMatrix,
    target: &Target,
) -> Result<TrainedModel, ModelError> {
    if task == TaskType::Clustering {
        return Err(ModelError::UnsupportedTask { task });
    }
    params.validate()?;
    if features.n_samples() == 0 {
        return Err(ModelError::EmptyDataset);
    }
    if target.len() != features.n_samples() {
        return Err(ModelError::TargetLengthMismatch {
            n_samples: features.n_samples(),
            n_targets: target.len(),
        });
    }

    let x = features.to_dense().map_err(fit_err)?;
    let n_features = features.n_features();
    // Every smartcore tree shares one seed, so an unset `m` (sqrt(p)) would
    // give all trees the same feature subset.
    let max_features = Some(params.max_features.map_or(n_features, |m| m.min(n_features)));
    let tree_count_err = || ModelError::InvalidTreeCount {
        n_trees: params.n_estimators,
        max: usize::from(u16::MAX),
    };

    let forest = match (task, target) {
        (TaskType::Classification, Target::Labels(labels)) => {
            let classes: Vec<String> = labels
                .iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .cloned()
                .collect();
            let y: Vec<u32> = labels
                .iter()
                .map(|l| classes.binary_search(l).unwrap_or_default() as u32)
                .collect();
            debug!(n_classes = classes.len(), "encoded class labels");
            if let [class] = classes.as_slice() {
                debug!(%class, "single-class target, skipping forest fit");
                Forest::SingleClass { class: class.clone() }
            } else {
                let mut p = RandomForestClassifierParameters::default();
                p.n_trees = params.n_estimators.try_into().map_err(|_| tree_count_err())?;
                p.max_depth = params.max_depth;
                p.min_samples_split = params.min_samples_split;
                p.min_samples_leaf = params.min_samples_leaf;
                p.m = max_features;
                p.seed = params.random_state;

                let model = RandomForestClassifier::fit(&x, &y, p).map_err(fit_err)?;
                Forest::Classifier { model, classes }
            }
        }
        (TaskType::Regression, Target::Values(values)) => {
            let mut p = RandomForestRegressorParameters::default();
            p.n_trees = params.n_estimators.try_into().map_err(|_| tree_count_err())?;
            p.max_depth = params.max_depth;
            p.min_samples_split = params.min_samples_split;
            p.min_samples_leaf = params.min_samples_leaf;
            p.m = max_features;
            p.seed = params.random_state;

            let model = RandomForestRegressor::fit(&x, values, p).map_err(fit_err)?;
            Forest::Regressor { model }
        }
        (TaskType::Classification, _) => {
            return Err(ModelError::TargetKindMismatch {
                task,
                expected: "label",
            });
        }
        (TaskType::Regression, _) => {
            return Err(ModelError::TargetKindMismatch {
                task,
                expected: "numeric",
            });
        }
        (TaskType::Clustering, _) => return Err(ModelError::UnsupportedTask { task }),
    };

    let model = TrainedModel {
        task,
        feature_names: features.names().to_vec(),
        params: params.clone(),
        forest,
    };
    info!(
        n_features = model.n_features(),
        n_classes = model.classes().map_or(0, <[String]>::len),
        "forest fitted"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_classes() -> (FeatureMatrix, Target) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            rows.push(vec![i as f64 * 0.1, 1.0]);
            labels.push("low".to_string());
            rows.push(vec![10.0 + i as f64 * 0.1, 1.0]);
            labels.push("high".to_string());
        }
        let names = vec!["x".to_string(), "constant".to_string()];
        (FeatureMatrix::new(names, rows).unwrap(), Target::Labels(labels))
    }

    fn linear_values() -> (FeatureMatrix, Target) {
        let rows: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64]).collect();
        let values: Vec<f64> = (0..60).map(|i| 3.0 * i as f64 + 1.0).collect();
        (
            FeatureMatrix::new(vec!["x".to_string()], rows).unwrap(),
            Target::Values(values),
        )
    }

    #[test]
    fn classifier_recovers_training_labels() {
        let (x, y) = separable_classes();
        let params = Hyperparameters::default().with_n_estimators(20);
        let model = params.fit(TaskType::Classification, &x, &y).unwrap();
        assert_eq!(model.task(), TaskType::Classification);
        assert_eq!(model.classes().unwrap(), &["high".to_string(), "low".to_string()]);

        let Scores::Classification(s) = model.evaluate(&x, &y).unwrap() else {
            panic!("expected classification scores");
        };
        assert!(s.accuracy > 0.95, "accuracy = {}", s.accuracy);
    }

    #[test]
    fn default_forest_finds_a_single_informative_column() {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let positive = i % 2 == 0;
            rows.push(vec![1.0, 2.0, 3.0, if positive { 1.0 } else { 0.0 }]);
            labels.push(if positive { "yes" } else { "no" }.to_string());
        }
        let names = ["a", "b", "c", "signal"].map(String::from).to_vec();
        let x = FeatureMatrix::new(names, rows).unwrap();
        let y = Target::Labels(labels);

        let model = Hyperparameters::default()
            .with_n_estimators(10)
            .fit(TaskType::Classification, &x, &y)
            .unwrap();
        let Scores::Classification(s) = model.evaluate(&x, &y).unwrap() else {
            panic!("expected classification scores");
        };
        assert!((s.accuracy - 1.0).abs() < 1e-12, "accuracy = {}", s.accuracy);
    }

    #[test]
    fn single_class_target_predicts_that_class() {
        let (x, _) = separable_classes();
        let y = Target::Labels(vec!["only".to_string(); x.n_samples()]);
        let model = Hyperparameters::default()
            .fit(TaskType::Classification, &x, &y)
            .unwrap();
        assert_eq!(model.classes().unwrap(), &["only".to_string()]);
        assert_eq!(model.predict(&x).unwrap(), y);

        let Scores::Classification(s) = model.evaluate(&x, &y).unwrap() else {
            panic!("expected classification scores");
        };
        assert!((s.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn regressor_fits_linear_trend() {
        let (x, y) = linear_values();
        let params = Hyperparameters::default().with_n_estimators(20);
        let model = params.fit(TaskType::Regression, &x, &y).unwrap();
        assert!(model.classes().is_none());

        let Scores::Regression(s) = model.evaluate(&x, &y).unwrap() else {
            panic!("expected regression scores");
        };
        assert!(s.r2 > 0.9, "r2 = {}", s.r2);
    }

    #[test]
    fn clustering_is_unsupported() {
        let (x, y) = separable_classes();
        let err = Hyperparameters::default()
            .fit(TaskType::Clustering, &x, &y)
            .unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedTask { task: TaskType::Clustering }));
    }

    #[test]
    fn regression_needs_numeric_target() {
        let (x, y) = separable_classes();
        let err = Hyperparameters::default()
            .fit(TaskType::Regression, &x, &y)
            .unwrap_err();
        assert!(matches!(err, ModelError::TargetKindMismatch { .. }));
    }

    #[test]
    fn target_length_must_match() {
        let (x, _) = separable_classes();
        let err = Hyperparameters::default()
            .fit(TaskType::Classification, &x, &Target::Labels(vec!["a".into()]))
            .unwrap_err();
        assert!(matches!(err, ModelError::TargetLengthMismatch { .. }));
    }

    #[test]
    fn predict_rejects_wrong_width() {
        let (x, y) = linear_values();
        let model = Hyperparameters::default()
            .with_n_estimators(5)
            .fit(TaskType::Regression, &x, &y)
            .unwrap();
        let wide = FeatureMatrix::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0]],
        )
        .unwrap();
        let err = model.predict(&wide).unwrap_err();
        assert!(matches!(
            err,
            ModelError::PredictionFeatureMismatch { expected: 1, got: 2 }
        ));
    }
}
