//! Classification and regression evaluation metrics.

use std::collections::BTreeSet;

use serde::Serialize;
use smartcore::metrics::{accuracy, mean_absolute_error, mean_squared_error};

use crate::data::Target;
use crate::error::ModelError;
use crate::task::TaskType;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted class indices.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyDataset`] | Zero labels provided |
    /// | [`ModelError::TargetLengthMismatch`] | Slices differ in length |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, ModelError> {
        if true_labels.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(ModelError::TargetLengthMismatch {
                n_samples: predicted.len(),
                n_targets: true_labels.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in true_labels.iter().zip(predicted.iter()) {
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted: usize = (0..self.n_classes).map(|i| self.matrix[i][c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Support-weighted mean of precision, recall, and F1.
    ///
    /// Classes with zero support contribute nothing; undefined per-class
    /// ratios count as zero.
    #[must_use]
    pub fn weighted_averages(&self) -> (f64, f64, f64) {
        let metrics = self.class_metrics();
        let total: usize = metrics.iter().map(|m| m.support).sum();
        if total == 0 {
            return (0.0, 0.0, 0.0);
        }
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            metrics.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total as f64
        };
        (
            weighted(|m| m.precision),
            weighted(|m| m.recall),
            weighted(|m| m.f1),
        )
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Held-out classification scores, weighted by class support.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationScores {
    /// Fraction of exact label matches.
    pub accuracy: f64,
    /// Support-weighted precision.
    pub precision: f64,
    /// Support-weighted recall.
    pub recall: f64,
    /// Support-weighted F1.
    pub f1: f64,
}

impl ClassificationScores {
    /// Score predicted labels against true labels.
    ///
    /// The class set is the union of labels seen in either slice, so a
    /// predicted class absent from the truth still counts as a false positive.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyDataset`] or
    /// [`ModelError::TargetLengthMismatch`] via [`ConfusionMatrix::from_labels`].
    pub fn compute(truth: &[String], predicted: &[String]) -> Result<Self, ModelError> {
        let classes: Vec<&String> = truth
            .iter()
            .chain(predicted)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = |label: &String| classes.binary_search(&label).unwrap_or_default();
        let t: Vec<usize> = truth.iter().map(index).collect();
        let p: Vec<usize> = predicted.iter().map(index).collect();

        let cm = ConfusionMatrix::from_labels(&t, &p, classes.len())?;
        let (precision, recall, f1) = cm.weighted_averages();
        let as_u32 = |xs: &[usize]| xs.iter().map(|&x| x as u32).collect::<Vec<u32>>();
        Ok(Self {
            accuracy: accuracy(&as_u32(&t), &as_u32(&p)),
            precision,
            recall,
            f1,
        })
    }
}

/// Held-out regression scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionScores {
    /// Mean squared error.
    pub mse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Coefficient of determination.
    pub r2: f64,
}

impl RegressionScores {
    /// Score predicted values against true values.
    ///
    /// R² of a constant truth is 1.0 for a perfect prediction and 0.0
    /// otherwise, so the score is always finite.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyDataset`] | Zero values |
    /// | [`ModelError::TargetLengthMismatch`] | Slices differ in length |
    pub fn compute(truth: &[f64], predicted: &[f64]) -> Result<Self, ModelError> {
        if truth.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        if truth.len() != predicted.len() {
            return Err(ModelError::TargetLengthMismatch {
                n_samples: predicted.len(),
                n_targets: truth.len(),
            });
        }
        let (t, p) = (truth.to_vec(), predicted.to_vec());
        let mse = mean_squared_error(&t, &p);
        let mae = mean_absolute_error(&t, &p);
        // Zero variance in the truth makes the library's R² a 0/0.
        let r2 = if truth.iter().all(|&y| y == truth[0]) {
            if mse == 0.0 { 1.0 } else { 0.0 }
        } else {
            smartcore::metrics::r2(&t, &p)
        };
        Ok(Self { mse, mae, r2 })
    }
}

/// Task-appropriate evaluation scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scores {
    /// Accuracy and weighted precision/recall/F1.
    Classification(ClassificationScores),
    /// MSE, MAE, and R².
    Regression(RegressionScores),
}

impl Scores {
    /// Score predictions for `task`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::UnsupportedTask`] | `task` has no metric set |
    /// | [`ModelError::TargetKindMismatch`] | target kinds do not suit `task` |
    /// | [`ModelError::EmptyDataset`] | zero samples |
    pub fn compute(task: TaskType, truth: &Target, predicted: &Target) -> Result<Self, ModelError> {
        match (task, truth, predicted) {
            (TaskType::Classification, Target::Labels(t), Target::Labels(p)) => {
                ClassificationScores::compute(t, p).map(Self::Classification)
            }
            (TaskType::Regression, Target::Values(t), Target::Values(p)) => {
                RegressionScores::compute(t, p).map(Self::Regression)
            }
            (TaskType::Classification, ..) => Err(ModelError::TargetKindMismatch {
                task,
                expected: "label",
            }),
            (TaskType::Regression, ..) => Err(ModelError::TargetKindMismatch {
                task,
                expected: "numeric",
            }),
            (TaskType::Clustering, ..) => Err(ModelError::UnsupportedTask { task }),
        }
    }

    /// Metric names and values in reporting order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        match self {
            Self::Classification(s) => vec![
                ("accuracy", s.accuracy),
                ("precision", s.precision),
                ("recall", s.recall),
                ("f1", s.f1),
            ],
            Self::Regression(s) => vec![("mse", s.mse), ("mae", s.mae), ("r2", s.r2)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn perfect_predictions() {
        let true_labels = vec![0, 0, 1, 1, 2, 2];
        let predicted = vec![0, 0, 1, 1, 2, 2];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted, 3).unwrap();
        for m in cm.class_metrics() {
            assert!((m.precision - 1.0).abs() < f64::EPSILON);
            assert!((m.recall - 1.0).abs() < f64::EPSILON);
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn known_confusion_matrix() {
        let true_labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = vec![0, 0, 1, 1, 1, 2, 2, 2, 0];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted, 3).unwrap();
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(metrics[0].support, 3);
        assert_eq!(metrics.iter().map(|m| m.support).sum::<usize>(), 9);
    }

    #[test]
    fn empty_labels_error() {
        let err = ConfusionMatrix::from_labels(&[], &[], 3).unwrap_err();
        assert!(matches!(err, ModelError::EmptyDataset));
    }

    #[test]
    fn weighted_scores_match_hand_computation() {
        // truth: a a a b ; pred: a a b b
        // a: P=1, R=2/3, F1=0.8, support 3
        // b: P=1/2, R=1, F1=2/3, support 1
        let s = ClassificationScores::compute(
            &labels(&["a", "a", "a", "b"]),
            &labels(&["a", "a", "b", "b"]),
        )
        .unwrap();
        assert!((s.accuracy - 0.75).abs() < 1e-12);
        assert!((s.precision - (3.0 * 1.0 + 0.5) / 4.0).abs() < 1e-12);
        assert!((s.recall - (3.0 * 2.0 / 3.0 + 1.0) / 4.0).abs() < 1e-12);
        assert!((s.f1 - (3.0 * 0.8 + 2.0 / 3.0) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn never_predicted_class_counts_as_zero_precision() {
        // Class "b" is never predicted: its precision is undefined and counts as 0.
        let s = ClassificationScores::compute(&labels(&["a", "b"]), &labels(&["a", "a"])).unwrap();
        assert!((s.precision - 0.25).abs() < 1e-12);
        assert!((s.recall - 0.5).abs() < 1e-12);
    }

    #[test]
    fn regression_scores_known_values() {
        let s = RegressionScores::compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 5.0]).unwrap();
        assert!((s.mse - 4.0 / 3.0).abs() < 1e-12);
        assert!((s.mae - 2.0 / 3.0).abs() < 1e-12);
        assert!((s.r2 - (1.0 - 4.0 / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn unseen_predicted_class_lowers_accuracy() {
        let s = ClassificationScores::compute(
            &labels(&["a", "b", "b", "c"]),
            &labels(&["a", "b", "d", "d"]),
        )
        .unwrap();
        assert!((s.accuracy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn r2_constant_truth_is_finite() {
        let perfect = RegressionScores::compute(&[2.0, 2.0], &[2.0, 2.0]).unwrap();
        assert_eq!(perfect.r2, 1.0);
        let off = RegressionScores::compute(&[2.0, 2.0], &[1.0, 3.0]).unwrap();
        assert_eq!(off.r2, 0.0);
    }

    #[test]
    fn scores_entries_use_metric_names() {
        let s = Scores::compute(
            TaskType::Regression,
            &Target::Values(vec![1.0, 2.0]),
            &Target::Values(vec![1.0, 2.0]),
        )
        .unwrap();
        let names: Vec<&str> = s.entries().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["mse", "mae", "r2"]);
    }

    #[test]
    fn scores_reject_mismatched_kind_and_clustering() {
        let labels_t = Target::Labels(labels(&["a"]));
        let err = Scores::compute(TaskType::Regression, &labels_t, &labels_t).unwrap_err();
        assert!(matches!(err, ModelError::TargetKindMismatch { .. }));
        let err = Scores::compute(TaskType::Clustering, &labels_t, &labels_t).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedTask { .. }));
    }
}
