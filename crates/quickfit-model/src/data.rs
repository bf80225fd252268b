//! Model-ready feature matrix and target vector.

use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::ModelError;

/// A dense, row-major feature matrix with named columns.
///
/// `rows[sample_idx][feature_idx]`. Every value is finite and every row has
/// one value per name.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a validated matrix.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::ZeroFeatures`] | `names` is empty |
    /// | [`ModelError::FeatureCountMismatch`] | a row's width differs from `names` |
    /// | [`ModelError::NonFiniteValue`] | a value is NaN or infinite |
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        if names.is_empty() {
            return Err(ModelError::ZeroFeatures);
        }
        for (sample_index, row) in rows.iter().enumerate() {
            if row.len() != names.len() {
                return Err(ModelError::FeatureCountMismatch {
                    expected: names.len(),
                    got: row.len(),
                    sample_index,
                });
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(ModelError::NonFiniteValue {
                    sample_index,
                    feature: names[j].clone(),
                });
            }
        }
        Ok(Self { names, rows })
    }

    /// Return the feature names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Gather the given rows into a new matrix, in the order given.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Copy with column `feature` replaced by `values`.
    pub(crate) fn with_column(&self, feature: usize, values: &[f64]) -> Self {
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, &v)| {
                let mut row = row.clone();
                row[feature] = v;
                row
            })
            .collect();
        Self {
            names: self.names.clone(),
            rows,
        }
    }

    /// Return one column as a vector.
    pub(crate) fn column(&self, feature: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[feature]).collect()
    }

    /// Convert to the model library's dense matrix.
    pub(crate) fn to_dense(&self) -> Result<DenseMatrix<f64>, Failed> {
        DenseMatrix::from_2d_vec(&self.rows)
    }
}

/// Target values (or predictions) for a set of samples.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Class labels, compared as strings.
    Labels(Vec<String>),
    /// Continuous values.
    Values(Vec<f64>),
}

impl Target {
    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Labels(v) => v.len(),
            Self::Values(v) => v.len(),
        }
    }

    /// Whether there are zero samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather the given samples into a new target, in the order given.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        match self {
            Self::Labels(v) => Self::Labels(indices.iter().map(|&i| v[i].clone()).collect()),
            Self::Values(v) => Self::Values(indices.iter().map(|&i| v[i]).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = FeatureMatrix::new(names(2), vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::FeatureCountMismatch { expected: 2, got: 1, sample_index: 1 }
        ));
    }

    #[test]
    fn rejects_non_finite() {
        let err = FeatureMatrix::new(names(2), vec![vec![1.0, f64::NAN]]).unwrap_err();
        assert!(matches!(err, ModelError::NonFiniteValue { ref feature, .. } if feature == "f1"));
    }

    #[test]
    fn rejects_zero_features() {
        let err = FeatureMatrix::new(vec![], vec![vec![]]).unwrap_err();
        assert!(matches!(err, ModelError::ZeroFeatures));
    }

    #[test]
    fn with_column_replaces_only_target_feature() {
        let m = FeatureMatrix::new(names(2), vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let swapped = m.with_column(0, &[9.0, 8.0]);
        assert_eq!(swapped.rows(), &[vec![9.0, 2.0], vec![8.0, 4.0]]);
        assert_eq!(m.column(1), vec![2.0, 4.0]);
    }

    #[test]
    fn select_keeps_alignment() {
        let m = FeatureMatrix::new(names(1), vec![vec![0.0], vec![1.0], vec![2.0]]).unwrap();
        let t = Target::Labels(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(m.select_rows(&[2, 0]).rows(), &[vec![2.0], vec![0.0]]);
        assert_eq!(t.select(&[2, 0]), Target::Labels(vec!["c".into(), "a".into()]));
    }
}
