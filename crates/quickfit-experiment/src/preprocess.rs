//! Table-to-matrix preprocessing: one-hot features and target encoding.

use std::collections::BTreeSet;

use quickfit_io::{Column, ColumnData, Table};
use quickfit_model::{FeatureMatrix, Target, TaskType};
use tracing::{debug, instrument, warn};

use crate::error::ExperimentError;

/// Features and raw target column produced by [`preprocess`].
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// All-numeric feature matrix.
    pub features: FeatureMatrix,
    /// The target column, still in its source type.
    pub target: Column,
    /// Rows removed because every cell was missing.
    pub dropped_rows: usize,
}

/// Split `table` into a one-hot feature matrix and the raw target column.
///
/// Rows with every cell missing are dropped first. Categorical features are
/// expanded with the first level dropped.
#[instrument(skip(table), fields(n_rows = table.n_rows(), n_columns = table.n_columns()))]
pub(crate) fn preprocess(table: Table, target_column: &str) -> Result<Preprocessed, ExperimentError> {
    if table.column(target_column).is_none() {
        return Err(ExperimentError::MissingTargetColumn {
            column: target_column.to_string(),
            available: table.column_names().join(", "),
        });
    }

    let (mut table, dropped_rows) = table.drop_empty_rows();
    if dropped_rows > 0 {
        warn!(dropped_rows, "dropped rows with no values");
    }

    let target = table
        .remove_column(target_column)
        .ok_or_else(|| ExperimentError::MissingTargetColumn {
            column: target_column.to_string(),
            available: table.column_names().join(", "),
        })?;
    if table.n_columns() == 0 {
        return Err(ExperimentError::NoFeatureColumns {
            target: target_column.to_string(),
        });
    }

    let features = one_hot(table.columns(), true)?;
    debug!(n_features = features.n_features(), "features encoded");

    Ok(Preprocessed {
        features,
        target,
        dropped_rows,
    })
}

/// Encode columns as a numeric feature matrix.
///
/// Numeric columns pass through. Each categorical column becomes one 0/1
/// indicator per distinct level, named `{column}_{level}`, with levels in
/// lexicographic order; `drop_first` omits the first level. A missing
/// categorical cell encodes as all zeros.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ExperimentError::MissingFeatureValue`] | a numeric cell is missing |
/// | [`ExperimentError::Model`] | no indicator columns remain, or a value is non-finite |
pub fn one_hot(columns: &[Column], drop_first: bool) -> Result<FeatureMatrix, ExperimentError> {
    let n_rows = columns.first().map_or(0, |c| c.data().len());
    let mut names = Vec::new();
    let mut encoded: Vec<Vec<f64>> = Vec::new();

    for column in columns {
        match column.data() {
            ColumnData::Numeric(values) => {
                let dense = values
                    .iter()
                    .enumerate()
                    .map(|(row, v)| {
                        v.ok_or_else(|| ExperimentError::MissingFeatureValue {
                            column: column.name().to_string(),
                            row,
                        })
                    })
                    .collect::<Result<Vec<f64>, _>>()?;
                names.push(column.name().to_string());
                encoded.push(dense);
            }
            ColumnData::Categorical(values) => {
                let levels: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
                for level in levels.into_iter().skip(usize::from(drop_first)) {
                    names.push(format!("{}_{level}", column.name()));
                    encoded.push(
                        values
                            .iter()
                            .map(|v| if v.as_deref() == Some(level) { 1.0 } else { 0.0 })
                            .collect(),
                    );
                }
            }
        }
    }

    let rows = (0..n_rows)
        .map(|row| encoded.iter().map(|col| col[row]).collect())
        .collect();
    Ok(FeatureMatrix::new(names, rows)?)
}

/// Encode a raw target column for `task`.
///
/// Classification targets become string labels (numbers rendered without a
/// trailing `.0`); regression targets must be numeric. Clustering targets
/// are labelled like classification ones and left for training to reject.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ExperimentError::MissingTargetValue`] | a target cell is missing |
/// | [`ExperimentError::NonNumericTarget`] | regression on a categorical column |
pub fn encode_target(column: &Column, task: TaskType) -> Result<Target, ExperimentError> {
    let missing = |row| ExperimentError::MissingTargetValue {
        column: column.name().to_string(),
        row,
    };
    match (task, column.data()) {
        (TaskType::Classification | TaskType::Clustering, data) => {
            let labels = (0..data.len())
                .map(|row| data.label(row).ok_or_else(|| missing(row)))
                .collect::<Result<_, _>>()?;
            Ok(Target::Labels(labels))
        }
        (TaskType::Regression, ColumnData::Numeric(values)) => {
            let values = values
                .iter()
                .enumerate()
                .map(|(row, v)| v.ok_or_else(|| missing(row)))
                .collect::<Result<_, _>>()?;
            Ok(Target::Values(values))
        }
        (TaskType::Regression, ColumnData::Categorical(_)) => Err(ExperimentError::NonNumericTarget {
            column: column.name().to_string(),
        }),
    }
}
