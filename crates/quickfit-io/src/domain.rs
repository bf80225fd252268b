//! Domain types for quickfit-io.

use std::collections::HashSet;
use std::fmt;

use crate::IoError;

/// A validated experiment name used as the output directory name.
///
/// Any non-empty single path component other than `.` and `..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty, is
    /// `.` or `..`, or contains a path separator or NUL.
    pub fn new(name: impl Into<String>) -> Result<Self, IoError> {
        let name = name.into();
        if matches!(name.as_str(), "" | "." | "..")
            || name.contains(['/', '\\', '\0'])
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cell values of one column, typed by what the whole column parses as.
///
/// `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Every non-missing cell parsed as a float.
    Numeric(Vec<Option<f64>>),
    /// At least one non-missing cell is not a number.
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    /// Number of cells (rows) in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    /// Whether the column has zero cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the column is numeric.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Whether the cell at `row` is missing.
    #[must_use]
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Numeric(v) => v[row].is_none(),
            Self::Categorical(v) => v[row].is_none(),
        }
    }

    /// Render the cell at `row` as a label string, or `None` if missing.
    ///
    /// Whole-valued floats render without a fractional part (`1.0` → `"1"`).
    /// `-0.0` renders as `"0"`, matching [`ColumnData::n_distinct`].
    #[must_use]
    pub fn label(&self, row: usize) -> Option<String> {
        match self {
            Self::Numeric(v) => v[row].map(|x| if x == 0.0 { 0.0 } else { x }.to_string()),
            Self::Categorical(v) => v[row].clone(),
        }
    }

    /// Count distinct non-missing values.
    #[must_use]
    pub fn n_distinct(&self) -> usize {
        match self {
            Self::Numeric(v) => v
                .iter()
                .flatten()
                // -0.0 and 0.0 compare equal, so fold them before hashing bits.
                .map(|&x| if x == 0.0 { 0.0f64.to_bits() } else { x.to_bits() })
                .collect::<HashSet<u64>>()
                .len(),
            Self::Categorical(v) => v.iter().flatten().collect::<HashSet<&String>>().len(),
        }
    }

    /// Gather the given rows into a new column, in the order given.
    #[must_use]
    pub fn select(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(rows.iter().map(|&r| v[r]).collect()),
            Self::Categorical(v) => Self::Categorical(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }
}

/// A named column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    /// Create a column from a name and its cells.
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the column cells.
    #[must_use]
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Consume the column, returning its cells.
    #[must_use]
    pub fn into_data(self) -> ColumnData {
        self.data
    }
}

/// A rectangular dataset of named, typed columns.
///
/// Produced by [`TableReader`](crate::TableReader). Columns keep the header
/// order of the source file; all columns have the same number of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Assemble a table from columns.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ColumnLengthMismatch`] if the columns disagree on
    /// row count.
    pub fn new(columns: Vec<Column>) -> Result<Self, IoError> {
        let n_rows = columns.first().map_or(0, |c| c.data.len());
        if let Some(bad) = columns.iter().find(|c| c.data.len() != n_rows) {
            return Err(IoError::ColumnLengthMismatch {
                column: bad.name.clone(),
                expected: n_rows,
                got: bad.data.len(),
            });
        }
        Ok(Self { columns, n_rows })
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Return the columns in header order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Return the column names in header order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Remove and return the named column, or `None` if absent.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// Remove and return the last column, or `None` if the table has none.
    pub fn pop_column(&mut self) -> Option<Column> {
        self.columns.pop()
    }

    /// Gather the given rows into a new table, in the order given.
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.select(rows)))
                .collect(),
            n_rows: rows.len(),
        }
    }

    /// Drop rows in which every cell is missing.
    ///
    /// Returns the filtered table and the number of rows dropped.
    #[must_use]
    pub fn drop_empty_rows(self) -> (Self, usize) {
        let keep: Vec<usize> = (0..self.n_rows)
            .filter(|&row| !self.columns.iter().all(|c| c.data.is_missing(row)))
            .collect();
        let dropped = self.n_rows - keep.len();
        if dropped == 0 {
            return (self, 0);
        }
        (self.select_rows(&keep), dropped)
    }
}
