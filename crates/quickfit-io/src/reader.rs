//! CSV table reader with column type inference.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::domain::{Column, ColumnData, Table};
use crate::IoError;

/// Cell spellings read as missing values.
const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
    "#NA",
];

/// Whether a raw cell (after trimming) denotes a missing value.
#[must_use]
pub fn is_missing_marker(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

/// Reads a comma-separated table with a header row.
///
/// Column types are inferred after reading: a column is
/// [`ColumnData::Numeric`] when every non-missing cell parses as `f64`,
/// otherwise [`ColumnData::Categorical`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoColumns`] | Header row is empty |
/// | [`IoError::DuplicateColumn`] | Two header cells share a name |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
pub struct TableReader {
    path: PathBuf,
}

impl TableReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read, validate, and type the CSV file, returning a [`Table`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Table, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that ragged rows surface as InconsistentRowLength
        // rather than a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();
        if expected_cols == 0 || header.iter().all(str::is_empty) {
            return Err(IoError::NoColumns {
                path: self.path.clone(),
            });
        }
        let mut seen = HashSet::new();
        for name in &header {
            if !seen.insert(name) {
                return Err(IoError::DuplicateColumn {
                    path: self.path.clone(),
                    column: name.to_string(),
                });
            }
        }
        debug!(expected_cols, "read CSV header");

        // Column-major raw cells; None marks a missing value.
        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); expected_cols];

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            for (col, cell) in record.iter().enumerate() {
                let value = (!is_missing_marker(cell)).then(|| cell.to_string());
                raw[col].push(value);
            }
        }

        let n_rows = raw.first().map_or(0, Vec::len);
        if n_rows == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let columns: Vec<Column> = header
            .iter()
            .zip(raw)
            .map(|(name, cells)| Column::new(name, infer_column(cells)))
            .collect();

        let n_categorical = columns.iter().filter(|c| !c.data().is_numeric()).count();
        info!(
            n_rows,
            n_columns = columns.len(),
            n_categorical,
            "table loaded"
        );

        Table::new(columns)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

/// Type a column of raw cells: numeric if every present cell parses as `f64`.
fn infer_column(cells: Vec<Option<String>>) -> ColumnData {
    let parsed: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => s.trim().parse::<f64>().ok().map(Some),
        })
        .collect();
    match parsed {
        Some(values) => ColumnData::Numeric(values),
        None => ColumnData::Categorical(cells),
    }
}
