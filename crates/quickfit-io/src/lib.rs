//! CSV table loading, validation, and JSON result writing for quickfit.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{Column, ColumnData, ExperimentName, Table};
pub use error::IoError;
pub use reader::{is_missing_marker, TableReader};
pub use writer::ResultWriter;
