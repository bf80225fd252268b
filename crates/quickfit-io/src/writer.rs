//! Per-experiment output directory and JSON document writer.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::ExperimentName;
use crate::IoError;

/// Writes experiment artifacts under `{output_dir}/{experiment}/`.
///
/// Creates the experiment directory (and any missing parents) on
/// construction. Existing files in the directory are overwritten by name,
/// never deleted.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a writer for `experiment` under `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        let dir = output_dir.join(experiment.as_str());
        fs::create_dir_all(&dir).map_err(|e| IoError::OutputDirCreate {
            path: dir.clone(),
            source: e,
        })?;
        debug!("experiment directory ready");
        Ok(Self { dir, experiment })
    }

    /// Return the experiment directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the experiment name.
    #[must_use]
    pub fn experiment(&self) -> &ExperimentName {
        &self.experiment
    }

    /// Return the path `filename` would occupy inside the experiment directory.
    ///
    /// Does not write anything.
    #[must_use]
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Write `document` as pretty-printed JSON to `filename`, returning its path.
    ///
    /// The file handle is flushed and closed before returning, on success
    /// and on error alike.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::WriteFile`] | file cannot be created or flushed |
    /// | [`IoError::EncodeJson`] | `document` fails to serialize |
    #[instrument(skip(self, document))]
    pub fn write_json<T: Serialize>(&self, filename: &str, document: &T) -> Result<PathBuf, IoError> {
        let path = self.path_for(filename);
        let write_err = |e: std::io::Error| IoError::WriteFile {
            path: path.clone(),
            source: e,
        };

        let file = fs::File::create(&path).map_err(write_err)?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, document).map_err(|e| IoError::EncodeJson {
            path: path.clone(),
            source: e,
        })?;
        out.write_all(b"\n").map_err(write_err)?;
        out.flush().map_err(write_err)?;

        info!(path = %path.display(), "JSON document written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn creates_nested_experiment_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let writer = ResultWriter::new(&nested, ExperimentName::new("exp_1").unwrap()).unwrap();
        assert!(nested.join("exp_1").is_dir());
        assert_eq!(writer.dir(), nested.join("exp_1"));
    }

    #[test]
    fn existing_dir_is_reused() {
        let dir = TempDir::new().unwrap();
        let name = ExperimentName::new("again").unwrap();
        ResultWriter::new(dir.path(), name.clone()).unwrap();
        assert!(ResultWriter::new(dir.path(), name).is_ok());
    }

    #[test]
    fn path_for_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("p").unwrap()).unwrap();
        let path = writer.path_for("model.pkl");
        assert_eq!(path, dir.path().join("p").join("model.pkl"));
        assert!(!path.exists());
    }

    #[test]
    fn write_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("json").unwrap()).unwrap();
        let mut doc = BTreeMap::new();
        doc.insert("accuracy", 0.75);
        let path = writer.write_json("results.json", &doc).unwrap();

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content["accuracy"], 0.75);
    }

    #[test]
    fn create_dir_fails_under_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let err = ResultWriter::new(&blocker, ExperimentName::new("x").unwrap()).unwrap_err();
        assert!(matches!(err, IoError::OutputDirCreate { .. }));
    }
}
