//! Model serialization and deserialization via bincode.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::ModelError;
use crate::model::TrainedModel;
use crate::task::TaskType;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope, written from a borrowed model.
///
/// Field order must match [`ModelEnvelope`].
#[derive(Serialize)]
struct ModelEnvelopeRef<'a> {
    format_version: u32,
    task: TaskType,
    n_features: usize,
    model: &'a TrainedModel,
}

/// Versioned envelope, read back into an owned model.
#[derive(Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    task: TaskType,
    n_features: usize,
    model: TrainedModel,
}

impl TrainedModel {
    /// Save the model to a binary file, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::SerializeModel`] | bincode encoding failed |
    /// | [`ModelError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<u64, ModelError> {
        let path = path.as_ref();

        let envelope = ModelEnvelopeRef {
            format_version: FORMAT_VERSION,
            task: self.task(),
            n_features: self.n_features(),
            model: self,
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| ModelError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| ModelError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(size_bytes = bytes.len(), task = %self.task(), "model saved");

        Ok(bytes.len() as u64)
    }

    /// Load a model from a binary file.
    ///
    /// The format version is checked before the model body is decoded.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::ReadModel`] | file read failed |
    /// | [`ModelError::DeserializeModel`] | bincode decoding failed |
    /// | [`ModelError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let decode_err = |e| ModelError::DeserializeModel {
            path: path.to_path_buf(),
            source: e,
        };

        let bytes = std::fs::read(path).map_err(|e| ModelError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let found: u32 = bincode::deserialize(&bytes).map_err(decode_err)?;
        if found != FORMAT_VERSION {
            return Err(ModelError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found,
                path: path.to_path_buf(),
            });
        }

        let envelope: ModelEnvelope = bincode::deserialize(&bytes).map_err(decode_err)?;

        debug!(
            format_version = envelope.format_version,
            task = %envelope.task,
            n_features = envelope.n_features,
            "model loaded"
        );

        Ok(envelope.model)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::data::{FeatureMatrix, Target};
    use crate::error::ModelError;
    use crate::model::TrainedModel;
    use crate::params::Hyperparameters;
    use crate::task::TaskType;

    fn train_simple_model() -> (TrainedModel, FeatureMatrix) {
        let rows = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        let labels = ["no", "no", "no", "yes", "yes", "yes"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let x = FeatureMatrix::new(vec!["x".into(), "y".into()], rows).unwrap();
        let model = Hyperparameters::default()
            .with_n_estimators(5)
            .fit(TaskType::Classification, &x, &Target::Labels(labels))
            .unwrap();
        (model, x)
    }

    #[test]
    fn round_trip_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.pkl");
        let (model, x) = train_simple_model();

        let size = model.save(&model_path).unwrap();
        assert_eq!(size, std::fs::metadata(&model_path).unwrap().len());

        let loaded = TrainedModel::load(&model_path).unwrap();
        assert_eq!(loaded.task(), TaskType::Classification);
        assert_eq!(loaded.feature_names(), model.feature_names());
        assert_eq!(loaded.classes(), model.classes());
        assert_eq!(loaded.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = TrainedModel::load(dir.path().join("missing.pkl")).unwrap_err();
        assert!(matches!(err, ModelError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.pkl");
        std::fs::write(&path, 1u32.to_le_bytes()).unwrap();
        let err = TrainedModel::load(&path).unwrap_err();
        assert!(matches!(err, ModelError::DeserializeModel { .. }));
    }

    #[test]
    fn load_future_version_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.pkl");
        std::fs::write(&path, 99u32.to_le_bytes()).unwrap();
        let err = TrainedModel::load(&path).unwrap_err();
        assert!(matches!(err, ModelError::IncompatibleModelVersion { found: 99, .. }));
    }
}
