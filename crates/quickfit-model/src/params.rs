//! Typed random-forest hyperparameters.

use serde::{Deserialize, Serialize};

use crate::data::{FeatureMatrix, Target};
use crate::error::ModelError;
use crate::model::TrainedModel;
use crate::task::TaskType;

/// Names accepted by [`Hyperparameters::set`].
const RECOGNIZED: &str =
    "n_estimators, max_depth, min_samples_split, min_samples_leaf, max_features, random_state";

/// Hyperparameters for random-forest fitting.
///
/// Construct via [`Hyperparameters::default`] and chain `with_*` methods, or
/// parse `key=value` options with [`Hyperparameters::from_pairs`]. Unknown
/// option names are rejected rather than ignored.
///
/// # Defaults
///
/// | Option              | Default |
/// |---------------------|---------|
/// | `n_estimators`      | 100     |
/// | `max_depth`         | `None`  |
/// | `min_samples_split` | 2       |
/// | `min_samples_leaf`  | 1       |
/// | `max_features`      | `None` (all features) |
/// | `random_state`      | 42      |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub(crate) n_estimators: usize,
    pub(crate) max_depth: Option<u16>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) random_state: u64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: 42,
        }
    }
}

impl Hyperparameters {
    /// Parse a list of `key=value` options on top of the defaults.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::MalformedOption`] | an entry has no `=` |
    /// | [`ModelError::UnrecognizedOption`] | a key is not a known option |
    /// | [`ModelError::InvalidOptionValue`] | a value does not parse |
    /// | [`ModelError::InvalidTreeCount`] | `n_estimators` out of range |
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::default();
        for pair in pairs {
            let raw = pair.as_ref();
            let (key, value) = raw.split_once('=').ok_or_else(|| ModelError::MalformedOption {
                raw: raw.to_string(),
            })?;
            params.set(key.trim(), value.trim())?;
        }
        params.validate()?;
        Ok(params)
    }

    /// Set one option by name from its string value.
    ///
    /// `max_depth` and `max_features` accept `none` to clear the limit.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnrecognizedOption`] for unknown names and
    /// [`ModelError::InvalidOptionValue`] for unparseable values.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ModelError> {
        let invalid = || ModelError::InvalidOptionValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        match name {
            "n_estimators" => self.n_estimators = value.parse().map_err(|_| invalid())?,
            "max_depth" => self.max_depth = parse_optional(value).map_err(|_| invalid())?,
            "min_samples_split" => {
                self.min_samples_split = value.parse().map_err(|_| invalid())?;
                if self.min_samples_split < 2 {
                    return Err(invalid());
                }
            }
            "min_samples_leaf" => {
                self.min_samples_leaf = value.parse().map_err(|_| invalid())?;
                if self.min_samples_leaf < 1 {
                    return Err(invalid());
                }
            }
            "max_features" => {
                self.max_features = parse_optional(value).map_err(|_| invalid())?;
                if self.max_features == Some(0) {
                    return Err(invalid());
                }
            }
            "random_state" => self.random_state = value.parse().map_err(|_| invalid())?,
            _ => {
                return Err(ModelError::UnrecognizedOption {
                    name: name.to_string(),
                    expected: RECOGNIZED,
                });
            }
        }
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTreeCount`] if `n_estimators` is zero or
    /// larger than `u16::MAX`.
    pub fn validate(&self) -> Result<(), ModelError> {
        let max = usize::from(u16::MAX);
        if self.n_estimators == 0 || self.n_estimators > max {
            return Err(ModelError::InvalidTreeCount {
                n_trees: self.n_estimators,
                max,
            });
        }
        Ok(())
    }

    // --- Setters ---

    /// Set the number of trees in the ensemble.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<u16>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features considered at each split.
    ///
    /// `None` considers every feature. smartcore seeds all trees of a forest
    /// identically, so its own `sqrt(p)` default would hand each tree the
    /// same feature subset and can miss every informative column.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<u16> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the per-split feature count, if set; `None` means all features.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn random_state(&self) -> u64 {
        self.random_state
    }

    /// Fit a model for `task` on the given features and target.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ModelError::UnsupportedTask`] | `task` is [`TaskType::Clustering`] |
    /// | [`ModelError::InvalidTreeCount`] | `n_estimators` out of range |
    /// | [`ModelError::EmptyDataset`] | zero samples |
    /// | [`ModelError::TargetLengthMismatch`] | target and rows differ in length |
    /// | [`ModelError::TargetKindMismatch`] | target kind does not suit `task` |
    /// | [`ModelError::Fit`] | the forest library rejects the data |
    pub fn fit(
        &self,
        task: TaskType,
        features: &FeatureMatrix,
        target: &Target,
    ) -> Result<TrainedModel, ModelError> {
        crate::model::fit(self, task, features, target)
    }
}

fn parse_optional<T: std::str::FromStr>(value: &str) -> Result<Option<T>, T::Err> {
    if value.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}
