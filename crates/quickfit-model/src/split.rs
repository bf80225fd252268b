//! Seeded shuffle-and-split into train and test partitions.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::ModelError;

/// Row indices for each side of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Training rows, in shuffled order.
    pub train: Vec<usize>,
    /// Held-out rows, in shuffled order.
    pub test: Vec<usize>,
}

/// Train/test split configuration.
///
/// The test side receives `ceil(test_size * n)` rows; the rest train. Both
/// sides must end up non-empty. The same seed and row count always produce
/// the same partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainTestSplit {
    test_size: f64,
    seed: u64,
}

impl TrainTestSplit {
    /// Create a split holding out `test_size` of the rows.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTestSize`] unless `0 < test_size < 1`.
    pub fn new(test_size: f64) -> Result<Self, ModelError> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(ModelError::InvalidTestSize { test_size });
        }
        Ok(Self {
            test_size,
            seed: 42,
        })
    }

    /// Set the shuffle seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the held-out fraction.
    #[must_use]
    pub fn test_size(&self) -> f64 {
        self.test_size
    }

    /// Return the shuffle seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Partition `0..n_samples`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SplitTooSmall`] if either side would be empty.
    pub fn split(&self, n_samples: usize) -> Result<SplitIndices, ModelError> {
        let n_test = (self.test_size * n_samples as f64).ceil() as usize;
        if n_test == 0 || n_test >= n_samples {
            return Err(ModelError::SplitTooSmall {
                n_samples,
                test_size: self.test_size,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut indices: Vec<usize> = (0..n_samples).collect();
        indices.shuffle(&mut rng);

        let train = indices.split_off(n_test);
        Ok(SplitIndices {
            train,
            test: indices,
        })
    }
}
