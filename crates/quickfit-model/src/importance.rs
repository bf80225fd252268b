//! Permutation-based feature importance.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::data::{FeatureMatrix, Target};
use crate::error::ModelError;
use crate::model::TrainedModel;

/// Shuffles per feature when no count is given.
pub const DEFAULT_IMPORTANCE_REPEATS: usize = 5;

/// Permutation importance result for a single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Feature name.
    pub name: String,
    /// Mean score drop when this feature is permuted.
    pub importance: f64,
    /// Standard deviation of the score drop across repeats.
    pub std: f64,
    /// Rank (1 = most important).
    pub rank: usize,
}

/// For each feature and each repeat:
/// 1. Shuffle the feature column with a seed derived from `(feature, repeat)`
/// 2. Score the model on the shuffled data
/// 3. Drop = baseline score - shuffled score
///
/// Importance is the mean drop; std is the population std (ddof=0).
/// Features are scored in parallel on the global rayon pool.
#[instrument(skip_all, fields(n_features = features.n_features(), repeats = repeats))]
pub(crate) fn permutation_importance(
    model: &TrainedModel,
    features: &FeatureMatrix,
    target: &Target,
    repeats: usize,
    seed: u64,
) -> Result<Vec<FeatureImportance>, ModelError> {
    let repeats = repeats.max(1);
    let baseline = model.score(features, target)?;
    debug!(baseline, "baseline score");

    let n_features = features.n_features();
    let drops: Vec<Vec<f64>> = (0..n_features)
        .into_par_iter()
        .map(|feat_idx| {
            let column = features.column(feat_idx);
            (0..repeats)
                .map(|r| {
                    let rng_seed = seed
                        .wrapping_add((feat_idx as u64).wrapping_mul(repeats as u64))
                        .wrapping_add(r as u64);
                    let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
                    let mut shuffled = column.clone();
                    shuffled.shuffle(&mut rng);
                    let permuted = features.with_column(feat_idx, &shuffled);
                    model.score(&permuted, target).map(|s| baseline - s)
                })
                .collect::<Result<Vec<f64>, ModelError>>()
        })
        .collect::<Result<_, _>>()?;

    let mut results: Vec<FeatureImportance> = drops
        .iter()
        .zip(features.names())
        .map(|(values, name)| {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n;
            FeatureImportance {
                name: name.clone(),
                importance: mean,
                std: variance.sqrt(),
                rank: 0,
            }
        })
        .collect();

    // Stable sort keeps column order among ties.
    results.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, result) in results.iter_mut().enumerate() {
        result.rank = i + 1;
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use crate::data::{FeatureMatrix, Target};
    use crate::params::Hyperparameters;
    use crate::task::TaskType;

    /// Feature 0 separates the classes, feature 1 is noise.
    fn make_data() -> (FeatureMatrix, Target) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (class, offset) in [("a", 0.0), ("b", 10.0), ("c", 20.0)] {
            for i in 0..30 {
                rows.push(vec![offset + i as f64 * 0.1, (i % 3) as f64]);
                labels.push(class.to_string());
            }
        }
        let names = vec!["informative".to_string(), "noise".to_string()];
        (FeatureMatrix::new(names, rows).unwrap(), Target::Labels(labels))
    }

    #[test]
    fn informative_feature_ranks_first() {
        let (x, y) = make_data();
        let model = Hyperparameters::default()
            .with_n_estimators(20)
            .fit(TaskType::Classification, &x, &y)
            .unwrap();
        let imp = model.feature_importances(&x, &y, 5, 42).unwrap();

        assert_eq!(imp.len(), 2);
        assert_eq!(imp[0].name, "informative");
        assert_eq!(imp[0].rank, 1);
        assert_eq!(imp[1].rank, 2);
        assert!(imp[0].importance > imp[1].importance);
        assert!(imp[0].importance > 0.3, "importance = {}", imp[0].importance);
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let (x, y) = make_data();
        let model = Hyperparameters::default()
            .with_n_estimators(10)
            .fit(TaskType::Classification, &x, &y)
            .unwrap();
        let a = model.feature_importances(&x, &y, 3, 7).unwrap();
        let b = model.feature_importances(&x, &y, 3, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn regression_importances_use_r2() {
        let rows: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64, 1.0]).collect();
        let values: Vec<f64> = (0..50).map(|i| 2.0 * i as f64).collect();
        let x = FeatureMatrix::new(vec!["x".into(), "flat".into()], rows).unwrap();
        let y = Target::Values(values);
        let model = Hyperparameters::default()
            .with_n_estimators(10)
            .fit(TaskType::Regression, &x, &y)
            .unwrap();
        let imp = model.feature_importances(&x, &y, 2, 1).unwrap();

        assert_eq!(imp[0].name, "x");
        // A constant column shuffles to itself.
        let flat = imp.iter().find(|f| f.name == "flat").unwrap();
        assert_eq!(flat.importance, 0.0);
        assert_eq!(flat.std, 0.0);
    }
}
