//! Accuracy regression tests for quickfit-model.
//!
//! Guard against changes that degrade fitted-model quality on deterministic
//! synthetic datasets.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use quickfit_model::{FeatureMatrix, Hyperparameters, Scores, Target, TaskType, TrainTestSplit};

// ---------------------------------------------------------------------------
// Helpers: deterministic synthetic datasets
// ---------------------------------------------------------------------------

/// 300 samples, 10 features, 3 classes.
///
/// Features 0-2 are informative (class * 3.0 + noise in [0, 0.5]).
/// Features 3-9 are pure noise in [0, 0.5].
fn make_classification() -> (FeatureMatrix, Target) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n_features = 10;
    let classes = ["setosa", "versicolor", "virginica"];

    let mut rows = Vec::with_capacity(300);
    let mut labels = Vec::with_capacity(300);
    for i in 0..300 {
        let class = i % classes.len();
        labels.push(classes[class].to_string());
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                base + rng.r#gen::<f64>() * 0.5
            })
            .collect();
        rows.push(row);
    }
    let names = (0..n_features).map(|f| format!("f{f}")).collect();
    (FeatureMatrix::new(names, rows).unwrap(), Target::Labels(labels))
}

/// 200 samples, y = 4*x0 - 2*x1 + noise, with a third pure-noise feature.
fn make_regression() -> (FeatureMatrix, Target) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut rows = Vec::with_capacity(200);
    let mut values = Vec::with_capacity(200);
    for _ in 0..200 {
        let x0 = rng.r#gen::<f64>() * 10.0;
        let x1 = rng.r#gen::<f64>() * 10.0;
        let noise = rng.r#gen::<f64>();
        values.push(4.0 * x0 - 2.0 * x1 + noise);
        rows.push(vec![x0, x1, rng.r#gen::<f64>()]);
    }
    let names = vec!["x0".into(), "x1".into(), "noise".into()];
    (FeatureMatrix::new(names, rows).unwrap(), Target::Values(values))
}

fn held_out(x: &FeatureMatrix, y: &Target) -> (FeatureMatrix, Target, FeatureMatrix, Target) {
    let split = TrainTestSplit::new(0.2).unwrap().split(x.n_samples()).unwrap();
    (
        x.select_rows(&split.train),
        y.select(&split.train),
        x.select_rows(&split.test),
        y.select(&split.test),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Held-out accuracy must exceed 0.9 on well-separated classes.
#[test]
fn classification_holdout_accuracy() {
    let (x, y) = make_classification();
    let (x_train, y_train, x_test, y_test) = held_out(&x, &y);
    let model = Hyperparameters::default()
        .fit(TaskType::Classification, &x_train, &y_train)
        .unwrap();

    let Scores::Classification(s) = model.evaluate(&x_test, &y_test).unwrap() else {
        panic!("expected classification scores");
    };
    assert!(s.accuracy > 0.9, "holdout accuracy {} <= 0.9", s.accuracy);
    assert!(s.f1 > 0.9, "holdout f1 {} <= 0.9", s.f1);
}

/// Held-out R² must exceed 0.8 on a noisy linear target.
#[test]
fn regression_holdout_r2() {
    let (x, y) = make_regression();
    let (x_train, y_train, x_test, y_test) = held_out(&x, &y);
    let model = Hyperparameters::default()
        .with_n_estimators(50)
        .fit(TaskType::Regression, &x_train, &y_train)
        .unwrap();

    let Scores::Regression(s) = model.evaluate(&x_test, &y_test).unwrap() else {
        panic!("expected regression scores");
    };
    assert!(s.r2 > 0.8, "holdout r2 {} <= 0.8", s.r2);
    assert!(s.mae < s.mse.sqrt() + 1e-9, "mae should not exceed rmse");
}

/// Informative features must outrank the noise features.
#[test]
fn importance_prefers_informative_features() {
    let (x, y) = make_regression();
    let model = Hyperparameters::default()
        .with_n_estimators(30)
        .fit(TaskType::Regression, &x, &y)
        .unwrap();
    let imp = model.feature_importances(&x, &y, 3, 42).unwrap();

    assert_eq!(imp[0].name, "x0");
    assert_eq!(imp.last().unwrap().name, "noise");
}

/// Same seed, same predictions.
#[test]
fn fitting_is_deterministic() {
    let (x, y) = make_classification();
    let params = Hyperparameters::default().with_n_estimators(20).with_random_state(3);
    let a = params.fit(TaskType::Classification, &x, &y).unwrap();
    let b = params.fit(TaskType::Classification, &x, &y).unwrap();
    assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
}
