//! Training throughput across model families

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tabflow::training::{ModelFamily, ModelParams};

fn synthetic_data(n_samples: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let x: Array2<f64> = Array2::from_shape_fn((n_samples, n_features), |_| rng.gen());
    let y: Array1<f64> = x
        .rows()
        .into_iter()
        .map(|row| if row.sum() > n_features as f64 / 2.0 { 1.0 } else { 0.0 })
        .collect();
    (x, y)
}

fn bench_training(c: &mut Criterion) {
    let (x, y) = synthetic_data(200, 7);

    let mut params = ModelParams::new();
    params.insert("n_estimators", serde_json::json!(20));
    params.insert("min_child_samples", serde_json::json!(5));
    params.insert("max_iter", serde_json::json!(200));

    let mut group = c.benchmark_group("fit");
    for family in [
        ModelFamily::Xgboost,
        ModelFamily::Lgbm,
        ModelFamily::RandomForest,
        ModelFamily::Svm,
        ModelFamily::LogisticRegression,
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(family), &family, |b, family| {
            b.iter(|| {
                let mut clf = family.build(&params);
                clf.fit(&x, &y).unwrap();
                clf
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_training);
criterion_main!(benches);
