//! Integration test: training pipeline across all model families

use ndarray::{array, Array1, Array2};
use tabflow::data::Dataset;
use tabflow::tracking::ExperimentTracker;
use tabflow::training::{evaluate_model, train_model, ModelFamily, ModelParams, REGISTRY};
use tabflow::TabflowError;

fn classification_dataset() -> Dataset {
    // Two well-separated clusters
    let x_train = array![
        [1.0, 10.0, 0.1],
        [2.0, 9.0, 0.2],
        [3.0, 8.0, 0.3],
        [4.0, 7.0, 0.4],
        [5.0, 6.0, 0.5],
        [1.5, 9.5, 0.15],
        [2.5, 8.5, 0.25],
        [3.5, 7.5, 0.35],
        [6.0, 5.0, 0.6],
        [7.0, 4.0, 0.7],
        [8.0, 3.0, 0.8],
        [9.0, 2.0, 0.9],
        [10.0, 1.0, 1.0],
        [6.5, 4.5, 0.65],
        [7.5, 3.5, 0.75],
        [8.5, 2.5, 0.85],
    ];
    let y_train = array![
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0
    ];
    let x_test = array![[2.0, 8.8, 0.2], [9.5, 1.5, 0.95], [3.0, 8.2, 0.3], [7.2, 3.8, 0.72]];
    let y_test = array![0.0, 1.0, 0.0, 1.0];

    Dataset {
        x_train,
        y_train,
        x_test,
        y_test,
        feature_names: vec!["f1".to_string(), "f2".to_string(), "f3".to_string()],
    }
}

fn quick_params() -> ModelParams {
    let mut params = ModelParams::new();
    params.insert("n_estimators", serde_json::json!(20));
    params.insert("min_child_samples", serde_json::json!(2));
    params
}

#[test]
fn test_every_family_trains_and_predicts() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::new(dir.path()).unwrap();
    let dataset = classification_dataset();

    for key in ["xgboost", "lgbm", "random_forest", "svm", "logistic_regression"] {
        let family = ModelFamily::parse(key).unwrap();
        let (clf, acc) = train_model(&dataset, family, &quick_params(), &tracker)
            .unwrap_or_else(|e| panic!("family {} should train: {}", key, e));

        let preds = clf.predict(&dataset.x_test).unwrap();
        assert_eq!(preds.len(), dataset.x_test.nrows(), "family {}", key);
        assert!(
            preds.iter().all(|&p| p == 0.0 || p == 1.0),
            "family {} predictions must be binary",
            key
        );
        assert!((0.0..=1.0).contains(&acc), "family {} accuracy", key);
    }
}

#[test]
fn test_gbdt_alias_selects_lgbm() {
    assert_eq!(ModelFamily::parse("gbdt").unwrap(), ModelFamily::Lgbm);
    assert_eq!(ModelFamily::parse("lgbm").unwrap(), ModelFamily::Lgbm);
}

#[test]
fn test_unknown_family_fails_naming_the_key() {
    let err = ModelFamily::parse("perceptron").unwrap_err();
    assert!(matches!(err, TabflowError::UnsupportedModel(_)));
    assert!(err.to_string().contains("perceptron"));
}

#[test]
fn test_registry_covers_all_families() {
    let families: Vec<ModelFamily> = REGISTRY.iter().map(|entry| entry.family).collect();
    assert_eq!(families.len(), 5);
}

#[test]
fn test_accuracy_invariant_to_row_order() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::new(dir.path()).unwrap();
    let dataset = classification_dataset();

    let (clf, _) = train_model(
        &dataset,
        ModelFamily::RandomForest,
        &quick_params(),
        &tracker,
    )
    .unwrap();

    let n = dataset.x_test.nrows();
    let reversed: Vec<usize> = (0..n).rev().collect();
    let x_rev: Array2<f64> = dataset.x_test.select(ndarray::Axis(0), &reversed);
    let y_rev: Array1<f64> =
        Array1::from_vec(reversed.iter().map(|&i| dataset.y_test[i]).collect());

    let forward = evaluate_model(&clf, &dataset.x_test, &dataset.y_test).unwrap();
    let backward = evaluate_model(&clf, &x_rev, &y_rev).unwrap();
    assert_eq!(forward, backward);
}

#[test]
fn test_run_records_params_metric_and_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::new(dir.path()).unwrap();
    let dataset = classification_dataset();

    let mut params = ModelParams::new();
    params.insert("n_estimators", serde_json::json!(15));
    params.insert("random_state", serde_json::json!(7));

    train_model(&dataset, ModelFamily::Xgboost, &params, &tracker).unwrap();

    let run_dirs: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(run_dirs.len(), 1, "one invocation, one run");

    let record: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(run_dirs[0].join("run.json")).unwrap())
            .unwrap();
    assert_eq!(record["run_name"], "xgboost");
    assert_eq!(record["status"], "finished");
    assert_eq!(record["params"]["n_estimators"], "15");
    assert!(record["metrics"]["accuracy"].is_f64() || record["metrics"]["accuracy"].is_u64());
    assert!(run_dirs[0].join("artifacts/model/xgboost/model.bin").exists());
    assert!(run_dirs[0].join("artifacts/confusion_matrix.html").exists());
}

#[test]
fn test_random_forest_params_override() {
    let mut params = ModelParams::new();
    params.insert("n_estimators", serde_json::json!(12));

    match ModelFamily::RandomForest.build(&params) {
        tabflow::training::Classifier::RandomForest(forest) => {
            assert_eq!(forest.n_estimators, 12);
            assert_eq!(forest.random_state, Some(42));
        }
        other => panic!("wrong classifier: {:?}", other.family()),
    }
}
