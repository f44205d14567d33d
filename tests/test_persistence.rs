//! Integration test: model persistence round trips

use ndarray::array;
use tabflow::data::Dataset;
use tabflow::persist::{load_model, save_model, ModelArtifact};
use tabflow::tracking::ExperimentTracker;
use tabflow::training::{train_model, ModelFamily, ModelParams};

fn dataset() -> Dataset {
    Dataset {
        x_train: array![
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, 0.3],
            [0.3, 0.2],
            [2.0, 2.0],
            [2.2, 2.1],
            [2.1, 2.3],
            [2.3, 2.2],
        ],
        y_train: array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        x_test: array![[0.15, 0.15], [2.15, 2.15]],
        y_test: array![0.0, 1.0],
        feature_names: vec!["a".to_string(), "b".to_string()],
    }
}

#[test]
fn test_saved_file_follows_naming_contract() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::new(dir.path().join("runs")).unwrap();

    let mut params = ModelParams::new();
    params.insert("n_estimators", serde_json::json!(10));
    let (clf, _) = train_model(&dataset(), ModelFamily::RandomForest, &params, &tracker).unwrap();

    let artifact = ModelArtifact::new(clf, Some(dataset().feature_names));
    let path = save_model(
        &artifact,
        &dir.path().join("models"),
        "random_forest",
        "20250523_065425",
    )
    .unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "random_forest_20250523_065425.bin"
    );
    assert!(path.exists());
}

#[test]
fn test_reloaded_model_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::new(dir.path().join("runs")).unwrap();
    let data = dataset();

    let probe = array![
        [0.1, 0.1],
        [2.2, 2.2],
        [1.0, 1.0],
        [0.0, 2.0],
    ];

    for key in ["xgboost", "lgbm", "random_forest", "svm", "logistic_regression"] {
        let mut params = ModelParams::new();
        params.insert("n_estimators", serde_json::json!(15));
        params.insert("min_child_samples", serde_json::json!(1));

        let family = ModelFamily::parse(key).unwrap();
        let (clf, _) = train_model(&data, family, &params, &tracker).unwrap();

        let before = clf.predict(&probe).unwrap();
        let artifact = ModelArtifact::new(clf, Some(data.feature_names.clone()));

        let path = save_model(&artifact, &dir.path().join("models"), key, "t1").unwrap();
        let restored = load_model(&path).unwrap();

        assert_eq!(restored.family, family, "family {} survives round trip", key);
        assert_eq!(
            restored.classifier.predict(&probe).unwrap(),
            before,
            "family {} predictions must match after reload",
            key
        );
    }
}

#[test]
fn test_feature_names_survive_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::new(dir.path().join("runs")).unwrap();

    let mut params = ModelParams::new();
    params.insert("n_estimators", serde_json::json!(5));
    let (clf, _) = train_model(&dataset(), ModelFamily::Lgbm, &params, &tracker).unwrap();

    let artifact = ModelArtifact::new(clf, Some(vec!["a".to_string(), "b".to_string()]));
    let path = save_model(&artifact, dir.path(), "lgbm", "t1").unwrap();

    let restored = load_model(&path).unwrap();
    assert_eq!(
        restored.feature_names,
        Some(vec!["a".to_string(), "b".to_string()])
    );
}
