//! Tracked training pipeline
//!
//! One experiment run per invocation: params are logged before fitting, the
//! accuracy metric and artifacts (serialized model, confusion-matrix plot)
//! after. Failures mark the run failed and propagate unchanged.

use crate::data::Dataset;
use crate::error::Result;
use crate::persist::ModelArtifact;
use crate::tracking::{confusion_matrix_plot, ExperimentTracker, Run, RunStatus};
use super::classifier::Classifier;
use super::metrics::{accuracy, confusion_matrix};
use super::registry::{ModelFamily, ModelParams};
use ndarray::{Array1, Array2};
use tracing::{error, info};

/// Train a classifier of `family` on `dataset`, logging the invocation as a
/// single experiment run. Returns the fitted classifier and its test
/// accuracy.
pub fn train_model(
    dataset: &Dataset,
    family: ModelFamily,
    params: &ModelParams,
    tracker: &ExperimentTracker,
) -> Result<(Classifier, f64)> {
    let mut run = tracker.start_run(family.key())?;
    info!(model = %family, "Training the model");

    if !params.is_empty() {
        run.log_params(params);
    }

    let mut classifier = family.build(params);

    match fit_and_log(&mut classifier, dataset, &mut run) {
        Ok(acc) => {
            run.finish(RunStatus::Finished)?;
            Ok((classifier, acc))
        }
        Err(e) => {
            error!(model = %family, error = %e, "Error during training");
            run.finish(RunStatus::Failed)?;
            Err(e)
        }
    }
}

fn fit_and_log(classifier: &mut Classifier, dataset: &Dataset, run: &mut Run) -> Result<f64> {
    classifier.fit(&dataset.x_train, &dataset.y_train)?;
    info!(model = %classifier.family(), "Model trained successfully");

    let acc = evaluate_model(classifier, &dataset.x_test, &dataset.y_test)?;
    run.log_metric("accuracy", acc);

    // Serialized model, under a family-specific artifact path
    let artifact = ModelArtifact::new(classifier.clone(), Some(dataset.feature_names.clone()));
    let flavor = classifier.family().artifact_flavor();
    run.log_artifact_bytes(
        &format!("model/{}/model.bin", flavor),
        &artifact.to_bytes()?,
    )?;

    // Confusion matrix plot
    let preds = classifier.predict(&dataset.x_test)?;
    let (classes, cm) = confusion_matrix(&dataset.y_test, &preds)?;
    let plot = confusion_matrix_plot(&classes, &cm);
    run.log_artifact_string("confusion_matrix.html", &plot.to_html())?;

    Ok(acc)
}

/// Accuracy of `classifier` on held-out data. Pure apart from logging.
pub fn evaluate_model(
    classifier: &Classifier,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
) -> Result<f64> {
    info!("Evaluating the model");
    let preds = classifier.predict(x_test)?;
    let acc = accuracy(y_test, &preds)?;
    let rounded = format!("{:.4}", acc);
    info!(accuracy = %rounded, "Evaluation complete");
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_dataset() -> Dataset {
        Dataset {
            x_train: array![
                [0.0, 0.0],
                [0.1, 0.2],
                [0.2, 0.1],
                [0.9, 1.0],
                [1.0, 0.9],
                [1.1, 1.1],
            ],
            y_train: array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            x_test: array![[0.05, 0.05], [1.05, 1.05]],
            y_test: array![0.0, 1.0],
            feature_names: vec!["f1".to_string(), "f2".to_string()],
        }
    }

    #[test]
    fn test_pipeline_produces_run_record() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::new(dir.path()).unwrap();
        let dataset = small_dataset();

        let mut params = ModelParams::new();
        params.insert("n_estimators", serde_json::json!(10));

        let (clf, acc) = train_model(&dataset, ModelFamily::RandomForest, &params, &tracker).unwrap();
        assert_eq!(clf.n_features(), 2);
        assert!((0.0..=1.0).contains(&acc));

        // Exactly one run directory with a finished record and both artifacts
        let run_dirs: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(run_dirs.len(), 1);

        let record: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(run_dirs[0].join("run.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(record["status"], "finished");
        assert_eq!(record["params"]["n_estimators"], "10");
        assert!(record["metrics"]["accuracy"].as_f64().unwrap() >= 0.0);
        assert!(run_dirs[0]
            .join("artifacts/model/native/model.bin")
            .exists());
        assert!(run_dirs[0].join("artifacts/confusion_matrix.html").exists());
    }

    #[test]
    fn test_evaluation_is_row_order_invariant() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::new(dir.path()).unwrap();
        let dataset = small_dataset();

        let mut params = ModelParams::new();
        params.insert("n_estimators", serde_json::json!(10));
        let (clf, _) = train_model(&dataset, ModelFamily::Xgboost, &params, &tracker).unwrap();

        let x = array![[0.0, 0.1], [1.0, 1.0], [0.2, 0.0], [0.9, 1.1]];
        let y = array![0.0, 1.0, 0.0, 1.0];
        let forward = evaluate_model(&clf, &x, &y).unwrap();

        let x_rev = array![[0.9, 1.1], [0.2, 0.0], [1.0, 1.0], [0.0, 0.1]];
        let y_rev = array![1.0, 0.0, 1.0, 0.0];
        let reversed = evaluate_model(&clf, &x_rev, &y_rev).unwrap();

        assert_eq!(forward, reversed);
    }
}
