//! Unified fitted-classifier type
//!
//! One serializable enum over the five families so persistence and serving
//! stay family-agnostic: everything downstream only needs `predict` and a
//! best-effort `predict_proba`.

use crate::error::{Result, TabflowError};
use super::lightgbm::LgbmClassifier;
use super::logistic::LogisticRegression;
use super::random_forest::RandomForestClassifier;
use super::registry::ModelFamily;
use super::svm::SvmClassifier;
use super::xgboost::XgbClassifier;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    Xgboost(XgbClassifier),
    Lgbm(LgbmClassifier),
    RandomForest(RandomForestClassifier),
    Svm(SvmClassifier),
    LogisticRegression(LogisticRegression),
}

impl Classifier {
    pub fn family(&self) -> ModelFamily {
        match self {
            Classifier::Xgboost(_) => ModelFamily::Xgboost,
            Classifier::Lgbm(_) => ModelFamily::Lgbm,
            Classifier::RandomForest(_) => ModelFamily::RandomForest,
            Classifier::Svm(_) => ModelFamily::Svm,
            Classifier::LogisticRegression(_) => ModelFamily::LogisticRegression,
        }
    }

    /// Concrete estimator type name, for metadata endpoints.
    pub fn class_name(&self) -> &'static str {
        match self {
            Classifier::Xgboost(_) => "XgbClassifier",
            Classifier::Lgbm(_) => "LgbmClassifier",
            Classifier::RandomForest(_) => "RandomForestClassifier",
            Classifier::Svm(_) => "SvmClassifier",
            Classifier::LogisticRegression(_) => "LogisticRegression",
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::Xgboost(m) => m.fit(x, y),
            Classifier::Lgbm(m) => m.fit(x, y),
            Classifier::RandomForest(m) => m.fit(x, y).map(|_| ()),
            Classifier::Svm(m) => m.fit(x, y),
            Classifier::LogisticRegression(m) => m.fit(x, y),
        }
    }

    /// Predicted class labels (0.0 or 1.0).
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        match self {
            Classifier::Xgboost(m) => m.predict(x),
            Classifier::Lgbm(m) => m.predict(x),
            Classifier::RandomForest(m) => m.predict(x),
            Classifier::Svm(m) => m.predict(x),
            Classifier::LogisticRegression(m) => m.predict(x),
        }
    }

    /// Positive-class probabilities. Errors for families without probability
    /// estimates (SVM); callers decide whether that is fatal.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        match self {
            Classifier::Xgboost(m) => m.predict_proba(x),
            Classifier::Lgbm(m) => m.predict_proba(x),
            Classifier::RandomForest(m) => m.predict_proba(x),
            Classifier::Svm(m) => m.predict_proba(x),
            Classifier::LogisticRegression(m) => m.predict_proba(x),
        }
    }

    /// Input narrower or wider than the fitted model must surface as an
    /// error, not an index panic inside an estimator.
    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        let expected = self.n_features();
        if expected != 0 && x.ncols() != expected {
            return Err(TabflowError::ShapeError {
                expected: format!("{} features", expected),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Number of features the model was fitted on (0 before fitting).
    pub fn n_features(&self) -> usize {
        match self {
            Classifier::Xgboost(m) => m.n_features(),
            Classifier::Lgbm(m) => m.n_features(),
            Classifier::RandomForest(m) => m.n_features(),
            Classifier::Svm(m) => m.n_features(),
            Classifier::LogisticRegression(m) => m.n_features(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::registry::ModelParams;
    use ndarray::array;

    #[test]
    fn test_width_mismatch_is_an_error_not_a_panic() {
        let x = array![[0.0, 0.0], [1.0, 1.0], [0.1, 0.0], [1.1, 1.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut clf = ModelFamily::LogisticRegression.build(&ModelParams::new());
        clf.fit(&x, &y).unwrap();

        let wide = array![[0.0, 0.0, 0.0]];
        assert!(clf.predict(&wide).is_err());
        assert!(clf.predict_proba(&wide).is_err());
    }

    #[test]
    fn test_every_family_round_trips_through_enum() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [0.9, 1.0],
            [1.0, 0.9],
            [1.1, 1.1],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut params = ModelParams::new();
        params.insert("n_estimators", serde_json::json!(10));

        for family in [
            ModelFamily::Xgboost,
            ModelFamily::Lgbm,
            ModelFamily::RandomForest,
            ModelFamily::Svm,
            ModelFamily::LogisticRegression,
        ] {
            let mut clf = family.build(&params);
            clf.fit(&x, &y).unwrap();
            let preds = clf.predict(&x).unwrap();
            assert_eq!(preds.len(), 6, "family {} prediction length", family);
            assert!(
                preds.iter().all(|&p| p == 0.0 || p == 1.0),
                "family {} predictions must be binary",
                family
            );
        }
    }
}
