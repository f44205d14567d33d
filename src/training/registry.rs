//! Model family registry
//!
//! Maps family keys to constructor functions. Adding a family means adding
//! one `FamilyEntry`; nothing else dispatches on the key.

use crate::error::{Result, TabflowError};
use super::classifier::Classifier;
use super::lightgbm::{LgbmClassifier, LgbmConfig};
use super::logistic::LogisticRegression;
use super::random_forest::RandomForestClassifier;
use super::svm::{KernelType, SvmClassifier, SvmConfig};
use super::xgboost::{XgbClassifier, XgbConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Xgboost,
    Lgbm,
    RandomForest,
    Svm,
    LogisticRegression,
}

impl ModelFamily {
    /// Canonical key, as accepted on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            ModelFamily::Xgboost => "xgboost",
            ModelFamily::Lgbm => "lgbm",
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::Svm => "svm",
            ModelFamily::LogisticRegression => "logistic_regression",
        }
    }

    /// Flavor tag used for the serialized-model artifact path.
    pub fn artifact_flavor(&self) -> &'static str {
        match self {
            ModelFamily::Xgboost => "xgboost",
            ModelFamily::Lgbm => "lightgbm",
            _ => "native",
        }
    }

    /// Resolve a user-supplied key to a family.
    pub fn parse(key: &str) -> Result<ModelFamily> {
        REGISTRY
            .iter()
            .find(|entry| entry.keys.contains(&key))
            .map(|entry| entry.family)
            .ok_or_else(|| TabflowError::UnsupportedModel(key.to_string()))
    }

    /// Construct an untrained classifier with `params` overriding defaults.
    pub fn build(&self, params: &ModelParams) -> Classifier {
        let entry = REGISTRY
            .iter()
            .find(|entry| entry.family == *self)
            .expect("every family has a registry entry");
        (entry.build)(params)
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// One registry row: the family, the keys that select it, its constructor.
pub struct FamilyEntry {
    pub family: ModelFamily,
    pub keys: &'static [&'static str],
    pub build: fn(&ModelParams) -> Classifier,
}

/// Ordered registry of supported families. `lgbm` and `gbdt` are aliases.
pub static REGISTRY: &[FamilyEntry] = &[
    FamilyEntry {
        family: ModelFamily::Xgboost,
        keys: &["xgboost"],
        build: build_xgboost,
    },
    FamilyEntry {
        family: ModelFamily::Lgbm,
        keys: &["lgbm", "gbdt"],
        build: build_lgbm,
    },
    FamilyEntry {
        family: ModelFamily::RandomForest,
        keys: &["random_forest"],
        build: build_random_forest,
    },
    FamilyEntry {
        family: ModelFamily::Svm,
        keys: &["svm"],
        build: build_svm,
    },
    FamilyEntry {
        family: ModelFamily::LogisticRegression,
        keys: &["logistic_regression"],
        build: build_logistic_regression,
    },
];

/// Caller-supplied hyperparameter overrides (a JSON object).
///
/// Unknown keys are ignored; values of the wrong type fall back to the
/// family default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelParams(BTreeMap<String, serde_json::Value>);

impl ModelParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON string; the value must be an object.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        match value {
            serde_json::Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(TabflowError::InvalidInput(format!(
                "params must be a JSON object, got: {}",
                other
            ))),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        self.0
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(default)
    }

    pub fn get_opt_usize(&self, key: &str) -> Option<usize> {
        self.0.get(key).and_then(|v| v.as_u64()).map(|v| v as usize)
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.0.get(key).and_then(|v| v.as_u64()).unwrap_or(default)
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.0.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.0.get(key).and_then(|v| v.as_str()).unwrap_or(default)
    }
}

fn build_xgboost(params: &ModelParams) -> Classifier {
    Classifier::Xgboost(XgbClassifier::new(XgbConfig {
        n_estimators: params.get_usize("n_estimators", 100),
        learning_rate: params.get_f64("learning_rate", 0.3),
        max_depth: params.get_usize("max_depth", 6),
        min_child_weight: params.get_f64("min_child_weight", 1.0),
        reg_lambda: params.get_f64("reg_lambda", 1.0),
        gamma: params.get_f64("gamma", 0.0),
        subsample: params.get_f64("subsample", 1.0),
        colsample_bytree: params.get_f64("colsample_bytree", 1.0),
        random_state: Some(params.get_u64("random_state", 42)),
    }))
}

fn build_lgbm(params: &ModelParams) -> Classifier {
    let max_leaves = params
        .get_opt_usize("num_leaves")
        .unwrap_or_else(|| params.get_usize("max_leaves", 31));
    Classifier::Lgbm(LgbmClassifier::new(LgbmConfig {
        n_estimators: params.get_usize("n_estimators", 100),
        learning_rate: params.get_f64("learning_rate", 0.1),
        max_leaves,
        max_depth: params.get_opt_usize("max_depth"),
        min_child_samples: params.get_usize("min_child_samples", 20),
        reg_lambda: params.get_f64("reg_lambda", 0.0),
        subsample: params.get_f64("subsample", 1.0),
        colsample_bytree: params.get_f64("colsample_bytree", 1.0),
        random_state: Some(params.get_u64("random_state", 42)),
    }))
}

fn build_random_forest(params: &ModelParams) -> Classifier {
    // Defaults: 100 estimators, fixed seed 42
    let mut forest = RandomForestClassifier::new(params.get_usize("n_estimators", 100))
        .with_random_state(params.get_u64("random_state", 42))
        .with_min_samples_split(params.get_usize("min_samples_split", 2))
        .with_min_samples_leaf(params.get_usize("min_samples_leaf", 1));
    if let Some(depth) = params.get_opt_usize("max_depth") {
        forest = forest.with_max_depth(depth);
    }
    Classifier::RandomForest(forest)
}

fn build_svm(params: &ModelParams) -> Classifier {
    let kernel = match params.get_str("kernel", "rbf") {
        "linear" => KernelType::Linear,
        _ => KernelType::Rbf {
            gamma: params.get_f64("gamma", 1.0),
        },
    };
    Classifier::Svm(SvmClassifier::new(SvmConfig {
        c: params.get_f64("C", params.get_f64("c", 1.0)),
        kernel,
        tol: params.get_f64("tol", 1e-3),
        max_iter: params.get_usize("max_iter", 1000),
        random_state: Some(params.get_u64("random_state", 42)),
    }))
}

fn build_logistic_regression(params: &ModelParams) -> Classifier {
    Classifier::LogisticRegression(
        LogisticRegression::new()
            .with_alpha(params.get_f64("alpha", 0.01))
            .with_max_iter(params.get_usize("max_iter", 1000))
            .with_learning_rate(params.get_f64("learning_rate", 0.1)),
    )
}
