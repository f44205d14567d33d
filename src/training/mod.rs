//! Model training module
//!
//! Provides the five supported classifier families and the tracked training
//! pipeline:
//! - XGBoost-style boosted trees (second-order, level-wise)
//! - LightGBM-style boosted trees (leaf-wise)
//! - Random forest
//! - Support vector machine (SMO)
//! - Logistic regression

mod classifier;
mod metrics;
mod pipeline;
mod registry;
pub mod decision_tree;
pub mod lightgbm;
pub mod logistic;
pub mod random_forest;
pub mod svm;
pub mod xgboost;

pub use classifier::Classifier;
pub use metrics::{accuracy, confusion_matrix};
pub use pipeline::{evaluate_model, train_model};
pub use registry::{FamilyEntry, ModelFamily, ModelParams, REGISTRY};
pub use lightgbm::{LgbmClassifier, LgbmConfig};
pub use logistic::LogisticRegression;
pub use random_forest::RandomForestClassifier;
pub use svm::{KernelType, SvmClassifier, SvmConfig};
pub use xgboost::{XgbClassifier, XgbConfig};
