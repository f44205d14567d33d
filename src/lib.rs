//! tabflow - Tabular classification training and serving
//!
//! This crate covers the full life of a small tabular classifier:
//! - [`data`] - fixed four-file CSV dataset loading
//! - [`training`] - five model families behind one registry, plus the
//!   tracked training pipeline
//! - [`tracking`] - per-invocation experiment runs (params, metrics,
//!   artifacts)
//! - [`persist`] - bincode model artifacts named `{name}_{timestamp}.bin`
//! - [`resolve`] - latest-model resolution with a synthetic fallback
//! - [`server`] - HTTP prediction endpoint around one resolved model
//! - [`cli`] - train / serve / seed commands

pub mod error;

pub mod data;
pub mod persist;
pub mod resolve;
pub mod tracking;
pub mod training;

pub mod cli;
pub mod server;

pub use error::{Result, TabflowError};

/// Serving feature order. Must match the order the model was trained on;
/// this is a contract with the caller, not something the crate verifies.
pub const PREDICTION_FEATURES: [&str; 7] =
    ["Pclass", "Sex", "Age", "SibSp", "Parch", "Fare", "Embarked"];

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Result, TabflowError};

    pub use crate::data::{load_dataset, Dataset};
    pub use crate::persist::{load_model, save_model, ModelArtifact};
    pub use crate::resolve::{synthesize_fallback, ModelResolver, ModelSource, ResolvedModel};
    pub use crate::tracking::{ExperimentTracker, Run, RunStatus};
    pub use crate::training::{
        accuracy, confusion_matrix, evaluate_model, train_model, Classifier, ModelFamily,
        ModelParams,
    };

    pub use crate::server::{create_router, AppState, ServeConfig};
}
