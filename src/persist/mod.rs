//! Model persistence
//!
//! Fitted models are wrapped in a [`ModelArtifact`] (family, feature names,
//! classifier) and written with bincode as `{model_name}_{timestamp}.bin`.

use crate::error::{Result, TabflowError};
use crate::training::{Classifier, ModelFamily};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Extension used for persisted model files.
pub const MODEL_FILE_EXT: &str = "bin";

/// A persisted, fitted model plus the metadata serving needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub family: ModelFamily,
    /// Feature names in training order, when the training side knew them.
    pub feature_names: Option<Vec<String>>,
    pub classifier: Classifier,
}

impl ModelArtifact {
    pub fn new(classifier: Classifier, feature_names: Option<Vec<String>>) -> Self {
        Self {
            family: classifier.family(),
            feature_names,
            classifier,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Serialize `artifact` to `{model_dir}/{model_name}_{timestamp}.bin`,
/// creating the directory if needed. Returns the written path.
pub fn save_model(
    artifact: &ModelArtifact,
    model_dir: &Path,
    model_name: &str,
    timestamp: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(model_dir)?;
    let path = model_dir.join(format!("{}_{}.{}", model_name, timestamp, MODEL_FILE_EXT));
    info!(path = %path.display(), "Saving model");

    let result = artifact
        .to_bytes()
        .and_then(|bytes| fs::write(&path, bytes).map_err(TabflowError::from));
    if let Err(ref e) = result {
        error!(path = %path.display(), error = %e, "Failed to save model");
    }
    result?;

    info!("Model saved successfully");
    Ok(path)
}

/// Load a persisted model artifact.
pub fn load_model(path: &Path) -> Result<ModelArtifact> {
    let bytes = fs::read(path)?;
    ModelArtifact::from_bytes(&bytes)
}
