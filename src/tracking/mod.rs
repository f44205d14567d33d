//! Experiment tracking
//!
//! One `Run` per training invocation: parameters, metrics, and artifacts,
//! persisted as a `run.json` record plus an `artifacts/` directory under the
//! tracker's base directory. Runs are immutable once finished.

mod plots;

pub use plots::confusion_matrix_plot;

use crate::error::{Result, TabflowError};
use crate::training::ModelParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Default runs directory, overridable via `RUNS_DIR`.
pub const DEFAULT_RUNS_DIR: &str = "runs";

/// Local-filesystem experiment tracker.
#[derive(Debug, Clone)]
pub struct ExperimentTracker {
    base_dir: PathBuf,
}

impl ExperimentTracker {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn from_env() -> Result<Self> {
        let dir = std::env::var("RUNS_DIR").unwrap_or_else(|_| DEFAULT_RUNS_DIR.to_string());
        Self::new(dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Start a new run. The run directory is created immediately so artifacts
    /// can be written while the run is live.
    pub fn start_run(&self, name: &str) -> Result<Run> {
        let run_id = Uuid::new_v4().to_string()[..8].to_string();
        let dir = self.base_dir.join(&run_id);
        fs::create_dir_all(dir.join("artifacts"))?;

        info!(run_id = %run_id, run_name = name, "Starting experiment run");

        Ok(Run {
            run_id,
            run_name: name.to_string(),
            start_time: Utc::now(),
            end_time: None,
            status: RunStatus::Running,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
            dir,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// A single tracked training invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    /// Artifact paths relative to the run directory.
    pub artifacts: Vec<String>,
    #[serde(skip)]
    dir: PathBuf,
}

impl Run {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl ToString) {
        self.params.insert(key.into(), value.to_string());
    }

    pub fn log_params(&mut self, params: &ModelParams) {
        for (key, value) in params.entries() {
            self.params.insert(key.clone(), value.to_string());
        }
    }

    pub fn log_metric(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        info!(metric = %key, value, "Logged metric");
        self.metrics.insert(key, value);
    }

    /// Write raw bytes as an artifact. `name` may contain `/` separators.
    pub fn log_artifact_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join("artifacts").join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        self.artifacts.push(name.to_string());
        info!(artifact = name, path = %path.display(), "Logged artifact");
        Ok(path)
    }

    pub fn log_artifact_string(&mut self, name: &str, contents: &str) -> Result<PathBuf> {
        self.log_artifact_bytes(name, contents.as_bytes())
    }

    /// Close the run and write its record. The record is not rewritten after
    /// this point.
    pub fn finish(mut self, status: RunStatus) -> Result<()> {
        self.status = status;
        self.end_time = Some(Utc::now());

        let record = serde_json::to_string_pretty(&self)
            .map_err(|e| TabflowError::SerializationError(e.to_string()))?;
        fs::write(self.dir.join("run.json"), record)?;

        info!(run_id = %self.run_id, status = ?status, "Finished experiment run");
        Ok(())
    }
}
