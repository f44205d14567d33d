//! Latest-model resolution for serving bootstrap
//!
//! An ordered chain of glob-pattern strategies; the first pattern with any
//! match wins and the newest file (by creation time) within it is loaded.
//! Later patterns are never consulted once a pattern matches. A synthetic
//! fallback model is the terminal strategy, so resolution never fails: the
//! server always starts, even if what it serves is meaningless.

use crate::error::{Result, TabflowError};
use crate::persist::{load_model, ModelArtifact, MODEL_FILE_EXT};
use crate::training::{Classifier, RandomForestClassifier};
use crate::PREDICTION_FEATURES;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

/// Where the served model came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Loaded from a persisted model file.
    File(PathBuf),
    /// Synthesized fallback trained on random data.
    Synthetic,
}

impl ModelSource {
    /// Short status string for the health endpoint.
    pub fn status(&self) -> String {
        match self {
            ModelSource::File(path) => format!("loaded ({})", path.display()),
            ModelSource::Synthetic => "synthetic fallback".to_string(),
        }
    }
}

/// A model ready to serve, with its provenance.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub artifact: ModelArtifact,
    pub source: ModelSource,
}

/// Ordered-pattern model resolver.
#[derive(Debug, Clone)]
pub struct ModelResolver {
    patterns: Vec<String>,
}

impl ModelResolver {
    /// The standard pattern chain for `model_dir`: deployment-marked files
    /// first, then anything in the model dir, then the generic `models/`
    /// location, then the current working directory.
    pub fn new(model_dir: &Path) -> Self {
        let dir = model_dir.display();
        Self {
            patterns: vec![
                format!("{}/*_deployed_*.{}", dir, MODEL_FILE_EXT),
                format!("{}/*.{}", dir, MODEL_FILE_EXT),
                format!("models/*.{}", MODEL_FILE_EXT),
                format!("*.{}", MODEL_FILE_EXT),
            ],
        }
    }

    pub fn with_patterns(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Resolve a serving model. Never fails: any miss or error falls back to
    /// the synthetic model.
    pub fn resolve(&self) -> ResolvedModel {
        match self.resolve_from_disk() {
            Ok(Some((path, artifact))) => {
                info!(path = %path.display(), family = %artifact.family, "Loaded persisted model");
                ResolvedModel {
                    artifact,
                    source: ModelSource::File(path),
                }
            }
            Ok(None) => {
                warn!("No persisted model found, synthesizing fallback model");
                ResolvedModel {
                    artifact: synthesize_fallback(),
                    source: ModelSource::Synthetic,
                }
            }
            Err(e) => {
                warn!(error = %e, "Model resolution failed, synthesizing fallback model");
                ResolvedModel {
                    artifact: synthesize_fallback(),
                    source: ModelSource::Synthetic,
                }
            }
        }
    }

    /// Walk the pattern chain. A pattern with matches terminates the walk:
    /// a load failure there falls back, it does not try later patterns.
    fn resolve_from_disk(&self) -> Result<Option<(PathBuf, ModelArtifact)>> {
        for pattern in &self.patterns {
            let matches = glob_matches(pattern)?;
            if matches.is_empty() {
                continue;
            }
            let newest = newest_by_creation(&matches)?;
            let artifact = load_model(&newest)?;
            return Ok(Some((newest, artifact)));
        }
        Ok(None)
    }
}

fn glob_matches(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| TabflowError::InvalidInput(format!("bad glob pattern {}: {}", pattern, e)))?;
    Ok(paths.filter_map(|entry| entry.ok()).collect())
}

/// Newest file by creation time, falling back to mtime on filesystems
/// without birth time.
fn newest_by_creation(paths: &[PathBuf]) -> Result<PathBuf> {
    let mut best: Option<(SystemTime, &PathBuf)> = None;
    for path in paths {
        let meta = std::fs::metadata(path)?;
        let created = meta.created().or_else(|_| meta.modified())?;
        if best.map_or(true, |(t, _)| created > t) {
            best = Some((created, path));
        }
    }
    best.map(|(_, p)| p.clone())
        .ok_or_else(|| TabflowError::InvalidInput("empty path list".to_string()))
}

/// Train a small random forest on seeded random data. Keeps the endpoint
/// operable when no real model exists, at the cost of meaningless
/// predictions.
pub fn synthesize_fallback() -> ModelArtifact {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let x: Array2<f64> = Array2::from_shape_fn((100, PREDICTION_FEATURES.len()), |_| rng.gen());
    let y: Array1<f64> = Array1::from_shape_fn(100, |_| rng.gen_range(0..2) as f64);

    let mut forest = RandomForestClassifier::new(50).with_random_state(42);
    forest
        .fit(&x, &y)
        .expect("fallback forest always fits its own synthetic data");

    let feature_names = PREDICTION_FEATURES.iter().map(|s| s.to_string()).collect();
    ModelArtifact::new(Classifier::RandomForest(forest), Some(feature_names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::save_model;
    use ndarray::array;

    fn artifact() -> ModelArtifact {
        synthesize_fallback()
    }

    fn patterns_for(dir: &Path) -> Vec<String> {
        vec![
            format!("{}/*_deployed_*.bin", dir.display()),
            format!("{}/*.bin", dir.display()),
        ]
    }

    #[test]
    fn test_empty_dir_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ModelResolver::with_patterns(patterns_for(dir.path()));

        let resolved = resolver.resolve();
        assert_eq!(resolved.source, ModelSource::Synthetic);

        let x = Array2::zeros((1, PREDICTION_FEATURES.len()));
        let pred = resolved.artifact.classifier.predict(&x).unwrap();
        assert!(pred[0] == 0.0 || pred[0] == 1.0);
    }

    #[test]
    fn test_pattern_priority_beats_recency() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact();

        // Deployed file first (older), plain file second (newer)
        let deployed = dir.path().join("a_deployed_1.bin");
        std::fs::write(&deployed, a.to_bytes().unwrap()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        std::fs::write(dir.path().join("b.bin"), a.to_bytes().unwrap()).unwrap();

        let resolver = ModelResolver::with_patterns(patterns_for(dir.path()));
        let resolved = resolver.resolve();
        assert_eq!(resolved.source, ModelSource::File(deployed));
    }

    #[test]
    fn test_newest_within_pattern_wins() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact();

        save_model(&a, dir.path(), "random_forest", "t1").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        let newer = save_model(&a, dir.path(), "random_forest", "t2").unwrap();

        let resolver = ModelResolver::with_patterns(patterns_for(dir.path()));
        let resolved = resolver.resolve();
        assert_eq!(resolved.source, ModelSource::File(newer));
    }

    #[test]
    fn test_corrupt_model_falls_back_without_trying_later_patterns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x_deployed_1.bin"), b"garbage").unwrap();
        save_model(&artifact(), dir.path(), "random_forest", "good").unwrap();

        let resolver = ModelResolver::with_patterns(patterns_for(dir.path()));
        let resolved = resolver.resolve();
        assert_eq!(resolved.source, ModelSource::Synthetic);
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let x = array![[0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]];
        let a = synthesize_fallback().classifier.predict_proba(&x).unwrap();
        let b = synthesize_fallback().classifier.predict_proba(&x).unwrap();
        assert_eq!(a.to_vec(), b.to_vec());
    }
}
