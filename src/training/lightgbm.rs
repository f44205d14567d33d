//! LightGBM-style boosted trees (leaf-wise growth)
//!
//! Binary classifier on the logistic loss. Unlike the level-wise booster,
//! trees grow best-first: the leaf with the highest split gain is expanded
//! next, until `max_leaves` is reached.

use crate::error::{Result, TabflowError};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LgbmConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    pub reg_lambda: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for LgbmConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_leaves: 31,
            max_depth: None,
            min_child_samples: 20,
            reg_lambda: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum LgbNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<LgbNode>,
        right: Box<LgbNode>,
    },
}

impl LgbNode {
    fn predict(&self, sample: &[f64]) -> f64 {
        match self {
            LgbNode::Leaf { value } => *value,
            LgbNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// LightGBM-style binary classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LgbmClassifier {
    pub config: LgbmConfig,
    trees: Vec<LgbNode>,
    base_score: f64,
    n_features: usize,
}

impl LgbmClassifier {
    pub fn new(config: LgbmConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    fn sigmoid(v: f64) -> f64 {
        1.0 / (1.0 + (-v).exp())
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(TabflowError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(TabflowError::InvalidInput(
                "cannot fit on an empty dataset".to_string(),
            ));
        }
        self.n_features = x.ncols();

        let p = y.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        let mut raw_preds = Array1::from_elem(n_samples, self.base_score);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for _ in 0..self.config.n_estimators {
            let probs: Array1<f64> = raw_preds.mapv(Self::sigmoid);
            let grad: Vec<f64> = probs
                .iter()
                .zip(y.iter())
                .map(|(p, y)| p - y)
                .collect();
            let hess: Vec<f64> = probs.iter().map(|p| (p * (1.0 - p)).max(1e-7)).collect();

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let tree = build_leaf_wise_tree(x, &grad, &hess, &row_indices, &self.config, &mut rng);

            for i in 0..n_samples {
                let row = x.row(i);
                raw_preds[i] += self.config.learning_rate * tree.predict(row.as_slice().unwrap());
            }

            self.trees.push(tree);
        }

        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(TabflowError::ModelNotFitted);
        }
        let n = x.nrows();
        let mut raw = Array1::from_elem(n, self.base_score);
        for i in 0..n {
            let row = x.row(i);
            let sample: Vec<f64> = row.iter().copied().collect();
            for tree in &self.trees {
                raw[i] += self.config.learning_rate * tree.predict(&sample);
            }
        }
        Ok(raw.mapv(Self::sigmoid))
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

// ---- Leaf-wise tree construction ----

fn leaf_value(grad: &[f64], hess: &[f64], indices: &[usize], lambda: f64) -> f64 {
    let g: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h: f64 = indices.iter().map(|&i| hess[i]).sum();
    -g / (h + lambda)
}

fn gain_term(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda)
}

struct PendingSplit {
    gain: f64,
    slot: usize,
    feature: usize,
    threshold: f64,
    left_indices: Vec<usize>,
    right_indices: Vec<usize>,
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.gain == other.gain
    }
}
impl Eq for PendingSplit {}
impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.gain.partial_cmp(&other.gain)
    }
}
impl Ord for PendingSplit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

enum Slot {
    Leaf(Vec<usize>),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

fn build_leaf_wise_tree(
    x: &Array2<f64>,
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    config: &LgbmConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> LgbNode {
    let n_features = x.ncols();
    let n_selected = ((n_features as f64 * config.colsample_bytree).ceil() as usize).max(1);
    let mut features: Vec<usize> = (0..n_features).collect();
    if n_selected < n_features {
        features.shuffle(rng);
        features.truncate(n_selected);
    }

    let max_depth = config.max_depth.unwrap_or(usize::MAX);

    let mut slots: Vec<Slot> = vec![Slot::Leaf(indices.to_vec())];
    let mut depths: Vec<usize> = vec![0];
    let mut heap: BinaryHeap<PendingSplit> = BinaryHeap::new();
    let mut n_leaves = 1;

    if let Some(split) = best_split_for_slot(x, grad, hess, indices, &features, config, 0) {
        heap.push(split);
    }

    while n_leaves < config.max_leaves {
        let Some(split) = heap.pop() else { break };

        let depth = depths[split.slot];
        let left_id = slots.len();
        let right_id = slots.len() + 1;

        slots.push(Slot::Leaf(split.left_indices.clone()));
        depths.push(depth + 1);
        slots.push(Slot::Leaf(split.right_indices.clone()));
        depths.push(depth + 1);

        slots[split.slot] = Slot::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        n_leaves += 1;

        if depth + 1 < max_depth {
            for (id, child) in [(left_id, &split.left_indices), (right_id, &split.right_indices)] {
                if let Some(next) = best_split_for_slot(x, grad, hess, child, &features, config, id)
                {
                    heap.push(next);
                }
            }
        }
    }

    materialize(0, &slots, grad, hess, config.reg_lambda)
}

fn best_split_for_slot(
    x: &Array2<f64>,
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    features: &[usize],
    config: &LgbmConfig,
    slot: usize,
) -> Option<PendingSplit> {
    if indices.len() < config.min_child_samples * 2 {
        return None;
    }

    let candidates: Vec<(usize, f64, f64, usize)> = features
        .par_iter()
        .filter_map(|&feature| {
            best_split_for_feature(x, grad, hess, indices, feature, config)
                .map(|(threshold, gain, pos)| (feature, threshold, gain, pos))
        })
        .collect();

    let (feature, threshold, gain, _) = candidates
        .into_iter()
        .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))?;

    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
        indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

    Some(PendingSplit {
        gain,
        slot,
        feature,
        threshold,
        left_indices,
        right_indices,
    })
}

/// Returns (threshold, gain, split position) for the best split on one feature.
fn best_split_for_feature(
    x: &Array2<f64>,
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    feature: usize,
    config: &LgbmConfig,
) -> Option<(f64, f64, usize)> {
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, x[[i, feature]])).collect();
    sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let total_g: f64 = indices.iter().map(|&i| grad[i]).sum();
    let total_h: f64 = indices.iter().map(|&i| hess[i]).sum();
    let base = gain_term(total_g, total_h, config.reg_lambda);

    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best_gain = f64::NEG_INFINITY;
    let mut best_threshold = 0.0;
    let mut best_pos = 0;

    for i in 0..sorted.len() - 1 {
        left_g += grad[sorted[i].0];
        left_h += hess[sorted[i].0];

        if i + 1 < config.min_child_samples || sorted.len() - i - 1 < config.min_child_samples {
            continue;
        }
        if sorted[i].1 == sorted[i + 1].1 {
            continue;
        }

        let gain = gain_term(left_g, left_h, config.reg_lambda)
            + gain_term(total_g - left_g, total_h - left_h, config.reg_lambda)
            - base;

        if gain > best_gain {
            best_gain = gain;
            best_threshold = (sorted[i].1 + sorted[i + 1].1) / 2.0;
            best_pos = i + 1;
        }
    }

    if best_gain > 0.0 {
        Some((best_threshold, best_gain, best_pos))
    } else {
        None
    }
}

fn materialize(slot: usize, slots: &[Slot], grad: &[f64], hess: &[f64], lambda: f64) -> LgbNode {
    match &slots[slot] {
        Slot::Leaf(indices) => LgbNode::Leaf {
            value: leaf_value(grad, hess, indices, lambda),
        },
        Slot::Split {
            feature,
            threshold,
            left,
            right,
        } => LgbNode::Split {
            feature: *feature,
            threshold: *threshold,
            left: Box::new(materialize(*left, slots, grad, hess, lambda)),
            right: Box::new(materialize(*right, slots, grad, hess, lambda)),
        },
    }
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k.max(1));
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((60, 2), (0..120).map(|i| i as f64 * 0.1).collect())
            .unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] + r[1] > 6.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_classifier_fits_separable_data() {
        let (x, y) = classification_data();
        let mut model = LgbmClassifier::new(LgbmConfig {
            n_estimators: 40,
            min_child_samples: 2,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let acc = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(acc >= 0.8, "accuracy = {}", acc);
    }

    #[test]
    fn test_respects_max_leaves() {
        let (x, y) = classification_data();
        let mut model = LgbmClassifier::new(LgbmConfig {
            n_estimators: 5,
            max_leaves: 2,
            min_child_samples: 2,
            ..Default::default()
        });
        // Only checks that a heavily-constrained tree still trains and predicts.
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_unfitted_errors() {
        let model = LgbmClassifier::new(LgbmConfig::default());
        let x = Array2::zeros((1, 2));
        assert!(model.predict(&x).is_err());
    }
}
