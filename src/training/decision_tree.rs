//! Classification decision tree (CART, gini impurity)
//!
//! Building block for the random forest. Leaves keep the positive-class
//! fraction so the forest can average probabilities instead of only voting.

use crate::error::{Result, TabflowError};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A fitted tree node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        /// Majority class label.
        class: f64,
        /// Fraction of positive (label 1) samples in the leaf.
        positive_fraction: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn traverse(&self, sample: &[f64]) -> (f64, f64) {
        match self {
            TreeNode::Leaf {
                class,
                positive_fraction,
            } => (*class, *positive_fraction),
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.traverse(sample)
                } else {
                    right.traverse(sample)
                }
            }
        }
    }
}

/// Classification tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features considered per split; `None` tries all.
    pub max_features: Option<usize>,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Fit the tree. `rng` drives per-split feature subsampling when
    /// `max_features` is set (the forest passes a per-tree seeded RNG).
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(TabflowError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(TabflowError::InvalidInput(
                "cannot fit a tree on an empty dataset".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_node(x, y, &indices, 0, rng));
        Ok(self)
    }

    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| y[i] > 0.5).count();

        let pure = positives == 0 || positives == n;
        let depth_reached = self.max_depth.map_or(false, |d| depth >= d);
        if pure || depth_reached || n < self.min_samples_split {
            return self.leaf(n, positives);
        }

        let features = self.candidate_features(x.ncols(), rng);
        let best = features
            .iter()
            .filter_map(|&f| best_split_for_feature(x, y, indices, f))
            .max_by(|a, b| {
                a.gain
                    .partial_cmp(&b.gain)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        match best {
            Some(split) if split.gain > 0.0 => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, split.feature]] <= split.threshold);

                if left_idx.len() < self.min_samples_leaf
                    || right_idx.len() < self.min_samples_leaf
                {
                    return self.leaf(n, positives);
                }

                let left = Box::new(self.build_node(x, y, &left_idx, depth + 1, rng));
                let right = Box::new(self.build_node(x, y, &right_idx, depth + 1, rng));
                TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                }
            }
            _ => self.leaf(n, positives),
        }
    }

    fn leaf(&self, n: usize, positives: usize) -> TreeNode {
        let fraction = positives as f64 / n as f64;
        TreeNode::Leaf {
            class: if fraction >= 0.5 { 1.0 } else { 0.0 },
            positive_fraction: fraction,
        }
    }

    fn candidate_features(&self, n_features: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut features: Vec<usize> = (0..n_features).collect();
        if let Some(k) = self.max_features {
            if k < n_features {
                features.shuffle(rng);
                features.truncate(k.max(1));
            }
        }
        features
    }

    /// Predicted class per row.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.apply(x, |class, _| class)
    }

    /// Positive-class fraction of the reached leaf, per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.apply(x, |_, fraction| fraction)
    }

    fn apply(&self, x: &Array2<f64>, pick: fn(f64, f64) -> f64) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(TabflowError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(TabflowError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        let out: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let values: Vec<f64> = row.iter().copied().collect();
                let (class, fraction) = root.traverse(&values);
                pick(class, fraction)
            })
            .collect();
        Ok(Array1::from_vec(out))
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

struct CandidateSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn gini(positives: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    let p = positives / total;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

/// Exact greedy split search along one feature.
fn best_split_for_feature(
    x: &Array2<f64>,
    y: &Array1<f64>,
    indices: &[usize],
    feature: usize,
) -> Option<CandidateSplit> {
    let mut sorted: Vec<(f64, f64)> = indices
        .iter()
        .map(|&i| (x[[i, feature]], y[i]))
        .collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len() as f64;
    let total_pos: f64 = sorted.iter().map(|&(_, label)| label).sum();
    let parent = gini(total_pos, n);

    let mut left_pos = 0.0;
    let mut best: Option<CandidateSplit> = None;

    for i in 0..sorted.len() - 1 {
        left_pos += sorted[i].1;
        if sorted[i].0 == sorted[i + 1].0 {
            continue;
        }
        let left_n = (i + 1) as f64;
        let right_n = n - left_n;
        let weighted = (left_n * gini(left_pos, left_n)
            + right_n * gini(total_pos - left_pos, right_n))
            / n;
        let gain = parent - weighted;

        if best.as_ref().map_or(true, |b| gain > b.gain) {
            best = Some(CandidateSplit {
                feature,
                threshold: (sorted[i].0 + sorted[i + 1].0) / 2.0,
                gain,
            });
        }
    }

    best
}
