//! Support vector classifier (SMO)
//!
//! Binary SVM trained with Sequential Minimal Optimization over a
//! precomputed kernel matrix. Labels must be {0, 1}; internally they map to
//! {-1, +1}. No probability estimates: `predict_proba` errors by design and
//! callers treat it as best-effort.

use crate::error::{Result, TabflowError};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Samples beyond this would make the eager kernel matrix too large.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel function type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// K(x, y) = x . y
    Linear,
    /// K(x, y) = exp(-gamma * ||x - y||^2)
    Rbf { gamma: f64 },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Rbf { gamma: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmConfig {
    /// Regularization parameter (C)
    pub c: f64,
    pub kernel: KernelType,
    /// Tolerance for the KKT stopping criterion
    pub tol: f64,
    pub max_iter: usize,
    pub random_state: Option<u64>,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::Rbf { gamma: 1.0 },
            tol: 1e-3,
            max_iter: 1000,
            random_state: Some(42),
        }
    }
}

/// Support vector classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    pub config: SvmConfig,
    support_vectors: Option<Array2<f64>>,
    alphas: Option<Array1<f64>>,
    support_labels: Option<Array1<f64>>,
    bias: f64,
    n_features: usize,
}

impl SvmClassifier {
    pub fn new(config: SvmConfig) -> Self {
        Self {
            config,
            support_vectors: None,
            alphas: None,
            support_labels: None,
            bias: 0.0,
            n_features: 0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(TabflowError::ShapeError {
                expected: format!("y length = {}", n),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(TabflowError::InvalidInput(format!(
                "dataset has {} samples, exceeding the maximum {} for the SVM kernel matrix",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }
        for (i, &v) in y.iter().enumerate() {
            if v != 0.0 && v != 1.0 {
                return Err(TabflowError::InvalidInput(format!(
                    "SVM requires binary {{0, 1}} labels, but sample {} has label {}",
                    i, v
                )));
            }
        }
        if y.iter().all(|&v| v == 0.0) || y.iter().all(|&v| v == 1.0) {
            return Err(TabflowError::InvalidInput(
                "SVM requires both classes to be present".to_string(),
            ));
        }

        self.n_features = x.ncols();

        // Map {0, 1} to {-1, +1}
        let y_signed: Array1<f64> = y.mapv(|v| if v == 1.0 { 1.0 } else { -1.0 });

        let (alphas, bias, support_indices) = self.smo_train(x, &y_signed)?;

        let sv_count = support_indices.len();
        let mut support_vectors = Array2::zeros((sv_count, self.n_features));
        let mut support_labels = Array1::zeros(sv_count);
        let mut support_alphas = Array1::zeros(sv_count);
        for (i, &idx) in support_indices.iter().enumerate() {
            support_vectors.row_mut(i).assign(&x.row(idx));
            support_labels[i] = y_signed[idx];
            support_alphas[i] = alphas[idx];
        }

        self.support_vectors = Some(support_vectors);
        self.support_labels = Some(support_labels);
        self.alphas = Some(support_alphas);
        self.bias = bias;
        Ok(())
    }

    fn smo_train(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(Array1<f64>, f64, Vec<usize>)> {
        let n = x.nrows();
        let c = self.config.c;
        let tol = self.config.tol;

        let kernel_matrix = self.compute_kernel_matrix(x);

        let mut alphas: Array1<f64> = Array1::zeros(n);
        let mut bias = 0.0;

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let decision = |kernel: &Array2<f64>, alphas: &Array1<f64>, bias: f64, i: usize| -> f64 {
            (0..n).map(|j| alphas[j] * y[j] * kernel[[i, j]]).sum::<f64>() + bias
        };

        let mut passes = 0;
        let max_passes = 5;
        let mut total_iter = 0;

        while passes < max_passes && total_iter < self.config.max_iter {
            let mut num_changed = 0;

            if n <= 1 {
                break;
            }

            for i in 0..n {
                let e_i = decision(&kernel_matrix, &alphas, bias, i) - y[i];

                if (y[i] * e_i < -tol && alphas[i] < c) || (y[i] * e_i > tol && alphas[i] > 0.0) {
                    let j = loop {
                        let j = rng.gen_range(0..n);
                        if j != i {
                            break j;
                        }
                    };
                    let e_j = decision(&kernel_matrix, &alphas, bias, j) - y[j];

                    let alpha_i_old = alphas[i];
                    let alpha_j_old = alphas[j];

                    let (low, high) = if y[i] != y[j] {
                        (
                            (alphas[j] - alphas[i]).max(0.0),
                            (c + alphas[j] - alphas[i]).min(c),
                        )
                    } else {
                        (
                            (alphas[i] + alphas[j] - c).max(0.0),
                            (alphas[i] + alphas[j]).min(c),
                        )
                    };
                    if low == high {
                        continue;
                    }

                    let eta = 2.0 * kernel_matrix[[i, j]]
                        - kernel_matrix[[i, i]]
                        - kernel_matrix[[j, j]];
                    if eta >= 0.0 {
                        continue;
                    }

                    alphas[j] = (alpha_j_old - y[j] * (e_i - e_j) / eta).clamp(low, high);
                    if (alphas[j] - alpha_j_old).abs() < 1e-5 {
                        continue;
                    }

                    alphas[i] = alpha_i_old + y[i] * y[j] * (alpha_j_old - alphas[j]);

                    let b1 = bias
                        - e_i
                        - y[i] * (alphas[i] - alpha_i_old) * kernel_matrix[[i, i]]
                        - y[j] * (alphas[j] - alpha_j_old) * kernel_matrix[[i, j]];
                    let b2 = bias
                        - e_j
                        - y[i] * (alphas[i] - alpha_i_old) * kernel_matrix[[i, j]]
                        - y[j] * (alphas[j] - alpha_j_old) * kernel_matrix[[j, j]];

                    bias = if alphas[i] > 0.0 && alphas[i] < c {
                        b1
                    } else if alphas[j] > 0.0 && alphas[j] < c {
                        b2
                    } else {
                        (b1 + b2) / 2.0
                    };

                    num_changed += 1;
                }
            }

            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
            total_iter += 1;
        }

        let support_indices: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
        Ok((alphas, bias, support_indices))
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut kernel = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let value = self.kernel_value(&x.row(i).to_owned(), &x.row(j).to_owned());
                kernel[[i, j]] = value;
                kernel[[j, i]] = value;
            }
        }
        kernel
    }

    fn kernel_value(&self, a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        match self.config.kernel {
            KernelType::Linear => a.dot(b),
            KernelType::Rbf { gamma } => {
                let diff = a - b;
                (-gamma * diff.dot(&diff)).exp()
            }
        }
    }

    /// Predict {0, 1} class labels from the sign of the decision function.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let support_vectors = self
            .support_vectors
            .as_ref()
            .ok_or(TabflowError::ModelNotFitted)?;
        let alphas = self.alphas.as_ref().ok_or(TabflowError::ModelNotFitted)?;
        let labels = self
            .support_labels
            .as_ref()
            .ok_or(TabflowError::ModelNotFitted)?;

        let preds: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let row = row.to_owned();
                let decision: f64 = (0..support_vectors.nrows())
                    .map(|s| {
                        alphas[s] * labels[s] * self.kernel_value(&support_vectors.row(s).to_owned(), &row)
                    })
                    .sum::<f64>()
                    + self.bias;
                if decision >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        Ok(Array1::from_vec(preds))
    }

    /// SVM decision values are not probabilities; this always errors and the
    /// serving side swallows it.
    pub fn predict_proba(&self, _x: &Array2<f64>) -> Result<Array1<f64>> {
        Err(TabflowError::ComputationError(
            "probability estimates are not available for svm".to_string(),
        ))
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map_or(0, |sv| sv.nrows())
    }
}
