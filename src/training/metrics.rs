//! Evaluation metrics

use crate::error::{Result, TabflowError};
use ndarray::{Array1, Array2};

/// Fraction of predictions matching the true labels.
///
/// Pure function; order of rows does not matter as long as `y_true` and
/// `y_pred` stay paired.
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(TabflowError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(TabflowError::InvalidInput(
            "cannot compute accuracy over zero samples".to_string(),
        ));
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Class-by-class count matrix: rows are true labels, columns predictions.
///
/// Classes are the sorted union of labels seen in either vector, so the
/// matrix is square even when a class never appears in the predictions.
pub fn confusion_matrix(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
) -> Result<(Vec<i64>, Array2<f64>)> {
    if y_true.len() != y_pred.len() {
        return Err(TabflowError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }

    let mut classes: Vec<i64> = y_true
        .iter()
        .chain(y_pred.iter())
        .map(|v| v.round() as i64)
        .collect();
    classes.sort_unstable();
    classes.dedup();

    let index = |label: f64| -> usize {
        let rounded = label.round() as i64;
        classes.iter().position(|&c| c == rounded).unwrap_or(0)
    };

    let k = classes.len();
    let mut matrix = Array2::zeros((k, k));
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        matrix[[index(*t), index(*p)]] += 1.0;
    }

    Ok((classes, matrix))
}
