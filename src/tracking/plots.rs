//! Plot artifacts for experiment runs

use ndarray::Array2;
use plotly::layout::{Axis, Layout};
use plotly::{HeatMap, Plot};

/// Render a confusion matrix as a heatmap.
///
/// Rows are true labels, columns predicted labels, matching the matrix from
/// [`crate::training::confusion_matrix`].
pub fn confusion_matrix_plot(classes: &[i64], matrix: &Array2<f64>) -> Plot {
    let labels: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
    let z: Vec<Vec<f64>> = matrix
        .rows()
        .into_iter()
        .map(|row| row.iter().copied().collect())
        .collect();

    let trace = HeatMap::new(labels.clone(), labels, z);

    let layout = Layout::new()
        .title("Confusion Matrix")
        .x_axis(Axis::new().title("Predicted Label"))
        .y_axis(Axis::new().title("True Label"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}
