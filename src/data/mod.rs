//! Dataset loading
//!
//! Loads the fixed four-file training layout (`X_train.csv`, `y_train.csv`,
//! `X_test.csv`, `y_test.csv`) from a caller-supplied directory into ndarray
//! matrices.

use crate::error::{Result, TabflowError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// The four file names every dataset directory must contain.
pub const DATASET_FILES: [&str; 4] = ["X_train.csv", "y_train.csv", "X_test.csv", "y_test.csv"];

/// An in-memory training/test split.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
    /// Feature column names, in training order.
    pub feature_names: Vec<String>,
}

impl Dataset {
    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }

    pub fn n_train_samples(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test_samples(&self) -> usize {
        self.x_test.nrows()
    }
}

/// Load the four dataset files from `data_dir`.
///
/// Label files contribute only their first column; extra label columns are
/// ignored.
pub fn load_dataset(data_dir: &Path) -> Result<Dataset> {
    info!(data_dir = %data_dir.display(), "Loading dataset");

    let paths: Vec<PathBuf> = DATASET_FILES.iter().map(|f| data_dir.join(f)).collect();
    let missing: Vec<String> = paths
        .iter()
        .filter(|p| !p.exists())
        .map(|p| p.display().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TabflowError::DataError(format!(
            "one or more dataset files not found in {}: {}",
            data_dir.display(),
            missing.join(", ")
        )));
    }

    let x_train_df = read_csv(&paths[0])?;
    let y_train_df = read_csv(&paths[1])?;
    let x_test_df = read_csv(&paths[2])?;
    let y_test_df = read_csv(&paths[3])?;

    let feature_names: Vec<String> = x_train_df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let x_train = frame_to_array2(&x_train_df)?;
    let x_test = frame_to_array2(&x_test_df)?;
    let y_train = first_column_to_array1(&y_train_df)?;
    let y_test = first_column_to_array1(&y_test_df)?;

    if x_train.nrows() != y_train.len() {
        return Err(TabflowError::ShapeError {
            expected: format!("{} training labels", x_train.nrows()),
            actual: format!("{} training labels", y_train.len()),
        });
    }
    if x_test.nrows() != y_test.len() {
        return Err(TabflowError::ShapeError {
            expected: format!("{} test labels", x_test.nrows()),
            actual: format!("{} test labels", y_test.len()),
        });
    }

    info!(
        n_train = x_train.nrows(),
        n_test = x_test.nrows(),
        n_features = x_train.ncols(),
        "Dataset loaded"
    );

    Ok(Dataset {
        x_train,
        y_train,
        x_test,
        y_test,
        feature_names,
    })
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| TabflowError::DataError(e.to_string()))?;

    let reader = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file);

    reader
        .finish()
        .map_err(|e| TabflowError::DataError(format!("{}: {}", path.display(), e)))
}

/// Convert every column of a DataFrame into a row-major `Array2<f64>`.
fn frame_to_array2(df: &DataFrame) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = df.width();

    let col_data: Vec<Vec<f64>> = df
        .get_columns()
        .iter()
        .map(series_to_f64_vec)
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Extract the first column of a label frame as `Array1<f64>`.
fn first_column_to_array1(df: &DataFrame) -> Result<Array1<f64>> {
    let series = df
        .get_columns()
        .first()
        .ok_or_else(|| TabflowError::DataError("label file has no columns".to_string()))?;
    Ok(Array1::from_vec(series_to_f64_vec(series)?))
}

fn series_to_f64_vec(series: &Series) -> Result<Vec<f64>> {
    let casted = series
        .cast(&DataType::Float64)
        .map_err(|e| TabflowError::DataError(e.to_string()))?;
    Ok(casted
        .f64()
        .map_err(|e| TabflowError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut f = File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    fn seed_dataset(dir: &Path) {
        write_file(dir, "X_train.csv", "a,b\n1,2\n3,4\n5,6\n");
        write_file(dir, "y_train.csv", "label\n0\n1\n1\n");
        write_file(dir, "X_test.csv", "a,b\n7,8\n");
        write_file(dir, "y_test.csv", "label\n1\n");
    }

    #[test]
    fn test_load_dataset() {
        let dir = tempfile::tempdir().unwrap();
        seed_dataset(dir.path());

        let ds = load_dataset(dir.path()).unwrap();
        assert_eq!(ds.x_train.nrows(), 3);
        assert_eq!(ds.x_train.ncols(), 2);
        assert_eq!(ds.y_train.len(), 3);
        assert_eq!(ds.x_test.nrows(), 1);
        assert_eq!(ds.feature_names, vec!["a", "b"]);
        assert_eq!(ds.y_train[1], 1.0);
    }

    #[test]
    fn test_missing_file_is_named() {
        let dir = tempfile::tempdir().unwrap();
        seed_dataset(dir.path());
        std::fs::remove_file(dir.path().join("y_test.csv")).unwrap();

        let err = load_dataset(dir.path()).unwrap_err();
        assert!(err.to_string().contains("y_test.csv"), "got: {}", err);
    }

    #[test]
    fn test_multi_column_labels_take_first() {
        let dir = tempfile::tempdir().unwrap();
        seed_dataset(dir.path());
        write_file(dir.path(), "y_train.csv", "label,extra\n0,9\n1,9\n0,9\n");

        let ds = load_dataset(dir.path()).unwrap();
        assert_eq!(ds.y_train.to_vec(), vec![0.0, 1.0, 0.0]);
    }
}
