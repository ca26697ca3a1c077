//! Dense feature matrices extracted from encoded tables

use crate::error::{ComplaintError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Row-major features with integer class labels and named columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub x: Array2<f64>,
    pub y: Array1<i64>,
    pub feature_names: Vec<String>,
}

impl FeatureMatrix {
    /// Assemble from parts, checking that shapes agree
    pub fn new(x: Array2<f64>, y: Array1<i64>, feature_names: Vec<String>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ComplaintError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.ncols() != feature_names.len() {
            return Err(ComplaintError::ShapeError {
                expected: format!("{} feature names", x.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        Ok(Self { x, y, feature_names })
    }

    /// Split an encoded table into features (every column except the label,
    /// in table order) and labels.
    pub fn from_frame(df: &DataFrame, label_col: &str) -> Result<Self> {
        let label = df
            .column(label_col)
            .map_err(|_| ComplaintError::FeatureNotFound(label_col.to_string()))?;
        let label = label
            .as_materialized_series()
            .cast(&DataType::Int64)
            .map_err(|e| ComplaintError::DataError(e.to_string()))?;
        let y: Vec<i64> = label
            .i64()
            .map_err(|e| ComplaintError::DataError(e.to_string()))?
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| ComplaintError::DataError(format!("null label in row {}", i)))
            })
            .collect::<Result<_>>()?;

        let feature_names: Vec<String> = df
            .get_columns()
            .iter()
            .map(|c| c.name().to_string())
            .filter(|name| name != label_col)
            .collect();

        let x = columns_to_array2(df, &feature_names)?;
        Self::new(x, Array1::from_vec(y), feature_names)
    }

    /// Select rows by index, keeping column structure
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
        }
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Labels as floats, for the tree and logit estimators
    pub fn y_f64(&self) -> Array1<f64> {
        self.y.mapv(|v| v as f64)
    }
}

/// Extract named columns into a row-major `Array2<f64>`.
/// Nulls are rejected rather than imputed.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| ComplaintError::FeatureNotFound(col_name.clone()))?;
            let as_f64 = column
                .as_materialized_series()
                .cast(&DataType::Float64)
                .map_err(|e| ComplaintError::DataError(e.to_string()))?;
            let values = as_f64
                .f64()
                .map_err(|e| ComplaintError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| {
                    v.ok_or_else(|| {
                        ComplaintError::DataError(format!("null value in column '{}'", col_name))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}
