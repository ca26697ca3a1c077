//! Rare-category collapsing and one-hot encoding

use crate::error::{ComplaintError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Category that absorbs rare or malformed values
pub const OTHER_CATEGORY: &str = "other";

/// Any column whose name contains this marker is removed after encoding
pub const OTHER_SUFFIX: &str = "_other";

/// One-hot encoder that keeps only categories common among positive rows.
///
/// A value survives when it occurs more than `threshold` times in rows whose
/// label is 1 and does not contain `[`. Everything else maps to
/// [`OTHER_CATEGORY`], whose indicator is dropped, so those rows read as all
/// zeros for that column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RareCategoryEncoder {
    columns: Vec<String>,
    threshold: usize,
    // column name -> surviving categories, sorted
    kept: BTreeMap<String, BTreeSet<String>>,
    is_fitted: bool,
}

impl RareCategoryEncoder {
    /// Create an encoder for the given categorical columns
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            threshold: 10,
            kept: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Set the minimum positive-row count a category must exceed
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Surviving categories for a column
    pub fn kept_categories(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.kept.get(column)
    }

    /// Count categories among positive rows and remember the survivors
    pub fn fit(&mut self, df: &DataFrame, label_col: &str) -> Result<&mut Self> {
        let labels = label_values(df, label_col)?;

        self.kept.clear();
        for col_name in &self.columns {
            let column = df
                .column(col_name)
                .map_err(|_| ComplaintError::FeatureNotFound(col_name.clone()))?;
            let ca = column
                .as_materialized_series()
                .str()
                .map_err(|e| ComplaintError::PreprocessingError(e.to_string()))?;

            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for (value, label) in ca.into_iter().zip(labels.iter()) {
                if let (Some(value), Some(1)) = (value, label) {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }

            let kept: BTreeSet<String> = counts
                .into_iter()
                .filter(|(value, count)| *count > self.threshold && !value.contains('['))
                .map(|(value, _)| value.to_string())
                .collect();

            debug!(column = %col_name, kept = kept.len(), "Fitted category filter");
            self.kept.insert(col_name.clone(), kept);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace categorical columns with indicator columns.
    ///
    /// Untouched columns keep their order and come first, followed by the
    /// indicators grouped by source column.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ComplaintError::ModelNotFitted);
        }

        let mut columns: Vec<Column> = df
            .get_columns()
            .iter()
            .filter(|c| !self.columns.iter().any(|name| name.as_str() == c.name().as_str()))
            .cloned()
            .collect();

        for col_name in &self.columns {
            let column = df
                .column(col_name)
                .map_err(|_| ComplaintError::FeatureNotFound(col_name.clone()))?;
            let ca = column
                .as_materialized_series()
                .str()
                .map_err(|e| ComplaintError::PreprocessingError(e.to_string()))?;
            let kept = self
                .kept
                .get(col_name)
                .ok_or(ComplaintError::ModelNotFitted)?;

            let collapsed: Vec<&str> = ca
                .into_iter()
                .map(|v| match v {
                    Some(value) if kept.contains(value) => value,
                    _ => OTHER_CATEGORY,
                })
                .collect();

            let present: BTreeSet<&str> = collapsed.iter().copied().collect();
            for category in present {
                let name = format!("{}_{}", col_name, category);
                let values: Vec<f64> = collapsed
                    .iter()
                    .map(|&v| if v == category { 1.0 } else { 0.0 })
                    .collect();
                columns.push(Column::new(name.into(), values));
            }
        }

        // Drop every sentinel-derived column
        let columns: Vec<Column> = columns
            .into_iter()
            .filter(|c| !c.name().as_str().contains(OTHER_SUFFIX))
            .collect();

        Ok(DataFrame::new(columns)?)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, label_col: &str) -> Result<DataFrame> {
        self.fit(df, label_col)?;
        self.transform(df)
    }
}

fn label_values(df: &DataFrame, label_col: &str) -> Result<Vec<Option<i64>>> {
    let column = df
        .column(label_col)
        .map_err(|_| ComplaintError::FeatureNotFound(label_col.to_string()))?;
    let cast = column
        .as_materialized_series()
        .cast(&DataType::Int64)
        .map_err(|e| ComplaintError::PreprocessingError(e.to_string()))?;
    let values = cast
        .i64()
        .map_err(|e| ComplaintError::PreprocessingError(e.to_string()))?
        .into_iter()
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        // "a" appears 3 times among positives, "b" twice, "c[x]" three times
        df!(
            "label" => &[1i64, 1, 1, 1, 1, 1, 1, 1, 0, 0],
            "age" => &[20.0, 21.0, 22.0, 23.0, 24.0, 25.0, 26.0, 27.0, 28.0, 29.0],
            "race" => &["a", "a", "a", "b", "b", "c[x]", "c[x]", "c[x]", "b", "d"],
            "sex" => &["m", "m", "m", "f", "f", "f", "m", "m", "f", "f"]
        )
        .unwrap()
    }

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_columns().iter().map(|c| c.name().to_string()).collect()
    }

    #[test]
    fn test_threshold_and_bracket_filter() {
        let df = frame();
        let mut encoder = RareCategoryEncoder::new(&["race", "sex"]).with_threshold(2);
        let result = encoder.fit_transform(&df, "label").unwrap();

        let kept = encoder.kept_categories("race").unwrap();
        assert!(kept.contains("a"));
        assert!(!kept.contains("b"), "exactly at threshold must not survive");
        assert!(!kept.contains("c[x]"), "bracketed values are malformed");

        assert_eq!(
            names(&result),
            vec!["label", "age", "race_a", "sex_f", "sex_m"]
        );
    }

    #[test]
    fn test_no_other_columns_survive() {
        let df = frame();
        let mut encoder = RareCategoryEncoder::new(&["race", "sex"]).with_threshold(2);
        let result = encoder.fit_transform(&df, "label").unwrap();
        assert!(names(&result).iter().all(|n| !n.contains(OTHER_SUFFIX)));

        // Rows with collapsed categories are all-zero across the group
        let race_a = result.column("race_a").unwrap().f64().unwrap();
        let values: Vec<f64> = race_a.into_iter().map(|v| v.unwrap()).collect();
        assert_eq!(values, vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_deterministic() {
        let df = frame();
        let a = RareCategoryEncoder::new(&["race", "sex"]).with_threshold(1).fit_transform(&df, "label").unwrap();
        let b = RareCategoryEncoder::new(&["race", "sex"]).with_threshold(1).fit_transform(&df, "label").unwrap();
        assert_eq!(names(&a), names(&b));
        assert!(a.equals(&b));
    }

    #[test]
    fn test_unfitted_and_missing_column() {
        let df = frame();
        let encoder = RareCategoryEncoder::new(&["race"]);
        assert!(matches!(encoder.transform(&df), Err(ComplaintError::ModelNotFitted)));

        let mut encoder = RareCategoryEncoder::new(&["zip_code"]);
        assert!(matches!(
            encoder.fit(&df, "label"),
            Err(ComplaintError::FeatureNotFound(_))
        ));
        let mut encoder = RareCategoryEncoder::new(&["race"]);
        assert!(matches!(
            encoder.fit(&df, "outcome"),
            Err(ComplaintError::FeatureNotFound(_))
        ));
    }
}
