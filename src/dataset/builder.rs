//! Dataset builder: complaint records to a flat labelled table

use super::{
    is_populated, outcome_label, ComplaintRecord, CATEGORICAL_COLUMNS, DATE_FIELD, DATE_FORMAT,
    LABEL_COLUMN, MONTH_COLUMN, NUMERIC_COLUMNS,
};
use crate::config::OutcomeMode;
use crate::error::{ComplaintError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

/// Builds the labelled feature table for one outcome mode
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    mode: OutcomeMode,
}

/// Column buffers filled row by row
struct ColumnBuffers {
    labels: Vec<i64>,
    categorical: Vec<Vec<String>>,
    numeric: Vec<Vec<f64>>,
    months: Vec<i64>,
}

impl ColumnBuffers {
    fn new() -> Self {
        Self {
            labels: Vec::new(),
            categorical: vec![Vec::new(); CATEGORICAL_COLUMNS.len()],
            numeric: vec![Vec::new(); NUMERIC_COLUMNS.len()],
            months: Vec::new(),
        }
    }

    fn into_frame(self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(2 + CATEGORICAL_COLUMNS.len() + NUMERIC_COLUMNS.len());
        columns.push(Column::new(LABEL_COLUMN.into(), self.labels));
        for (name, values) in CATEGORICAL_COLUMNS.iter().zip(self.categorical) {
            columns.push(Column::new((*name).into(), values));
        }
        for (name, values) in NUMERIC_COLUMNS.iter().zip(self.numeric) {
            columns.push(Column::new((*name).into(), values));
        }
        columns.push(Column::new(MONTH_COLUMN.into(), self.months));

        Ok(DataFrame::new(columns)?)
    }
}

impl DatasetBuilder {
    pub fn new(mode: OutcomeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> OutcomeMode {
        self.mode
    }

    /// Build the table. Records without a label or with a missing required
    /// field are skipped; malformed values in otherwise complete records
    /// are errors.
    pub fn build(&self, records: &[ComplaintRecord]) -> Result<DataFrame> {
        let mut buffers = ColumnBuffers::new();
        let mut unlabelled = 0usize;
        let mut incomplete = 0usize;

        for (idx, record) in records.iter().enumerate() {
            let label = match outcome_label(record, self.mode) {
                Some(label) => label,
                None => {
                    unlabelled += 1;
                    continue;
                }
            };

            if !Self::is_complete(record) {
                incomplete += 1;
                continue;
            }

            let categorical = CATEGORICAL_COLUMNS
                .iter()
                .map(|field| categorical_value(record, field, idx))
                .collect::<Result<Vec<String>>>()?;
            let numeric = NUMERIC_COLUMNS
                .iter()
                .map(|field| numeric_value(record, field, idx))
                .collect::<Result<Vec<f64>>>()?;
            let month = month_of_year(record, idx)?;

            buffers.labels.push(label);
            for (column, value) in buffers.categorical.iter_mut().zip(categorical) {
                column.push(value);
            }
            for (column, value) in buffers.numeric.iter_mut().zip(numeric) {
                column.push(value);
            }
            buffers.months.push(month);
        }

        let positives = buffers.labels.iter().filter(|&&l| l == 1).count();
        info!(
            outcome = %self.mode,
            retained = buffers.labels.len(),
            positives,
            unlabelled,
            incomplete,
            "Built dataset"
        );

        buffers.into_frame()
    }

    fn is_complete(record: &ComplaintRecord) -> bool {
        CATEGORICAL_COLUMNS
            .iter()
            .chain(NUMERIC_COLUMNS.iter())
            .chain(std::iter::once(&DATE_FIELD))
            .all(|field| is_populated(record, field))
    }
}

fn categorical_value(record: &ComplaintRecord, field: &str, idx: usize) -> Result<String> {
    match record.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(ComplaintError::DataError(format!(
            "record {}: field '{}' is not a string: {:?}",
            idx, field, other
        ))),
    }
}

fn numeric_value(record: &ComplaintRecord, field: &str, idx: usize) -> Result<f64> {
    let parsed = match record.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        ComplaintError::DataError(format!(
            "record {}: field '{}' is not numeric: {:?}",
            idx,
            field,
            record.get(field)
        ))
    })
}

fn month_of_year(record: &ComplaintRecord, idx: usize) -> Result<i64> {
    let raw = record
        .get(DATE_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ComplaintError::DataError(format!("record {}: '{}' is not a string", idx, DATE_FIELD))
        })?;
    let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
        ComplaintError::DataError(format!(
            "record {}: cannot parse '{}' as {}: {}",
            idx, raw, DATE_FORMAT, e
        ))
    })?;
    debug!(record = idx, month = date.month(), "Parsed received date");
    Ok(date.month() as i64)
}
