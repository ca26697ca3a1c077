//! Loading complaint exports from disk

use super::ComplaintRecord;
use crate::error::{ComplaintError, Result};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Load a JSON file holding an array of complaint objects
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<ComplaintRecord>> {
    let path = path.as_ref();
    let start = Instant::now();

    let file = File::open(path)
        .map_err(|e| ComplaintError::DataError(format!("{}: {}", path.display(), e)))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ComplaintError::DataError(format!(
                "{}: expected a JSON array of records, found {}",
                path.display(),
                json_kind(&other)
            )))
        }
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(ComplaintError::DataError(format!(
                "record {} is {}, expected an object",
                idx,
                json_kind(&other)
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        path = %path.display(),
        records = records.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded complaint records"
    );
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_records() {
        let file = write_json(r#"[{"po_sex": "male"}, {"po_sex": "female", "complainant_age": 30}]"#);
        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["complainant_age"], 30);
    }

    #[test]
    fn test_rejects_non_array() {
        let file = write_json(r#"{"po_sex": "male"}"#);
        let err = load_records(file.path()).unwrap_err();
        assert!(matches!(err, ComplaintError::DataError(_)));
    }

    #[test]
    fn test_rejects_non_object_entry() {
        let file = write_json(r#"[{"po_sex": "male"}, 7]"#);
        assert!(load_records(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_records("/nonexistent/complaints.json").unwrap_err();
        assert!(matches!(err, ComplaintError::DataError(_)));
    }
}
