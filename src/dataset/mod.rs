//! Complaint records and the dataset builder
//!
//! Raw complaints arrive as JSON objects. The builder keeps the rows that
//! carry a binary outcome label and a fully populated feature set, and lays
//! them out as a Polars `DataFrame`.

mod builder;
mod loader;

pub use builder::DatasetBuilder;
pub use loader::load_records;

use crate::config::OutcomeMode;
use serde_json::{Map, Value};

/// One raw complaint: field name to JSON value
pub type ComplaintRecord = Map<String, Value>;

/// Name of the label column, shared by both outcome modes
pub const LABEL_COLUMN: &str = "investigative_outcome";

/// Categorical features, in table order
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "complainant_race",
    "complainant_sex",
    "po_race",
    "po_sex",
    "general_cap_classification",
];

/// Numeric features, in table order
pub const NUMERIC_COLUMNS: [&str; 4] = [
    "complainant_age",
    "district_population",
    "district_income",
    "district_pct_black",
];

/// Derived from `date_received`
pub const MONTH_COLUMN: &str = "month_of_year";

pub const DATE_FIELD: &str = "date_received";
pub const DATE_FORMAT: &str = "%m/%d/%y";

pub const INVESTIGATIVE_FIELD: &str = "investigative_findings";
pub const DISCIPLINARY_FIELD: &str = "disciplinary_findings";

/// Whether a field is present and carries a truthy value.
///
/// Null, empty strings, numeric zero, `false` and empty containers all count
/// as missing.
pub fn is_populated(record: &ComplaintRecord, field: &str) -> bool {
    match record.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map_or(true, |v| v != 0.0),
        Some(Value::Bool(b)) => *b,
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn finding<'a>(record: &'a ComplaintRecord, field: &str) -> &'a str {
    record.get(field).and_then(Value::as_str).unwrap_or("")
}

/// Binary label for a record, or `None` when the outcome is pending or
/// otherwise undecided for this mode.
pub fn outcome_label(record: &ComplaintRecord, mode: OutcomeMode) -> Option<i64> {
    match mode {
        OutcomeMode::Investigative => match finding(record, INVESTIGATIVE_FIELD) {
            "No Sustained Findings" => Some(0),
            "Sustained Finding" => Some(1),
            _ => None,
        },
        OutcomeMode::Disciplinary => {
            let disciplinary = finding(record, DISCIPLINARY_FIELD);
            if disciplinary == "Guilty Finding" {
                Some(1)
            } else if disciplinary.contains("Pending")
                || finding(record, INVESTIGATIVE_FIELD).contains("Pending")
            {
                None
            } else {
                Some(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ComplaintRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_is_populated() {
        let r = record(json!({
            "a": "x", "b": "", "c": 0, "d": 3.5, "e": null, "f": false, "g": []
        }));
        assert!(is_populated(&r, "a"));
        assert!(!is_populated(&r, "b"));
        assert!(!is_populated(&r, "c"));
        assert!(is_populated(&r, "d"));
        assert!(!is_populated(&r, "e"));
        assert!(!is_populated(&r, "f"));
        assert!(!is_populated(&r, "g"));
        assert!(!is_populated(&r, "missing"));
    }

    #[test]
    fn test_investigative_labels() {
        let sustained = record(json!({"investigative_findings": "Sustained Finding"}));
        let cleared = record(json!({"investigative_findings": "No Sustained Findings"}));
        let pending = record(json!({"investigative_findings": "Pending"}));

        assert_eq!(outcome_label(&sustained, OutcomeMode::Investigative), Some(1));
        assert_eq!(outcome_label(&cleared, OutcomeMode::Investigative), Some(0));
        assert_eq!(outcome_label(&pending, OutcomeMode::Investigative), None);
        assert_eq!(outcome_label(&ComplaintRecord::new(), OutcomeMode::Investigative), None);
    }

    #[test]
    fn test_disciplinary_labels() {
        let guilty = record(json!({
            "disciplinary_findings": "Guilty Finding",
            "investigative_findings": "No Sustained Findings"
        }));
        let not_guilty = record(json!({
            "disciplinary_findings": "Not Guilty",
            "investigative_findings": "Sustained Finding"
        }));
        let pending = record(json!({
            "disciplinary_findings": "Discipline Pending",
            "investigative_findings": "Sustained Finding"
        }));
        let pending_investigation = record(json!({
            "disciplinary_findings": "",
            "investigative_findings": "Investigation Pending"
        }));

        assert_eq!(outcome_label(&guilty, OutcomeMode::Disciplinary), Some(1));
        assert_eq!(outcome_label(&guilty, OutcomeMode::Investigative), Some(0));
        assert_eq!(outcome_label(&not_guilty, OutcomeMode::Disciplinary), Some(0));
        assert_eq!(outcome_label(&pending, OutcomeMode::Disciplinary), None);
        assert_eq!(outcome_label(&pending_investigation, OutcomeMode::Disciplinary), None);
    }
}
