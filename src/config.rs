//! Pipeline configuration

use crate::error::{ComplaintError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default location of the complaint export, relative to the working directory
pub const DEFAULT_DATA_PATH: &str = "../static/data/complaint_discipline_viz_data.json";

/// Which finding the binary label is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeMode {
    /// Sustained vs. not sustained investigative finding
    Investigative,
    /// Guilty vs. any other disciplinary finding
    Disciplinary,
}

impl OutcomeMode {
    /// Both modes in the order the pipeline runs them
    pub const ALL: [OutcomeMode; 2] = [OutcomeMode::Investigative, OutcomeMode::Disciplinary];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeMode::Investigative => "investigative",
            OutcomeMode::Disciplinary => "disciplinary",
        }
    }
}

impl fmt::Display for OutcomeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeMode {
    type Err = ComplaintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "investigative" => Ok(OutcomeMode::Investigative),
            "disciplinary" => Ok(OutcomeMode::Disciplinary),
            other => Err(ComplaintError::InvalidParameter {
                name: "outcome".to_string(),
                value: other.to_string(),
                reason: "expected 'investigative' or 'disciplinary'".to_string(),
            }),
        }
    }
}

/// Configuration for a full pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Path to the JSON array of complaint records
    pub data_path: PathBuf,

    /// A category survives encoding only if it occurs more than this many
    /// times among positive-label rows
    pub category_threshold: usize,

    /// Held-out fraction before oversampling
    pub oversample_test_size: f64,

    /// Held-out fraction of the balanced set
    pub report_test_size: f64,

    /// Seed shared by both train/test splits
    pub split_seed: u64,

    /// Nearest neighbours considered by SMOTE
    pub smote_k_neighbors: usize,

    /// SMOTE random seed
    pub smote_seed: u64,

    // Forest parameters
    /// Number of trees
    pub n_estimators: usize,

    /// Maximum depth per tree
    pub max_depth: usize,

    /// Forest random seed
    pub forest_seed: u64,

    /// Folds for cross-validated accuracy
    pub cv_folds: usize,

    // Logit parameters
    /// Newton iterations before giving up
    pub logit_max_iter: usize,

    /// Convergence tolerance on the largest parameter change
    pub logit_tol: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            category_threshold: 10,
            oversample_test_size: 0.2,
            report_test_size: 0.3,
            split_seed: 0,
            smote_k_neighbors: 5,
            smote_seed: 0,
            n_estimators: 100,
            max_depth: 2,
            forest_seed: 0,
            cv_folds: 5,
            logit_max_iter: 35,
            logit_tol: 1e-8,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input file
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the rare-category threshold
    pub fn with_category_threshold(mut self, threshold: usize) -> Self {
        self.category_threshold = threshold;
        self
    }

    /// Set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Set the maximum tree depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the number of cross-validation folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Set every seed at once
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split_seed = seed;
        self.smote_seed = seed;
        self.forest_seed = seed;
        self
    }

    /// Load a configuration from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ComplaintError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("oversample_test_size", self.oversample_test_size),
            ("report_test_size", self.report_test_size),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(invalid(name, value, "must be in (0, 1)"));
            }
        }
        if self.smote_k_neighbors == 0 {
            return Err(invalid("smote_k_neighbors", 0, "must be at least 1"));
        }
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", 0, "must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(invalid("max_depth", 0, "must be at least 1"));
        }
        if self.cv_folds < 2 {
            return Err(invalid("cv_folds", self.cv_folds, "must be at least 2"));
        }
        if self.logit_max_iter == 0 {
            return Err(invalid("logit_max_iter", 0, "must be at least 1"));
        }
        if !(self.logit_tol > 0.0) {
            return Err(invalid("logit_tol", self.logit_tol, "must be positive"));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> ComplaintError {
    ComplaintError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.category_threshold, 10);
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.data_path, PathBuf::from(DEFAULT_DATA_PATH));
    }

    #[test]
    fn test_outcome_mode_parse() {
        assert_eq!("investigative".parse::<OutcomeMode>().unwrap(), OutcomeMode::Investigative);
        assert_eq!("Disciplinary".parse::<OutcomeMode>().unwrap(), OutcomeMode::Disciplinary);
        assert!("both".parse::<OutcomeMode>().is_err());
        assert_eq!(OutcomeMode::Disciplinary.to_string(), "disciplinary");
    }

    #[test]
    fn test_validate_rejects_bad_split() {
        let mut config = PipelineConfig::default();
        config.report_test_size = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ComplaintError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_depth": 3, "cv_folds": 4}}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.cv_folds, 4);
        assert_eq!(config.n_estimators, 100);
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = PipelineConfig::from_json_file("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, ComplaintError::ConfigError(_)));
    }
}
