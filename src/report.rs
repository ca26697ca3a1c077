//! Per-outcome report and its console rendering

use crate::config::OutcomeMode;
use crate::error::Result;
use crate::training::{CVResults, LogitSummary, RankedFeature};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything printed for one outcome mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub outcome: OutcomeMode,
    /// Rows in the balanced training set
    pub n_balanced_rows: usize,
    /// Labels in the balanced training set (always equal to the row count)
    pub n_balanced_labels: usize,
    pub logit: LogitSummary,
    /// Forest importances, most important first
    pub feature_importances: Vec<RankedFeature>,
    pub cv: CVResults,
}

impl OutcomeReport {
    /// Console text: balanced sizes, the logit table, one
    /// `name importance` line per feature, then the CV accuracy line
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = writeln!(out, "{} {}", self.n_balanced_rows, self.n_balanced_labels);
        let _ = writeln!(out, "{}", self.logit);
        for feature in &self.feature_importances {
            let _ = writeln!(out, "{} {}", feature.name, feature.importance);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.accuracy_line());
        out
    }

    /// `Accuracy: mean (+/- 2*std)` with two decimals
    pub fn accuracy_line(&self) -> String {
        format!(
            "Accuracy: {:.2} (+/- {:.2})",
            self.cv.mean_score,
            self.cv.std_score * 2.0
        )
    }

    /// Write the report as pretty JSON to `{dir}/{outcome}_report.json`
    pub fn save_json(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}_report.json", self.outcome));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        info!(path = %path.display(), "Report written");
        Ok(path)
    }
}
