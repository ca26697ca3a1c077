//! Complaint Outcomes - what predicts sustained findings and discipline
//!
//! Turns an export of police misconduct complaints into a labelled table,
//! one-hot encodes the common categories, balances the classes with SMOTE
//! and reports a logistic regression, random-forest feature importances and
//! cross-validated accuracy.
//!
//! # Modules
//!
//! - [`dataset`] - Record loading and labelled table construction
//! - [`preprocessing`] - Rare-category collapsing, one-hot encoding, feature matrices
//! - [`synthetic`] - SMOTE oversampling
//! - [`training`] - Logit, decision trees, random forests, cross-validation
//! - [`report`] - Per-outcome report and console rendering
//! - [`pipeline`] - End-to-end run for one outcome
//! - [`cli`] - Command-line interface

// Core error handling and configuration
pub mod error;
pub mod config;

// Data
pub mod dataset;
pub mod preprocessing;
pub mod synthetic;

// Modelling
pub mod training;
pub mod report;
pub mod pipeline;

// Services
pub mod cli;

pub use error::{ComplaintError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{OutcomeMode, PipelineConfig};
    pub use crate::dataset::{load_records, ComplaintRecord, DatasetBuilder};
    pub use crate::error::{ComplaintError, Result};
    pub use crate::pipeline::run_outcome;
    pub use crate::preprocessing::{FeatureMatrix, RareCategoryEncoder};
    pub use crate::report::OutcomeReport;
    pub use crate::synthetic::{oversample, Sampler, SMOTE};
    pub use crate::training::{
        cross_val_score, rank_features, train_test_split, CVResults, Logit, LogitResults,
        RandomForest, RankedFeature,
    };
}
