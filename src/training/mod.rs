//! Model training module
//!
//! Provides:
//! - Train/test splitting and stratified k-fold cross-validation
//! - CART decision trees and Random Forests (Gini, bootstrap, MDI importances)
//! - Maximum-likelihood logit with inference statistics
//! - Feature importance ranking

pub mod cross_validation;
pub mod decision_tree;
mod importance;
pub mod linear_models;
pub mod random_forest;

pub use cross_validation::{
    accuracy, cross_val_score, train_test_split, CVResults, CVSplit, CVStrategy, Classifier,
    CrossValidator,
};
pub use decision_tree::{DecisionTree, TreeNode};
pub use importance::{rank_features, RankedFeature};
pub use linear_models::{CoefficientRow, Logit, LogitResults, LogitSummary};
pub use random_forest::{MaxFeatures, RandomForest};
