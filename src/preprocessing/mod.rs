//! Data preprocessing module
//!
//! Turns the labelled complaint table into model input:
//! - Rare-category collapsing and one-hot encoding
//! - Extraction of dense feature matrices

mod encoder;
mod matrix;

pub use encoder::{RareCategoryEncoder, OTHER_CATEGORY, OTHER_SUFFIX};
pub use matrix::{columns_to_array2, FeatureMatrix};
