//! Feature importance ranking

use crate::error::{ComplaintError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// A feature with its importance score and 1-based rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFeature {
    pub name: String,
    /// Normalized importance (sums to 1.0 across features)
    pub importance: f64,
    /// 1 = most important
    pub rank: usize,
}

/// Pair names with importances and sort descending. Equal scores keep
/// their column order.
pub fn rank_features(names: &[String], importances: &Array1<f64>) -> Result<Vec<RankedFeature>> {
    if names.len() != importances.len() {
        return Err(ComplaintError::ShapeError {
            expected: format!("{} importances", names.len()),
            actual: format!("{} importances", importances.len()),
        });
    }

    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(importances.iter())
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    // sort_by is stable
    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    for (i, feature) in features.iter_mut().enumerate() {
        feature.rank = i + 1;
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rank_features() {
        let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let ranked = rank_features(&names, &array![0.1, 0.4, 0.1, 0.4]).unwrap();

        let order: Vec<&str> = ranked.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[3].rank, 4);
    }

    #[test]
    fn test_length_mismatch() {
        let names = vec!["a".to_string()];
        assert!(rank_features(&names, &array![0.5, 0.5]).is_err());
    }
}
