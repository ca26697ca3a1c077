//! Train/test split followed by SMOTE on the training side

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::preprocessing::FeatureMatrix;
use crate::synthetic::{class_counts, Sampler, SMOTE};
use crate::training::train_test_split;
use tracing::info;

/// Output of [`oversample`]
#[derive(Debug, Clone)]
pub struct Oversampled {
    /// Class-balanced training partition
    pub balanced: FeatureMatrix,
    /// Held-out partition; not used by the report
    pub holdout: FeatureMatrix,
}

/// Hold out `oversample_test_size` of the rows, then balance the remaining
/// training rows with SMOTE. Column names and order are preserved.
pub fn oversample(features: &FeatureMatrix, config: &PipelineConfig) -> Result<Oversampled> {
    let split = train_test_split(
        features.n_samples(),
        config.oversample_test_size,
        config.split_seed,
    )?;
    let train = features.select_rows(&split.train_indices);
    let holdout = features.select_rows(&split.test_indices);

    let mut smote = SMOTE::new()
        .with_k_neighbors(config.smote_k_neighbors)
        .with_seed(config.smote_seed);
    let resampled = smote.fit_resample(&train.x, &train.y)?;

    let counts = class_counts(&resampled.y);
    info!(
        train = train.n_samples(),
        holdout = holdout.n_samples(),
        balanced = resampled.y.len(),
        synthetic = resampled.n_synthetic.iter().sum::<usize>(),
        classes = ?counts,
        "Oversampled training partition"
    );

    let balanced = FeatureMatrix::new(resampled.x, resampled.y, train.feature_names)?;
    Ok(Oversampled { balanced, holdout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn imbalanced(n: usize) -> FeatureMatrix {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y = Array1::from_shape_fn(n, |i| if i % 4 == 0 { 1 } else { 0 });
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        FeatureMatrix::new(x, y, names).unwrap()
    }

    #[test]
    fn test_balanced_and_columns_preserved() {
        let features = imbalanced(100);
        let out = oversample(&features, &PipelineConfig::default()).unwrap();

        assert_eq!(out.holdout.n_samples(), 20);
        assert_eq!(out.balanced.feature_names, features.feature_names);

        let counts = class_counts(&out.balanced.y);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&0], counts[&1]);
        assert_eq!(out.balanced.n_samples(), counts[&0] * 2);
    }

    #[test]
    fn test_oversample_is_deterministic() {
        let features = imbalanced(60);
        let config = PipelineConfig::default();
        let a = oversample(&features, &config).unwrap();
        let b = oversample(&features, &config).unwrap();
        assert_eq!(a.balanced, b.balanced);
    }
}
