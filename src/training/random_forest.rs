//! Random Forest classifier

use super::cross_validation::Classifier;
use super::decision_tree::{argmax_classes, DecisionTree};
use crate::error::{ComplaintError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered at each split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random state
    pub random_state: u64,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Number of features
    n_features: usize,
    /// Sorted class labels
    classes: Vec<f64>,
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Number of features to draw out of `n_features`, at least one
    pub fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new_classifier(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest of depth-2 trees
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: Some(2),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            random_state: 0,
            feature_importances: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Grow trees until their leaves are pure
    pub fn with_unlimited_depth(mut self) -> Self {
        self.max_depth = None;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(ComplaintError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || self.n_estimators == 0 {
            return Err(ComplaintError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: self.n_estimators.to_string(),
                reason: format!("cannot grow a forest on {} samples", n_samples),
            });
        }

        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(ComplaintError::TrainingError(
                "forest input contains NaN or infinity".to_string(),
            ));
        }

        self.n_features = n_features;
        let max_features = self.max_features.resolve(n_features);

        let mut classes: Vec<f64> = y.iter().copied().collect();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup();
        self.classes = classes;

        // Each tree owns a seed derived from its index, so the result does
        // not depend on how rayon schedules the work
        let base_seed = self.random_state;
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot = y.select(Axis(0), &sample_indices);

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_random_state(rng.gen());
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();

        debug!(
            n_trees = self.trees.len(),
            max_features,
            n_samples,
            "Random forest fitted"
        );

        Ok(self)
    }

    /// Mean of the per-tree normalized importances, renormalized to sum to
    /// one. Trees that never split carry no importance and are skipped.
    fn compute_feature_importances(&mut self) {
        let mut total_importances = vec![0.0; self.n_features];
        let mut n_contributing = 0usize;

        for tree in &self.trees {
            if tree.get_n_leaves() <= 1 {
                continue;
            }
            if let Some(imp) = tree.feature_importances() {
                for (total, &val) in total_importances.iter_mut().zip(imp.iter()) {
                    *total += val;
                }
                n_contributing += 1;
            }
        }

        if n_contributing > 0 {
            for imp in &mut total_importances {
                *imp /= n_contributing as f64;
            }
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total_importances));
    }

    /// Average of the trees' class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(ComplaintError::ModelNotFitted);
        }

        let per_tree: Vec<Array2<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba_for(x, &self.classes))
            .collect::<Result<Vec<_>>>()?;

        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));
        for p in &per_tree {
            proba += p;
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(argmax_classes(&proba, &self.classes))
    }

    /// Mean accuracy on the given data
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let predictions = self.predict(x)?;
        Ok(super::cross_validation::accuracy(y, &predictions))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Fitted trees
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RandomForest::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RandomForest::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_classifier() {
        let (x, y) = separable();

        let mut rf = RandomForest::new_classifier(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let accuracy = rf.score(&x, &y).unwrap();
        assert!(accuracy >= 0.8, "Accuracy too low: {}", accuracy);
        assert_eq!(rf.n_trees(), 10);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = Array2::from_shape_fn((40, 3), |(i, j)| ((i * 7 + j * 11) % 13) as f64);
        let y = Array1::from_shape_fn(40, |i| ((i * 5) % 3 == 0) as u8 as f64);

        let mut rf = RandomForest::new_classifier(20);
        assert_eq!(rf.max_depth, Some(2));
        rf.fit(&x, &y).unwrap();
        assert!(rf.trees().iter().all(|t| t.get_depth() <= 2));

        let mut rf = RandomForest::new_classifier(20).with_max_depth(1);
        rf.fit(&x, &y).unwrap();
        assert!(rf.trees().iter().all(|t| t.get_depth() <= 1));

        let mut rf = RandomForest::new_classifier(20).with_unlimited_depth();
        rf.fit(&x, &y).unwrap();
        assert!(rf.trees().iter().any(|t| t.get_depth() > 2));
    }

    #[test]
    fn test_non_finite_input_is_a_training_error() {
        let (mut x, y) = separable();
        x[[2, 1]] = f64::NAN;
        let mut rf = RandomForest::new_classifier(5);
        assert!(matches!(rf.fit(&x, &y), Err(ComplaintError::TrainingError(_))));
        assert_eq!(rf.n_trees(), 0);
    }

    #[test]
    fn test_feature_importances_sum_to_one() {
        let x = Array2::from_shape_fn((40, 4), |(i, j)| match j {
            0 => i as f64,
            1 => (i % 3) as f64,
            _ => ((i * 7 + j) % 5) as f64,
        });
        let y = Array1::from_shape_fn(40, |i| if i >= 20 { 1.0 } else { 0.0 });

        let mut rf = RandomForest::new_classifier(50).with_max_depth(2);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 4);
        assert!((importances.sum() - 1.0).abs() < 1e-9);
        assert!(importances.iter().all(|&v| v >= 0.0));
        // The perfectly separating column dominates
        let top = importances
            .iter()
            .enumerate()
            .fold(0, |best, (i, &v)| if v > importances[best] { i } else { best });
        assert_eq!(top, 0);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let x = Array2::from_shape_fn((30, 5), |(i, j)| ((i * 13 + j * 7) % 17) as f64);
        let y = Array1::from_shape_fn(30, |i| (i % 2) as f64);

        let mut a = RandomForest::new_classifier(25).with_max_depth(2).with_random_state(0);
        let mut b = RandomForest::new_classifier(25).with_max_depth(2).with_random_state(0);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.feature_importances(), b.feature_importances());
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::Sqrt.resolve(30), 5);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::Log2.resolve(8), 3);
        assert_eq!(MaxFeatures::Fixed(10).resolve(4), 4);
        assert_eq!(MaxFeatures::All.resolve(7), 7);
    }

    #[test]
    fn test_not_fitted() {
        let rf = RandomForest::new_classifier(5);
        assert!(matches!(
            rf.predict(&array![[1.0, 2.0]]),
            Err(ComplaintError::ModelNotFitted)
        ));
    }
}
