//! CART classification tree with Gini impurity

use crate::error::{ComplaintError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with class distribution
    Leaf {
        /// Fraction of samples per class, aligned with the tree's classes
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at random for each split (None = all)
    pub max_features: Option<usize>,
    /// Seed for feature sampling
    pub random_state: u64,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Sorted class labels seen during fit
    classes: Vec<f64>,
}

/// Read-only state shared by the recursive build
struct BuildContext<'a> {
    x: &'a Array2<f64>,
    /// Class position of every sample
    y_class: &'a [usize],
    n_classes: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: 0,
            n_features: 0,
            feature_importances: None,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set the number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set the feature-sampling seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(ComplaintError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ComplaintError::ValidationError(
                "Cannot fit a tree on zero samples".to_string(),
            ));
        }

        self.n_features = n_features;

        let mut classes: Vec<f64> = y.iter().copied().collect();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup();
        let y_class: Vec<usize> = y
            .iter()
            .map(|v| classes.iter().position(|c| c == v).unwrap_or(0))
            .collect();
        self.classes = classes;

        let ctx = BuildContext {
            x,
            y_class: &y_class,
            n_classes: self.classes.len(),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut importances = vec![0.0; n_features];

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(&ctx, &indices, 0, &mut importances, &mut rng));

        // Normalize feature importances
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn class_counts(ctx: &BuildContext, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; ctx.n_classes];
        for &i in indices {
            counts[ctx.y_class[i]] += 1;
        }
        counts
    }

    fn gini(counts: &[usize], n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
    }

    fn leaf(counts: &[usize], n_samples: usize) -> TreeNode {
        let distribution = counts
            .iter()
            .map(|&c| if n_samples > 0 { c as f64 / n_samples as f64 } else { 0.0 })
            .collect();
        TreeNode::Leaf {
            distribution,
            n_samples,
        }
    }

    fn build_tree(
        &self,
        ctx: &BuildContext,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = Self::class_counts(ctx, indices);
        let impurity = Self::gini(&counts, n_samples);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= 0.0;

        if should_stop {
            return Self::leaf(&counts, n_samples);
        }

        let features = self.draw_features(ctx, indices, rng);

        let Some((feature_idx, threshold, gain)) =
            self.find_best_split(ctx, indices, &features, &counts, impurity)
        else {
            return Self::leaf(&counts, n_samples);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| ctx.x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(ctx, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(ctx, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Candidate features for one split, in ascending index order.
    ///
    /// Features are visited in random order and `max_features` of them are
    /// drawn. A feature constant over the node's samples counts toward that
    /// number but cannot be searched, so the draw continues past the quota
    /// until at least one varying feature is found.
    fn draw_features(
        &self,
        ctx: &BuildContext,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Vec<usize> {
        let n_features = ctx.x.ncols();
        let n_try = self.max_features.unwrap_or(n_features).min(n_features);

        let mut features = Vec::with_capacity(n_try);
        for (visited, feature_idx) in index::sample(rng, n_features, n_features)
            .into_iter()
            .enumerate()
        {
            if visited >= n_try && !features.is_empty() {
                break;
            }
            if !Self::is_constant(ctx, indices, feature_idx) {
                features.push(feature_idx);
            }
        }
        features.sort_unstable();
        features
    }

    fn is_constant(ctx: &BuildContext, indices: &[usize], feature_idx: usize) -> bool {
        let mut values = indices.iter().map(|&i| ctx.x[[i, feature_idx]]);
        match values.next() {
            Some(first) => values.all(|v| v == first),
            None => true,
        }
    }

    /// Best (feature, threshold, impurity decrease) over the candidate
    /// features. Each feature is swept once in sorted order.
    fn find_best_split(
        &self,
        ctx: &BuildContext,
        indices: &[usize],
        features: &[usize],
        parent_counts: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();
        let min_leaf = self.min_samples_leaf;

        let feature_results: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut values: Vec<(f64, usize)> = indices
                    .iter()
                    .map(|&i| (ctx.x[[i, feature_idx]], ctx.y_class[i]))
                    .collect();
                values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

                let mut left_counts = vec![0usize; ctx.n_classes];
                let mut right_counts = parent_counts.to_vec();
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..n - 1 {
                    let (value, class) = values[pos];
                    left_counts[class] += 1;
                    right_counts[class] -= 1;

                    let next_value = values[pos + 1].0;
                    if next_value <= value {
                        continue;
                    }

                    let left_n = pos + 1;
                    let right_n = n - left_n;
                    if left_n < min_leaf || right_n < min_leaf {
                        continue;
                    }

                    let weighted = (left_n as f64 * Self::gini(&left_counts, left_n)
                        + right_n as f64 * Self::gini(&right_counts, right_n))
                        / n as f64;
                    let gain = parent_impurity - weighted;

                    if gain > best.map_or(0.0, |(g, _)| g) {
                        best = Some((gain, (value + next_value) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        // First feature wins ties, independent of thread scheduling
        feature_results
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<(usize, f64, f64)>, candidate| match acc {
                Some(current) if current.2 >= candidate.2 => Some(current),
                _ => Some(candidate),
            })
    }

    fn leaf_for<'a>(&'a self, node: &'a TreeNode, sample: ArrayView1<f64>) -> &'a [f64] {
        match node {
            TreeNode::Leaf { distribution, .. } => distribution,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    self.leaf_for(left, sample)
                } else {
                    self.leaf_for(right, sample)
                }
            }
        }
    }

    /// Class probabilities aligned with `classes` (labels the tree never saw
    /// get probability zero)
    pub fn predict_proba_for(&self, x: &Array2<f64>, classes: &[f64]) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(ComplaintError::ModelNotFitted)?;
        self.check_width(x)?;

        let positions: Vec<Option<usize>> = self
            .classes
            .iter()
            .map(|c| classes.iter().position(|k| k == c))
            .collect();

        let mut proba = Array2::zeros((x.nrows(), classes.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            let distribution = self.leaf_for(root, row);
            for (own, &p) in distribution.iter().enumerate() {
                if let Some(col) = positions[own] {
                    proba[[i, col]] += p;
                }
            }
        }
        Ok(proba)
    }

    /// Predict class probabilities over the classes seen during fit
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.predict_proba_for(x, &self.classes)
    }

    /// Most probable class per row; ties go to the smaller label
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(argmax_classes(&proba, &self.classes))
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(ComplaintError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Sorted class labels seen during fit
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Get tree depth (number of split levels)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

/// Pick the highest-probability class for each row
pub(crate) fn argmax_classes(proba: &Array2<f64>, classes: &[f64]) -> Array1<f64> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0usize;
            for (j, &p) in row.iter().enumerate() {
                if p > row[best] {
                    best = j;
                }
            }
            classes.get(best).copied().unwrap_or(0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_simple() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
        assert_eq!(tree.get_depth(), 1);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();
        assert!(tree.get_depth() <= 2);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_predict_proba_alignment() {
        let x = array![[0.0], [1.0]];
        let y = array![1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba_for(&x, &[0.0, 1.0]).unwrap();
        assert_eq!(proba, array![[0.0, 1.0], [0.0, 1.0]]);
    }

    #[test]
    fn test_duplicate_values_do_not_split() {
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.get_n_leaves(), 1);
        // Tie between classes resolves to the smaller label
        assert_eq!(tree.predict(&x).unwrap(), array![0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_feature_draw_skips_constant_columns() {
        // Only the last of eight columns varies; drawing one feature per
        // split still finds it
        let x = Array2::from_shape_fn((8, 8), |(i, j)| if j == 7 { i as f64 } else { 1.0 });
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

        for seed in 0..10 {
            let mut tree = DecisionTree::new().with_max_features(1).with_random_state(seed);
            tree.fit(&x, &y).unwrap();
            assert_eq!(tree.get_n_leaves(), 2, "seed {}", seed);
            assert_eq!(tree.predict(&x).unwrap(), y);
            assert!((tree.feature_importances().unwrap()[7] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_errors() {
        let tree = DecisionTree::new();
        assert!(matches!(tree.predict(&array![[1.0]]), Err(ComplaintError::ModelNotFitted)));

        let mut tree = DecisionTree::new();
        assert!(tree.fit(&array![[1.0], [2.0]], &array![0.0]).is_err());

        tree.fit(&array![[1.0], [2.0]], &array![0.0, 1.0]).unwrap();
        assert!(matches!(
            tree.predict(&array![[1.0, 2.0]]),
            Err(ComplaintError::ShapeError { .. })
        ));
    }
}
