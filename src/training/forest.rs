//! Random forest classifier
//!
//! Binary classification trees grown on bootstrap samples with Gini impurity
//! and a random feature subset at every split.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{GridironError, Result, TrainingConfig};

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; sqrt of the feature count when None
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
        }
    }
}

impl From<&TrainingConfig> for ForestParams {
    fn from(config: &TrainingConfig) -> Self {
        ForestParams {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features,
            seed: config.seed,
        }
    }
}

impl ForestParams {
    fn features_per_split(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().round() as usize)
            .clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Fraction of positive labels reaching this leaf
        prob: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Gini impurity of a binary node
fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Single classification tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
    /// Unnormalized weighted impurity decrease per feature
    importances: Vec<f64>,
}

/// Read-only training data shared while growing a tree
struct TrainingSet<'a> {
    features: &'a [Vec<f64>],
    labels: &'a [f64],
    n_features: usize,
}

impl DecisionTree {
    fn fit(
        data: &TrainingSet<'_>,
        indices: &[usize],
        params: &ForestParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut tree = DecisionTree {
            root: Node::Leaf { prob: 0.5, samples: 0 },
            importances: vec![0.0; data.n_features],
        };
        let mut indices = indices.to_vec();
        tree.root = tree.grow(data, &mut indices, 0, params, rng);
        tree
    }

    fn grow(
        &mut self,
        data: &TrainingSet<'_>,
        indices: &mut [usize],
        depth: usize,
        params: &ForestParams,
        rng: &mut ChaCha8Rng,
    ) -> Node {
        let total = indices.len();
        let positives = indices.iter().filter(|&&i| data.labels[i] > 0.5).count();
        let impurity = gini(positives, total);
        let leaf = Node::Leaf {
            prob: if total == 0 { 0.5 } else { positives as f64 / total as f64 },
            samples: total,
        };

        if depth >= params.max_depth || total < params.min_samples_split || impurity < 1e-12 {
            return leaf;
        }

        let Some(split) = self.best_split(data, indices, impurity, params, rng) else {
            return leaf;
        };

        self.importances[split.feature] += split.gain * total as f64;

        // Partition in place: rows at or below the threshold go left
        let mut boundary = 0;
        for i in 0..indices.len() {
            if data.features[indices[i]][split.feature] <= split.threshold {
                indices.swap(i, boundary);
                boundary += 1;
            }
        }
        let (left, right) = indices.split_at_mut(boundary);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(data, left, depth + 1, params, rng)),
            right: Box::new(self.grow(data, right, depth + 1, params, rng)),
        }
    }

    /// Sweep each candidate feature in sorted order, tracking class counts
    fn best_split(
        &self,
        data: &TrainingSet<'_>,
        indices: &[usize],
        parent_impurity: f64,
        params: &ForestParams,
        rng: &mut ChaCha8Rng,
    ) -> Option<Split> {
        let mut candidates: Vec<usize> = (0..data.n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(params.features_per_split(data.n_features));

        let total = indices.len();
        let total_positives = indices.iter().filter(|&&i| data.labels[i] > 0.5).count();
        let min_leaf = params.min_samples_leaf.max(1);
        let mut best: Option<Split> = None;

        for feature in candidates {
            let mut column: Vec<(f64, bool)> = indices
                .iter()
                .map(|&i| (data.features[i][feature], data.labels[i] > 0.5))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_positives = 0;
            for pos in 0..total - 1 {
                if column[pos].1 {
                    left_positives += 1;
                }
                let n_left = pos + 1;
                let n_right = total - n_left;
                if column[pos].0 == column[pos + 1].0 || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * gini(left_positives, n_left)
                    + n_right as f64 * gini(total_positives - left_positives, n_right))
                    / total as f64;
                let gain = parent_impurity - weighted;

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (column[pos].0 + column[pos + 1].0) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Probability that the home team wins
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { prob, .. } => return *prob,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row.get(*feature).copied().unwrap_or(0.0) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

/// Bagged ensemble of [`DecisionTree`]s
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    feature_names: Vec<String>,
    /// Normalized to sum to 1
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit on a row-major feature matrix and 0/1 labels
    pub fn fit(
        features: &[Vec<f64>],
        labels: &[f64],
        feature_names: Vec<String>,
        params: ForestParams,
    ) -> Result<Self> {
        if features.is_empty() {
            return Err(GridironError::EmptyDataset(
                "no training rows for the forest".to_string(),
            ));
        }
        if features.len() != labels.len() {
            return Err(GridironError::DataFormat {
                row: features.len().min(labels.len()) + 1,
                message: format!(
                    "{} feature rows but {} labels",
                    features.len(),
                    labels.len()
                ),
            });
        }
        if let Some(row) = features.iter().position(|r| r.len() != feature_names.len()) {
            return Err(GridironError::DataFormat {
                row: row + 1,
                message: format!(
                    "expected {} features, found {}",
                    feature_names.len(),
                    features[row].len()
                ),
            });
        }

        let data = TrainingSet {
            features,
            labels,
            n_features: feature_names.len(),
        };
        let n = features.len();
        let mut trees = Vec::with_capacity(params.n_trees);

        for t in 0..params.n_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(t as u64));
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let tree = DecisionTree::fit(&data, &bootstrap, &params, &mut rng);
            log::debug!("Tree {} grown to depth {}", t + 1, tree.depth());
            trees.push(tree);
        }

        let mut importances = vec![0.0; data.n_features];
        for tree in &trees {
            for (acc, imp) in importances.iter_mut().zip(&tree.importances) {
                *acc += imp;
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= sum);
        } else if !importances.is_empty() {
            // No split anywhere: every feature is equally uninformative
            let uniform = 1.0 / importances.len() as f64;
            importances.iter_mut().for_each(|imp| *imp = uniform);
        }

        log::info!(
            "Fitted random forest: {} trees on {} rows x {} features",
            trees.len(),
            n,
            data.n_features
        );

        Ok(RandomForest {
            trees,
            feature_names,
            importances,
        })
    }

    /// Mean home-win probability across trees
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        self.trees.iter().map(|t| t.predict_proba(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// 1 for a predicted home win
    pub fn predict(&self, row: &[f64]) -> u8 {
        u8::from(self.predict_proba(row) >= 0.5)
    }

    /// (feature, importance) pairs, most important first
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    /// Label is 1 when the first feature is positive; the second is noise
    fn separable(n: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let signal: f64 = rng.gen_range(-10.0..10.0);
            let noise: f64 = rng.gen_range(-10.0..10.0);
            x.push(vec![signal, noise]);
            y.push(if signal > 0.0 { 1.0 } else { 0.0 });
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 15,
            max_features: Some(2),
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(0, 10), 0.0);
        assert_eq!(gini(10, 10), 0.0);
        assert_eq!(gini(5, 10), 0.5);
        assert_eq!(gini(0, 0), 0.0);
    }

    #[test]
    fn test_learns_separable_data() {
        let (x, y) = separable(300, 1);
        let forest = RandomForest::fit(&x, &y, names(2), small_params()).unwrap();

        let (test_x, test_y) = separable(100, 2);
        let correct = test_x
            .iter()
            .zip(&test_y)
            .filter(|(row, label)| forest.predict(row) as f64 == **label)
            .count();
        assert!(correct >= 95, "only {} of 100 correct", correct);

        let ranked = forest.ranked_importances();
        assert_eq!(ranked[0].0, "f0");
        assert!(ranked[0].1 > ranked[1].1);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (x, y) = separable(200, 3);
        let forest = RandomForest::fit(&x, &y, names(2), small_params()).unwrap();
        let total: f64 = forest.ranked_importances().iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_labels_give_uniform_importances() {
        let x = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let y = vec![1.0, 1.0, 1.0];
        let forest = RandomForest::fit(&x, &y, names(2), small_params()).unwrap();

        assert_eq!(forest.predict_proba(&[0.0, 0.0]), 1.0);
        for (_, imp) in forest.ranked_importances() {
            assert_eq!(imp, 0.5);
        }
    }

    #[test]
    fn test_same_seed_same_model() {
        let (x, y) = separable(150, 4);
        let a = RandomForest::fit(&x, &y, names(2), small_params()).unwrap();
        let b = RandomForest::fit(&x, &y, names(2), small_params()).unwrap();

        for row in &x {
            assert_eq!(a.predict_proba(row), b.predict_proba(row));
        }
        assert_eq!(a.ranked_importances(), b.ranked_importances());
    }

    #[test]
    fn test_depth_limit() {
        let (x, y) = separable(200, 5);
        let params = ForestParams {
            max_depth: 2,
            ..small_params()
        };
        let forest = RandomForest::fit(&x, &y, names(2), params).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() <= 3));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            RandomForest::fit(&[], &[], names(2), small_params()),
            Err(GridironError::EmptyDataset(_))
        ));
        assert!(matches!(
            RandomForest::fit(&[vec![1.0]], &[1.0], names(2), small_params()),
            Err(GridironError::DataFormat { row: 1, .. })
        ));
    }
}
