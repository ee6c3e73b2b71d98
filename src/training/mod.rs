//! Model training
//!
//! Train/test splitting, forest fitting, and held-out evaluation.

pub mod forest;
pub mod metrics;

pub use forest::{DecisionTree, ForestParams, RandomForest};
pub use metrics::Metrics;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::FeatureTable;
use crate::{GridironError, Result, TrainingConfig};

/// How rows are divided between training and evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Seeded shuffle before splitting
    #[default]
    Random,
    /// Hold out the most recent rows
    Chronological,
}

impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitStrategy::Random => write!(f, "random"),
            SplitStrategy::Chronological => write!(f, "chronological"),
        }
    }
}

impl FromStr for SplitStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(SplitStrategy::Random),
            "chronological" | "time" => Ok(SplitStrategy::Chronological),
            _ => Err(format!("Unknown split strategy: {}. Use random or chronological.", s)),
        }
    }
}

/// Row indices for training and held-out evaluation.
/// The test side gets `ceil(n * test_ratio)` rows.
pub fn train_test_split(
    n: usize,
    test_ratio: f64,
    strategy: SplitStrategy,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    if strategy == SplitStrategy::Random {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
    }

    // Tolerance keeps 10 * 0.3 from rounding up to 4
    let n_test = ((n as f64 * test_ratio - 1e-9).ceil().max(0.0) as usize).min(n);
    let test = indices.split_off(n - n_test);
    (indices, test)
}

/// Feature name and its normalized importance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Outcome of one training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model: RandomForest,
    /// Held-out accuracy, 0 when nothing was held out
    pub accuracy: f64,
    pub metrics: Metrics,
    /// Most important first, summing to 1
    pub importances: Vec<FeatureImportance>,
    pub train_size: usize,
    pub test_size: usize,
    /// Home-win rate on the held-out rows, the always-pick-home baseline
    pub baseline_accuracy: f64,
}

/// Fits and evaluates the forest on a feature table
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Trainer { config }
    }

    /// Split, fit on the training side, and score the held-out side
    pub fn train(&self, table: &FeatureTable) -> Result<TrainingReport> {
        if table.is_empty() {
            return Err(GridironError::EmptyDataset(
                "feature table has no rows to train on".to_string(),
            ));
        }

        let (features, labels) = table.matrix();
        let (train_idx, test_idx) = train_test_split(
            features.len(),
            self.config.test_ratio,
            self.config.split,
            self.config.seed,
        );
        if train_idx.is_empty() {
            return Err(GridironError::EmptyDataset(format!(
                "test ratio {} leaves no training rows out of {}",
                self.config.test_ratio,
                features.len()
            )));
        }

        log::info!(
            "Training on {} rows, evaluating on {} ({} split, seed {})",
            train_idx.len(),
            test_idx.len(),
            self.config.split,
            self.config.seed
        );

        let select = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
            idx.iter()
                .map(|&i| (features[i].clone(), labels[i]))
                .unzip()
        };
        let (train_x, train_y) = select(&train_idx);
        let (test_x, test_y) = select(&test_idx);

        let model = RandomForest::fit(
            &train_x,
            &train_y,
            table.feature_names(),
            ForestParams::from(&self.config),
        )?;

        let probs: Vec<f64> = test_x.iter().map(|row| model.predict_proba(row)).collect();
        let metrics = Metrics::from_predictions(&probs, &test_y);
        if test_idx.is_empty() {
            log::warn!("No rows held out; accuracy is not measured");
        } else {
            log::info!("Held-out {}", metrics);
        }

        let baseline_accuracy = if test_y.is_empty() {
            0.0
        } else {
            test_y.iter().sum::<f64>() / test_y.len() as f64
        };

        let importances = model
            .ranked_importances()
            .into_iter()
            .map(|(feature, importance)| FeatureImportance { feature, importance })
            .collect();

        Ok(TrainingReport {
            accuracy: metrics.accuracy(),
            metrics,
            importances,
            train_size: train_idx.len(),
            test_size: test_idx.len(),
            baseline_accuracy,
            model,
        })
    }

    /// Fit on every row, for scoring games that have not been played
    pub fn fit_all(&self, table: &FeatureTable) -> Result<RandomForest> {
        let (features, labels) = table.matrix();
        RandomForest::fit(
            &features,
            &labels,
            table.feature_names(),
            ForestParams::from(&self.config),
        )
    }
}
