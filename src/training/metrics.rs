//! Evaluation metrics for home-win predictions

use serde::Serialize;
use std::fmt;

/// Confusion counts and probability error accumulated over predictions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    /// Sum of squared probability errors
    #[serde(skip)]
    brier_sum: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from aligned probabilities and 0/1 labels
    pub fn from_predictions(probs: &[f64], labels: &[f64]) -> Self {
        let mut metrics = Metrics::new();
        for (&prob, &label) in probs.iter().zip(labels) {
            metrics.update(prob, label);
        }
        metrics
    }

    /// Record one prediction; a probability of 0.5 or more predicts a home win
    pub fn update(&mut self, prob: f64, label: f64) {
        let actual = label > 0.5;
        match (prob >= 0.5, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_negatives += 1,
        }
        let target = if actual { 1.0 } else { 0.0 };
        self.brier_sum += (prob - target).powi(2);
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// Share of predicted home wins that were home wins
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// Share of home wins that were predicted
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Mean squared error of the predicted probabilities
    pub fn brier_score(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.brier_sum / self.total() as f64
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Acc: {:.2}% | Precision: {:.3} | Recall: {:.3} | Brier: {:.4} | n={}",
            self.accuracy() * 100.0,
            self.precision(),
            self.recall(),
            self.brier_score(),
            self.total()
        )
    }
}
