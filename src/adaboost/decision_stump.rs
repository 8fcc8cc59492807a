//! One-level decision tree split on a single dimension
//!
//! The split maximizes weighted information gain; points with a value below
//! the threshold go to the left leaf.

use crate::adaboost::weak_learner::{arg_max, WeakLearner};
use crate::core::error::check_dim;
use crate::core::{AdaBoostConfig, MlError, Result};
use log::debug;
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Gains at or below this are treated as no improvement
const MIN_GAIN: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub dimension: usize,
    pub threshold: f64,
    pub left_class: usize,
    pub right_class: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionStump {
    /// `None` when no split improved on a single leaf
    split: Option<Split>,
    /// Weighted majority class over all training points
    majority_class: usize,
}

impl DecisionStump {
    pub fn split(&self) -> Option<&Split> {
        self.split.as_ref()
    }

    pub fn majority_class(&self) -> usize {
        self.majority_class
    }
}

/// Weighted entropy in bits of a class histogram with total mass `total`
fn entropy(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

impl WeakLearner for DecisionStump {
    fn train(
        data: ArrayView2<'_, f64>,
        labels: &[usize],
        num_classes: usize,
        weights: ArrayView1<'_, f64>,
        config: &AdaBoostConfig,
    ) -> Result<Self> {
        let n = data.ncols();
        check_dim(n, labels.len())?;
        check_dim(n, weights.len())?;
        if n == 0 {
            return Err(MlError::EmptyDataset);
        }

        let mut counts = vec![0.0; num_classes];
        for (&label, &w) in labels.iter().zip(weights.iter()) {
            counts[label] += w;
        }
        let total: f64 = counts.iter().sum();
        if total <= 0.0 {
            return Err(MlError::InvalidParameter(
                "Decision stump weights must have positive total mass".to_string(),
            ));
        }
        let parent_entropy = entropy(&counts, total);
        let majority_class = arg_max(counts.iter().copied());

        let min_leaf = config.minimum_leaf_size.max(1);
        let mut best_gain = MIN_GAIN;
        let mut best: Option<Split> = None;

        let mut order: Vec<usize> = (0..n).collect();
        let mut left = vec![0.0; num_classes];
        for (dimension, row) in data.rows().into_iter().enumerate() {
            order.sort_by(|&a, &b| row[a].total_cmp(&row[b]));
            left.iter_mut().for_each(|c| *c = 0.0);
            let mut left_total = 0.0;

            for i in 0..n - 1 {
                let j = order[i];
                left[labels[j]] += weights[j];
                left_total += weights[j];

                let (value, next) = (row[j], row[order[i + 1]]);
                if value == next || i + 1 < min_leaf || n - i - 1 < min_leaf {
                    continue;
                }

                let right: Vec<f64> = counts.iter().zip(&left).map(|(c, l)| c - l).collect();
                let right_total = total - left_total;
                let gain = parent_entropy
                    - (left_total / total) * entropy(&left, left_total)
                    - (right_total / total) * entropy(&right, right_total);

                if gain > best_gain {
                    best_gain = gain;
                    best = Some(Split {
                        dimension,
                        threshold: (value + next) / 2.0,
                        left_class: arg_max(left.iter().copied()),
                        right_class: arg_max(right.iter().copied()),
                    });
                }
            }
        }

        match &best {
            Some(split) => debug!(
                "Stump split on dimension {} at {:.6} (gain {:.6})",
                split.dimension, split.threshold, best_gain
            ),
            None => debug!("Stump found no informative split; using class {majority_class}"),
        }

        Ok(Self {
            split: best,
            majority_class,
        })
    }

    fn classify_point(&self, point: ArrayView1<'_, f64>) -> usize {
        match &self.split {
            Some(split) if point[split.dimension] < split.threshold => split.left_class,
            Some(split) => split.right_class,
            None => self.majority_class,
        }
    }
}
