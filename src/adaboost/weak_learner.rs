//! Weak learner contract used by the boosting loop

use crate::core::{AdaBoostConfig, Result};
use ndarray::{ArrayView1, ArrayView2, Axis};

/// A classifier trainable on per-point weights
pub trait WeakLearner: Sized {
    /// Fit to the columns of `data` with class indices `labels` in
    /// `0..num_classes`, weighting point `j` by `weights[j]`
    fn train(
        data: ArrayView2<'_, f64>,
        labels: &[usize],
        num_classes: usize,
        weights: ArrayView1<'_, f64>,
        config: &AdaBoostConfig,
    ) -> Result<Self>;

    /// Class index of one point
    fn classify_point(&self, point: ArrayView1<'_, f64>) -> usize;

    /// Class index of every column of `data`
    fn classify(&self, data: ArrayView2<'_, f64>) -> Vec<usize> {
        data.axis_iter(Axis(1))
            .map(|point| self.classify_point(point))
            .collect()
    }
}

/// Index of the largest entry, the first on ties
pub(crate) fn arg_max(values: impl IntoIterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.into_iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}
