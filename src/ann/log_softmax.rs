//! Column-wise log-softmax

use crate::ann::Layer;
use crate::core::error::check_dim;
use crate::core::{Matrix, Result, Vector};
use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// `y = x - ln Σ exp(x)` per column; no parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSoftMax {
    size: usize,
}

impl LogSoftMax {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl Layer for LogSoftMax {
    fn weight_size(&self) -> usize {
        0
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn parameters(&self) -> &[f64] {
        &[]
    }

    fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
        check_dim(0, weights.len())
    }

    fn forward(&self, input: ArrayView2<'_, f64>) -> Result<Matrix> {
        check_dim(self.size, input.nrows())?;
        let mut output = input.to_owned();
        for mut column in output.axis_iter_mut(Axis(1)) {
            let max = column.fold(f64::NEG_INFINITY, |m, &x| m.max(x));
            let log_sum = column.fold(0.0, |s, &x| s + (x - max).exp()).ln();
            column.mapv_inplace(|x| x - max - log_sum);
        }
        Ok(output)
    }

    fn backward(
        &self,
        _input: ArrayView2<'_, f64>,
        output: ArrayView2<'_, f64>,
        gy: ArrayView2<'_, f64>,
    ) -> Result<Matrix> {
        check_dim(self.size, gy.nrows())?;
        let totals = gy.sum_axis(Axis(0)).insert_axis(Axis(0));
        Ok(&gy - &(output.mapv(f64::exp) * &totals))
    }

    fn gradient(&self, _input: ArrayView2<'_, f64>, _error: ArrayView2<'_, f64>) -> Result<Vector> {
        Ok(Array1::zeros(0))
    }
}
