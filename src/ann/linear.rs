//! Affine layer `y = W x + b`
//!
//! The parameter buffer holds the `out x in` weight matrix row by row,
//! followed by the `out` bias entries.

use crate::ann::{Layer, NoRegularizer, Regularizer};
use crate::core::error::check_dim;
use crate::core::{Matrix, Result, Vector};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear<R: Regularizer = NoRegularizer> {
    in_size: usize,
    out_size: usize,
    weights: Vec<f64>,
    regularizer: R,
}

impl Linear<NoRegularizer> {
    /// Unregularized layer with all parameters zero
    pub fn new(in_size: usize, out_size: usize) -> Self {
        Self::with_regularizer(in_size, out_size, NoRegularizer)
    }
}

impl<R: Regularizer> Linear<R> {
    /// Layer whose parameter gradient is adjusted by `regularizer`
    pub fn with_regularizer(in_size: usize, out_size: usize, regularizer: R) -> Self {
        Self {
            in_size,
            out_size,
            weights: vec![0.0; out_size * in_size + out_size],
            regularizer,
        }
    }

    pub fn regularizer(&self) -> &R {
        &self.regularizer
    }

    /// The `out x in` weight matrix
    pub fn weight(&self) -> Result<ArrayView2<'_, f64>> {
        let n = self.out_size * self.in_size;
        Ok(ArrayView2::from_shape(
            (self.out_size, self.in_size),
            &self.weights[..n],
        )?)
    }

    /// The bias vector
    pub fn bias(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(&self.weights[self.out_size * self.in_size..])
    }
}

impl<R: Regularizer> Layer for Linear<R> {
    fn weight_size(&self) -> usize {
        self.out_size * self.in_size + self.out_size
    }

    fn input_size(&self) -> usize {
        self.in_size
    }

    fn output_size(&self) -> usize {
        self.out_size
    }

    fn parameters(&self) -> &[f64] {
        &self.weights
    }

    fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
        check_dim(self.weight_size(), weights.len())?;
        self.weights.copy_from_slice(weights);
        Ok(())
    }

    fn forward(&self, input: ArrayView2<'_, f64>) -> Result<Matrix> {
        check_dim(self.in_size, input.nrows())?;
        let mut output = self.weight()?.dot(&input);
        output += &self.bias().insert_axis(Axis(1));
        Ok(output)
    }

    fn backward(
        &self,
        _input: ArrayView2<'_, f64>,
        _output: ArrayView2<'_, f64>,
        gy: ArrayView2<'_, f64>,
    ) -> Result<Matrix> {
        check_dim(self.out_size, gy.nrows())?;
        Ok(self.weight()?.t().dot(&gy))
    }

    fn gradient(&self, input: ArrayView2<'_, f64>, error: ArrayView2<'_, f64>) -> Result<Vector> {
        check_dim(self.in_size, input.nrows())?;
        check_dim(self.out_size, error.nrows())?;
        check_dim(input.ncols(), error.ncols())?;

        let mut gradient = Vec::with_capacity(self.weight_size());
        gradient.extend(error.dot(&input.t()).iter());
        gradient.extend(error.sum_axis(Axis(1)).iter());

        self.regularizer.evaluate(&self.weights, &mut gradient);
        Ok(Array1::from(gradient))
    }
}
