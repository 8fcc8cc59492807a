//! The contract every network layer implements
//!
//! Layers are stateless between calls: `forward`, `backward` and `gradient`
//! receive everything they need from the caller, which is responsible for
//! retaining intermediate activations (see [`crate::ann::Sequential`]).
//! Inputs and outputs are matrices whose columns are batch items.

use crate::core::{Matrix, Result, Vector};
use ndarray::ArrayView2;
use std::fmt::Debug;

pub trait Layer: Debug + Send + Sync {
    /// Number of entries in the flat parameter buffer
    fn weight_size(&self) -> usize;

    /// Rows of one input column
    fn input_size(&self) -> usize;

    /// Rows of one output column
    fn output_size(&self) -> usize;

    /// The flat parameter buffer
    fn parameters(&self) -> &[f64];

    /// Replace the parameter buffer; its length must equal `weight_size()`
    fn set_weights(&mut self, weights: &[f64]) -> Result<()>;

    /// Map `input` (`input_size x batch`) to the output
    /// (`output_size x batch`)
    fn forward(&self, input: ArrayView2<'_, f64>) -> Result<Matrix>;

    /// Gradient with respect to the input, given the gradient `gy` with
    /// respect to the output
    fn backward(
        &self,
        input: ArrayView2<'_, f64>,
        output: ArrayView2<'_, f64>,
        gy: ArrayView2<'_, f64>,
    ) -> Result<Matrix>;

    /// Gradient with respect to the parameters, in buffer order, given the
    /// gradient `error` with respect to the output
    fn gradient(&self, input: ArrayView2<'_, f64>, error: ArrayView2<'_, f64>) -> Result<Vector>;
}
