//! Loss functions closing a [`crate::ann::Sequential`] network

use crate::core::error::check_dim;
use crate::core::{Matrix, MlError, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub trait Loss: Debug + Send + Sync {
    /// Loss value of `prediction` against `target`
    fn forward(&self, prediction: ArrayView2<'_, f64>, target: ArrayView2<'_, f64>) -> Result<f64>;

    /// Gradient of the loss with respect to `prediction`
    fn backward(
        &self,
        prediction: ArrayView2<'_, f64>,
        target: ArrayView2<'_, f64>,
    ) -> Result<Matrix>;
}

/// Summed negative log-likelihood of log-probabilities.
///
/// `target` is a `1 x batch` row of 0-based class indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NegativeLogLikelihood;

impl NegativeLogLikelihood {
    fn classes(prediction: ArrayView2<'_, f64>, target: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        check_dim(1, target.nrows())?;
        check_dim(prediction.ncols(), target.ncols())?;
        target
            .iter()
            .map(|&label| {
                if label >= 0.0 && label.fract() == 0.0 && (label as usize) < prediction.nrows() {
                    Ok(label as usize)
                } else {
                    Err(MlError::InvalidLabel(label))
                }
            })
            .collect()
    }
}

impl Loss for NegativeLogLikelihood {
    fn forward(&self, prediction: ArrayView2<'_, f64>, target: ArrayView2<'_, f64>) -> Result<f64> {
        let classes = Self::classes(prediction, target)?;
        Ok(-classes
            .iter()
            .enumerate()
            .map(|(j, &k)| prediction[[k, j]])
            .sum::<f64>())
    }

    fn backward(
        &self,
        prediction: ArrayView2<'_, f64>,
        target: ArrayView2<'_, f64>,
    ) -> Result<Matrix> {
        let classes = Self::classes(prediction, target)?;
        let mut g = Array2::<f64>::zeros(prediction.raw_dim());
        for (j, k) in classes.into_iter().enumerate() {
            g[[k, j]] = -1.0;
        }
        Ok(g)
    }
}

/// Mean of squared differences over all entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
    fn forward(&self, prediction: ArrayView2<'_, f64>, target: ArrayView2<'_, f64>) -> Result<f64> {
        check_dim(prediction.len(), target.len())?;
        if prediction.is_empty() {
            return Err(MlError::EmptyDataset);
        }
        let total: f64 = prediction
            .iter()
            .zip(target.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum();
        Ok(total / prediction.len() as f64)
    }

    fn backward(
        &self,
        prediction: ArrayView2<'_, f64>,
        target: ArrayView2<'_, f64>,
    ) -> Result<Matrix> {
        check_dim(prediction.len(), target.len())?;
        let scale = 2.0 / prediction.len().max(1) as f64;
        let g = prediction
            .iter()
            .zip(target.iter())
            .map(|(p, t)| scale * (p - t))
            .collect();
        Ok(Array2::from_shape_vec(prediction.raw_dim(), g)?)
    }
}
