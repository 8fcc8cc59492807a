//! Utility functions shared by the distributions, layers and AdaBoost

use crate::core::{MlError, Result};

/// Validation and preprocessing utilities
pub mod validation {
    use super::*;
    use ndarray::{ArrayView1, ArrayView2};

    /// Validate a per-point weight vector against the data it weights.
    ///
    /// Weights must be finite and non-negative, one per column of `data`.
    pub fn validate_weights(data: ArrayView2<'_, f64>, weights: ArrayView1<'_, f64>) -> Result<()> {
        if weights.len() != data.ncols() {
            return Err(MlError::DimensionMismatch {
                expected: data.ncols(),
                actual: weights.len(),
            });
        }
        for (i, &w) in weights.iter().enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(MlError::InvalidParameter(format!(
                    "Weight {w} at index {i} must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }

    /// Validate that every entry of `data` is finite
    pub fn validate_finite(data: ArrayView2<'_, f64>) -> Result<()> {
        for ((row, col), &value) in data.indexed_iter() {
            if !value.is_finite() {
                return Err(MlError::InvalidDataset(format!(
                    "Non-finite value {value} at dimension {row} of point {col}"
                )));
            }
        }
        Ok(())
    }

    /// Validate that a dataset has at least one point
    pub fn validate_non_empty(data: ArrayView2<'_, f64>) -> Result<()> {
        if data.ncols() == 0 {
            return Err(MlError::EmptyDataset);
        }
        Ok(())
    }
}

/// Mapping between arbitrary real-valued labels and class indices
pub mod labels {
    use super::*;

    /// Map labels onto `0..k` in order of first appearance.
    ///
    /// Returns the class index of every point and the distinct original
    /// labels, where `mapping[c]` is the label of class `c`.
    pub fn normalize_labels(labels: &[f64]) -> Result<(Vec<usize>, Vec<f64>)> {
        let mut mapping: Vec<f64> = Vec::new();
        let mut normalized = Vec::with_capacity(labels.len());

        for &label in labels {
            if !label.is_finite() {
                return Err(MlError::InvalidLabel(label));
            }
            let class = match mapping.iter().position(|&m| m == label) {
                Some(c) => c,
                None => {
                    mapping.push(label);
                    mapping.len() - 1
                }
            };
            normalized.push(class);
        }

        Ok((normalized, mapping))
    }

    /// Map class indices back onto the original labels
    pub fn revert_labels(classes: &[usize], mapping: &[f64]) -> Result<Vec<f64>> {
        classes
            .iter()
            .map(|&c| {
                mapping.get(c).copied().ok_or_else(|| {
                    MlError::InvalidParameter(format!(
                        "Class index {c} outside of label mapping of size {}",
                        mapping.len()
                    ))
                })
            })
            .collect()
    }
}
