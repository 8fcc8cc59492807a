//! Penalty terms added to a layer's parameter gradient

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Adds the gradient of a penalty on `weights` to `gradient` in place
pub trait Regularizer: Debug + Clone + Send + Sync {
    fn evaluate(&self, weights: &[f64], gradient: &mut [f64]);
}

/// No penalty
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NoRegularizer;

impl Regularizer for NoRegularizer {
    fn evaluate(&self, _weights: &[f64], _gradient: &mut [f64]) {}
}

/// L1 penalty `factor * |w|`, gradient `factor * sign(w)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct L1Regularizer {
    pub factor: f64,
}

impl L1Regularizer {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl Regularizer for L1Regularizer {
    fn evaluate(&self, weights: &[f64], gradient: &mut [f64]) {
        for (g, &w) in gradient.iter_mut().zip(weights) {
            // sign(0) is 0
            if w != 0.0 {
                *g += self.factor * w.signum();
            }
        }
    }
}

/// L2 penalty `factor / 2 * w²`, gradient `factor * w`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct L2Regularizer {
    pub factor: f64,
}

impl L2Regularizer {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl Regularizer for L2Regularizer {
    fn evaluate(&self, weights: &[f64], gradient: &mut [f64]) {
        for (g, &w) in gradient.iter_mut().zip(weights) {
            *g += self.factor * w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_regularizer_leaves_gradient() {
        let mut gradient = vec![0.5, -1.0];
        NoRegularizer.evaluate(&[3.0, 4.0], &mut gradient);
        assert_eq!(gradient, vec![0.5, -1.0]);
    }

    #[test]
    fn test_l1_adds_sign() {
        let mut gradient = vec![0.0, 0.0, 1.0];
        L1Regularizer::new(0.1).evaluate(&[2.0, -3.0, 0.0], &mut gradient);
        assert_eq!(gradient, vec![0.1, -0.1, 1.0]);
    }

    #[test]
    fn test_l2_adds_scaled_weights() {
        let mut gradient = vec![1.0, 1.0];
        L2Regularizer::new(0.5).evaluate(&[2.0, -4.0], &mut gradient);
        assert_eq!(gradient, vec![2.0, -1.0]);
    }
}
