//! Weighted multiclass perceptron

use crate::adaboost::weak_learner::{arg_max, WeakLearner};
use crate::core::error::check_dim;
use crate::core::{AdaBoostConfig, Matrix, MlError, Result, Vector};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// One weight row and bias per class; predicts the class with the largest
/// score `w_k·x + b_k`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perceptron {
    weights: Matrix,
    biases: Vector,
}

impl Perceptron {
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &Vector {
        &self.biases
    }
}

impl WeakLearner for Perceptron {
    /// Each mistake moves the true class toward the point and the predicted
    /// class away from it, scaled by the point's weight. Stops after a pass
    /// with no mistakes or after `config.perceptron_iterations` passes.
    fn train(
        data: ArrayView2<'_, f64>,
        labels: &[usize],
        num_classes: usize,
        weights: ArrayView1<'_, f64>,
        config: &AdaBoostConfig,
    ) -> Result<Self> {
        check_dim(data.ncols(), labels.len())?;
        check_dim(data.ncols(), weights.len())?;
        if data.ncols() == 0 {
            return Err(MlError::EmptyDataset);
        }

        let mut p = Self {
            weights: Array2::zeros((num_classes, data.nrows())),
            biases: Array1::zeros(num_classes),
        };

        for pass in 0..config.perceptron_iterations {
            let mut mistakes = 0;
            for (j, point) in data.axis_iter(Axis(1)).enumerate() {
                let predicted = p.classify_point(point);
                let actual = labels[j];
                if predicted == actual {
                    continue;
                }
                mistakes += 1;
                let w = weights[j];
                p.weights.row_mut(actual).scaled_add(w, &point);
                p.weights.row_mut(predicted).scaled_add(-w, &point);
                p.biases[actual] += w;
                p.biases[predicted] -= w;
            }
            if mistakes == 0 {
                debug!("Perceptron converged after {} passes", pass + 1);
                break;
            }
        }

        Ok(p)
    }

    fn classify_point(&self, point: ArrayView1<'_, f64>) -> usize {
        let scores = self.weights.dot(&point) + &self.biases;
        arg_max(scores.iter().copied())
    }
}
