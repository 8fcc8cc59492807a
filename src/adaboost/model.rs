//! Trained AdaBoost classifier with its label mapping

use crate::adaboost::{AdaBoost, DecisionStump, Perceptron};
use crate::core::error::check_dim;
use crate::core::{AdaBoostConfig, Matrix, MlError, Result, WeakLearnerType};
use crate::utils::{labels, validation};
use log::info;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// The ensemble for whichever weak learner family was trained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ensemble {
    DecisionStump(AdaBoost<DecisionStump>),
    Perceptron(AdaBoost<Perceptron>),
}

impl Ensemble {
    fn classify(&self, data: ArrayView2<'_, f64>) -> (Vec<usize>, Matrix) {
        match self {
            Self::DecisionStump(m) => m.classify(data),
            Self::Perceptron(m) => m.classify(data),
        }
    }

    fn alphas(&self) -> &[f64] {
        match self {
            Self::DecisionStump(m) => m.alphas(),
            Self::Perceptron(m) => m.alphas(),
        }
    }
}

/// AdaBoost over original label values.
///
/// Labels are mapped to classes `0..k` in order of first appearance during
/// training; predictions are mapped back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaBoostModel {
    mappings: Vec<f64>,
    dimensionality: usize,
    ensemble: Ensemble,
}

impl AdaBoostModel {
    /// Train on the columns of `data` with one label per column
    pub fn train(data: ArrayView2<'_, f64>, labels: &[f64], config: &AdaBoostConfig) -> Result<Self> {
        validation::validate_non_empty(data)?;
        validation::validate_finite(data)?;
        check_dim(data.ncols(), labels.len())?;

        let (classes, mappings) = labels::normalize_labels(labels)?;
        let num_classes = mappings.len();
        info!(
            "Training AdaBoost with {} on {} points, {} dimensions, {} classes",
            config.weak_learner.name(),
            data.ncols(),
            data.nrows(),
            num_classes
        );

        let ensemble = match config.weak_learner {
            WeakLearnerType::DecisionStump => Ensemble::DecisionStump(AdaBoost::train(
                data,
                &classes,
                num_classes,
                config,
            )?),
            WeakLearnerType::Perceptron => {
                Ensemble::Perceptron(AdaBoost::train(data, &classes, num_classes, config)?)
            }
        };

        Ok(Self {
            mappings,
            dimensionality: data.nrows(),
            ensemble,
        })
    }

    /// Predicted labels and the `classes x n` probability matrix for the
    /// columns of `data`
    pub fn classify(&self, data: ArrayView2<'_, f64>) -> Result<(Vec<f64>, Matrix)> {
        if data.nrows() != self.dimensionality {
            return Err(MlError::DimensionMismatch {
                expected: self.dimensionality,
                actual: data.nrows(),
            });
        }
        let (classes, probabilities) = self.ensemble.classify(data);
        let predicted = labels::revert_labels(&classes, &self.mappings)?;
        Ok((predicted, probabilities))
    }

    /// Predicted labels only
    pub fn predict(&self, data: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        Ok(self.classify(data)?.0)
    }

    /// Class probabilities only
    pub fn predict_proba(&self, data: ArrayView2<'_, f64>) -> Result<Matrix> {
        Ok(self.classify(data)?.1)
    }

    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    pub fn num_classes(&self) -> usize {
        self.mappings.len()
    }

    /// Original label of each class, in class order
    pub fn mappings(&self) -> &[f64] {
        &self.mappings
    }

    pub fn weak_learner_type(&self) -> WeakLearnerType {
        match self.ensemble {
            Ensemble::DecisionStump(_) => WeakLearnerType::DecisionStump,
            Ensemble::Perceptron(_) => WeakLearnerType::Perceptron,
        }
    }

    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    /// Number of weak learners in the ensemble
    pub fn weak_learners(&self) -> usize {
        self.ensemble.alphas().len()
    }

    pub fn alphas(&self) -> &[f64] {
        self.ensemble.alphas()
    }

    pub fn tolerance(&self) -> f64 {
        match &self.ensemble {
            Ensemble::DecisionStump(m) => m.tolerance(),
            Ensemble::Perceptron(m) => m.tolerance(),
        }
    }
}
