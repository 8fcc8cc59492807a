//! Core type definitions and configuration

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Dense column vector
pub type Vector = Array1<f64>;

/// Dense matrix; rows are dimensions, columns are points
pub type Matrix = Array2<f64>;

/// Weak learner used by AdaBoost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeakLearnerType {
    /// One-level decision tree on a single dimension
    DecisionStump,
    /// Multiclass perceptron
    Perceptron,
}

impl WeakLearnerType {
    /// Name used on the command line and in model summaries
    pub fn name(&self) -> &'static str {
        match self {
            Self::DecisionStump => "decision_stump",
            Self::Perceptron => "perceptron",
        }
    }
}

/// Configuration for AdaBoost training
#[derive(Debug, Clone)]
pub struct AdaBoostConfig {
    /// Maximum number of boosting rounds
    pub iterations: usize,
    /// Stop when the weighted margin changes less than this between rounds
    pub tolerance: f64,
    /// Weak learner family
    pub weak_learner: WeakLearnerType,
    /// Minimum number of points in each leaf of a decision stump
    pub minimum_leaf_size: usize,
    /// Maximum passes over the data for each perceptron
    pub perceptron_iterations: usize,
}

impl Default for AdaBoostConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            tolerance: 1e-10,
            weak_learner: WeakLearnerType::DecisionStump,
            minimum_leaf_size: 1,
            perceptron_iterations: 1000,
        }
    }
}

/// Configuration for the iterative Gamma shape fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaFitConfig {
    /// Relative change in alpha below which the fit has converged
    pub tolerance: f64,
    /// Newton iteration budget per dimension
    pub max_iterations: usize,
}

impl Default for GammaFitConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 1000,
        }
    }
}
