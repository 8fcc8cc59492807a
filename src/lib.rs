//! Machine learning building blocks in Rust
//!
//! Probability distributions with weighted maximum-likelihood training,
//! neural network layers with analytic gradients (including multihead
//! attention), and AdaBoost.MH multiclass boosting. Data matrices store one
//! point per column.

pub mod adaboost;
pub mod ann;
pub mod api;
pub mod core;
pub mod data;
pub mod distributions;
pub mod math;
pub mod persistence;
pub mod utils;

// Re-export main types for convenience
pub use crate::adaboost::AdaBoostModel;
pub use crate::ann::{Layer, Linear, LogSoftMax, MultiheadAttention, Sequential};
pub use crate::api::{AdaBoostTrainer, EvaluationMetrics};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{MlError, Result};
pub use crate::data::{CSVDataset, LibSVMDataset};
pub use crate::distributions::{
    DiagonalGaussianDistribution, DiscreteDistribution, GammaDistribution, GaussianDistribution,
    LaplaceDistribution, RegressionDistribution,
};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
