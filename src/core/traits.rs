//! Core traits shared across rsml

use crate::core::{Result, Vector};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::Rng;

/// Dataset abstraction: a dense matrix of points plus optional labels
pub trait Dataset: Send + Sync {
    /// Number of points in the dataset
    fn len(&self) -> usize;

    /// Number of features (dimensionality)
    fn dim(&self) -> usize;

    /// Points as columns of a `dim() x len()` matrix
    fn data(&self) -> ArrayView2<'_, f64>;

    /// Per-point labels, when the source carried them
    fn labels(&self) -> Option<&[f64]>;

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A probability distribution that can be evaluated and fit to data.
///
/// Observations are columns; a single observation is a vector whose length
/// equals [`Distribution::dimensionality`].
pub trait Distribution: Send + Sync {
    /// Number of dimensions of one observation
    fn dimensionality(&self) -> usize;

    /// Log density (or log mass) of one observation
    fn log_probability(&self, observation: ArrayView1<'_, f64>) -> Result<f64>;

    /// Density (or mass) of one observation
    fn probability(&self, observation: ArrayView1<'_, f64>) -> Result<f64> {
        Ok(self.log_probability(observation)?.exp())
    }

    /// Log density of every column of `observations`
    fn log_probabilities(&self, observations: ArrayView2<'_, f64>) -> Result<Vector> {
        observations
            .columns()
            .into_iter()
            .map(|column| self.log_probability(column))
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }

    /// Density of every column of `observations`
    fn probabilities(&self, observations: ArrayView2<'_, f64>) -> Result<Vector> {
        observations
            .columns()
            .into_iter()
            .map(|column| self.probability(column))
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }

    /// Maximum-likelihood estimate of the parameters from `observations`
    fn train(&mut self, observations: ArrayView2<'_, f64>) -> Result<()>;

    /// Weighted maximum-likelihood estimate; one non-negative weight per column
    fn train_weighted(
        &mut self,
        observations: ArrayView2<'_, f64>,
        weights: ArrayView1<'_, f64>,
    ) -> Result<()>;
}

/// Distributions that can draw random observations
pub trait RandomSample {
    /// Draw one observation
    fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector;
}
