//! Multivariate Gaussian with full covariance
//!
//! The lower Cholesky factor, inverse covariance and log-determinant are
//! cached and refreshed whenever the covariance changes. Serialized form holds
//! only the mean and covariance; the cache is rebuilt on load.

use crate::core::error::check_dim;
use crate::core::{Distribution, Matrix, MlError, RandomSample, Result, Vector};
use crate::math::linalg;
use crate::utils::validation;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution as _, StandardNormal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Multivariate normal distribution `N(mean, covariance)`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GaussianParameters", into = "GaussianParameters")]
pub struct GaussianDistribution {
    mean: Vector,
    covariance: Matrix,
    cov_lower: Matrix,
    inv_cov: Matrix,
    log_det_cov: f64,
}

#[derive(Serialize, Deserialize)]
struct GaussianParameters {
    mean: Vector,
    covariance: Matrix,
}

impl TryFrom<GaussianParameters> for GaussianDistribution {
    type Error = MlError;

    fn try_from(p: GaussianParameters) -> Result<Self> {
        Self::from_parameters(p.mean, p.covariance)
    }
}

impl From<GaussianDistribution> for GaussianParameters {
    fn from(g: GaussianDistribution) -> Self {
        Self {
            mean: g.mean,
            covariance: g.covariance,
        }
    }
}

impl Default for GaussianDistribution {
    /// Empty distribution of dimensionality 0
    fn default() -> Self {
        Self::new(0)
    }
}

impl GaussianDistribution {
    /// Zero mean and identity covariance in `dimension` dimensions
    pub fn new(dimension: usize) -> Self {
        Self {
            mean: Array1::zeros(dimension),
            covariance: Array2::eye(dimension),
            cov_lower: Array2::eye(dimension),
            inv_cov: Array2::eye(dimension),
            log_det_cov: 0.0,
        }
    }

    /// Distribution with the given mean and covariance.
    ///
    /// Fails when the shapes disagree or the covariance is not
    /// positive-definite.
    pub fn from_parameters(mean: Vector, covariance: Matrix) -> Result<Self> {
        check_dim(mean.len(), covariance.nrows())?;
        check_dim(mean.len(), covariance.ncols())?;
        let mut g = Self::new(0);
        g.mean = mean;
        g.set_covariance(covariance)?;
        Ok(g)
    }

    pub fn mean(&self) -> &Vector {
        &self.mean
    }

    pub fn covariance(&self) -> &Matrix {
        &self.covariance
    }

    /// Replace the mean; the covariance cache is unaffected
    pub fn set_mean(&mut self, mean: Vector) -> Result<()> {
        check_dim(self.mean.len(), mean.len())?;
        self.mean = mean;
        Ok(())
    }

    /// Replace the covariance and refresh the cached factorization
    pub fn set_covariance(&mut self, covariance: Matrix) -> Result<()> {
        check_dim(self.mean.len(), covariance.nrows())?;
        let lower = linalg::cholesky(covariance.view())?;
        self.refresh(covariance, lower)
    }

    fn refresh(&mut self, covariance: Matrix, lower: Matrix) -> Result<()> {
        self.inv_cov = linalg::cholesky_inverse(lower.view())?;
        self.log_det_cov = linalg::log_det_from_cholesky(lower.view());
        self.cov_lower = lower;
        self.covariance = covariance;
        Ok(())
    }

    /// Inverse of the covariance
    pub fn inv_cov(&self) -> &Matrix {
        &self.inv_cov
    }

    /// `ln |covariance|`
    pub fn log_det_cov(&self) -> f64 {
        self.log_det_cov
    }

    fn estimate(
        &mut self,
        observations: ArrayView2<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<()> {
        validation::validate_non_empty(observations)?;
        validation::validate_finite(observations)?;
        if let Some(w) = weights.as_ref() {
            if w.sum() <= 0.0 {
                return Err(MlError::InvalidParameter(
                    "Weights must have positive total mass".to_string(),
                ));
            }
        }

        let mean = linalg::column_mean(observations, weights);
        let mut covariance = linalg::column_covariance_around(observations, mean.view(), weights);

        let (lower, jitter) = linalg::cholesky_with_jitter(covariance.view())?;
        if jitter > 0.0 {
            covariance.diag_mut().mapv_inplace(|v| v + jitter);
        }

        self.mean = mean;
        self.refresh(covariance, lower)
    }
}

impl Distribution for GaussianDistribution {
    fn dimensionality(&self) -> usize {
        self.mean.len()
    }

    fn log_probability(&self, observation: ArrayView1<'_, f64>) -> Result<f64> {
        check_dim(self.dimensionality(), observation.len())?;
        let k = self.dimensionality() as f64;
        let diff = &observation - &self.mean;
        // (x - mu)^T Sigma^-1 (x - mu) = |L^-1 (x - mu)|^2
        let y = linalg::solve_lower(self.cov_lower.view(), diff.view().insert_axis(Axis(1)))?;
        let mahalanobis = y.iter().map(|v| v * v).sum::<f64>();
        Ok(-0.5 * k * (2.0 * PI).ln() - 0.5 * self.log_det_cov - 0.5 * mahalanobis)
    }

    fn train(&mut self, observations: ArrayView2<'_, f64>) -> Result<()> {
        self.estimate(observations, None)
    }

    fn train_weighted(
        &mut self,
        observations: ArrayView2<'_, f64>,
        weights: ArrayView1<'_, f64>,
    ) -> Result<()> {
        validation::validate_weights(observations, weights)?;
        self.estimate(observations, Some(weights))
    }
}

impl RandomSample for GaussianDistribution {
    fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector {
        let z: Vector = Array1::from_shape_fn(self.dimensionality(), |_| StandardNormal.sample(rng));
        self.cov_lower.dot(&z) + &self.mean
    }
}
