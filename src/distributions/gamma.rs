//! Gamma distribution with independent dimensions
//!
//! Each dimension `d` has shape `alpha[d]` and scale `beta[d]`:
//!
//! p(x) = x^(α-1) e^(-x/β) / (Γ(α) β^α)
//!
//! Training solves the maximum-likelihood equation for the shape with Minka's
//! generalized Newton iteration ("Estimating a Gamma distribution", 2002),
//! starting from his closed-form approximation. The scale follows as
//! `mean(x) / alpha`.

use crate::core::error::check_dim;
use crate::core::{Distribution, GammaFitConfig, MlError, RandomSample, Result, Vector};
use crate::utils::validation;
use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};
use special::Gamma;

/// Gamma distribution; one (shape, scale) pair per dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaDistribution {
    alpha: Vector,
    beta: Vector,
    #[serde(default)]
    config: GammaFitConfig,
}

impl Default for GammaDistribution {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GammaDistribution {
    /// `dimension` dimensions, each with unit shape and scale
    pub fn new(dimension: usize) -> Self {
        Self {
            alpha: Array1::ones(dimension),
            beta: Array1::ones(dimension),
            config: GammaFitConfig::default(),
        }
    }

    /// Distribution with explicit shapes and scales (all positive)
    pub fn from_parameters(alpha: Vector, beta: Vector) -> Result<Self> {
        check_dim(alpha.len(), beta.len())?;
        for (&a, &b) in alpha.iter().zip(beta.iter()) {
            if !(a.is_finite() && a > 0.0 && b.is_finite() && b > 0.0) {
                return Err(MlError::InvalidParameter(format!(
                    "Gamma parameters must be positive, got alpha {a} and beta {b}"
                )));
            }
        }
        Ok(Self {
            alpha,
            beta,
            config: GammaFitConfig::default(),
        })
    }

    /// Fit a new distribution to `observations`
    pub fn fit(observations: ArrayView2<'_, f64>) -> Result<Self> {
        let mut g = Self::default();
        g.train(observations)?;
        Ok(g)
    }

    /// Use a different convergence configuration for later training
    pub fn with_config(mut self, config: GammaFitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GammaFitConfig {
        &self.config
    }

    /// Shape of dimension `dim`
    pub fn alpha(&self, dim: usize) -> f64 {
        self.alpha[dim]
    }

    /// Scale of dimension `dim`
    pub fn beta(&self, dim: usize) -> f64 {
        self.beta[dim]
    }

    pub fn alphas(&self) -> &Vector {
        &self.alpha
    }

    pub fn betas(&self) -> &Vector {
        &self.beta
    }

    /// Fit every dimension from its sufficient statistics: `ln(mean(x))`,
    /// `mean(ln(x))` and `mean(x)`.
    pub fn train_statistics(
        &mut self,
        log_mean_x: ArrayView1<'_, f64>,
        mean_log_x: ArrayView1<'_, f64>,
        mean_x: ArrayView1<'_, f64>,
    ) -> Result<()> {
        check_dim(log_mean_x.len(), mean_log_x.len())?;
        check_dim(log_mean_x.len(), mean_x.len())?;

        let dims = log_mean_x.len();
        let mut alpha = Array1::<f64>::zeros(dims);
        let mut beta = Array1::<f64>::zeros(dims);
        for d in 0..dims {
            if !(mean_x[d].is_finite() && mean_x[d] > 0.0) {
                return Err(MlError::NumericalError(format!(
                    "mean of dimension {d} is {}, expected a positive value",
                    mean_x[d]
                )));
            }
            alpha[d] = fit_shape(log_mean_x[d], mean_log_x[d], &self.config)
                .map_err(|e| match e {
                    MlError::NonConvergence(msg) => {
                        MlError::NonConvergence(format!("dimension {d}: {msg}"))
                    }
                    other => other,
                })?;
            beta[d] = mean_x[d] / alpha[d];
        }

        self.alpha = alpha;
        self.beta = beta;
        Ok(())
    }

    /// Density of `x` under dimension `dim` alone
    pub fn probability_dim(&self, x: f64, dim: usize) -> f64 {
        self.log_probability_dim(x, dim).exp()
    }

    /// Log density of `x` under dimension `dim` alone
    pub fn log_probability_dim(&self, x: f64, dim: usize) -> f64 {
        let (a, b) = (self.alpha[dim], self.beta[dim]);
        if x < 0.0 {
            return f64::NEG_INFINITY;
        }
        if x == 0.0 && a == 1.0 {
            return -b.ln();
        }
        (a - 1.0) * x.ln() - x / b - Gamma::ln_gamma(a).0 - a * b.ln()
    }

    fn estimate(
        &mut self,
        observations: ArrayView2<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<()> {
        validation::validate_non_empty(observations)?;
        if let Some(&bad) = observations.iter().find(|x| !(x.is_finite() && **x > 0.0)) {
            return Err(MlError::InvalidDataset(format!(
                "Gamma observations must be positive and finite, got {bad}"
            )));
        }

        let total: f64 = weights.as_ref().map_or(observations.ncols() as f64, |w| w.sum());
        if total <= 0.0 {
            return Err(MlError::InvalidParameter(
                "Weights must have positive total mass".to_string(),
            ));
        }

        let dims = observations.nrows();
        let mut mean_x = Array1::<f64>::zeros(dims);
        let mut mean_log_x = Array1::<f64>::zeros(dims);
        for (j, column) in observations.axis_iter(Axis(1)).enumerate() {
            let w = weights.as_ref().map_or(1.0, |w| w[j]);
            for d in 0..dims {
                mean_x[d] += w * column[d];
                mean_log_x[d] += w * column[d].ln();
            }
        }
        mean_x /= total;
        mean_log_x /= total;
        let log_mean_x = mean_x.mapv(f64::ln);

        self.train_statistics(log_mean_x.view(), mean_log_x.view(), mean_x.view())
    }
}

/// Maximum-likelihood shape for one dimension.
///
/// `s = ln(mean(x)) - mean(ln(x))` is positive for any non-constant data.
fn fit_shape(log_mean_x: f64, mean_log_x: f64, config: &GammaFitConfig) -> Result<f64> {
    let s = log_mean_x - mean_log_x;
    if !s.is_finite() || s <= 0.0 {
        return Err(MlError::NumericalError(format!(
            "degenerate statistics for the shape fit (ln mean x - mean ln x = {s})"
        )));
    }

    let mut alpha = (3.0 - s + ((s - 3.0) * (s - 3.0) + 24.0 * s).sqrt()) / (12.0 * s);

    for iteration in 0..config.max_iterations {
        let numerator = mean_log_x - log_mean_x + alpha.ln() - Gamma::digamma(alpha);
        let denominator = alpha * alpha * (1.0 / alpha - Gamma::trigamma(&alpha));
        let mut next = 1.0 / (1.0 / alpha + numerator / denominator);
        if !next.is_finite() || next <= 0.0 {
            next = alpha / 2.0;
        }

        let change = (next - alpha).abs() / next;
        alpha = next;
        if change < config.tolerance {
            debug!("Gamma shape converged to {alpha} after {} iterations", iteration + 1);
            return Ok(alpha);
        }
    }

    Err(MlError::NonConvergence(format!(
        "shape estimate did not converge within {} iterations (last value {alpha})",
        config.max_iterations
    )))
}

impl Distribution for GammaDistribution {
    fn dimensionality(&self) -> usize {
        self.alpha.len()
    }

    fn log_probability(&self, observation: ArrayView1<'_, f64>) -> Result<f64> {
        check_dim(self.dimensionality(), observation.len())?;
        Ok(observation
            .iter()
            .enumerate()
            .map(|(d, &x)| self.log_probability_dim(x, d))
            .sum())
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

impl RandomSample for GammaDistribution {
    fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector {
        Array1::from_shape_fn(self.dimensionality(), |d| {
            rand_distr::Gamma::new(self.alpha[d], self.beta[d])
                .map_or(f64::NAN, |gamma| gamma.sample(rng))
        })
    }
}
