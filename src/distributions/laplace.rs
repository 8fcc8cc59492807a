//! Laplace distribution with a location vector and one shared scale
//!
//! Dimensions are independent Laplace variables sharing the scale `s`:
//!
//! ln p(x) = -d ln(2s) - ||x - μ||₁ / s

use crate::core::error::check_dim;
use crate::core::{Distribution, MlError, RandomSample, Result, Vector};
use crate::utils::validation;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaplaceDistribution {
    mean: Vector,
    scale: f64,
}

impl Default for LaplaceDistribution {
    fn default() -> Self {
        Self::new(0)
    }
}

impl LaplaceDistribution {
    /// Zero location and unit scale
    pub fn new(dimension: usize) -> Self {
        Self {
            mean: Array1::zeros(dimension),
            scale: 1.0,
        }
    }

    pub fn from_parameters(mean: Vector, scale: f64) -> Result<Self> {
        let mut l = Self::new(mean.len());
        l.mean = mean;
        l.set_scale(scale)?;
        Ok(l)
    }

    /// Location of each dimension
    pub fn mean(&self) -> &Vector {
        &self.mean
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_mean(&mut self, mean: Vector) -> Result<()> {
        check_dim(self.mean.len(), mean.len())?;
        self.mean = mean;
        Ok(())
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(MlError::InvalidParameter(format!(
                "Laplace scale must be positive, got {scale}"
            )));
        }
        self.scale = scale;
        Ok(())
    }

    fn estimate(
        &mut self,
        observations: ArrayView2<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<()> {
        validation::validate_non_empty(observations)?;
        validation::validate_finite(observations)?;

        let n = observations.ncols();
        let weight_of = |j: usize| weights.as_ref().map_or(1.0, |w| w[j]);
        let total: f64 = (0..n).map(weight_of).sum();
        if total <= 0.0 {
            return Err(MlError::InvalidParameter(
                "Weights must have positive total mass".to_string(),
            ));
        }

        let dims = observations.nrows();
        let mut mean = Array1::<f64>::zeros(dims);
        let mut deviation = 0.0;
        for (d, row) in observations.rows().into_iter().enumerate() {
            mean[d] = weighted_median(row, &weight_of, total);
            deviation += row
                .iter()
                .enumerate()
                .map(|(j, &x)| weight_of(j) * (x - mean[d]).abs())
                .sum::<f64>();
        }
        let scale = deviation / (total * dims as f64);

        if scale <= 0.0 || !scale.is_finite() {
            return Err(MlError::NumericalError(
                "observations have no spread around their median".to_string(),
            ));
        }

        self.mean = mean;
        self.scale = scale;
        Ok(())
    }
}

/// Smallest value whose cumulative weight reaches half of `total`
fn weighted_median(row: ArrayView1<'_, f64>, weight_of: &impl Fn(usize) -> f64, total: f64) -> f64 {
    let mut order: Vec<usize> = (0..row.len()).collect();
    order.sort_by(|&a, &b| row[a].total_cmp(&row[b]));

    let half = total / 2.0;
    let mut cumulative = 0.0;
    for &j in &order {
        cumulative += weight_of(j);
        if cumulative >= half {
            return row[j];
        }
    }
    order.last().map_or(0.0, |&j| row[j])
}

impl Distribution for LaplaceDistribution {
    fn dimensionality(&self) -> usize {
        self.mean.len()
    }

    fn log_probability(&self, observation: ArrayView1<'_, f64>) -> Result<f64> {
        check_dim(self.dimensionality(), observation.len())?;
        let l1: f64 = observation
            .iter()
            .zip(self.mean.iter())
            .map(|(x, m)| (x - m).abs())
            .sum();
        let d = self.dimensionality() as f64;
        Ok(-d * (2.0 * self.scale).ln() - l1 / self.scale)
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

impl RandomSample for LaplaceDistribution {
    /// Inverse-CDF sampling per dimension
    fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector {
        self.mean.mapv(|m| {
            let u: f64 = rng.random::<f64>() - 0.5;
            let tail = (1.0 - 2.0 * u.abs()).max(f64::MIN_POSITIVE);
            m - self.scale * u.signum() * tail.ln()
        })
    }
}
