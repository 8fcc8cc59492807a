//! Gaussian with a diagonal covariance (independent dimensions)

use crate::core::error::check_dim;
use crate::core::{Distribution, MlError, RandomSample, Result, Vector};
use crate::math::linalg;
use crate::utils::validation;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution as _, StandardNormal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Smallest variance kept after training
const MIN_VARIANCE: f64 = 1e-50;

/// Multivariate normal distribution whose covariance is diagonal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DiagonalParameters", into = "DiagonalParameters")]
pub struct DiagonalGaussianDistribution {
    mean: Vector,
    covariance: Vector,
    inv_cov: Vector,
    log_det_cov: f64,
}

#[derive(Serialize, Deserialize)]
struct DiagonalParameters {
    mean: Vector,
    covariance: Vector,
}

impl TryFrom<DiagonalParameters> for DiagonalGaussianDistribution {
    type Error = MlError;

    fn try_from(p: DiagonalParameters) -> Result<Self> {
        Self::from_parameters(p.mean, p.covariance)
    }
}

impl From<DiagonalGaussianDistribution> for DiagonalParameters {
    fn from(g: DiagonalGaussianDistribution) -> Self {
        Self {
            mean: g.mean,
            covariance: g.covariance,
        }
    }
}

impl Default for DiagonalGaussianDistribution {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DiagonalGaussianDistribution {
    /// Zero mean and unit variances
    pub fn new(dimension: usize) -> Self {
        Self {
            mean: Array1::zeros(dimension),
            covariance: Array1::ones(dimension),
            inv_cov: Array1::ones(dimension),
            log_det_cov: 0.0,
        }
    }

    /// Distribution with the given mean and per-dimension variances
    pub fn from_parameters(mean: Vector, covariance: Vector) -> Result<Self> {
        let mut g = Self::new(mean.len());
        g.mean = mean;
        g.set_covariance(covariance)?;
        Ok(g)
    }

    pub fn mean(&self) -> &Vector {
        &self.mean
    }

    /// Diagonal of the covariance
    pub fn covariance(&self) -> &Vector {
        &self.covariance
    }

    pub fn set_mean(&mut self, mean: Vector) -> Result<()> {
        check_dim(self.mean.len(), mean.len())?;
        self.mean = mean;
        Ok(())
    }

    /// Replace the variances; every entry must be positive
    pub fn set_covariance(&mut self, covariance: Vector) -> Result<()> {
        check_dim(self.mean.len(), covariance.len())?;
        if let Some(bad) = covariance.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(MlError::InvalidParameter(format!(
                "Variance {bad} must be positive and finite"
            )));
        }
        self.inv_cov = covariance.mapv(|v| 1.0 / v);
        self.log_det_cov = covariance.iter().map(|v| v.ln()).sum();
        self.covariance = covariance;
        Ok(())
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
        let denominator = linalg::unbiased_denominator(observations.ncols(), weights);

        let mut covariance = Array1::<f64>::zeros(mean.len());
        for (j, column) in observations.axis_iter(Axis(1)).enumerate() {
            let w = weights.as_ref().map_or(1.0, |w| w[j]);
            let diff = &column - &mean;
            covariance.scaled_add(w, &diff.mapv(|d| d * d));
        }
        if denominator > 0.0 {
            covariance /= denominator;
        }
        covariance.mapv_inplace(|v| v.max(MIN_VARIANCE));

        self.mean = mean;
        self.set_covariance(covariance)
    }
}

impl Distribution for DiagonalGaussianDistribution {
    fn dimensionality(&self) -> usize {
        self.mean.len()
    }

    fn log_probability(&self, observation: ArrayView1<'_, f64>) -> Result<f64> {
        check_dim(self.dimensionality(), observation.len())?;
        let k = self.dimensionality() as f64;
        let diff = &observation - &self.mean;
        let exponent: f64 = diff
            .iter()
            .zip(self.inv_cov.iter())
            .map(|(d, inv)| d * d * inv)
            .sum();
        Ok(-0.5 * k * (2.0 * PI).ln() - 0.5 * self.log_det_cov - 0.5 * exponent)
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

impl RandomSample for DiagonalGaussianDistribution {
    fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector {
        Array1::from_shape_fn(self.dimensionality(), |i| {
            let z: f64 = StandardNormal.sample(rng);
            self.mean[i] + self.covariance[i].sqrt() * z
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_constructors() {
        let empty = DiagonalGaussianDistribution::default();
        assert_eq!(empty.mean().len(), 0);
        assert_eq!(empty.covariance().len(), 0);

        let d = DiagonalGaussianDistribution::new(4);
        assert_eq!(d.mean().len(), 4);
        assert_eq!(d.covariance().len(), 4);

        assert!(DiagonalGaussianDistribution::from_parameters(array![0.0], array![0.0]).is_err());
        assert!(
            DiagonalGaussianDistribution::from_parameters(array![0.0, 1.0], array![1.0]).is_err()
        );
    }

    #[test]
    fn test_log_probability_reference_values() {
        let d = DiagonalGaussianDistribution::from_parameters(
            array![2.0, 5.0, 3.0, 4.0, 1.0],
            array![3.0, 1.0, 5.0, 3.0, 2.0],
        )
        .unwrap();
        assert_relative_eq!(
            d.log_probability(array![3.0, 5.0, 2.0, 7.0, 8.0].view()).unwrap(),
            -20.861264167855161,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            d.log_probability(array![2.0, 9.0, 5.0, 6.0, 3.0].view()).unwrap(),
            -16.9112641678551621,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_multipoint_log_probabilities() {
        let d = DiagonalGaussianDistribution::from_parameters(
            array![2.0, 5.0, 3.0, 7.0, 2.0],
            array![9.0, 2.0, 1.0, 4.0, 8.0],
        )
        .unwrap();
        let points = array![
            [3.0, 5.0, 2.0, 7.0, 5.0, 8.0],
            [2.0, 6.0, 8.0, 3.0, 4.0, 6.0],
            [1.0, 4.0, 2.0, 7.0, 8.0, 2.0],
            [6.0, 8.0, 4.0, 7.0, 9.0, 2.0],
            [4.0, 6.0, 7.0, 7.0, 3.0, 2.0]
        ];
        let phis = d.log_probabilities(points.view()).unwrap();
        let expected = [
            -12.453302051926864,
            -10.147746496371308,
            -13.210246496371308,
            -19.724135385260197,
            -21.585246496371308,
            -13.647746496371308,
        ];
        assert_eq!(phis.len(), 6);
        for (p, e) in phis.iter().zip(expected.iter()) {
            assert_relative_eq!(*p, *e, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_univariate_probability() {
        let mut d = DiagonalGaussianDistribution::from_parameters(array![1.0], array![2.0]).unwrap();
        assert_relative_eq!(d.probability(array![0.0].view()).unwrap(), 0.21969564473386122, epsilon = 1e-12);
        assert_relative_eq!(d.probability(array![-1.0].view()).unwrap(), 0.10377687435514872, epsilon = 1e-12);

        d.set_covariance(array![1.0]).unwrap();
        assert_relative_eq!(d.probability(array![-1.0].view()).unwrap(), 0.053990966513188056, epsilon = 1e-12);
    }

    #[test]
    fn test_unbiased_weighted_estimator() {
        let observations = array![
            [3.0, 5.0, 2.0, 7.0],
            [2.0, 6.0, 8.0, 3.0],
            [1.0, 4.0, 2.0, 7.0],
            [6.0, 8.0, 4.0, 7.0]
        ];
        let mut d = DiagonalGaussianDistribution::default();
        d.train_weighted(observations.view(), array![0.3, 0.4, 0.1, 0.2].view())
            .unwrap();

        let means = [4.5, 4.4, 3.5, 6.8];
        let variances = [
            3.78571428571428603,
            6.34285714285714253,
            6.64285714285714235,
            2.22857142857142865,
        ];
        for i in 0..4 {
            assert_relative_eq!(d.mean()[i], means[i], epsilon = 1e-10);
            assert_relative_eq!(d.covariance()[i], variances[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_equal_weights_reduce_to_unweighted() {
        let observations = array![
            [2.1, 3.4, 1.9, 2.8, 2.2],
            [1.0, 0.2, 3.3, 1.1, 2.0],
            [8.0, 9.1, 7.5, 6.9, 8.8],
            [3.0, 2.5, 4.1, 3.3, 1.9]
        ];
        let mut d1 = DiagonalGaussianDistribution::default();
        let mut d2 = DiagonalGaussianDistribution::default();
        d1.train(observations.view()).unwrap();
        d2.train_weighted(observations.view(), Array1::from_elem(5, 0.2).view())
            .unwrap();
        for i in 0..4 {
            assert_relative_eq!(d1.mean()[i], d2.mean()[i], epsilon = 1e-12);
            assert_relative_eq!(d1.covariance()[i], d2.covariance()[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_constant_dimension_is_floored() {
        let observations = array![[1.0, 1.0, 1.0], [0.0, 1.0, 2.0]];
        let mut d = DiagonalGaussianDistribution::default();
        d.train(observations.view()).unwrap();
        assert_eq!(d.covariance()[0], MIN_VARIANCE);
        assert_relative_eq!(d.covariance()[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_random_recovers_parameters() {
        let d = DiagonalGaussianDistribution::from_parameters(array![2.5, 1.25], array![0.5, 0.25])
            .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut samples = Array2::<f64>::zeros((2, 5000));
        for mut column in samples.columns_mut() {
            column.assign(&d.random(&mut rng));
        }
        let mut fitted = DiagonalGaussianDistribution::default();
        fitted.train(samples.view()).unwrap();
        assert_relative_eq!(fitted.mean()[0], 2.5, epsilon = 0.05);
        assert_relative_eq!(fitted.mean()[1], 1.25, epsilon = 0.05);
        assert_relative_eq!(fitted.covariance()[0], 0.5, epsilon = 0.05);
        assert_relative_eq!(fitted.covariance()[1], 0.25, epsilon = 0.025);
    }
}
