//! Factorized multi-dimensional categorical distribution
//!
//! Each dimension is an independent categorical variable over `0..n_d`; the
//! probability of an observation is the product of the per-dimension
//! probabilities. Observations are real-valued and rounded to the nearest
//! category.

use crate::core::error::check_dim;
use crate::core::{Distribution, MlError, RandomSample, Result, Vector};
use crate::utils::validation;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Discrete distribution over one or more categorical dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteDistribution {
    probabilities: Vec<Vector>,
}

impl DiscreteDistribution {
    /// One dimension with `num_categories` equally likely categories
    pub fn new(num_categories: usize) -> Self {
        Self::with_dimensions(&[num_categories])
    }

    /// One uniform categorical dimension per entry of `categories`
    pub fn with_dimensions(categories: &[usize]) -> Self {
        let probabilities = categories
            .iter()
            .map(|&n| uniform(n))
            .collect();
        Self { probabilities }
    }

    /// Explicit per-dimension probability vectors.
    ///
    /// Each vector is normalized to sum to one; a vector with no mass becomes
    /// uniform. Negative or non-finite entries are rejected.
    pub fn from_probabilities(probabilities: Vec<Vector>) -> Result<Self> {
        let probabilities = probabilities
            .into_iter()
            .enumerate()
            .map(|(d, p)| normalized(d, p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { probabilities })
    }

    /// Probability vector of dimension `dim`
    pub fn dimension_probabilities(&self, dim: usize) -> Option<&Vector> {
        self.probabilities.get(dim)
    }

    /// Replace the probability vector of dimension `dim` (normalized like
    /// [`DiscreteDistribution::from_probabilities`])
    pub fn set_dimension_probabilities(&mut self, dim: usize, probabilities: Vector) -> Result<()> {
        let p = normalized(dim, probabilities)?;
        match self.probabilities.get_mut(dim) {
            Some(slot) => {
                *slot = p;
                Ok(())
            }
            None => Err(MlError::InvalidParameter(format!(
                "Dimension {dim} does not exist in a {}-dimensional distribution",
                self.probabilities.len()
            ))),
        }
    }

    /// Number of categories of each dimension
    pub fn categories(&self) -> Vec<usize> {
        self.probabilities.iter().map(|p| p.len()).collect()
    }

    /// Category index of `value` in dimension `dim`
    fn category(&self, dim: usize, value: f64) -> Result<usize> {
        let n = self.probabilities[dim].len();
        let rounded = (value + 0.5).floor();
        if !rounded.is_finite() || rounded < 0.0 || rounded >= n as f64 {
            return Err(MlError::InvalidParameter(format!(
                "Observation {value} in dimension {dim} is outside of the categories 0..{n}"
            )));
        }
        Ok(rounded as usize)
    }

    fn estimate(
        &mut self,
        observations: ArrayView2<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<()> {
        check_dim(self.dimensionality(), observations.nrows())?;

        let mut counts: Vec<Vector> = self
            .probabilities
            .iter()
            .map(|p| Array1::zeros(p.len()))
            .collect();

        for (j, column) in observations.columns().into_iter().enumerate() {
            let w = weights.as_ref().map_or(1.0, |w| w[j]);
            for (d, &value) in column.iter().enumerate() {
                let c = self.category(d, value)?;
                counts[d][c] += w;
            }
        }

        self.probabilities = counts
            .into_iter()
            .enumerate()
            .map(|(d, c)| normalized(d, c))
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }
}

impl Distribution for DiscreteDistribution {
    fn dimensionality(&self) -> usize {
        self.probabilities.len()
    }

    fn log_probability(&self, observation: ArrayView1<'_, f64>) -> Result<f64> {
        check_dim(self.dimensionality(), observation.len())?;
        let mut log_p = 0.0;
        for (d, &value) in observation.iter().enumerate() {
            log_p += self.probabilities[d][self.category(d, value)?].ln();
        }
        Ok(log_p)
    }

    fn probability(&self, observation: ArrayView1<'_, f64>) -> Result<f64> {
        check_dim(self.dimensionality(), observation.len())?;
        let mut p = 1.0;
        for (d, &value) in observation.iter().enumerate() {
            p *= self.probabilities[d][self.category(d, value)?];
        }
        Ok(p)
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

impl RandomSample for DiscreteDistribution {
    fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector {
        self.probabilities
            .iter()
            .map(|p| {
                let u: f64 = rng.random();
                let mut cumulative = 0.0;
                for (c, &pc) in p.iter().enumerate() {
                    cumulative += pc;
                    if u < cumulative {
                        return c as f64;
                    }
                }
                // Rounding can leave the cumulative sum just under one.
                p.len().saturating_sub(1) as f64
            })
            .collect()
    }
}

fn uniform(n: usize) -> Vector {
    if n == 0 {
        return Array1::zeros(0);
    }
    Array1::from_elem(n, 1.0 / n as f64)
}

fn normalized(dim: usize, probabilities: Vector) -> Result<Vector> {
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(MlError::InvalidParameter(format!(
            "Probability {bad} in dimension {dim} must be finite and non-negative"
        )));
    }
    let total = probabilities.sum();
    if total > 0.0 {
        Ok(probabilities / total)
    } else {
        Ok(uniform(probabilities.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_constructor() {
        let d = DiscreteDistribution::new(5);
        assert_eq!(d.dimensionality(), 1);
        assert_eq!(d.dimension_probabilities(0).unwrap().len(), 5);
        for i in 0..5 {
            let p = d.probability(array![i as f64].view()).unwrap();
            assert_relative_eq!(p, 0.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_explicit_probabilities() {
        let d = DiscreteDistribution::from_probabilities(vec![array![0.2, 0.4, 0.1, 0.1, 0.2]])
            .unwrap();
        let expected = [0.2, 0.4, 0.1, 0.1, 0.2];
        for (i, &e) in expected.iter().enumerate() {
            assert_relative_eq!(d.probability(array![i as f64].view()).unwrap(), e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_normalizes_and_rounds() {
        let d = DiscreteDistribution::from_probabilities(vec![array![1.0, 3.0], array![0.0, 0.0]])
            .unwrap();
        assert_relative_eq!(d.dimension_probabilities(0).unwrap()[1], 0.75, epsilon = 1e-12);
        // All-zero vector becomes uniform.
        assert_relative_eq!(d.dimension_probabilities(1).unwrap()[0], 0.5, epsilon = 1e-12);

        // 0.6 rounds to category 1, 0.4 to category 0.
        let p = d.probability(array![0.6, 0.4].view()).unwrap();
        assert_relative_eq!(p, 0.375, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_range_observation() {
        let d = DiscreteDistribution::new(3);
        assert!(d.probability(array![3.0].view()).is_err());
        assert!(d.probability(array![-0.7].view()).is_err());
        assert!(d.probability(array![1.0, 1.0].view()).is_err());
    }

    #[test]
    fn test_train_counts() {
        let mut d = DiscreteDistribution::new(4);
        d.train(array![[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0]].view())
            .unwrap();
        let expected = [0.25, 0.25, 0.375, 0.125];
        for (i, &e) in expected.iter().enumerate() {
            assert_relative_eq!(d.probability(array![i as f64].view()).unwrap(), e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_train_weighted() {
        let mut d = DiscreteDistribution::new(3);
        d.train_weighted(
            array![[0.0, 0.0, 1.0, 2.0]].view(),
            array![0.25, 0.25, 0.5, 1.0].view(),
        )
        .unwrap();
        assert_relative_eq!(d.probability(array![0.0].view()).unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(d.probability(array![1.0].view()).unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(d.probability(array![2.0].view()).unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_train_without_mass_is_uniform() {
        let mut d = DiscreteDistribution::new(4);
        d.train_weighted(array![[1.0, 2.0]].view(), array![0.0, 0.0].view())
            .unwrap();
        assert_relative_eq!(d.probability(array![3.0].view()).unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_support_sums_to_one() {
        let d = DiscreteDistribution::from_probabilities(vec![
            array![0.1, 0.3, 0.6],
            array![0.3, 0.3, 0.3],
        ])
        .unwrap();
        let mut total = 0.0;
        for a in 0..3 {
            for b in 0..3 {
                total += d.probability(array![a as f64, b as f64].view()).unwrap();
            }
        }
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_random_frequencies() {
        let d = DiscreteDistribution::from_probabilities(vec![array![0.3, 0.6, 0.1]]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0.0; 3];
        for _ in 0..50_000 {
            let x = d.random(&mut rng);
            counts[x[0] as usize] += 1.0;
        }
        assert_relative_eq!(counts[0] / 50_000.0, 0.3, epsilon = 0.02);
        assert_relative_eq!(counts[1] / 50_000.0, 0.6, epsilon = 0.02);
        assert_relative_eq!(counts[2] / 50_000.0, 0.1, epsilon = 0.02);
    }

    #[test]
    fn test_set_dimension_probabilities() {
        let mut d = DiscreteDistribution::with_dimensions(&[2, 2]);
        d.set_dimension_probabilities(1, array![3.0, 1.0]).unwrap();
        assert_relative_eq!(d.dimension_probabilities(1).unwrap()[0], 0.75, epsilon = 1e-12);
        assert!(d.set_dimension_probabilities(2, array![1.0]).is_err());
        assert!(d.set_dimension_probabilities(0, array![-1.0, 2.0]).is_err());
    }
}
