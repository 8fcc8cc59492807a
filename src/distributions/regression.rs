//! Regression-error distribution
//!
//! A ridge linear regression plus a one-dimensional Gaussian over its
//! residuals. An observation is a column whose first entry is the response
//! and whose remaining entries are the predictors; its density is the
//! residual density at `response - prediction`.

use crate::core::error::check_dim;
use crate::core::{Distribution, MlError, Result, Vector};
use crate::distributions::GaussianDistribution;
use crate::math::linalg;
use crate::utils::validation;
use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Ridge linear regression: `y = b + w·x`, with `lambda` penalizing `w` only
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Intercept followed by one coefficient per predictor
    parameters: Vector,
    lambda: f64,
}

impl LinearRegression {
    /// Untrained regression with ridge penalty `lambda`
    pub fn new(lambda: f64) -> Result<Self> {
        if !(lambda.is_finite() && lambda >= 0.0) {
            return Err(MlError::InvalidParameter(format!(
                "Ridge penalty must be non-negative, got {lambda}"
            )));
        }
        Ok(Self {
            parameters: Array1::zeros(0),
            lambda,
        })
    }

    pub fn parameters(&self) -> &Vector {
        &self.parameters
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Number of predictors the regression was trained on
    pub fn dimensionality(&self) -> usize {
        self.parameters.len().saturating_sub(1)
    }

    /// Least-squares fit of `responses` on the columns of `predictors`.
    ///
    /// Solves the (weighted) normal equations `(X W Xᵀ + λ I') θ = X W y`
    /// where `X` carries a leading row of ones and `I'` leaves the intercept
    /// unpenalized.
    pub fn train(
        &mut self,
        predictors: ArrayView2<'_, f64>,
        responses: ArrayView1<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<()> {
        validation::validate_non_empty(predictors)?;
        validation::validate_finite(predictors)?;
        check_dim(predictors.ncols(), responses.len())?;
        if let Some(w) = weights {
            validation::validate_weights(predictors, w)?;
        }

        let p = predictors.nrows() + 1;
        let mut gram = Array2::<f64>::zeros((p, p));
        let mut rhs = Array1::<f64>::zeros(p);
        let mut row = Array1::<f64>::ones(p);
        for (j, column) in predictors.axis_iter(Axis(1)).enumerate() {
            let w = weights.as_ref().map_or(1.0, |w| w[j]);
            row.slice_mut(s![1..]).assign(&column);
            for a in 0..p {
                let scaled = w * row[a];
                rhs[a] += scaled * responses[j];
                for b in 0..p {
                    gram[[a, b]] += scaled * row[b];
                }
            }
        }
        for a in 1..p {
            gram[[a, a]] += self.lambda;
        }

        let (lower, jitter) = linalg::cholesky_with_jitter(gram.view())?;
        if jitter > 0.0 {
            debug!("Normal equations needed a jitter of {jitter:e}");
        }
        self.parameters = linalg::cholesky_solve_vector(lower.view(), rhs.view())?;
        Ok(())
    }

    /// Prediction for one predictor vector
    pub fn predict_point(&self, predictors: ArrayView1<'_, f64>) -> Result<f64> {
        if self.parameters.is_empty() {
            return Err(MlError::ModelNotTrained);
        }
        check_dim(self.dimensionality(), predictors.len())?;
        Ok(self.parameters[0] + self.parameters.slice(s![1..]).dot(&predictors))
    }

    /// Predictions for every column of `predictors`
    pub fn predict(&self, predictors: ArrayView2<'_, f64>) -> Result<Vector> {
        predictors
            .axis_iter(Axis(1))
            .map(|column| self.predict_point(column))
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from)
    }
}

/// Conditional distribution of a response given its predictors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionDistribution {
    rf: LinearRegression,
    err: GaussianDistribution,
}

impl Default for RegressionDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionDistribution {
    /// Untrained distribution with an unpenalized regression
    pub fn new() -> Self {
        Self {
            rf: LinearRegression::default(),
            err: GaussianDistribution::new(1),
        }
    }

    /// Untrained distribution whose regression carries ridge penalty `lambda`
    pub fn with_lambda(lambda: f64) -> Result<Self> {
        Ok(Self {
            rf: LinearRegression::new(lambda)?,
            err: GaussianDistribution::new(1),
        })
    }

    /// Fit directly from predictors (`d x n`) and responses (`n`)
    pub fn from_data(predictors: ArrayView2<'_, f64>, responses: ArrayView1<'_, f64>) -> Result<Self> {
        let mut dist = Self::new();
        dist.fit(predictors, responses, None)?;
        Ok(dist)
    }

    /// The regression function
    pub fn rf(&self) -> &LinearRegression {
        &self.rf
    }

    /// The residual distribution
    pub fn err(&self) -> &GaussianDistribution {
        &self.err
    }

    /// Predicted responses for every column of `predictors`
    pub fn predict(&self, predictors: ArrayView2<'_, f64>) -> Result<Vector> {
        self.rf.predict(predictors)
    }

    fn fit(
        &mut self,
        predictors: ArrayView2<'_, f64>,
        responses: ArrayView1<'_, f64>,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<()> {
        self.rf.train(predictors, responses, weights)?;
        let residuals = &responses - &self.rf.predict(predictors)?;
        let residuals = residuals.insert_axis(Axis(0));

        let mut err = GaussianDistribution::new(1);
        match weights {
            Some(w) => err.train_weighted(residuals.view(), w)?,
            None => err.train(residuals.view())?,
        }
        self.err = err;
        Ok(())
    }

    fn split(observations: ArrayView2<'_, f64>) -> Result<(ArrayView2<'_, f64>, ArrayView1<'_, f64>)> {
        if observations.nrows() < 2 {
            return Err(MlError::InvalidDataset(
                "regression observations need a response row and at least one predictor row"
                    .to_string(),
            ));
        }
        Ok((
            observations.slice_move(s![1.., ..]),
            observations.index_axis_move(Axis(0), 0),
        ))
    }
}

impl Distribution for RegressionDistribution {
    /// Response plus predictors
    fn dimensionality(&self) -> usize {
        self.rf.parameters().len()
    }

    fn log_probability(&self, observation: ArrayView1<'_, f64>) -> Result<f64> {
        if self.rf.parameters().is_empty() {
            return Err(MlError::ModelNotTrained);
        }
        check_dim(self.dimensionality(), observation.len())?;
        let prediction = self.rf.predict_point(observation.slice(s![1..]))?;
        let residual = Array1::from_elem(1, observation[0] - prediction);
        self.err.log_probability(residual.view())
    }

    fn train(&mut self, observations: ArrayView2<'_, f64>) -> Result<()> {
        let (predictors, responses) = Self::split(observations)?;
        self.fit(predictors, responses, None)
    }

    fn train_weighted(
        &mut self,
        observations: ArrayView2<'_, f64>,
        weights: ArrayView1<'_, f64>,
    ) -> Result<()> {
        let (predictors, responses) = Self::split(observations)?;
        self.fit(predictors, responses, Some(weights))
    }
}
