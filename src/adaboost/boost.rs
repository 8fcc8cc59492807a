//! AdaBoost.MH boosting loop over a weak learner family

use crate::adaboost::weak_learner::{arg_max, WeakLearner};
use crate::core::error::check_dim;
use crate::core::{AdaBoostConfig, Matrix, MlError, Result};
use log::{debug, info};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Margins this close to one count as a perfect learner
const PERFECT_MARGIN: f64 = 1e-12;

/// Ensemble of weak learners with their voting weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaBoost<W> {
    num_classes: usize,
    tolerance: f64,
    alphas: Vec<f64>,
    learners: Vec<W>,
    /// Product of the per-round normalizers, an upper bound on training error
    zt_product: f64,
}

impl<W: WeakLearner> AdaBoost<W> {
    /// Boost on the columns of `data` with class indices `labels`.
    ///
    /// The weight distribution over (class, point) pairs starts uniform.
    /// Each round fits a weak learner to the per-point weight sums, scores it
    /// by the weighted margin `r_t` and reweights with `α_t = ½ ln((1+r)/(1-r))`.
    /// Training stops after `config.iterations` rounds, when `r_t` changes by
    /// less than `config.tolerance`, or when a learner is perfect.
    pub fn train(
        data: ArrayView2<'_, f64>,
        labels: &[usize],
        num_classes: usize,
        config: &AdaBoostConfig,
    ) -> Result<Self> {
        let n = data.ncols();
        check_dim(n, labels.len())?;
        if n == 0 {
            return Err(MlError::EmptyDataset);
        }
        if config.iterations == 0 {
            return Err(MlError::InvalidParameter(
                "AdaBoost needs at least one iteration".to_string(),
            ));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(MlError::InvalidLabel(bad as f64));
        }

        let mut d = Array2::<f64>::from_elem((num_classes, n), 1.0 / (n * num_classes) as f64);
        let mut alphas = Vec::new();
        let mut learners = Vec::new();
        let mut zt_product = 1.0;
        let mut last_rt = 0.0;

        for round in 0..config.iterations {
            let point_weights = d.sum_axis(Axis(0));
            let learner = W::train(data, labels, num_classes, point_weights.view(), config)?;
            let predicted = learner.classify(data);

            let rt: f64 = predicted
                .iter()
                .zip(labels)
                .zip(point_weights.iter())
                .map(|((p, l), &w)| if p == l { w } else { -w })
                .sum();

            if round > 0 && (rt - last_rt).abs() < config.tolerance {
                debug!("Round {round}: margin {rt:.6} unchanged, stopping");
                break;
            }
            last_rt = rt;

            if rt >= 1.0 - PERFECT_MARGIN {
                debug!("Round {round}: weak learner is perfect");
                alphas.push(1.0);
                learners.push(learner);
                break;
            }
            if rt <= -1.0 {
                return Err(MlError::NumericalError(format!(
                    "weak learner misclassified every point in round {round}"
                )));
            }

            let alpha = 0.5 * ((1.0 + rt) / (1.0 - rt)).ln();
            let scale = alpha.exp();
            for (j, mut column) in d.axis_iter_mut(Axis(1)).enumerate() {
                if predicted[j] == labels[j] {
                    column /= scale;
                } else {
                    column *= scale;
                }
            }
            let zt = d.sum();
            d /= zt;
            zt_product *= zt;

            debug!("Round {round}: r_t = {rt:.6}, alpha = {alpha:.6}, z_t = {zt:.6}");
            alphas.push(alpha);
            learners.push(learner);
        }

        info!(
            "AdaBoost trained {} weak learners (z product {:.6})",
            learners.len(),
            zt_product
        );

        Ok(Self {
            num_classes,
            tolerance: config.tolerance,
            alphas,
            learners,
            zt_product,
        })
    }

    /// Predicted class of every column and the `num_classes x n` matrix of
    /// normalized vote weights
    pub fn classify(&self, data: ArrayView2<'_, f64>) -> (Vec<usize>, Matrix) {
        let mut probabilities = Array2::<f64>::zeros((self.num_classes, data.ncols()));
        for (learner, &alpha) in self.learners.iter().zip(&self.alphas) {
            for (j, class) in learner.classify(data).into_iter().enumerate() {
                probabilities[[class, j]] += alpha;
            }
        }

        let mut predicted = Vec::with_capacity(data.ncols());
        for mut column in probabilities.axis_iter_mut(Axis(1)) {
            let total = column.sum();
            if total != 0.0 {
                column /= total;
            }
            predicted.push(arg_max(column.iter().copied()));
        }
        (predicted, probabilities)
    }
}

impl<W> AdaBoost<W> {
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    pub fn learners(&self) -> &[W] {
        &self.learners
    }

    pub fn zt_product(&self) -> f64 {
        self.zt_product
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaboost::{DecisionStump, Perceptron};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn bands() -> (Matrix, Vec<usize>) {
        // Three classes in bands along dimension 0, which one stump cannot
        // separate.
        let data = array![
            [0.0, 0.5, 1.0, 1.5, 4.0, 4.5, 5.0, 5.5, 9.0, 9.5, 10.0, 10.5],
            [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]
        ];
        (data, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2])
    }

    #[test]
    fn test_stumps_boost_beyond_single_split() {
        let (data, labels) = bands();
        let model =
            AdaBoost::<DecisionStump>::train(data.view(), &labels, 3, &AdaBoostConfig::default())
                .unwrap();
        assert!(model.learners().len() > 1);

        let (predicted, probabilities) = model.classify(data.view());
        assert_eq!(probabilities.dim(), (3, 12));
        for column in probabilities.columns() {
            assert_relative_eq!(column.sum(), 1.0, epsilon = 1e-12);
        }
        let correct = predicted.iter().zip(&labels).filter(|(p, l)| p == l).count();
        assert!(correct >= 8, "only {correct} of 12 correct");
    }

    #[test]
    fn test_perfect_learner_stops_with_unit_weight() {
        let data = array![[0.0, 1.0, 5.0, 6.0]];
        let model = AdaBoost::<DecisionStump>::train(
            data.view(),
            &[0, 0, 1, 1],
            2,
            &AdaBoostConfig::default(),
        )
        .unwrap();
        assert_eq!(model.alphas(), &[1.0]);
        let (predicted, probabilities) = model.classify(data.view());
        assert_eq!(predicted, vec![0, 0, 1, 1]);
        assert_eq!(probabilities[[1, 3]], 1.0);
    }

    #[test]
    fn test_perceptron_ensemble() {
        let (data, labels) = bands();
        let config = AdaBoostConfig {
            iterations: 20,
            perceptron_iterations: 50,
            ..Default::default()
        };
        let model = AdaBoost::<Perceptron>::train(data.view(), &labels, 3, &config).unwrap();
        assert!(!model.learners().is_empty());
        assert!(model.learners().len() <= 20);
        let (predicted, _) = model.classify(data.view());
        assert_eq!(predicted.len(), 12);
    }

    #[test]
    fn test_invalid_inputs() {
        let data = array![[0.0, 1.0]];
        let config = AdaBoostConfig::default();
        assert!(AdaBoost::<DecisionStump>::train(data.view(), &[0], 2, &config).is_err());
        assert!(matches!(
            AdaBoost::<DecisionStump>::train(data.view(), &[0, 2], 2, &config),
            Err(MlError::InvalidLabel(_))
        ));
        let none = AdaBoostConfig {
            iterations: 0,
            ..Default::default()
        };
        assert!(AdaBoost::<DecisionStump>::train(data.view(), &[0, 1], 2, &none).is_err());
    }
}
