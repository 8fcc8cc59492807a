//! High-level API for AdaBoost training and evaluation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rsml::api::AdaBoostTrainer;
//! use rsml::core::WeakLearnerType;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = AdaBoostTrainer::new()
//!     .with_iterations(50)
//!     .with_weak_learner(WeakLearnerType::DecisionStump)
//!     .train_from_file("train.libsvm")?;
//!
//! let metrics = rsml::api::evaluate_file(&model, "test.libsvm")?;
//! println!("Accuracy: {:.2}%", metrics.accuracy() * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::adaboost::AdaBoostModel;
use crate::core::{AdaBoostConfig, Dataset, MlError, Result, WeakLearnerType};
use crate::data::{CSVDataset, LibSVMDataset};
use ndarray::Axis;
use std::path::Path;

/// AdaBoost training with builder-style configuration
#[derive(Debug, Clone, Default)]
pub struct AdaBoostTrainer {
    config: AdaBoostConfig,
}

impl AdaBoostTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AdaBoostConfig) -> Self {
        Self { config }
    }

    /// Set the maximum number of boosting rounds
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.config.iterations = iterations;
        self
    }

    /// Set the margin-change tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn with_weak_learner(mut self, weak_learner: WeakLearnerType) -> Self {
        self.config.weak_learner = weak_learner;
        self
    }

    /// Set the minimum number of points in a decision stump leaf
    pub fn with_minimum_leaf_size(mut self, minimum_leaf_size: usize) -> Self {
        self.config.minimum_leaf_size = minimum_leaf_size;
        self
    }

    /// Set the pass budget of each perceptron
    pub fn with_perceptron_iterations(mut self, iterations: usize) -> Self {
        self.config.perceptron_iterations = iterations;
        self
    }

    pub fn config(&self) -> &AdaBoostConfig {
        &self.config
    }

    /// Train on a labelled dataset
    pub fn train<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<AdaBoostModel> {
        let labels = dataset.labels().ok_or_else(|| {
            MlError::InvalidDataset("training data has no labels".to_string())
        })?;
        AdaBoostModel::train(dataset.data(), labels, &self.config)
    }

    /// Train from a LibSVM format file
    pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> Result<AdaBoostModel> {
        let dataset = LibSVMDataset::from_file(path)?;
        self.train(&dataset)
    }

    /// Train from a CSV file whose last column is the label
    pub fn train_from_csv<P: AsRef<Path>>(&self, path: P) -> Result<AdaBoostModel> {
        let dataset = CSVDataset::from_file_with_labels(path)?;
        self.train(&dataset)
    }
}

/// Confusion matrix over original label values
#[derive(Debug, Clone)]
pub struct EvaluationMetrics {
    /// Label of each row and column of `confusion`
    pub classes: Vec<f64>,
    /// `confusion[actual][predicted]` counts
    pub confusion: Vec<Vec<usize>>,
}

impl EvaluationMetrics {
    /// Tally `predicted` against `actual`, starting from the labels in `known`
    pub fn from_predictions(known: &[f64], actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(MlError::DimensionMismatch {
                expected: actual.len(),
                actual: predicted.len(),
            });
        }

        let mut classes = known.to_vec();
        let mut index_of = |label: f64| match classes.iter().position(|&c| c == label) {
            Some(i) => i,
            None => {
                classes.push(label);
                classes.len() - 1
            }
        };
        let pairs: Vec<(usize, usize)> = actual
            .iter()
            .zip(predicted)
            .map(|(&a, &p)| (index_of(a), index_of(p)))
            .collect();

        let k = classes.len();
        let mut confusion = vec![vec![0; k]; k];
        for (a, p) in pairs {
            confusion[a][p] += 1;
        }
        Ok(Self { classes, confusion })
    }

    pub fn total(&self) -> usize {
        self.confusion.iter().flatten().sum()
    }

    /// Fraction of points on the diagonal
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            let correct: usize = (0..self.classes.len()).map(|i| self.confusion[i][i]).sum();
            correct as f64 / total as f64
        }
    }

    /// TP / (TP + FP) for class index `class`
    pub fn precision(&self, class: usize) -> f64 {
        let predicted: usize = self.confusion.iter().map(|row| row[class]).sum();
        if predicted == 0 {
            0.0
        } else {
            self.confusion[class][class] as f64 / predicted as f64
        }
    }

    /// TP / (TP + FN) for class index `class`
    pub fn recall(&self, class: usize) -> f64 {
        let actual: usize = self.confusion[class].iter().sum();
        if actual == 0 {
            0.0
        } else {
            self.confusion[class][class] as f64 / actual as f64
        }
    }

    pub fn f1_score(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }

    /// Unweighted mean of the per-class F1 scores
    pub fn macro_f1(&self) -> f64 {
        let k = self.classes.len();
        if k == 0 {
            0.0
        } else {
            (0..k).map(|c| self.f1_score(c)).sum::<f64>() / k as f64
        }
    }
}

/// Predict every point of a labelled dataset and tally the results
pub fn evaluate<D: Dataset + ?Sized>(model: &AdaBoostModel, dataset: &D) -> Result<EvaluationMetrics> {
    let labels = dataset
        .labels()
        .ok_or_else(|| MlError::InvalidDataset("evaluation data has no labels".to_string()))?;
    let predicted = model.predict(dataset.data())?;
    EvaluationMetrics::from_predictions(model.mappings(), labels, &predicted)
}

/// Evaluate on a LibSVM format file, padding sparse trailing features
pub fn evaluate_file<P: AsRef<Path>>(model: &AdaBoostModel, path: P) -> Result<EvaluationMetrics> {
    let dataset = LibSVMDataset::from_file(path)?.with_dimensionality(model.dimensionality())?;
    evaluate(model, &dataset)
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Train with default parameters on LibSVM data
    pub fn train_libsvm<P: AsRef<Path>>(path: P) -> Result<AdaBoostModel> {
        AdaBoostTrainer::new().train_from_file(path)
    }

    /// Train with default parameters on CSV data labelled in the last column
    pub fn train_csv<P: AsRef<Path>>(path: P) -> Result<AdaBoostModel> {
        AdaBoostTrainer::new().train_from_csv(path)
    }

    /// Train on one LibSVM file and return the accuracy on another
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
    ) -> Result<f64> {
        let model = train_libsvm(train_path)?;
        Ok(evaluate_file(&model, test_path)?.accuracy())
    }

    /// Train on the leading `train_ratio` of the points, test on the rest
    pub fn simple_validation<D: Dataset + ?Sized>(
        dataset: &D,
        train_ratio: f64,
        trainer: &AdaBoostTrainer,
    ) -> Result<f64> {
        if train_ratio <= 0.0 || train_ratio >= 1.0 {
            return Err(MlError::InvalidParameter(format!(
                "Train ratio must be between 0 and 1, got: {train_ratio}"
            )));
        }
        let labels = dataset
            .labels()
            .ok_or_else(|| MlError::InvalidDataset("dataset has no labels".to_string()))?;

        let n = dataset.len();
        let train_size = (n as f64 * train_ratio) as usize;
        if train_size == 0 || train_size == n {
            return Err(MlError::InvalidDataset(format!(
                "cannot split {n} points with ratio {train_ratio}"
            )));
        }

        // Sequential split, not randomized, for reproducibility
        let data = dataset.data();
        let (train, test) = data.split_at(Axis(1), train_size);
        let train_set = CSVDataset::from_matrix(train.to_owned(), Some(labels[..train_size].to_vec()))?;
        let test_set = CSVDataset::from_matrix(test.to_owned(), Some(labels[train_size..].to_vec()))?;

        let model = trainer.train(&train_set)?;
        Ok(evaluate(&model, &test_set)?.accuracy())
    }
}
