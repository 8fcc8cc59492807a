//! Reference values and weighted-training behavior across the distribution
//! family.

use approx::assert_relative_eq;
use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rsml::ann::{L2Regularizer, Layer, Linear};
use rsml::distributions::{
    DiagonalGaussianDistribution, DiscreteDistribution, GammaDistribution, GaussianDistribution,
    LaplaceDistribution, RegressionDistribution,
};
use rsml::persistence;
use rsml::{Distribution, RandomSample};
use tempfile::Builder;

/// Draw `n` points, alternating between `first` and `second`
fn alternating_sample<D: RandomSample>(first: &D, second: &D, dim: usize, n: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Array2::<f64>::zeros((dim, n));
    for j in 0..n {
        let point = if j % 2 == 0 {
            first.random(&mut rng)
        } else {
            second.random(&mut rng)
        };
        data.column_mut(j).assign(&point);
    }
    data
}

/// Near-one weights for even columns, near-zero weights for odd columns
fn favor_even_columns(n: usize, seed: u64) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array1::from_shape_fn(n, |j| {
        if j % 2 == 0 {
            rng.random_range(0.98..1.0)
        } else {
            rng.random_range(0.0..0.02)
        }
    })
}

#[test]
fn test_multidimensional_discrete_training() {
    let mut d = DiscreteDistribution::with_dimensions(&[10, 10, 10]);
    let observations = array![
        [0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0],
        [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0],
        [0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0]
    ];
    d.train(observations.view()).unwrap();

    assert_relative_eq!(d.probability(array![0.0, 0.0, 0.0].view()).unwrap(), 0.009, epsilon = 1e-12);
    assert_relative_eq!(d.probability(array![0.0, 1.0, 2.0].view()).unwrap(), 0.015, epsilon = 1e-12);
    assert_relative_eq!(d.probability(array![2.0, 1.0, 0.0].view()).unwrap(), 0.054, epsilon = 1e-12);
}

#[test]
fn test_multidimensional_discrete_weighted_training() {
    let mut d = DiscreteDistribution::with_dimensions(&[5, 5, 5]);
    let observations = array![
        [0.0, 0.0, 1.0, 1.0, 2.0],
        [0.0, 1.0, 1.0, 2.0, 2.0],
        [0.0, 1.0, 1.0, 2.0, 2.0]
    ];
    d.train_weighted(observations.view(), array![0.25, 0.25, 0.25, 0.25, 1.0].view())
        .unwrap();

    assert_relative_eq!(d.probability(array![0.0, 0.0, 0.0].view()).unwrap(), 0.00390625, epsilon = 1e-12);
    assert_relative_eq!(d.probability(array![1.0, 0.0, 1.0].view()).unwrap(), 0.0078125, epsilon = 1e-12);
    assert_relative_eq!(d.probability(array![2.0, 1.0, 0.0].view()).unwrap(), 0.015625, epsilon = 1e-12);
}

#[test]
fn test_discrete_batch_log_probabilities() {
    let d = DiscreteDistribution::with_dimensions(&[5, 5]);
    let points = array![[0.0, 4.0], [3.0, 1.0]];
    let log_probs = d.log_probabilities(points.view()).unwrap();
    for lp in log_probs.iter() {
        assert_relative_eq!(*lp, -3.2188758248682, epsilon = 1e-10);
    }
    let probs = d.probabilities(points.view()).unwrap();
    for p in probs.iter() {
        assert_relative_eq!(*p, 0.04, epsilon = 1e-12);
    }
}

#[test]
fn test_gaussian_multivariate_reference_values() {
    let mut g = GaussianDistribution::from_parameters(array![0.0, 0.0], array![[1.0, 0.0], [0.0, 1.0]]).unwrap();
    assert_relative_eq!(
        g.probability(array![0.0, 0.0].view()).unwrap(),
        0.159154943091895,
        epsilon = 1e-12
    );

    g.set_covariance(array![[2.0, 0.0], [0.0, 2.0]]).unwrap();
    assert_relative_eq!(
        g.probability(array![0.0, 0.0].view()).unwrap(),
        0.0795774715459477,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        g.probability(array![1.0, 1.0].view()).unwrap(),
        0.0482661763150270,
        epsilon = 1e-12
    );

    g.set_mean(array![1.0, 1.0]).unwrap();
    g.set_covariance(array![[2.0, 1.5], [1.5, 4.0]]).unwrap();
    assert_relative_eq!(
        g.probability(array![1.0, 1.0].view()).unwrap(),
        0.066372199406187285,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        g.probability(array![-1.0, 4.0].view()).unwrap(),
        0.00072147262356379415,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        g.probability(array![1.0, -4.0].view()).unwrap(),
        0.00085851785428674523,
        epsilon = 1e-12
    );
}

#[test]
fn test_gaussian_weighted_mixture_follows_heavy_points() {
    let heavy = GaussianDistribution::from_parameters(array![5.0], array![[4.0]]).unwrap();
    let light = GaussianDistribution::from_parameters(array![3.0], array![[1.0]]).unwrap();
    let n = 50_000;
    let data = alternating_sample(&heavy, &light, 1, n, 11);
    let weights = favor_even_columns(n, 12);

    let mut fitted = GaussianDistribution::default();
    fitted.train_weighted(data.view(), weights.view()).unwrap();

    assert_relative_eq!(fitted.mean()[0], 5.0, max_relative = 0.05);
    assert_relative_eq!(fitted.covariance()[[0, 0]], 4.0, max_relative = 0.05);
}

#[test]
fn test_diagonal_gaussian_matches_full_gaussian() {
    let mean = array![1.0, -2.0, 0.5];
    let variances = array![2.0, 0.5, 3.0];
    let diagonal = DiagonalGaussianDistribution::from_parameters(mean.clone(), variances.clone()).unwrap();
    let full = GaussianDistribution::from_parameters(mean, Array2::from_diag(&variances)).unwrap();

    let points = array![[0.0, 1.0, -1.0], [0.0, -2.0, 3.0], [0.0, 0.5, 2.0]];
    let a = diagonal.log_probabilities(points.view()).unwrap();
    let b = full.log_probabilities(points.view()).unwrap();
    for (x, y) in a.iter().zip(b.iter()) {
        assert_relative_eq!(x, y, epsilon = 1e-10);
    }
}

#[test]
fn test_gamma_probability_reference_values() {
    let d = GammaDistribution::from_parameters(array![2.0], array![0.9]).unwrap();
    let probs = d.probabilities(array![[2.0]].view()).unwrap();
    assert_relative_eq!(probs[0], 0.267575, epsilon = 1e-5);

    let d = GammaDistribution::from_parameters(array![3.1], array![1.4]).unwrap();
    let probs = d.probabilities(array![[2.94]].view()).unwrap();
    assert_relative_eq!(probs[0], 0.189043, epsilon = 1e-5);
    assert_relative_eq!(probs[0], d.probability_dim(2.94, 0), epsilon = 1e-12);

    // Two dimensions multiply the one-dimensional densities
    let d = GammaDistribution::from_parameters(array![2.0, 3.1], array![0.9, 1.4]).unwrap();
    let probs = d.probabilities(array![[2.0, 2.94], [2.0, 2.94]].view()).unwrap();
    assert_relative_eq!(probs[0], 0.04408, epsilon = 1e-4);
    assert_relative_eq!(probs[1], 0.026165, epsilon = 1e-4);
}

#[test]
fn test_gamma_weighted_mixture_follows_heavy_points() {
    let heavy = GammaDistribution::from_parameters(array![1.9, 1.9], array![8.4, 8.4]).unwrap();
    let light = GammaDistribution::from_parameters(array![5.4, 5.4], array![6.7, 6.7]).unwrap();
    let n = 50_000;
    let data = alternating_sample(&heavy, &light, 2, n, 21);
    let weights = favor_even_columns(n, 22);

    let mut fitted = GammaDistribution::default();
    fitted.train_weighted(data.view(), weights.view()).unwrap();

    for dim in 0..2 {
        assert_relative_eq!(fitted.alpha(dim), 1.9, max_relative = 0.075);
        assert_relative_eq!(fitted.beta(dim), 8.4, max_relative = 0.075);
    }
}

#[test]
fn test_laplace_reference_values() {
    let d = LaplaceDistribution::from_parameters(array![0.0], 1.0).unwrap();
    assert_relative_eq!(d.probability(array![0.0].view()).unwrap(), 0.5, epsilon = 1e-12);
    assert_relative_eq!(
        d.probability(array![1.0].view()).unwrap(),
        0.5 * (-1.0f64).exp(),
        epsilon = 1e-12
    );
    assert_relative_eq!(d.log_probability(array![-2.0].view()).unwrap(), 0.5f64.ln() - 2.0, epsilon = 1e-12);
}

#[test]
fn test_regression_distribution_workflow() {
    // y = 1 + 2 x0 - x1 with small deterministic residuals
    let predictors = array![[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], [1.0, 0.0, 2.0, 1.0, 3.0, 0.0]];
    let residuals = [0.1, -0.1, 0.05, -0.05, 0.1, -0.1];
    let responses = Array1::from_shape_fn(6, |j| {
        1.0 + 2.0 * predictors[[0, j]] - predictors[[1, j]] + residuals[j]
    });

    let d = RegressionDistribution::from_data(predictors.view(), responses.view()).unwrap();
    let predicted = d.predict(predictors.view()).unwrap();
    for (p, r) in predicted.iter().zip(responses.iter()) {
        assert!((p - r).abs() < 0.2);
    }
    assert!(d.err().covariance()[[0, 0]] > 0.0);
}

#[test]
fn test_every_distribution_survives_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let x = array![1.5, 0.5];

    let gaussian = GaussianDistribution::from_parameters(array![1.0, 0.0], array![[1.0, 0.2], [0.2, 2.0]]).unwrap();
    let path = dir.path().join("gaussian.json");
    persistence::save(&gaussian, &path).unwrap();
    let loaded: GaussianDistribution = persistence::load(&path).unwrap();
    assert_relative_eq!(
        loaded.log_probability(x.view()).unwrap(),
        gaussian.log_probability(x.view()).unwrap(),
        epsilon = 1e-10
    );

    let gamma = GammaDistribution::from_parameters(array![2.0, 3.0], array![1.0, 0.5]).unwrap();
    let file = Builder::new().suffix(".bin").tempfile().unwrap();
    persistence::save(&gamma, file.path()).unwrap();
    let loaded: GammaDistribution = persistence::load(file.path()).unwrap();
    assert_relative_eq!(
        loaded.log_probability(x.view()).unwrap(),
        gamma.log_probability(x.view()).unwrap(),
        epsilon = 1e-10
    );

    let discrete = DiscreteDistribution::with_dimensions(&[3, 4]);
    let path = dir.path().join("discrete.json");
    persistence::save(&discrete, &path).unwrap();
    let loaded: DiscreteDistribution = persistence::load(&path).unwrap();
    let point = array![1.0, 2.0];
    assert_relative_eq!(
        loaded.probability(point.view()).unwrap(),
        discrete.probability(point.view()).unwrap(),
        epsilon = 1e-10
    );
}

/// Save `model` under `suffix` and load it back
fn reloaded<T: persistence::Persist>(model: &T, suffix: &str) -> T {
    let file = Builder::new().suffix(suffix).tempfile().unwrap();
    persistence::save(model, file.path()).unwrap();
    persistence::load(file.path()).unwrap()
}

fn assert_same_log_probabilities<D: Distribution>(a: &D, b: &D, points: &Array2<f64>) {
    let x = a.log_probabilities(points.view()).unwrap();
    let y = b.log_probabilities(points.view()).unwrap();
    for (p, q) in x.iter().zip(y.iter()) {
        assert_relative_eq!(p, q, epsilon = 1e-10);
    }
}

#[test]
fn test_remaining_distributions_survive_persistence() {
    let points = array![[0.5, -1.0, 2.5], [1.0, 0.0, -0.5]];

    let mut laplace = LaplaceDistribution::new(2);
    laplace
        .train(array![[0.0, 1.0, 3.0, -2.0, 0.5], [1.0, -1.0, 0.5, 2.0, 0.0]].view())
        .unwrap();
    let diagonal = DiagonalGaussianDistribution::from_parameters(array![0.3, -0.7], array![1.5, 0.4]).unwrap();

    // Response row followed by one predictor row
    let observations = array![[1.1, 2.9, 5.2, 6.8, 9.1], [0.0, 1.0, 2.0, 3.0, 4.0]];
    let mut regression = RegressionDistribution::with_lambda(0.5).unwrap();
    regression.train(observations.view()).unwrap();

    for suffix in [".json", ".bin"] {
        let loaded = reloaded(&laplace, suffix);
        assert_eq!(loaded.mean(), laplace.mean());
        assert_relative_eq!(loaded.scale(), laplace.scale(), epsilon = 1e-10);
        assert_same_log_probabilities(&laplace, &loaded, &points);

        let loaded = reloaded(&diagonal, suffix);
        assert_eq!(loaded.covariance(), diagonal.covariance());
        assert_same_log_probabilities(&diagonal, &loaded, &points);

        let loaded = reloaded(&regression, suffix);
        assert_eq!(loaded.rf(), regression.rf());
        assert_relative_eq!(
            loaded.err().covariance()[[0, 0]],
            regression.err().covariance()[[0, 0]],
            epsilon = 1e-10
        );
        assert_same_log_probabilities(&regression, &loaded, &observations);
    }
}

#[test]
fn test_linear_layers_survive_persistence() {
    let input = array![[0.5, -1.0], [2.0, 0.25], [-0.75, 1.5]];
    let weights: Vec<f64> = (0..8).map(|i| (i as f64 - 3.5) * 0.2).collect();

    let mut plain = Linear::new(3, 2);
    plain.set_weights(&weights).unwrap();
    let mut ridge = Linear::with_regularizer(3, 2, L2Regularizer::new(0.1));
    ridge.set_weights(&weights).unwrap();

    for suffix in [".json", ".bin"] {
        let loaded = reloaded(&plain, suffix);
        assert_eq!(loaded.parameters(), plain.parameters());
        let a = plain.forward(input.view()).unwrap();
        let b = loaded.forward(input.view()).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-10);
        }

        let loaded = reloaded(&ridge, suffix);
        assert_eq!(loaded.parameters(), ridge.parameters());
        assert_eq!(loaded.regularizer(), ridge.regularizer());
    }
}

#[test]
fn test_unit_weights_match_unweighted_training() {
    let ones = Array1::<f64>::ones(6);

    let categories = array![[0.0, 1.0, 1.0, 2.0, 0.0, 2.0], [3.0, 3.0, 0.0, 1.0, 2.0, 3.0]];
    let mut plain = DiscreteDistribution::with_dimensions(&[3, 4]);
    let mut weighted = plain.clone();
    plain.train(categories.view()).unwrap();
    weighted.train_weighted(categories.view(), ones.view()).unwrap();
    for d in 0..2 {
        assert_eq!(plain.dimension_probabilities(d), weighted.dimension_probabilities(d));
    }

    let values = array![[0.4, -1.2, 3.3, 0.9, -0.1, 2.2], [1.0, 1.5, -2.0, 0.3, 0.8, -0.6]];
    let mut plain = LaplaceDistribution::new(2);
    let mut weighted = LaplaceDistribution::new(2);
    plain.train(values.view()).unwrap();
    weighted.train_weighted(values.view(), ones.view()).unwrap();
    assert_eq!(plain.mean(), weighted.mean());
    assert_relative_eq!(plain.scale(), weighted.scale(), epsilon = 1e-12);

    let mut plain = RegressionDistribution::new();
    let mut weighted = RegressionDistribution::new();
    plain.train(values.view()).unwrap();
    weighted.train_weighted(values.view(), ones.view()).unwrap();
    assert_eq!(plain.rf(), weighted.rf());
    assert_relative_eq!(
        plain.err().covariance()[[0, 0]],
        weighted.err().covariance()[[0, 0]],
        epsilon = 1e-12
    );
}
