//! Probability distributions with density evaluation, sampling and
//! (weighted) maximum-likelihood training

pub mod diagonal_gaussian;
pub mod discrete;
pub mod gamma;
pub mod gaussian;
pub mod laplace;
pub mod regression;

pub use self::diagonal_gaussian::DiagonalGaussianDistribution;
pub use self::discrete::DiscreteDistribution;
pub use self::gamma::GammaDistribution;
pub use self::gaussian::GaussianDistribution;
pub use self::laplace::LaplaceDistribution;
pub use self::regression::{LinearRegression, RegressionDistribution};
