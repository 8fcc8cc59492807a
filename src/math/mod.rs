//! Numerical substrate: dense linear algebra helpers over ndarray-linalg

pub mod linalg;

pub use self::linalg::*;
