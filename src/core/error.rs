//! Error types for rsml

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MlError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Fit did not converge: {0}")]
    NonConvergence(String),

    #[error("Numerical error: {0}")]
    NumericalError(String),

    #[error("Model not trained")]
    ModelNotTrained,

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label: {0}")]
    InvalidLabel(f64),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, MlError>;

impl From<ndarray_linalg::error::LinalgError> for MlError {
    fn from(e: ndarray_linalg::error::LinalgError) -> Self {
        MlError::NumericalError(e.to_string())
    }
}

/// Fails with [`MlError::DimensionMismatch`] unless `actual == expected`.
pub(crate) fn check_dim(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(MlError::DimensionMismatch { expected, actual })
    }
}
