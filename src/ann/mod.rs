//! Neural network layers
//!
//! Layers keep their parameters in one flat buffer and expose forward,
//! backward and parameter-gradient passes over batches stored column-wise.

pub mod init;
pub mod layer;
pub mod linear;
pub mod log_softmax;
pub mod loss;
pub mod multihead_attention;
pub mod regularizer;
pub mod sequential;

pub use init::Initialization;
pub use layer::Layer;
pub use linear::Linear;
pub use log_softmax::LogSoftMax;
pub use loss::{Loss, MeanSquaredError, NegativeLogLikelihood};
pub use multihead_attention::MultiheadAttention;
pub use regularizer::{L1Regularizer, L2Regularizer, NoRegularizer, Regularizer};
pub use sequential::Sequential;
