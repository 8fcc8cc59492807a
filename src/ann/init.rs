//! Parameter initialization schemes

use crate::core::{MlError, Result};
use rand::Rng;
use rand_distr::{Distribution as _, Uniform};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Initialization {
    #[default]
    Zeros,
    /// Uniform on `[low, high)`
    RandomUniform { low: f64, high: f64 },
    /// Uniform on `±√(6 / (fan_in + fan_out))`
    XavierUniform,
}

impl Initialization {
    /// `size` initial values for a layer with the given fan-in and fan-out
    pub fn generate<R: Rng + ?Sized>(
        &self,
        size: usize,
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        let (low, high) = match *self {
            Self::Zeros => return Ok(vec![0.0; size]),
            Self::RandomUniform { low, high } => (low, high),
            Self::XavierUniform => {
                let range = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
                (-range, range)
            }
        };
        let uniform = Uniform::new(low, high).map_err(|e| {
            MlError::InvalidParameter(format!("Invalid initialization range [{low}, {high}): {e}"))
        })?;
        Ok((0..size).map(|_| uniform.sample(rng)).collect())
    }
}
