//! Model serialization and persistence
//!
//! Models are written inside an envelope that records the library version,
//! the kind of object stored and the creation time. Files ending in `.bin`
//! use bincode; everything else is written as pretty-printed JSON.

use crate::adaboost::AdaBoostModel;
use crate::ann::{L1Regularizer, L2Regularizer, Linear, LogSoftMax, MultiheadAttention, NoRegularizer};
use crate::core::{MlError, Result};
use crate::distributions::{
    DiagonalGaussianDistribution, DiscreteDistribution, GammaDistribution, GaussianDistribution,
    LaplaceDistribution, LinearRegression, RegressionDistribution,
};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Binary,
}

impl Format {
    /// `.bin` selects bincode, anything else JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") => Self::Binary,
            _ => Self::Json,
        }
    }
}

/// Objects that can be saved with [`save`] and restored with [`load`]
pub trait Persist: Serialize + DeserializeOwned {
    /// Tag stored in the envelope and checked on load
    const KIND: &'static str;
}

macro_rules! persist {
    ($($ty:ty => $kind:literal),* $(,)?) => {
        $(impl Persist for $ty {
            const KIND: &'static str = $kind;
        })*
    };
}

persist! {
    DiscreteDistribution => "discrete_distribution",
    GaussianDistribution => "gaussian_distribution",
    DiagonalGaussianDistribution => "diagonal_gaussian_distribution",
    GammaDistribution => "gamma_distribution",
    LaplaceDistribution => "laplace_distribution",
    LinearRegression => "linear_regression",
    RegressionDistribution => "regression_distribution",
    Linear<NoRegularizer> => "linear",
    Linear<L1Regularizer> => "linear_l1",
    Linear<L2Regularizer> => "linear_l2",
    MultiheadAttention => "multihead_attention",
    LogSoftMax => "log_softmax",
    AdaBoostModel => "adaboost_model",
}

/// Envelope header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the file
    pub library_version: String,
    /// [`Persist::KIND`] of the stored object
    pub kind: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl ModelMetadata {
    fn new(kind: &str) -> Self {
        Self {
            library_version: env!("CARGO_PKG_VERSION").to_string(),
            kind: kind.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn print_summary(&self) {
        println!("Kind: {}", self.kind);
        println!("Library Version: {}", self.library_version);
        println!("Created: {}", self.created_at);
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    metadata: ModelMetadata,
    model: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    metadata: ModelMetadata,
    model: T,
}

/// Leading part of an envelope, readable without knowing the model type
#[derive(Deserialize)]
struct Header {
    metadata: ModelMetadata,
}

/// Save `model` to `path`, choosing the format from the extension
pub fn save<T: Persist, P: AsRef<Path>>(model: &T, path: P) -> Result<()> {
    let format = Format::from_path(path.as_ref());
    save_with_format(model, path, format)
}

pub fn save_with_format<T: Persist, P: AsRef<Path>>(model: &T, path: P, format: Format) -> Result<()> {
    let envelope = EnvelopeRef {
        metadata: ModelMetadata::new(T::KIND),
        model,
    };
    let writer = BufWriter::new(File::create(path.as_ref())?);
    match format {
        Format::Json => serde_json::to_writer_pretty(writer, &envelope)
            .map_err(|e| MlError::SerializationError(e.to_string()))?,
        Format::Binary => bincode::serialize_into(writer, &envelope)
            .map_err(|e| MlError::SerializationError(e.to_string()))?,
    }
    debug!("Saved {} to {:?} as {:?}", T::KIND, path.as_ref(), format);
    Ok(())
}

/// Load a `T` from `path`, choosing the format from the extension
pub fn load<T: Persist, P: AsRef<Path>>(path: P) -> Result<T> {
    let format = Format::from_path(path.as_ref());
    load_with_format(path, format)
}

/// Fails with [`MlError::SerializationError`] when the file holds a
/// different kind of object
pub fn load_with_format<T: Persist, P: AsRef<Path>>(path: P, format: Format) -> Result<T> {
    let bytes = fs::read(path.as_ref())?;
    let header: Header = decode(&bytes, format)?;
    if header.metadata.kind != T::KIND {
        return Err(MlError::SerializationError(format!(
            "expected a {} but {:?} holds a {}",
            T::KIND,
            path.as_ref(),
            header.metadata.kind
        )));
    }
    let envelope: Envelope<T> = decode(&bytes, format)?;
    debug!(
        "Loaded {} written by version {} at {}",
        T::KIND,
        envelope.metadata.library_version,
        envelope.metadata.created_at
    );
    Ok(envelope.model)
}

/// Read only the envelope header
pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<ModelMetadata> {
    let format = Format::from_path(path.as_ref());
    let bytes = fs::read(path.as_ref())?;
    let header: Header = decode(&bytes, format)?;
    Ok(header.metadata)
}

fn decode<T: DeserializeOwned>(bytes: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => {
            serde_json::from_slice(bytes).map_err(|e| MlError::SerializationError(e.to_string()))
        }
        Format::Binary => {
            bincode::deserialize(bytes).map_err(|e| MlError::SerializationError(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ann::Layer;
    use crate::core::{AdaBoostConfig, Distribution};
    use approx::assert_relative_eq;
    use ndarray::array;
    use tempfile::Builder;

    fn temp(suffix: &str) -> tempfile::NamedTempFile {
        Builder::new().suffix(suffix).tempfile().unwrap()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("m.bin")), Format::Binary);
        assert_eq!(Format::from_path(Path::new("m.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("m")), Format::Json);
    }

    #[test]
    fn test_gaussian_round_trip_both_formats() {
        let g = GaussianDistribution::from_parameters(
            array![1.0, -2.0],
            array![[2.0, 0.3], [0.3, 1.0]],
        )
        .unwrap();
        let x = array![0.5, -1.0];

        for suffix in [".json", ".bin"] {
            let file = temp(suffix);
            save(&g, file.path()).unwrap();
            let loaded: GaussianDistribution = load(file.path()).unwrap();
            assert_relative_eq!(
                loaded.log_probability(x.view()).unwrap(),
                g.log_probability(x.view()).unwrap(),
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn test_adaboost_round_trip() {
        let data = array![[1.0, 2.0, 8.0, 9.0]];
        let model = AdaBoostModel::train(data.view(), &[4.0, 4.0, 5.0, 5.0], &AdaBoostConfig::default())
            .unwrap();
        let file = temp(".bin");
        save(&model, file.path()).unwrap();
        let loaded: AdaBoostModel = load(file.path()).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_masked_attention_round_trip() {
        let mask = array![[0.0, f64::MIN]];
        let mut layer = MultiheadAttention::new(1, 2, 2, 1)
            .unwrap()
            .with_key_padding_mask(mask)
            .unwrap();
        let weights: Vec<f64> = (0..layer.weight_size()).map(|i| i as f64 * 0.01).collect();
        layer.set_weights(&weights).unwrap();

        let file = temp(".json");
        save(&layer, file.path()).unwrap();
        let loaded: MultiheadAttention = load(file.path()).unwrap();
        assert_eq!(loaded, layer);
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let file = temp(".json");
        save(&LaplaceDistribution::new(2), file.path()).unwrap();
        let result: Result<GammaDistribution> = load(file.path());
        assert!(matches!(result, Err(MlError::SerializationError(_))));

        let metadata = load_metadata(file.path()).unwrap();
        assert_eq!(metadata.kind, "laplace_distribution");
        assert_eq!(metadata.library_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_missing_file() {
        let result: Result<LogSoftMax> = load("/non/existent/model.json");
        assert!(matches!(result, Err(MlError::IoError(_))));
    }
}
