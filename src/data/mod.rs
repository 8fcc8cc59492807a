//! Data loading and dataset implementations
//!
//! Both loaders produce dense `d x n` matrices with one point per column.

pub mod csv;
pub mod libsvm;

pub use self::csv::{load_labels, save_labels, save_matrix, write_matrix, CSVDataset};
pub use self::libsvm::LibSVMDataset;

use crate::core::{Dataset, MlError, Result};
use log::warn;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    LibSvm,
}

impl DataFormat {
    /// Guess the format from the file extension, falling back to CSV
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Self::Csv,
            Some("libsvm") | Some("svm") => Self::LibSvm,
            Some(other) => {
                warn!("Unknown file extension '{other}', assuming CSV format");
                Self::Csv
            }
            None => {
                warn!("No file extension, assuming CSV format");
                Self::Csv
            }
        }
    }
}

impl FromStr for DataFormat {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Self::Csv),
            "libsvm" => Ok(Self::LibSvm),
            _ => Err(MlError::InvalidParameter(format!(
                "Unsupported format: {s}. Use 'libsvm' or 'csv'"
            ))),
        }
    }
}

/// Load a dataset in `format`. For CSV, `labels_in_last_column` moves the
/// last column into the labels; LibSVM files always carry labels.
pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    format: DataFormat,
    labels_in_last_column: bool,
) -> Result<Box<dyn Dataset>> {
    Ok(match format {
        DataFormat::Csv if labels_in_last_column => Box::new(CSVDataset::from_file_with_labels(path)?),
        DataFormat::Csv => Box::new(CSVDataset::from_file(path)?),
        DataFormat::LibSvm => Box::new(LibSVMDataset::from_file(path)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_detection() {
        assert_eq!(DataFormat::detect(&PathBuf::from("test.csv")), DataFormat::Csv);
        assert_eq!(DataFormat::detect(&PathBuf::from("test.libsvm")), DataFormat::LibSvm);
        assert_eq!(DataFormat::detect(&PathBuf::from("test.svm")), DataFormat::LibSvm);
        assert_eq!(DataFormat::detect(&PathBuf::from("test")), DataFormat::Csv);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("csv".parse::<DataFormat>().unwrap(), DataFormat::Csv);
        assert_eq!("libsvm".parse::<DataFormat>().unwrap(), DataFormat::LibSvm);
        assert!("arff".parse::<DataFormat>().is_err());
    }
}
