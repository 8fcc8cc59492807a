//! LibSVM format dataset implementation
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! 1 1:0.5 3:1.2 7:0.8
//! 3 2:0.3 5:2.1
//!
//! Points are densified into the columns of a matrix whose row count is the
//! largest feature index seen. Labels are kept as given.

use crate::core::{Dataset, Matrix, MlError, Result};
use ndarray::{s, Array2, ArrayView2};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dense dataset loaded from a LibSVM format file
#[derive(Debug, Clone)]
pub struct LibSVMDataset {
    data: Matrix,
    labels: Vec<f64>,
}

/// One parsed line: label and 0-based (index, value) pairs
type SparsePoint = (f64, Vec<(usize, f64)>);

impl LibSVMDataset {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a dataset from a reader (for testing and flexibility)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut points: Vec<SparsePoint> = Vec::new();
        let mut dimensions = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let point = Self::parse_line(line).map_err(|e| {
                MlError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            if let Some(max_index) = point.1.iter().map(|&(i, _)| i).max() {
                dimensions = dimensions.max(max_index + 1);
            }
            points.push(point);
        }

        if points.is_empty() {
            return Err(MlError::EmptyDataset);
        }

        let mut data = Array2::<f64>::zeros((dimensions, points.len()));
        let mut labels = Vec::with_capacity(points.len());
        for (j, (label, features)) in points.into_iter().enumerate() {
            for (i, value) in features {
                data[[i, j]] = value;
            }
            labels.push(label);
        }

        Ok(Self { data, labels })
    }

    /// Pad the feature rows with zeros up to `dimensions`.
    ///
    /// Sparse files omit trailing zero features, so data meant for a model of
    /// known dimensionality may load with fewer rows.
    pub fn with_dimensionality(mut self, dimensions: usize) -> Result<Self> {
        let current = self.data.nrows();
        if dimensions < current {
            return Err(MlError::DimensionMismatch {
                expected: dimensions,
                actual: current,
            });
        }
        if dimensions > current {
            let mut padded = Array2::<f64>::zeros((dimensions, self.data.ncols()));
            padded.slice_mut(s![..current, ..]).assign(&self.data);
            self.data = padded;
        }
        Ok(self)
    }

    /// Parse a single line in libsvm format
    fn parse_line(line: &str) -> Result<SparsePoint> {
        let mut parts = line.split_whitespace();

        let label_str = parts
            .next()
            .ok_or_else(|| MlError::ParseError("Empty line".to_string()))?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| MlError::ParseError(format!("Invalid label: {label_str}")))?;

        let mut features = Vec::new();
        for feature_str in parts {
            let (index, value) = feature_str.split_once(':').ok_or_else(|| {
                MlError::ParseError(format!("Invalid feature format: {feature_str}"))
            })?;

            let index = index
                .parse::<usize>()
                .map_err(|_| MlError::ParseError(format!("Invalid feature index: {index}")))?;
            let value = value
                .parse::<f64>()
                .map_err(|_| MlError::ParseError(format!("Invalid feature value: {value}")))?;

            // libsvm uses 1-based indexing, convert to 0-based
            if index == 0 {
                return Err(MlError::ParseError(format!(
                    "Feature index must be positive: {index}"
                )));
            }
            features.push((index - 1, value));
        }

        Ok((label, features))
    }
}

impl Dataset for LibSVMDataset {
    fn len(&self) -> usize {
        self.data.ncols()
    }

    fn dim(&self) -> usize {
        self.data.nrows()
    }

    fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    fn labels(&self) -> Option<&[f64]> {
        Some(&self.labels)
    }
}
