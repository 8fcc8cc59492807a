//! CSV matrix files
//!
//! Every line holds one point, so a file with `n` lines of `d` fields loads
//! as a `d x n` matrix. A leading header line is detected automatically and
//! lines starting with `#` are skipped. When labels are requested they are
//! taken from the last column.

use crate::core::{Dataset, Matrix, MlError, Result};
use log::debug;
use ndarray::{s, Array2, ArrayView2, Axis};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Dense dataset loaded from a CSV file
#[derive(Debug, Clone)]
pub struct CSVDataset {
    data: Matrix,
    labels: Option<Vec<f64>>,
}

impl CSVDataset {
    /// Load a matrix from a CSV file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a matrix whose last column holds the labels
    pub fn from_file_with_labels<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader_with_labels(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, true)
    }

    pub fn from_reader_with_labels<R: BufRead>(reader: R) -> Result<Self> {
        let mut dataset = Self::from_reader(reader)?;
        if dataset.data.nrows() < 2 {
            return Err(MlError::InvalidDataset(
                "labelled CSV data needs at least one feature column and a label column"
                    .to_string(),
            ));
        }
        let last = dataset.data.nrows() - 1;
        dataset.labels = Some(dataset.data.row(last).to_vec());
        dataset.data = dataset.data.slice(s![..last, ..]).to_owned();
        Ok(dataset)
    }

    /// Load a matrix, optionally treating a non-numeric first line as a header
    pub fn from_reader_with_options<R: BufRead>(reader: R, auto_detect_header: bool) -> Result<Self> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut first = true;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if first {
                first = false;
                if auto_detect_header && Self::is_header_line(line) {
                    debug!("Skipping CSV header: {line}");
                    continue;
                }
            }

            let row = Self::parse_row(line, line_num + 1)?;
            if let Some(expected) = rows.first().map(Vec::len) {
                if row.len() != expected {
                    return Err(MlError::ParseError(format!(
                        "line {} has {} fields, expected {}",
                        line_num + 1,
                        row.len(),
                        expected
                    )));
                }
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(MlError::EmptyDataset);
        }

        let dim = rows[0].len();
        let data = Array2::from_shape_fn((dim, rows.len()), |(i, j)| rows[j][i]);
        Ok(Self { data, labels: None })
    }

    /// Wrap an existing `d x n` matrix
    pub fn from_matrix(data: Matrix, labels: Option<Vec<f64>>) -> Result<Self> {
        if let Some(labels) = &labels {
            if labels.len() != data.ncols() {
                return Err(MlError::DimensionMismatch {
                    expected: data.ncols(),
                    actual: labels.len(),
                });
            }
        }
        Ok(Self { data, labels })
    }

    pub fn set_labels(&mut self, labels: Vec<f64>) -> Result<()> {
        if labels.len() != self.data.ncols() {
            return Err(MlError::DimensionMismatch {
                expected: self.data.ncols(),
                actual: labels.len(),
            });
        }
        self.labels = Some(labels);
        Ok(())
    }

    pub fn into_matrix(self) -> Matrix {
        self.data
    }

    /// A line is a header when more than half of its fields are not numbers
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();
        let non_numeric = fields
            .iter()
            .filter(|field| field.trim().parse::<f64>().is_err())
            .count();
        non_numeric * 2 > fields.len()
    }

    fn parse_row(line: &str, line_num: usize) -> Result<Vec<f64>> {
        line.split(',')
            .enumerate()
            .map(|(column, field)| {
                let field = field.trim();
                field.parse::<f64>().map_err(|_| {
                    MlError::ParseError(format!(
                        "invalid value '{field}' at line {line_num}, column {}",
                        column + 1
                    ))
                })
            })
            .collect()
    }
}

impl Dataset for CSVDataset {
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
        self.labels.as_deref()
    }
}

/// Write `matrix` one column per line
pub fn write_matrix<W: Write>(writer: W, matrix: ArrayView2<'_, f64>) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    for column in matrix.axis_iter(Axis(1)) {
        let line = column
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Save `matrix` to a CSV file, one column per line
pub fn save_matrix<P: AsRef<Path>>(path: P, matrix: ArrayView2<'_, f64>) -> Result<()> {
    write_matrix(File::create(path)?, matrix)
}

/// Save one label per line
pub fn save_labels<P: AsRef<Path>>(path: P, labels: &[f64]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for label in labels {
        writeln!(writer, "{label}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Load labels stored either one per line or as a single line
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let matrix = CSVDataset::from_file(path)?.into_matrix();
    if matrix.nrows() == 1 || matrix.ncols() == 1 {
        Ok(matrix.iter().copied().collect())
    } else {
        Err(MlError::InvalidDataset(format!(
            "labels must be a single row or column, got {}x{}",
            matrix.ncols(),
            matrix.nrows()
        )))
    }
}
