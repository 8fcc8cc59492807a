//! Dense linear algebra on top of ndarray and ndarray-linalg
//!
//! Factorizations and triangular solves go through LAPACK. This module adds
//! the diagonal jitter retry and the (weighted) column statistics that the
//! distributions and regression need.

use crate::core::{MlError, Matrix, Result, Vector};
use log::warn;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::{Cholesky, Diag, SolveTriangular, UPLO};

/// Number of times the diagonal jitter is increased before giving up
const MAX_JITTER_ATTEMPTS: usize = 12;

/// Lower-triangular Cholesky factor `L` with `a = L * L^T`.
///
/// Fails with [`MlError::NumericalError`] when `a` is not square or not
/// positive-definite.
pub fn cholesky(a: ArrayView2<'_, f64>) -> Result<Matrix> {
    if a.nrows() != a.ncols() {
        return Err(MlError::NumericalError(format!(
            "Cholesky factorization needs a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }
    if a.is_empty() {
        return Ok(Array2::zeros((0, 0)));
    }

    let lower = a.cholesky(UPLO::Lower)?;
    if let Some(pivot) = lower.diag().iter().find(|v| !(v.is_finite() && **v > 0.0)) {
        return Err(MlError::NumericalError(format!(
            "matrix is not positive-definite (pivot {pivot})"
        )));
    }
    Ok(lower)
}

/// Cholesky factorization that adds a growing multiple of the identity until
/// the matrix becomes positive-definite.
///
/// Returns the factor and the jitter that was added (0 when none was needed).
pub fn cholesky_with_jitter(a: ArrayView2<'_, f64>) -> Result<(Matrix, f64)> {
    if let Ok(l) = cholesky(a) {
        return Ok((l, 0.0));
    }

    let n = a.nrows();
    let scale = if n == 0 {
        1.0
    } else {
        (a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64).max(1.0)
    };

    let mut jitter = 1e-10 * scale;
    for _ in 0..MAX_JITTER_ATTEMPTS {
        let mut perturbed = a.to_owned();
        perturbed.diag_mut().mapv_inplace(|v| v + jitter);
        if let Ok(l) = cholesky(perturbed.view()) {
            warn!("Added {jitter:e} to the diagonal to make the matrix positive-definite");
            return Ok((l, jitter));
        }
        jitter *= 10.0;
    }

    Err(MlError::NumericalError(
        "matrix could not be made positive-definite".to_string(),
    ))
}

/// Solve `L Y = B` for lower-triangular `L`
pub fn solve_lower(l: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Result<Matrix> {
    if l.is_empty() {
        return Ok(b.to_owned());
    }
    Ok(l.solve_triangular(UPLO::Lower, Diag::NonUnit, &b.to_owned())?)
}

/// Solve `A X = B` given the Cholesky factor `L` of `A`
pub fn cholesky_solve(l: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Result<Matrix> {
    if l.is_empty() {
        return Ok(b.to_owned());
    }
    let y = solve_lower(l, b)?;
    let upper = l.t().to_owned();
    Ok(upper.solve_triangular(UPLO::Upper, Diag::NonUnit, &y)?)
}

/// Solve `A x = b` for a single right-hand side
pub fn cholesky_solve_vector(l: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>) -> Result<Vector> {
    let x = cholesky_solve(l, b.insert_axis(Axis(1)))?;
    Ok(x.column(0).to_owned())
}

/// Inverse of `A` given the Cholesky factor `L` of `A`
pub fn cholesky_inverse(l: ArrayView2<'_, f64>) -> Result<Matrix> {
    cholesky_solve(l, Array2::<f64>::eye(l.nrows()).view())
}

/// `ln |A|` given the Cholesky factor `L` of `A`
pub fn log_det_from_cholesky(l: ArrayView2<'_, f64>) -> f64 {
    2.0 * l.diag().iter().map(|v| v.ln()).sum::<f64>()
}

/// Mean of the columns of `data`, optionally weighted.
///
/// Returns a zero vector when there are no columns or no weight mass.
pub fn column_mean(data: ArrayView2<'_, f64>, weights: Option<ArrayView1<'_, f64>>) -> Vector {
    let mut mean = Array1::<f64>::zeros(data.nrows());
    let mut total = 0.0;
    for (j, column) in data.axis_iter(Axis(1)).enumerate() {
        let w = weights.as_ref().map_or(1.0, |w| w[j]);
        mean.scaled_add(w, &column);
        total += w;
    }
    if total > 0.0 {
        mean /= total;
    }
    mean
}

/// Denominator of the unbiased (reliability-weighted) variance estimate:
/// `V1 - V2 / V1`, which is `n - 1` for unit weights.
pub fn unbiased_denominator(n_points: usize, weights: Option<ArrayView1<'_, f64>>) -> f64 {
    match weights {
        None => n_points as f64 - 1.0,
        Some(w) => {
            let v1: f64 = w.sum();
            let v2: f64 = w.iter().map(|x| x * x).sum();
            if v1 > 0.0 {
                v1 - v2 / v1
            } else {
                0.0
            }
        }
    }
}

/// Sample covariance of the columns of `data` around `mean`, optionally
/// weighted, with the unbiased denominator.
///
/// When the denominator is not positive (a single effective point) the
/// scatter matrix is returned unnormalized.
pub fn column_covariance_around(
    data: ArrayView2<'_, f64>,
    mean: ArrayView1<'_, f64>,
    weights: Option<ArrayView1<'_, f64>>,
) -> Matrix {
    let centered = &data - &mean.insert_axis(Axis(1));
    let scaled = match weights {
        Some(w) => &centered * &w.insert_axis(Axis(0)),
        None => centered.clone(),
    };
    let mut cov = scaled.dot(&centered.t());

    let denominator = unbiased_denominator(data.ncols(), weights);
    if denominator > 0.0 {
        cov /= denominator;
    }
    cov
}

/// Unbiased sample covariance of the columns of `data`
pub fn column_covariance(data: ArrayView2<'_, f64>) -> Matrix {
    let mean = column_mean(data, None);
    column_covariance_around(data, mean.view(), None)
}
