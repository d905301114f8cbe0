//! # Covariance Matrix Calculations
//!
//! The covariance of the fitted parameters is estimated from the Jacobian at
//! the solution:
//!
//! ```text
//! covar = inv(J^T J) * chi2 / nfree
//! ```
//!
//! with `nfree = n_points - n_varying`. The inverse goes through a Cholesky
//! factorization, so a singular or indefinite `J^T J` yields `None` instead of
//! a meaningless matrix.

use ndarray::{Array1, Array2};

use crate::utils::matrix_convert::{nalgebra_to_ndarray, ndarray_to_nalgebra};

/// Calculate the covariance matrix from a Jacobian matrix.
///
/// Returns `None` when `nfree == 0` or `J^T J` is not positive definite.
pub fn calculate_covariance(jacobian: &Array2<f64>, chi2: f64, nfree: usize) -> Option<Array2<f64>> {
    if nfree == 0 || jacobian.ncols() == 0 {
        return None;
    }
    let j = ndarray_to_nalgebra(jacobian);
    let jtj = j.tr_mul(&j);
    let inverse = jtj.cholesky()?.inverse();

    let covar = nalgebra_to_ndarray(&inverse) * (chi2 / nfree as f64);
    covar.iter().all(|v| v.is_finite()).then_some(covar)
}

/// Calculate the correlation matrix from a covariance matrix.
///
/// `correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])`, with ones on
/// the diagonal and zero where a variance vanishes.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            return 1.0;
        }
        let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if denom > 0.0 {
            covar[[i, j]] / denom
        } else {
            0.0
        }
    })
}

/// Standard errors from the covariance diagonal.
///
/// `None` if any variance is negative or non-finite.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Option<Array1<f64>> {
    let diag = covar.diag();
    if diag.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return None;
    }
    Some(diag.mapv(f64::sqrt))
}
