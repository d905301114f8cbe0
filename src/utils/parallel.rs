//! Parallel Jacobian evaluation.
//!
//! Each finite-difference column needs one full model evaluation, so columns
//! are spread over the rayon thread pool.

use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::error::Result;
use crate::problem::Problem;

use super::finite_difference::{check_residual_len, column, DEFAULT_STEP};

/// Compute the Jacobian matrix using forward finite differences in parallel.
///
/// Produces the same matrix as
/// [`finite_difference::jacobian_at`](super::finite_difference::jacobian_at).
pub fn jacobian_parallel(
    problem: &dyn Problem,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    step: Option<f64>,
) -> Result<Array2<f64>> {
    let step = step.unwrap_or(DEFAULT_STEP);
    check_residual_len(problem, residuals)?;

    let columns: Result<Vec<Array1<f64>>> = (0..params.len())
        .into_par_iter()
        .map(|j| column(problem, params, residuals, j, step))
        .collect();

    let mut jac = Array2::zeros((residuals.len(), params.len()));
    for (j, col) in columns?.iter().enumerate() {
        jac.column_mut(j).assign(col);
    }
    Ok(jac)
}
