//! Finite difference methods for numerical differentiation.
//!
//! Forward differences with a step relative to the parameter magnitude, as in
//! MINPACK's `fdjac2`: `h = step * |p|`, or `step` when `p == 0`.

use crate::error::{PeakFitError, Result};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default relative step, `sqrt(f64::EPSILON)`.
pub const DEFAULT_STEP: f64 = 1.490_116_119_384_765_6e-8;

/// Step size for one parameter.
pub fn step_size(param: f64, step: f64) -> f64 {
    let h = step * param.abs();
    if h == 0.0 {
        step
    } else {
        h
    }
}

/// Check that a problem returned the number of residuals it advertises.
pub(crate) fn check_residual_len(problem: &dyn Problem, residuals: &Array1<f64>) -> Result<()> {
    if residuals.len() != problem.residual_count() {
        return Err(PeakFitError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            problem.residual_count(),
            residuals.len()
        )));
    }
    Ok(())
}

/// One Jacobian column: `(r(p + h e_j) - r(p)) / h`.
pub(crate) fn column(
    problem: &dyn Problem,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    j: usize,
    step: f64,
) -> Result<Array1<f64>> {
    let h = step_size(params[j], step);
    let mut perturbed = params.clone();
    perturbed[j] += h;
    let shifted = problem.eval(&perturbed)?;
    check_residual_len(problem, &shifted)?;
    Ok((&shifted - residuals) / h)
}

/// Compute the Jacobian matrix using forward finite differences.
///
/// The Jacobian is the matrix of partial derivatives of the residuals with
/// respect to the parameters: `J[i,j] = d residual[i] / d param[j]`.
///
/// # Arguments
///
/// * `problem` - The problem to evaluate
/// * `params` - The parameter values at which to evaluate the Jacobian
/// * `step` - Relative step size (optional, defaults to [`DEFAULT_STEP`])
pub fn jacobian(problem: &dyn Problem, params: &Array1<f64>, step: Option<f64>) -> Result<Array2<f64>> {
    let residuals = problem.eval(params)?;
    jacobian_at(problem, params, &residuals, step)
}

/// Same as [`jacobian`] but reuses residuals already evaluated at `params`.
pub fn jacobian_at(
    problem: &dyn Problem,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    step: Option<f64>,
) -> Result<Array2<f64>> {
    let step = step.unwrap_or(DEFAULT_STEP);
    check_residual_len(problem, residuals)?;

    let mut jac = Array2::zeros((residuals.len(), params.len()));
    for j in 0..params.len() {
        let col = column(problem, params, residuals, j, step)?;
        jac.column_mut(j).assign(&col);
    }
    Ok(jac)
}
