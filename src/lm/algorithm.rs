//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! Each outer iteration evaluates the Jacobian once and then solves the
//! damped normal equations `(J^T J + lambda D) delta = -J^T r` until a trial
//! step lowers the sum of squares or a stopping test fires. `D` is the running
//! maximum of `diag(J^T J)` (Marquardt scaling), which makes the iteration
//! invariant to the units of the individual parameters.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use std::fmt;
use std::ops::ControlFlow;

use crate::error::{PeakFitError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference::{check_residual_len, jacobian_at};
use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::trust_region::TrustRegion;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of completed outer iterations
    pub iterations: usize,

    /// Number of function evaluations, Jacobian columns included
    pub func_evals: usize,

    /// Whether one of the convergence tests was met
    pub success: bool,

    /// Why the solver stopped
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// Solver state handed to the observer at every iteration boundary.
///
/// Iteration 0 is reported once, before the first Jacobian, with the starting
/// point. Afterwards the observer sees the accepted point of every completed
/// iteration.
#[derive(Debug, Clone, Copy)]
pub struct IterationState<'a> {
    pub iteration: usize,
    pub nfev: usize,
    pub params: &'a Array1<f64>,
    pub residuals: &'a Array1<f64>,
    pub cost: f64,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of function evaluations.
    pub fn with_max_nfev(mut self, max_nfev: usize) -> Self {
        self.config.max_nfev = Some(max_nfev);
        self
    }

    /// Set the tolerance for the relative reduction of the sum of squares.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for the relative step length.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for the gradient cosine.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the assumed relative error of the function values.
    pub fn with_epsfcn(mut self, epsfcn: f64) -> Self {
        self.config.epsfcn = epsfcn;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the damping ceiling.
    pub fn with_max_lambda(mut self, max_lambda: f64) -> Self {
        self.config.max_lambda = max_lambda;
        self
    }

    /// Enable or disable parallel Jacobian evaluation.
    pub fn with_parallel_jacobian(mut self, parallel: bool) -> Self {
        self.config.parallel_jacobian = parallel;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    pub fn minimize<P: Problem>(&self, problem: &P, initial_params: Array1<f64>) -> Result<LmResult> {
        self.minimize_with_observer(problem, initial_params, |_: &IterationState<'_>| {
            ControlFlow::Continue(())
        })
    }

    /// Minimize the sum of squared residuals, reporting every iteration.
    ///
    /// Returning [`ControlFlow::Break`] from `observer` stops the solver
    /// before the next Jacobian; the result then carries
    /// [`ConvergenceStatus::Aborted`] and the last accepted parameters.
    ///
    /// Non-finite residuals do not produce an `Err`: at the starting point or
    /// inside a Jacobian they end the run with
    /// [`ConvergenceStatus::NumericalError`], on a trial step they reject the
    /// step. Other errors from the problem are propagated.
    pub fn minimize_with_observer<P, F>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
        mut observer: F,
    ) -> Result<LmResult>
    where
        P: Problem,
        F: FnMut(&IterationState<'_>) -> ControlFlow<()>,
    {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(PeakFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let max_nfev = self.config.max_nfev_for(n_params);
        let criteria = ConvergenceCriteria::new(self.config.xtol, self.config.ftol, self.config.gtol);
        let mut damping = TrustRegion::new(
            self.config.initial_lambda,
            self.config.min_lambda,
            self.config.max_lambda,
        );

        let mut params = initial_params;
        let mut nfev = 1;
        let mut residuals = match evaluate_finite(problem, &params)? {
            Some(r) => r,
            None => {
                let residuals = Array1::from_elem(problem.residual_count(), f64::NAN);
                return Ok(finish(params, residuals, f64::NAN, 0, nfev, ConvergenceStatus::NumericalError));
            }
        };
        let mut cost = sum_of_squares(&residuals);

        let mut scale = DVector::<f64>::zeros(n_params);
        let mut iteration = 0;

        let status = 'outer: loop {
            let state = IterationState {
                iteration,
                nfev,
                params: &params,
                residuals: &residuals,
                cost,
            };
            if observer(&state).is_break() {
                break ConvergenceStatus::Aborted;
            }

            if cost == 0.0 {
                break ConvergenceStatus::FunctionValueConvergence;
            }
            if nfev + n_params > max_nfev {
                break ConvergenceStatus::MaxEvaluationsReached;
            }

            let jac = match self.jacobian(problem, &params, &residuals) {
                Ok(jac) if jac.iter().all(|v| v.is_finite()) => jac,
                Ok(_) | Err(PeakFitError::FunctionEvaluation(_)) => {
                    break ConvergenceStatus::NumericalError;
                }
                Err(e) => return Err(e),
            };
            if !problem.has_custom_jacobian() {
                nfev += n_params;
            }

            let j = ndarray_to_nalgebra(&jac);
            let r = ndarray_vec_to_nalgebra(&residuals);
            let jtj = j.tr_mul(&j);
            let gradient = j.tr_mul(&r);

            for k in 0..n_params {
                scale[k] = scale[k].max(jtj[(k, k)]);
            }
            let diag = scale.map(|d| if d > 0.0 { d } else { 1.0 });

            let cosine = gradient_cosine(&jtj, &gradient, cost.sqrt());
            let status = criteria.check_gradient(cosine);
            if status.is_converged() {
                break status;
            }

            let p = ndarray_vec_to_nalgebra(&params);
            let param_norm = scaled_norm(&diag, &p);

            // Inner loop: shrink the step until the sum of squares drops
            loop {
                if nfev >= max_nfev {
                    iteration += 1;
                    break 'outer ConvergenceStatus::MaxEvaluationsReached;
                }

                let delta = match solve_damped(&jtj, &gradient, &diag, damping.lambda) {
                    Some(delta) => delta,
                    None => {
                        damping.increase();
                        if damping.is_exhausted() {
                            iteration += 1;
                            break 'outer ConvergenceStatus::DampingLimitReached;
                        }
                        continue;
                    }
                };

                let step_norm = scaled_norm(&diag, &delta);
                let damped = delta.component_mul(&diag) * damping.lambda;
                let predicted = delta.dot(&(damped - &gradient));

                let trial = &params + &nalgebra_vec_to_ndarray(&delta);
                let trial_residuals = evaluate_finite(problem, &trial)?;
                nfev += 1;
                let trial_cost = trial_residuals
                    .as_ref()
                    .map_or(f64::INFINITY, sum_of_squares);

                let status = if trial_cost.is_finite() {
                    criteria.check_step(cost, cost - trial_cost, predicted, step_norm, param_norm)
                } else if step_norm <= criteria.xtol * param_norm.max(criteria.xtol) {
                    ConvergenceStatus::ParameterConvergence
                } else {
                    ConvergenceStatus::Running
                };

                let rho = TrustRegion::gain_ratio(cost, trial_cost, predicted);
                let accepted = damping.update_lambda(rho);
                if accepted {
                    if let Some(trial_residuals) = trial_residuals {
                        params = trial;
                        residuals = trial_residuals;
                        cost = trial_cost;
                    }
                }

                log::trace!(
                    "lm step: lambda = {:.3e}, rho = {:.3}, cost = {:.6e}, accepted = {}",
                    damping.lambda,
                    rho,
                    cost,
                    accepted
                );

                if status.is_converged() {
                    iteration += 1;
                    break 'outer status;
                }
                if accepted {
                    break;
                }
                if damping.is_exhausted() {
                    iteration += 1;
                    break 'outer ConvergenceStatus::DampingLimitReached;
                }
            }

            iteration += 1;
        };

        Ok(finish(params, residuals, cost, iteration, nfev, status))
    }

    fn jacobian<P: Problem>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            return problem.jacobian(params);
        }
        numerical_jacobian(
            problem,
            params,
            residuals,
            self.config.diff_step(),
            self.config.parallel_jacobian,
        )
    }
}

#[cfg(feature = "parallel")]
fn numerical_jacobian(
    problem: &dyn Problem,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    step: f64,
    parallel: bool,
) -> Result<Array2<f64>> {
    if parallel {
        crate::utils::parallel::jacobian_parallel(problem, params, residuals, Some(step))
    } else {
        jacobian_at(problem, params, residuals, Some(step))
    }
}

#[cfg(not(feature = "parallel"))]
fn numerical_jacobian(
    problem: &dyn Problem,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    step: f64,
    _parallel: bool,
) -> Result<Array2<f64>> {
    jacobian_at(problem, params, residuals, Some(step))
}

/// Evaluate residuals, mapping non-finite output to `None`.
fn evaluate_finite<P: Problem>(problem: &P, params: &Array1<f64>) -> Result<Option<Array1<f64>>> {
    match problem.eval(params) {
        Ok(residuals) => {
            check_residual_len(problem, &residuals)?;
            if residuals.iter().all(|r| r.is_finite()) {
                Ok(Some(residuals))
            } else {
                Ok(None)
            }
        }
        Err(PeakFitError::FunctionEvaluation(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

fn scaled_norm(diag: &DVector<f64>, v: &DVector<f64>) -> f64 {
    diag.iter()
        .zip(v.iter())
        .map(|(d, x)| d * x * x)
        .sum::<f64>()
        .sqrt()
}

/// Largest cosine between the residual vector and a Jacobian column.
fn gradient_cosine(jtj: &DMatrix<f64>, gradient: &DVector<f64>, residual_norm: f64) -> f64 {
    if residual_norm == 0.0 {
        return 0.0;
    }
    (0..gradient.len())
        .filter_map(|k| {
            let column_norm = jtj[(k, k)].sqrt();
            (column_norm > 0.0).then(|| gradient[k].abs() / (column_norm * residual_norm))
        })
        .fold(0.0, f64::max)
}

/// Solve `(J^T J + lambda D) delta = -g`; `None` if the system is not
/// positive definite.
fn solve_damped(
    jtj: &DMatrix<f64>,
    gradient: &DVector<f64>,
    diag: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let mut a = jtj.clone();
    for k in 0..diag.len() {
        a[(k, k)] += lambda * diag[k];
    }
    let delta = a.cholesky()?.solve(&(-gradient));
    delta.iter().all(|v| v.is_finite()).then_some(delta)
}

fn finish(
    params: Array1<f64>,
    residuals: Array1<f64>,
    cost: f64,
    iterations: usize,
    func_evals: usize,
    status: ConvergenceStatus,
) -> LmResult {
    LmResult {
        params,
        residuals,
        cost,
        iterations,
        func_evals,
        success: status.is_converged(),
        message: status.description(),
        status,
    }
}
