//! Convergence criteria for the Levenberg-Marquardt loop.
//!
//! The tests mirror MINPACK's `lmdif`: a relative reduction test on the sum of
//! squares (`ftol`), a relative step-length test (`xtol`) and a cosine test on
//! the gradient (`gtol`).

use serde::{Deserialize, Serialize};

/// Possible convergence states for an optimization algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// The algorithm has converged due to a small parameter change.
    ParameterConvergence,

    /// The algorithm has converged due to a small function value change.
    FunctionValueConvergence,

    /// The algorithm has converged due to a small gradient.
    GradientConvergence,

    /// The evaluation budget ran out.
    MaxEvaluationsReached,

    /// The damping parameter reached its ceiling without reducing the cost.
    DampingLimitReached,

    /// The model produced non-finite values.
    NumericalError,

    /// An observer asked the solver to stop.
    Aborted,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> String {
        match self {
            ConvergenceStatus::Running => "Optimization is still running".to_string(),
            ConvergenceStatus::ParameterConvergence => {
                "Converged: relative step below xtol".to_string()
            }
            ConvergenceStatus::FunctionValueConvergence => {
                "Converged: relative reduction in the sum of squares below ftol".to_string()
            }
            ConvergenceStatus::GradientConvergence => {
                "Converged: residuals orthogonal to the Jacobian columns within gtol".to_string()
            }
            ConvergenceStatus::MaxEvaluationsReached => {
                "Terminated: maximum number of function evaluations reached".to_string()
            }
            ConvergenceStatus::DampingLimitReached => {
                "Terminated: damping reached its limit without reducing the sum of squares"
                    .to_string()
            }
            ConvergenceStatus::NumericalError => {
                "Terminated: model produced non-finite values".to_string()
            }
            ConvergenceStatus::Aborted => "Terminated: stopped by observer".to_string(),
        }
    }
}

/// Criteria for determining when the solver has converged.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for change in parameter values.
    pub xtol: f64,

    /// Tolerance for change in function value.
    pub ftol: f64,

    /// Tolerance for the gradient cosine.
    pub gtol: f64,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            xtol: 1.5e-8,
            ftol: 1.5e-8,
            gtol: 0.0,
        }
    }
}

impl ConvergenceCriteria {
    pub fn new(xtol: f64, ftol: f64, gtol: f64) -> Self {
        Self { xtol, ftol, gtol }
    }

    /// Gradient test, evaluated once per Jacobian.
    ///
    /// `gradient_cosine` is `max_j |J_j . r| / (|J_j| |r|)`.
    pub fn check_gradient(&self, gradient_cosine: f64) -> ConvergenceStatus {
        if gradient_cosine <= self.gtol {
            ConvergenceStatus::GradientConvergence
        } else {
            ConvergenceStatus::Running
        }
    }

    /// Step tests, evaluated for every trial step.
    ///
    /// # Arguments
    ///
    /// * `cost` - Sum of squares before the step
    /// * `actual_reduction` - `cost - new_cost`
    /// * `predicted_reduction` - Reduction predicted by the linearized model
    /// * `step_norm` - Scaled norm of the step
    /// * `param_norm` - Scaled norm of the parameters
    pub fn check_step(
        &self,
        cost: f64,
        actual_reduction: f64,
        predicted_reduction: f64,
        step_norm: f64,
        param_norm: f64,
    ) -> ConvergenceStatus {
        let ftol_hit = cost > 0.0
            && actual_reduction.abs() <= self.ftol * cost
            && predicted_reduction <= self.ftol * cost
            && actual_reduction <= 2.0 * predicted_reduction;
        if ftol_hit {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        if step_norm <= self.xtol * param_norm.max(self.xtol) {
            return ConvergenceStatus::ParameterConvergence;
        }

        ConvergenceStatus::Running
    }
}
