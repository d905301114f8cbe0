//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! Defaults follow lmfit's `leastsq` wrapper around MINPACK: `ftol` and
//! `xtol` of `1.5e-8`, `gtol` of zero and at most `2000 * (nvary + 1)`
//! function evaluations.

use serde::{Deserialize, Serialize};

/// Configuration options for the Levenberg-Marquardt algorithm.
///
/// Deserializable with every field optional:
///
/// ```
/// use peakfit_rs::lm::LmConfig;
///
/// let config: LmConfig = serde_json::from_str(r#"{"max_nfev": 500, "ftol": 1e-10}"#).unwrap();
/// assert_eq!(config.max_nfev, Some(500));
/// assert_eq!(config.xtol, LmConfig::default().xtol);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of function evaluations, Jacobian columns included.
    /// Default: `None`, meaning `2000 * (n_params + 1)`
    pub max_nfev: Option<usize>,

    /// Relative tolerance on the reduction of the sum of squares. Default: 1.5e-8
    pub ftol: f64,

    /// Relative tolerance on the step length. Default: 1.5e-8
    pub xtol: f64,

    /// Tolerance on the cosine between residuals and Jacobian columns. Default: 0.0
    pub gtol: f64,

    /// Assumed relative error of the model output; the finite-difference step
    /// is `sqrt(epsfcn)` times the parameter magnitude. Default: `f64::EPSILON`
    pub epsfcn: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Damping beyond this value ends the fit. Default: 1e16
    pub max_lambda: f64,

    /// Compute Jacobian columns on the rayon pool when the `parallel`
    /// feature is enabled. Default: true
    pub parallel_jacobian: bool,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_nfev: None,
            ftol: 1.5e-8,
            xtol: 1.5e-8,
            gtol: 0.0,
            epsfcn: f64::EPSILON,
            initial_lambda: 1e-3,
            min_lambda: 1e-12,
            max_lambda: 1e16,
            parallel_jacobian: true,
        }
    }
}

impl LmConfig {
    /// Evaluation budget for a problem with `n_params` free parameters
    pub fn max_nfev_for(&self, n_params: usize) -> usize {
        self.max_nfev.unwrap_or(2000 * (n_params + 1))
    }

    /// Relative finite-difference step
    pub fn diff_step(&self) -> f64 {
        self.epsfcn.max(f64::EPSILON).sqrt()
    }
}
