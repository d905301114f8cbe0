//! # Uncertainty Calculation
//!
//! Standard errors and parameter correlations from the Jacobian at the
//! solution, computed the way lmfit does for `leastsq` fits.

mod covariance;

pub use covariance::{calculate_correlation, calculate_covariance, standard_errors_from_covariance};

use ndarray::{Array1, Array2};

/// Covariance-based uncertainty of the varying parameters.
#[derive(Debug, Clone)]
pub struct Uncertainty {
    /// Covariance matrix, in varying-parameter order
    pub covariance: Array2<f64>,
    /// Standard error of each varying parameter
    pub standard_errors: Array1<f64>,
    /// Correlation matrix derived from the covariance
    pub correlation: Array2<f64>,
}

impl Uncertainty {
    /// Estimate uncertainties from the Jacobian of the residuals with respect
    /// to the varying parameters.
    ///
    /// Returns `None` when the problem is degenerate: no degrees of freedom,
    /// a `J^T J` that is not positive definite, or an unusable variance.
    pub fn estimate(jacobian: &Array2<f64>, chi2: f64, n_points: usize) -> Option<Self> {
        let nfree = n_points.checked_sub(jacobian.ncols())?;
        let covariance = calculate_covariance(jacobian, chi2, nfree)?;
        let standard_errors = standard_errors_from_covariance(&covariance)?;
        let correlation = calculate_correlation(&covariance);
        Some(Self {
            covariance,
            standard_errors,
            correlation,
        })
    }
}
