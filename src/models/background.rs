//! Background models: linear, quadratic and polynomial baselines.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};

/// Highest polynomial degree accepted for a background.
pub const MAX_POLYNOMIAL_DEGREE: usize = 7;

const POLYNOMIAL_NAMES: [&str; MAX_POLYNOMIAL_DEGREE + 1] =
    ["c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7"];

/// Baseline families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackgroundKind {
    /// `slope * x + intercept`
    Linear,
    /// `a * x^2 + b * x + c`
    Quadratic,
    /// `c0 + c1 * x + ... + cN * x^N`
    Polynomial { degree: usize },
}

impl BackgroundKind {
    /// Polynomial background of the given degree, rejecting degrees above
    /// [`MAX_POLYNOMIAL_DEGREE`].
    pub fn polynomial(degree: usize) -> Result<Self> {
        if degree > MAX_POLYNOMIAL_DEGREE {
            return Err(PeakFitError::Config(format!(
                "polynomial background degree must be between 0 and {}, got {}",
                MAX_POLYNOMIAL_DEGREE, degree
            )));
        }
        Ok(BackgroundKind::Polynomial { degree })
    }

    /// Parse a case-insensitive type name.
    ///
    /// For `polynomial`, a missing `degree` is inferred from the number of
    /// declared coefficients.
    pub fn from_type(kind: &str, degree: Option<usize>, declared: usize) -> Result<Self> {
        match kind.trim().to_lowercase().as_str() {
            "linear" => Ok(BackgroundKind::Linear),
            "quadratic" => Ok(BackgroundKind::Quadratic),
            "polynomial" => {
                let degree = match degree {
                    Some(d) => d,
                    None if declared > 0 => declared - 1,
                    None => {
                        return Err(PeakFitError::Config(
                            "polynomial background needs a degree or at least one coefficient"
                                .to_string(),
                        ))
                    }
                };
                Self::polynomial(degree)
            }
            _ => Err(PeakFitError::Config(format!(
                "unknown background type: {}",
                kind
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackgroundKind::Linear => "linear",
            BackgroundKind::Quadratic => "quadratic",
            BackgroundKind::Polynomial { .. } => "polynomial",
        }
    }

    pub fn degree(&self) -> Option<usize> {
        match self {
            BackgroundKind::Polynomial { degree } => Some(*degree),
            _ => None,
        }
    }

    /// Canonical parameter names, in evaluation order
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            BackgroundKind::Linear => &["intercept", "slope"],
            BackgroundKind::Quadratic => &["a", "b", "c"],
            BackgroundKind::Polynomial { degree } => &POLYNOMIAL_NAMES[..=*degree],
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_names().len()
    }

    /// Add the background curve to `out`, with `values` in
    /// [`parameter_names`](Self::parameter_names) order.
    pub fn eval_into(&self, x: &Array1<f64>, values: &[f64], out: &mut Array1<f64>) {
        match self {
            BackgroundKind::Linear => {
                let (intercept, slope) = (values[0], values[1]);
                out.zip_mut_with(x, |y, &xv| *y += slope * xv + intercept);
            }
            BackgroundKind::Quadratic => {
                let (a, b, c) = (values[0], values[1], values[2]);
                out.zip_mut_with(x, |y, &xv| *y += (a * xv + b) * xv + c);
            }
            BackgroundKind::Polynomial { .. } => {
                out.zip_mut_with(x, |y, &xv| {
                    *y += values.iter().rev().fold(0.0, |acc, &c| acc * xv + c);
                });
            }
        }
    }
}

impl fmt::Display for BackgroundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackgroundKind::Polynomial { degree } => write!(f, "polynomial(degree={})", degree),
            other => f.write_str(other.name()),
        }
    }
}
