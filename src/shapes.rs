//! Peak line shapes and FWHM conversions.
//!
//! All shapes are area-normalized: `amplitude` is the integrated area, as in
//! lmfit's `GaussianModel`, `LorentzianModel` and `PseudoVoigtModel`. Every
//! family is parameterized internally by a width `sigma`; users work in FWHM.
//!
//! | kind        | FWHM                     |
//! |-------------|--------------------------|
//! | Gaussian    | `2 * sqrt(2 ln 2) * sigma` |
//! | Lorentzian  | `2 * sigma`              |
//! | PseudoVoigt | `2 * sigma`              |

use std::f64::consts::{LN_2, PI};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};

/// Guard against division by zero for degenerate widths.
pub const TINY: f64 = 1.0e-15;

const SQRT_2PI: f64 = 2.506_628_274_631_000_2;

/// Ratio of FWHM to sigma for a Gaussian, `2 * sqrt(2 ln 2)`.
pub fn gaussian_fwhm_factor() -> f64 {
    2.0 * (2.0 * LN_2).sqrt()
}

/// Area-normalized Gaussian.
pub fn gaussian(x: f64, amplitude: f64, center: f64, sigma: f64) -> f64 {
    let dx = x - center;
    amplitude / (SQRT_2PI * sigma).max(TINY) * (-dx * dx / (2.0 * sigma * sigma).max(TINY)).exp()
}

/// Area-normalized Lorentzian with half width at half maximum `sigma`.
pub fn lorentzian(x: f64, amplitude: f64, center: f64, sigma: f64) -> f64 {
    let z = (x - center) / sigma.max(TINY);
    (amplitude / (1.0 + z * z)) / (PI * sigma).max(TINY)
}

/// Mixture of a Lorentzian and a Gaussian sharing the same FWHM (`2 * sigma`).
///
/// The Gaussian part uses `sigma_g = sigma / sqrt(2 ln 2)`.
pub fn pseudo_voigt(x: f64, amplitude: f64, center: f64, sigma: f64, fraction: f64) -> f64 {
    let sigma_g = sigma / (2.0 * LN_2).sqrt();
    (1.0 - fraction) * gaussian(x, amplitude, center, sigma_g)
        + fraction * lorentzian(x, amplitude, center, sigma)
}

/// Peak families supported by the composite model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakKind {
    Gaussian,
    Lorentzian,
    PseudoVoigt,
}

impl PeakKind {
    /// Lower-case wire name
    pub fn name(&self) -> &'static str {
        match self {
            PeakKind::Gaussian => "gaussian",
            PeakKind::Lorentzian => "lorentzian",
            PeakKind::PseudoVoigt => "pseudovoigt",
        }
    }

    /// `fwhm = factor * sigma`
    pub fn fwhm_factor(&self) -> f64 {
        match self {
            PeakKind::Gaussian => gaussian_fwhm_factor(),
            PeakKind::Lorentzian | PeakKind::PseudoVoigt => 2.0,
        }
    }

    pub fn sigma_from_fwhm(&self, fwhm: f64) -> f64 {
        fwhm / self.fwhm_factor()
    }

    pub fn fwhm_from_sigma(&self, sigma: f64) -> f64 {
        sigma * self.fwhm_factor()
    }

    /// Convert an optional FWHM bound to a sigma bound.
    ///
    /// An absent bound stays absent and an infinite bound stays infinite;
    /// neither goes through the conversion formula.
    pub fn sigma_bound_from_fwhm(&self, bound: Option<f64>) -> Option<f64> {
        match bound {
            Some(b) if b.is_finite() => Some(self.sigma_from_fwhm(b)),
            other => other,
        }
    }

    /// Evaluate the shape at a single point with internal parameters
    /// `amplitude, center, sigma[, fraction]`.
    pub fn evaluate(&self, x: f64, amplitude: f64, center: f64, sigma: f64, fraction: f64) -> f64 {
        match self {
            PeakKind::Gaussian => gaussian(x, amplitude, center, sigma),
            PeakKind::Lorentzian => lorentzian(x, amplitude, center, sigma),
            PeakKind::PseudoVoigt => pseudo_voigt(x, amplitude, center, sigma, fraction),
        }
    }
}

impl fmt::Display for PeakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PeakKind {
    type Err = PeakFitError;

    /// Case-insensitive; `pseudo_voigt` and `pseudo-voigt` are accepted too.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "gaussian" => Ok(PeakKind::Gaussian),
            "lorentzian" => Ok(PeakKind::Lorentzian),
            "pseudovoigt" => Ok(PeakKind::PseudoVoigt),
            _ => Err(PeakFitError::Config(format!("unknown peak type: {}", s))),
        }
    }
}
