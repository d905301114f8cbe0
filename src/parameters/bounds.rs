//! Box bounds on fit parameters.
//!
//! The solver never sees a bound. Each bounded parameter is reparameterized
//! through a [`BoundsTransform`] (the MINUIT scheme also used by lmfit), so any
//! real internal coordinate maps to an external value inside `[min, max]`.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Value {value} lies outside [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Non-finite parameter value is not allowed")]
    NonFiniteValue,
}

/// Closed interval `[min, max]`; a missing side is stored as an infinity.
///
/// On the wire an infinite side is written as `null`, since JSON has no
/// infinities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireBounds", into = "WireBounds")]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Serialize, Deserialize)]
struct WireBounds {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

impl TryFrom<WireBounds> for Bounds {
    type Error = BoundsError;

    fn try_from(wire: WireBounds) -> Result<Self, Self::Error> {
        Bounds::from_options(wire.min, wire.max)
    }
}

impl From<Bounds> for WireBounds {
    fn from(bounds: Bounds) -> Self {
        WireBounds {
            min: bounds.lower(),
            max: bounds.upper(),
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// ```
    /// use peakfit_rs::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 2.5).unwrap();
    /// assert!(bounds.contains(2.5));
    /// assert!(Bounds::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// Bounds from optional sides; `None` means unbounded on that side.
    pub fn from_options(min: Option<f64>, max: Option<f64>) -> Result<Self, BoundsError> {
        Self::new(min.unwrap_or(NEG_INFINITY), max.unwrap_or(INFINITY))
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Finite lower limit, if any
    pub fn lower(&self) -> Option<f64> {
        self.min.is_finite().then_some(self.min)
    }

    /// Finite upper limit, if any
    pub fn upper(&self) -> Option<f64> {
        self.max.is_finite().then_some(self.max)
    }
}

/// Mapping between a bounded external value and an unbounded internal one.
///
/// | bounds      | external from internal `u`              |
/// |-------------|------------------------------------------|
/// | none        | `u`                                      |
/// | lower only  | `min - 1 + sqrt(u^2 + 1)`                |
/// | upper only  | `max + 1 - sqrt(u^2 + 1)`                |
/// | both        | `min + (sin(u) + 1) * (max - min) / 2`   |
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundsTransform {
    Free,
    Lower(f64),
    Upper(f64),
    Interval { min: f64, max: f64 },
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        match (bounds.lower(), bounds.upper()) {
            (None, None) => BoundsTransform::Free,
            (Some(min), None) => BoundsTransform::Lower(min),
            (None, Some(max)) => BoundsTransform::Upper(max),
            (Some(min), Some(max)) => BoundsTransform::Interval { min, max },
        }
    }

    pub fn to_external(&self, u: f64) -> f64 {
        match *self {
            BoundsTransform::Free => u,
            BoundsTransform::Lower(min) => min - 1.0 + u.hypot(1.0),
            BoundsTransform::Upper(max) => max + 1.0 - u.hypot(1.0),
            BoundsTransform::Interval { min, max } => min + (u.sin() + 1.0) * (max - min) / 2.0,
        }
    }

    /// Internal coordinate of an in-bounds external value.
    pub fn to_internal(&self, value: f64) -> Result<f64, BoundsError> {
        if !value.is_finite() {
            return Err(BoundsError::NonFiniteValue);
        }
        let outside = |min: f64, max: f64| BoundsError::ValueOutsideBounds { value, min, max };

        match *self {
            BoundsTransform::Free => Ok(value),
            BoundsTransform::Lower(min) if value < min => Err(outside(min, INFINITY)),
            BoundsTransform::Lower(min) => Ok(((value - min + 1.0).powi(2) - 1.0).sqrt()),
            BoundsTransform::Upper(max) if value > max => Err(outside(NEG_INFINITY, max)),
            BoundsTransform::Upper(max) => Ok(((max - value + 1.0).powi(2) - 1.0).sqrt()),
            BoundsTransform::Interval { min, max } if value < min || value > max => {
                Err(outside(min, max))
            }
            BoundsTransform::Interval { min, max } if max == min => Ok(0.0),
            BoundsTransform::Interval { min, max } => {
                let scaled = 2.0 * (value - min) / (max - min) - 1.0;
                Ok(scaled.clamp(-1.0, 1.0).asin())
            }
        }
    }
}
