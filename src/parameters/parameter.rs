//! A [`Parameter`] is a named scalar with a current value, a free/fixed flag,
//! box bounds, and (after a fit) a standard error.

use crate::parameters::bounds::{Bounds, BoundsError, BoundsTransform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Parameter '{name}' is already defined")]
    DuplicateName { name: String },

    #[error("Parameter '{name}' has a non-finite value")]
    NonFiniteValue { name: String },

    #[error("Expected {expected} values, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// One named scalar of a fit.
///
/// The value never leaves `bounds`. Constructors clamp it and
/// [`Parameter::set_value`] rejects out-of-range input. `stderr` stays `None`
/// until a fit could estimate it, and is never set for a fixed parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    value: f64,
    /// Value at construction, restored by [`Parameter::reset`]
    init_value: f64,
    vary: bool,
    bounds: Bounds,
    stderr: Option<f64>,
}

impl Parameter {
    /// Unbounded, varying parameter.
    ///
    /// ```
    /// use peakfit_rs::parameters::Parameter;
    ///
    /// let param = Parameter::new("p0_amplitude", 10.0);
    /// assert!(param.vary());
    /// assert_eq!(param.stderr(), None);
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self::with_checked_bounds(name, value, Bounds::default())
    }

    /// Bounded parameter; `value` is clamped into `[min, max]`.
    ///
    /// Callers that need to know whether clamping happened compare
    /// [`Parameter::value`] with their input.
    ///
    /// ```
    /// use peakfit_rs::parameters::Parameter;
    ///
    /// let param = Parameter::with_bounds("p0_sigma", 0.5, 0.0, 0.2).unwrap();
    /// assert_eq!(param.value(), 0.2);
    /// assert_eq!((param.min(), param.max()), (0.0, 0.2));
    /// ```
    pub fn with_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<Self, ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::NonFiniteValue {
                name: name.to_string(),
            });
        }
        let bounds = Bounds::new(min, max)?;
        Ok(Self::with_checked_bounds(name, bounds.clamp(value), bounds))
    }

    fn with_checked_bounds(name: &str, value: f64, bounds: Bounds) -> Self {
        Self {
            name: name.to_string(),
            value,
            init_value: value,
            vary: true,
            bounds,
            stderr: None,
        }
    }

    /// Builder-style setter for the vary flag
    pub fn varying(mut self, vary: bool) -> Self {
        self.vary = vary;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value of the parameter
    ///
    /// Returns an error if the value is outside the bounds.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !self.bounds.contains(value) {
            let Bounds { min, max } = self.bounds;
            return Err(BoundsError::ValueOutsideBounds { value, min, max }.into());
        }
        self.value = value;
        Ok(())
    }

    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    /// Reset the parameter to its initial value and clear the standard error
    pub fn reset(&mut self) {
        self.value = self.bounds.clamp(self.init_value);
        self.stderr = None;
    }

    pub fn vary(&self) -> bool {
        self.vary
    }

    pub fn set_vary(&mut self, vary: bool) {
        self.vary = vary;
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Set the bounds for the parameter, clamping the current value into them
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ParameterError> {
        let bounds = Bounds::new(min, max)?;
        self.bounds = bounds;
        self.value = bounds.clamp(self.value);
        Ok(())
    }

    /// Standard error from the last fit, if one could be computed
    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    pub fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }

    /// Convert the current value to the solver's unbounded coordinate
    pub fn to_internal(&self) -> Result<f64, ParameterError> {
        Ok(BoundsTransform::new(self.bounds).to_internal(self.value)?)
    }

    /// Map a solver coordinate back to an in-bounds external value
    pub fn from_internal(&self, internal: f64) -> f64 {
        BoundsTransform::new(self.bounds).to_external(internal)
    }

    /// Set the value from a solver coordinate
    pub fn set_from_internal(&mut self, internal: f64) {
        self.value = self.bounds.clamp(self.from_internal(internal));
    }
}
