//! Measured 1-D patterns.

use ndarray::Array1;

use crate::error::{PeakFitError, Result};

/// An immutable `(x, y)` measurement with at least one finite point.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    x: Array1<f64>,
    y: Array1<f64>,
}

impl Pattern {
    /// Validate and wrap a pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use peakfit_rs::Pattern;
    ///
    /// let pattern = Pattern::new(array![0.0, 1.0], array![2.0, 3.0]).unwrap();
    /// assert_eq!(pattern.len(), 2);
    /// assert!(Pattern::new(array![0.0], array![1.0, 2.0]).is_err());
    /// ```
    pub fn new(x: Array1<f64>, y: Array1<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(PeakFitError::Config(format!(
                "pattern x and y must have the same length (got {} and {})",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(PeakFitError::Config("pattern must not be empty".to_string()));
        }
        if let Some(i) = x.iter().zip(y.iter()).position(|(a, b)| !a.is_finite() || !b.is_finite()) {
            return Err(PeakFitError::Config(format!(
                "pattern contains a non-finite value at index {}",
                i
            )));
        }
        Ok(Self { x, y })
    }

    pub fn from_vecs(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        Self::new(Array1::from_vec(x), Array1::from_vec(y))
    }

    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}
