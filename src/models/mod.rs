//! Component models that make up a composite spectrum.
//!
//! A composite model is one background plus any number of peaks. Each
//! component owns a contiguous slice of the shared parameter vector and adds
//! its curve into the output.

pub mod background;
pub mod peak;

pub use background::{BackgroundKind, MAX_POLYNOMIAL_DEGREE};
pub use crate::shapes::PeakKind;

use ndarray::Array1;

/// Closed set of component families with their evaluation dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Background(BackgroundKind),
    Peak(PeakKind),
}

impl ComponentKind {
    /// Wire name of the component type
    pub fn type_name(&self) -> &'static str {
        match self {
            ComponentKind::Background(kind) => kind.name(),
            ComponentKind::Peak(kind) => kind.name(),
        }
    }

    /// Solver-side parameter names in evaluation order
    pub fn internal_names(&self) -> &'static [&'static str] {
        match self {
            ComponentKind::Background(kind) => kind.parameter_names(),
            ComponentKind::Peak(kind) => kind.internal_names(),
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.internal_names().len()
    }

    pub fn eval_into(&self, x: &Array1<f64>, values: &[f64], out: &mut Array1<f64>) {
        match self {
            ComponentKind::Background(kind) => kind.eval_into(x, values, out),
            ComponentKind::Peak(kind) => kind.eval_into(x, values, out),
        }
    }
}
