//! The composite model as a least-squares [`Problem`].
//!
//! The solver sees only the varying parameters, mapped to unbounded internal
//! coordinates through each parameter's bounds transform. Fixed parameters
//! keep their values. Residuals are `y - model`.

use ndarray::Array1;

use crate::error::{PeakFitError, Result};
use crate::model::CompositeModel;
use crate::pattern::Pattern;
use crate::problem::Problem;

/// Residuals of a composite model against a pattern, as a function of the
/// internal coordinates of the varying parameters.
#[derive(Debug, Clone, Copy)]
pub struct ModelObjective<'a> {
    model: &'a CompositeModel,
    pattern: &'a Pattern,
    n_varying: usize,
}

impl<'a> ModelObjective<'a> {
    pub fn new(model: &'a CompositeModel, pattern: &'a Pattern) -> Self {
        Self {
            model,
            pattern,
            n_varying: model.varying_count(),
        }
    }

    /// Full external parameter vector for a point in solver space.
    pub fn external_values(&self, internal: &Array1<f64>) -> Result<Vec<f64>> {
        Ok(self
            .model
            .parameters()
            .values_from_internal(&internal.to_vec())?)
    }

    /// `y - model` for a full external parameter vector.
    pub fn residuals(&self, values: &[f64]) -> Result<Array1<f64>> {
        let model = self.model.evaluate(values, self.pattern.x())?;
        let residuals = self.pattern.y() - &model;
        if residuals.iter().any(|r| !r.is_finite()) {
            return Err(PeakFitError::FunctionEvaluation(
                "model produced non-finite values".to_string(),
            ));
        }
        Ok(residuals)
    }

    /// The same residuals as a function of the external values of the
    /// varying parameters, used for the covariance estimate.
    pub fn external(&self) -> ExternalObjective<'a> {
        ExternalObjective { inner: *self }
    }
}

impl Problem for ModelObjective<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let values = self.external_values(params)?;
        self.residuals(&values)
    }

    fn parameter_count(&self) -> usize {
        self.n_varying
    }

    fn residual_count(&self) -> usize {
        self.pattern.len()
    }
}

/// Residuals over the external values of the varying parameters.
#[derive(Debug, Clone, Copy)]
pub struct ExternalObjective<'a> {
    inner: ModelObjective<'a>,
}

impl ExternalObjective<'_> {
    /// Current external values of the varying parameters.
    pub fn current(&self) -> Array1<f64> {
        self.inner
            .model
            .parameters()
            .varying()
            .iter()
            .map(|p| p.value())
            .collect()
    }
}

impl Problem for ExternalObjective<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let parameters = self.inner.model.parameters();
        let varying = parameters.varying_indices();
        if params.len() != varying.len() {
            return Err(PeakFitError::DimensionMismatch(format!(
                "Expected {} varying values, got {}",
                varying.len(),
                params.len()
            )));
        }
        let mut values = parameters.values();
        for (&i, &v) in varying.iter().zip(params.iter()) {
            values[i] = v;
        }
        self.inner.residuals(&values)
    }

    fn parameter_count(&self) -> usize {
        self.inner.n_varying
    }

    fn residual_count(&self) -> usize {
        self.inner.pattern.len()
    }
}
