//! Ordered, name-indexed parameter collection.

use crate::parameters::parameter::{Parameter, ParameterError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An insertion-ordered collection of uniquely named parameters
///
/// Order matters: the composite model lays its parameter slices out in the
/// order they were added, and the solver vector follows the order of the
/// varying parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    params: Vec<Parameter>,

    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Parameters {
    /// Empty collection
    ///
    /// # Examples
    ///
    /// ```
    /// use peakfit_rs::parameters::parameters::Parameters;
    ///
    /// let params = Parameters::new();
    /// assert_eq!(params.len(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `param`; names must be unique.
    ///
    /// # Examples
    ///
    /// ```
    /// use peakfit_rs::parameters::parameters::Parameters;
    /// use peakfit_rs::parameters::parameter::Parameter;
    ///
    /// let mut params = Parameters::new();
    /// params.add(Parameter::new("bkg_intercept", 1.0)).unwrap();
    /// assert!(params.add(Parameter::new("bkg_intercept", 2.0)).is_err());
    /// assert_eq!(params.len(), 1);
    /// ```
    pub fn add(&mut self, param: Parameter) -> Result<(), ParameterError> {
        if self.index_of(param.name()).is_some() {
            return Err(ParameterError::DuplicateName {
                name: param.name().to_string(),
            });
        }
        self.index.insert(param.name().to_string(), self.params.len());
        self.params.push(param);
        Ok(())
    }

    /// Append an unbounded parameter
    pub fn add_param(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        self.add(Parameter::new(name, value))
    }

    /// Append a bounded parameter, clamping `value` into `[min, max]`
    pub fn add_param_with_bounds(
        &mut self,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), ParameterError> {
        self.add(Parameter::with_bounds(name, value, min, max)?)
    }

    /// Position of a parameter in insertion order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        // The index is skipped by serde, so fall back to a scan after deserialization.
        match self.index.get(name) {
            Some(&i) => Some(i),
            None if self.index.len() != self.params.len() => {
                self.params.iter().position(|p| p.name() == name)
            }
            None => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index_of(name).map(|i| &self.params[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.index_of(name).map(move |i| &mut self.params[i])
    }

    /// Look up a parameter, reporting a missing name as an error
    pub fn require(&self, name: &str) -> Result<&Parameter, ParameterError> {
        self.get(name).ok_or_else(|| ParameterError::ParameterNotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.iter_mut()
    }

    /// Current values of all parameters in insertion order
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value()).collect()
    }

    /// Overwrite every value at once, in insertion order
    pub fn set_values(&mut self, values: &[f64]) -> Result<(), ParameterError> {
        self.check_len(self.params.len(), values.len())?;
        for (param, &value) in self.params.iter_mut().zip(values) {
            param.set_value(value)?;
        }
        Ok(())
    }

    /// Insertion-order positions of the varying parameters
    pub fn varying_indices(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.vary())
            .map(|(i, _)| i)
            .collect()
    }

    /// Parameters the solver adjusts, in order
    ///
    /// # Examples
    ///
    /// ```
    /// use peakfit_rs::parameters::parameters::Parameters;
    ///
    /// let mut params = Parameters::new();
    /// params.add_param("amplitude", 10.0).unwrap();
    /// params.add_param("center", 5.0).unwrap();
    /// params.get_mut("center").unwrap().set_vary(false);
    ///
    /// let varying = params.varying();
    /// assert_eq!(varying.len(), 1);
    /// assert_eq!(varying[0].name(), "amplitude");
    /// ```
    pub fn varying(&self) -> Vec<&Parameter> {
        self.params.iter().filter(|p| p.vary()).collect()
    }

    /// Solver coordinates of the varying parameters, in order
    pub fn varying_internal_values(&self) -> Result<Vec<f64>, ParameterError> {
        self.params
            .iter()
            .filter(|p| p.vary())
            .map(|p| p.to_internal())
            .collect()
    }

    /// All external values with the varying ones replaced by the mapping of
    /// `internal` through each parameter's bounds transform
    pub fn values_from_internal(&self, internal: &[f64]) -> Result<Vec<f64>, ParameterError> {
        let varying = self.varying_indices();
        self.check_len(varying.len(), internal.len())?;

        let mut values = self.values();
        for (&i, &u) in varying.iter().zip(internal) {
            values[i] = self.params[i].from_internal(u);
        }
        Ok(values)
    }

    /// Move the varying parameters to the solver point `internal`
    ///
    /// # Examples
    ///
    /// ```
    /// use peakfit_rs::parameters::parameters::Parameters;
    ///
    /// let mut params = Parameters::new();
    /// params.add_param_with_bounds("amplitude", 10.0, 0.0, 20.0).unwrap();
    /// params.add_param("center", 5.0).unwrap();
    /// params.get_mut("center").unwrap().set_vary(false);
    ///
    /// params.update_from_internal(&[0.0]).unwrap();
    /// assert_eq!(params.get("amplitude").unwrap().value(), 10.0);
    /// assert_eq!(params.get("center").unwrap().value(), 5.0);
    /// ```
    pub fn update_from_internal(&mut self, internal: &[f64]) -> Result<(), ParameterError> {
        let varying = self.varying_indices();
        self.check_len(varying.len(), internal.len())?;

        for (&i, &u) in varying.iter().zip(internal) {
            self.params[i].set_from_internal(u);
        }
        Ok(())
    }

    /// Assign standard errors to the varying parameters, in order.
    ///
    /// Fixed parameters always get `None`. Passing `None` clears every error.
    pub fn set_varying_stderrs(&mut self, stderrs: Option<&[f64]>) -> Result<(), ParameterError> {
        let varying = self.varying_indices();
        if let Some(errors) = stderrs {
            self.check_len(varying.len(), errors.len())?;
        }

        for param in self.params.iter_mut() {
            param.set_stderr(None);
        }
        if let Some(errors) = stderrs {
            for (&i, &e) in varying.iter().zip(errors) {
                self.params[i].set_stderr(Some(e));
            }
        }
        Ok(())
    }

    /// Restore every initial value and drop the standard errors
    pub fn reset(&mut self) {
        for param in self.params.iter_mut() {
            param.reset();
        }
    }

    fn check_len(&self, expected: usize, got: usize) -> Result<(), ParameterError> {
        if expected != got {
            return Err(ParameterError::LengthMismatch { expected, got });
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}
