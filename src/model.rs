//! Structured model descriptions and the composite model built from them.
//!
//! A [`ModelSpec`] is what a caller declares: one background and an ordered
//! list of peaks, each with user-facing parameters (`fwhm` rather than
//! `sigma`). [`CompositeModel::build`] turns it into a single namespaced
//! [`Parameters`] collection and an evaluation function that sums every
//! component.
//!
//! Parameter names are namespaced per component: background parameters get
//! the `bkg_` prefix and peak `i` (0-based, in input order) gets `p{i}_`.
//! A peak's `fwhm` is stored as `p{i}_sigma`.

use std::collections::HashMap;
use std::f64::{INFINITY, NEG_INFINITY};
use std::ops::Range;

use log::{debug, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};
use crate::models::{BackgroundKind, ComponentKind, PeakKind};
use crate::parameters::{Parameter, Parameters};

/// Prefix for background parameter names.
pub const BACKGROUND_PREFIX: &str = "bkg_";

/// Prefix for the parameters of peak `index`.
pub fn peak_prefix(index: usize) -> String {
    format!("p{}_", index)
}

/// Normalize a declared parameter name: lower case, with legacy aliases
/// (`position`, `eta`) mapped to their canonical names.
pub fn canonical_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.as_str() {
        "position" => "center".to_string(),
        "eta" => "fraction".to_string(),
        _ => lower,
    }
}

/// Full parameter key for a declared name within a component.
pub fn parameter_key(prefix: &str, declared_name: &str) -> String {
    let canonical = canonical_name(declared_name);
    format!("{}{}", prefix, PeakKind::internal_name(&canonical))
}

fn default_vary() -> bool {
    true
}

/// A declared parameter: value, free/fixed flag and optional bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: f64,
    #[serde(default = "default_vary")]
    pub vary: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl NamedValue {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            vary: true,
            min: None,
            max: None,
        }
    }

    pub fn fixed(name: &str, value: f64) -> Self {
        Self::new(name, value).with_vary(false)
    }

    pub fn with_vary(mut self, vary: bool) -> Self {
        self.vary = vary;
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundSpec {
    pub kind: BackgroundKind,
    pub params: Vec<NamedValue>,
}

impl BackgroundSpec {
    pub fn new(kind: BackgroundKind, params: Vec<NamedValue>) -> Self {
        Self { kind, params }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakSpec {
    pub kind: PeakKind,
    pub params: Vec<NamedValue>,
}

impl PeakSpec {
    pub fn new(kind: PeakKind, params: Vec<NamedValue>) -> Self {
        Self { kind, params }
    }
}

/// The caller's declaration of a composite model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub background: BackgroundSpec,
    pub peaks: Vec<PeakSpec>,
}

impl ModelSpec {
    pub fn new(background: BackgroundSpec) -> Self {
        Self {
            background,
            peaks: Vec::new(),
        }
    }

    pub fn with_peak(mut self, peak: PeakSpec) -> Self {
        self.peaks.push(peak);
        self
    }

    /// Components paired with their prefixes, background first
    pub fn components(&self) -> Vec<(ComponentKind, String, &[NamedValue])> {
        let mut out = Vec::with_capacity(self.peaks.len() + 1);
        out.push((
            ComponentKind::Background(self.background.kind),
            BACKGROUND_PREFIX.to_string(),
            self.background.params.as_slice(),
        ));
        for (i, peak) in self.peaks.iter().enumerate() {
            out.push((ComponentKind::Peak(peak.kind), peak_prefix(i), peak.params.as_slice()));
        }
        out
    }
}

/// Where a component's parameters live in the shared parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSlot {
    pub kind: ComponentKind,
    pub prefix: String,
    pub offset: usize,
}

impl ComponentSlot {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.kind.parameter_count()
    }
}

/// Background plus peaks over one shared, namespaced parameter set.
#[derive(Debug, Clone)]
pub struct CompositeModel {
    spec: ModelSpec,
    parameters: Parameters,
    components: Vec<ComponentSlot>,
}

impl CompositeModel {
    /// Build the composite model and its parameters from a declaration.
    ///
    /// Every canonical parameter of every component must be declared exactly
    /// once. Names are matched case-insensitively. Missing, unknown or
    /// duplicate names and invalid bounds are configuration errors.
    pub fn build(spec: &ModelSpec) -> Result<Self> {
        let mut parameters = Parameters::new();
        let mut components = Vec::with_capacity(spec.peaks.len() + 1);

        for (kind, prefix, declared) in spec.components() {
            let offset = parameters.len();
            add_component(&mut parameters, kind, &prefix, declared)?;
            components.push(ComponentSlot {
                kind,
                prefix,
                offset,
            });
        }

        debug!(
            "built composite model: {} components, {} parameters ({} varying)",
            components.len(),
            parameters.len(),
            parameters.varying().len()
        );

        Ok(Self {
            spec: spec.clone(),
            parameters,
            components,
        })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub fn components(&self) -> &[ComponentSlot] {
        &self.components
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn varying_count(&self) -> usize {
        self.parameters.varying_indices().len()
    }

    /// Evaluate the summed model with `values` in parameter order.
    pub fn evaluate(&self, values: &[f64], x: &Array1<f64>) -> Result<Array1<f64>> {
        if values.len() != self.parameters.len() {
            return Err(PeakFitError::DimensionMismatch(format!(
                "Expected {} parameter values, got {}",
                self.parameters.len(),
                values.len()
            )));
        }

        let mut y = Array1::zeros(x.len());
        for slot in &self.components {
            slot.kind.eval_into(x, &values[slot.range()], &mut y);
        }
        Ok(y)
    }

    /// Evaluate one component on its own
    pub fn evaluate_component(
        &self,
        index: usize,
        values: &[f64],
        x: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        let slot = self.components.get(index).ok_or_else(|| {
            PeakFitError::InvalidInput(format!("no component at index {}", index))
        })?;
        if values.len() != self.parameters.len() {
            return Err(PeakFitError::DimensionMismatch(format!(
                "Expected {} parameter values, got {}",
                self.parameters.len(),
                values.len()
            )));
        }
        let mut y = Array1::zeros(x.len());
        slot.kind.eval_into(x, &values[slot.range()], &mut y);
        Ok(y)
    }

    /// Evaluate with the current parameter values
    pub fn evaluate_current(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        self.evaluate(&self.parameters.values(), x)
    }
}

fn user_names(kind: ComponentKind) -> &'static [&'static str] {
    match kind {
        ComponentKind::Background(k) => k.parameter_names(),
        ComponentKind::Peak(k) => k.parameter_names(),
    }
}

fn describe(kind: ComponentKind, prefix: &str) -> String {
    match kind {
        ComponentKind::Background(k) => format!("{} background", k.name()),
        ComponentKind::Peak(k) => format!("{} peak '{}'", k.name(), prefix.trim_end_matches('_')),
    }
}

fn add_component(
    parameters: &mut Parameters,
    kind: ComponentKind,
    prefix: &str,
    declared: &[NamedValue],
) -> Result<()> {
    let names = user_names(kind);
    let context = describe(kind, prefix);

    let mut by_name: HashMap<String, &NamedValue> = HashMap::with_capacity(declared.len());
    for value in declared {
        let key = canonical_name(&value.name);
        if !names.contains(&key.as_str()) {
            return Err(PeakFitError::Config(format!(
                "unknown parameter '{}' for {}; expected one of {:?}",
                value.name, context, names
            )));
        }
        if by_name.insert(key, value).is_some() {
            return Err(PeakFitError::Config(format!(
                "parameter '{}' declared more than once for {}",
                value.name, context
            )));
        }
    }

    for (&name, &internal) in names.iter().zip(kind.internal_names()) {
        let entry = by_name.get(name).ok_or_else(|| {
            PeakFitError::Config(format!("missing parameter '{}' for {}", name, context))
        })?;

        let (value, min, max) = match kind {
            ComponentKind::Peak(peak) if name == "fwhm" => (
                peak.sigma_from_fwhm(entry.value),
                peak.sigma_bound_from_fwhm(entry.min),
                peak.sigma_bound_from_fwhm(entry.max),
            ),
            _ => (entry.value, entry.min, entry.max),
        };

        let key = format!("{}{}", prefix, internal);
        let mut param = Parameter::with_bounds(
            &key,
            value,
            min.unwrap_or(NEG_INFINITY),
            max.unwrap_or(INFINITY),
        )
        .map_err(|e| PeakFitError::Config(format!("{} of {}: {}", name, context, e)))?;
        if param.value() != value {
            warn!(
                "initial value {} of '{}' is outside its bounds; clamped to {}",
                value,
                key,
                param.value()
            );
        }
        param.set_vary(entry.vary);

        parameters
            .add(param)
            .map_err(|e| PeakFitError::Config(e.to_string()))?;
    }

    Ok(())
}
