//! Mapping fitted parameters back to the declared, user-facing form.
//!
//! Output follows the declaration: the same components in the same order,
//! each parameter under the name the caller used. Peak widths are reported
//! as FWHM again, with the standard error scaled by the same factor.

use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};
use crate::model::{canonical_name, parameter_key, ModelSpec};
use crate::models::ComponentKind;
use crate::parameters::Parameters;

/// One fitted parameter as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterOutput {
    pub name: String,
    pub value: f64,
    /// Standard error; absent for fixed parameters and degenerate fits
    pub error: Option<f64>,
    pub vary: bool,
}

/// A background or peak with its fitted parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentOutput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<usize>,
    pub parameters: Vec<ParameterOutput>,
}

impl ComponentOutput {
    /// Look up a parameter by its declared name
    pub fn get(&self, name: &str) -> Option<&ParameterOutput> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Structured fit result: one background and the peaks in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutput {
    pub background: ComponentOutput,
    pub peaks: Vec<ComponentOutput>,
}

/// Project the current `parameters` onto the shape of `spec`.
pub fn project(spec: &ModelSpec, parameters: &Parameters) -> Result<FitOutput> {
    let components = spec
        .components()
        .into_iter()
        .map(|(kind, prefix, declared)| -> Result<ComponentOutput> {
            let outputs = declared
                .iter()
                .map(|entry| -> Result<ParameterOutput> {
                    let param = parameters.require(&parameter_key(&prefix, &entry.name))?;
                    let (value, error) = match kind {
                        ComponentKind::Peak(peak) if canonical_name(&entry.name) == "fwhm" => (
                            peak.fwhm_from_sigma(param.value()),
                            param.stderr().map(|e| peak.fwhm_from_sigma(e)),
                        ),
                        _ => (param.value(), param.stderr()),
                    };
                    Ok(ParameterOutput {
                        name: entry.name.clone(),
                        value,
                        error,
                        vary: param.vary(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let degree = match kind {
                ComponentKind::Background(background) => background.degree(),
                ComponentKind::Peak(_) => None,
            };
            Ok(ComponentOutput {
                kind: kind.type_name().to_string(),
                degree,
                parameters: outputs,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut components = components.into_iter();
    let background = components
        .next()
        .ok_or_else(|| PeakFitError::InvalidState("model has no background".to_string()))?;
    Ok(FitOutput {
        background,
        peaks: components.collect(),
    })
}
