//! JSON wire types for fit requests, responses and progress events.
//!
//! ```json
//! { "pattern": {"x": [..], "y": [..]},
//!   "background": {"type": "linear", "parameters": [{"name": "intercept", "value": 1.0}, ..]},
//!   "peaks": [{"type": "gaussian", "parameters": [{"name": "amplitude", "value": 10.0}, ..]}] }
//! ```
//!
//! Type names are matched case-insensitively. Everything that can be wrong
//! with a request is detected by [`FitRequest::validate`], before any work is
//! scheduled.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fit::{FitOutput, FitResult, ProgressSnapshot};
use crate::model::{BackgroundSpec, CompositeModel, ModelSpec, NamedValue, PeakSpec};
use crate::models::{BackgroundKind, PeakKind};
use crate::pattern::Pattern;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundRequest {
    #[serde(rename = "type")]
    pub kind: String,
    /// Polynomial degree; inferred from the parameter count when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<usize>,
    #[serde(default)]
    pub parameters: Vec<NamedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parameters: Vec<NamedValue>,
}

/// A complete fit request: the data plus the initial model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRequest {
    pub pattern: PatternData,
    pub background: BackgroundRequest,
    #[serde(default)]
    pub peaks: Vec<PeakRequest>,
}

impl FitRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_pattern(&self) -> Result<Pattern> {
        Pattern::from_vecs(self.pattern.x.clone(), self.pattern.y.clone())
    }

    /// Resolve type names into a [`ModelSpec`].
    pub fn to_model_spec(&self) -> Result<ModelSpec> {
        let background = BackgroundKind::from_type(
            &self.background.kind,
            self.background.degree,
            self.background.parameters.len(),
        )?;
        let mut spec = ModelSpec::new(BackgroundSpec::new(
            background,
            self.background.parameters.clone(),
        ));
        for peak in &self.peaks {
            let kind: PeakKind = peak.kind.parse()?;
            spec = spec.with_peak(PeakSpec::new(kind, peak.parameters.clone()));
        }
        Ok(spec)
    }

    /// Check the whole request and build what a fit needs.
    pub fn validate(&self) -> Result<(Pattern, CompositeModel)> {
        let pattern = self.to_pattern()?;
        let model = CompositeModel::build(&self.to_model_spec()?)?;
        Ok((pattern, model))
    }
}

/// Final answer to a fit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResponse {
    pub success: bool,
    pub message: String,
    pub chi2: f64,
    pub red_chi2: f64,
    pub nfev: usize,
    pub result: FitOutput,
}

impl FitResponse {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&FitResult> for FitResponse {
    fn from(result: &FitResult) -> Self {
        Self {
            success: result.success,
            message: result.message.clone(),
            chi2: result.chi2,
            red_chi2: result.red_chi2,
            nfev: result.nfev,
            result: result.output.clone(),
        }
    }
}

/// Per-iteration progress message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub iter: usize,
    pub resid: Vec<f64>,
    pub chi2: f64,
    pub red_chi2: f64,
    pub result: FitOutput,
}

impl ProgressEvent {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&ProgressSnapshot> for ProgressEvent {
    fn from(snapshot: &ProgressSnapshot) -> Self {
        Self {
            iter: snapshot.iteration,
            resid: snapshot.residuals.clone(),
            chi2: snapshot.chi2,
            red_chi2: snapshot.red_chi2,
            result: snapshot.result.clone(),
        }
    }
}
