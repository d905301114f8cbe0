//! The fit engine: one composite model, one run.
//!
//! [`FitEngine::run`] drives the Levenberg-Marquardt solver over the varying
//! parameters of a [`CompositeModel`]. At every iteration boundary it
//! publishes a [`ProgressSnapshot`] and checks the stop flag. Whatever the
//! solver outcome, a run that starts produces a [`FitResult`].

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PeakFitError, Result};
use crate::lm::{ConvergenceStatus, IterationState, LevenbergMarquardt, LmConfig};
use crate::model::CompositeModel;
use crate::parameters::Parameters;
use crate::pattern::Pattern;
use crate::uncertainty::Uncertainty;
use crate::utils::finite_difference;

use super::objective::ModelObjective;
use super::progress::{reduced_chi_square, ProgressSink, ProgressSlot, ProgressSnapshot, StopHandle};
use super::projection::{project, FitOutput};

/// Lifecycle of a [`FitEngine`]: `Idle -> Running -> {Succeeded, Failed, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl FitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FitState::Succeeded | FitState::Failed | FitState::Cancelled)
    }
}

/// Terminal outcome of one fit run.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub success: bool,
    pub message: String,
    pub state: FitState,
    /// Why the solver stopped
    pub status: ConvergenceStatus,
    /// Fitted values; `stderr` is set for varying parameters when the
    /// covariance could be estimated
    pub parameters: Parameters,
    /// Fitted values in the declared shape
    pub output: FitOutput,
    pub chi2: f64,
    pub red_chi2: f64,
    pub nfev: usize,
    pub iterations: usize,
    /// `y - model` at the fitted parameters
    pub residuals: Array1<f64>,
    /// Covariance of the varying parameters, in parameter order
    pub covariance: Option<Array2<f64>>,
    pub correlation: Option<Array2<f64>>,
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Result ({:?}):", self.state)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  chi2: {:.6e}  red_chi2: {:.6e}", self.chi2, self.red_chi2)?;
        writeln!(f, "  Iterations: {}  nfev: {}", self.iterations, self.nfev)?;
        for param in self.parameters.iter() {
            match param.stderr() {
                Some(err) => writeln!(f, "  {:<16} {:>14.6e} +/- {:.3e}", param.name(), param.value(), err)?,
                None => writeln!(f, "  {:<16} {:>14.6e}", param.name(), param.value())?,
            }
        }
        Ok(())
    }
}

/// Runs a single fit of one composite model.
pub struct FitEngine {
    model: CompositeModel,
    config: LmConfig,
    state: FitState,
    stop: StopHandle,
    progress: ProgressSlot,
    sinks: Vec<Box<dyn ProgressSink + Send>>,
}

impl fmt::Debug for FitEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitEngine")
            .field("state", &self.state)
            .field("parameters", &self.model.parameter_count())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FitEngine {
    pub fn new(model: CompositeModel) -> Self {
        Self::with_config(model, LmConfig::default())
    }

    pub fn with_config(model: CompositeModel, config: LmConfig) -> Self {
        Self {
            model,
            config,
            state: FitState::Idle,
            stop: StopHandle::new(),
            progress: ProgressSlot::new(),
            sinks: Vec::new(),
        }
    }

    /// Use an externally owned stop flag.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Publish snapshots into an externally owned slot.
    pub fn with_progress_slot(mut self, progress: ProgressSlot) -> Self {
        self.progress = progress;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn progress_slot(&self) -> ProgressSlot {
        self.progress.clone()
    }

    /// Register a subscriber that receives every snapshot.
    pub fn add_sink(&mut self, sink: Box<dyn ProgressSink + Send>) {
        self.sinks.push(sink);
    }

    pub fn state(&self) -> FitState {
        self.state
    }

    pub fn model(&self) -> &CompositeModel {
        &self.model
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Fit the model to `pattern`.
    ///
    /// Errors only when the engine has already been run or the run cannot
    /// start; solver failures and cancellation are reported in the result.
    pub fn run(&mut self, pattern: &Pattern) -> Result<FitResult> {
        if self.state != FitState::Idle {
            return Err(PeakFitError::InvalidState(format!(
                "fit engine has already been run (state: {:?})",
                self.state
            )));
        }
        self.state = FitState::Running;

        let outcome = self.solve(pattern);
        if outcome.is_err() {
            self.state = FitState::Failed;
        }
        outcome
    }

    fn solve(&mut self, pattern: &Pattern) -> Result<FitResult> {
        let n_points = pattern.len();
        info!(
            "starting fit: {} points, {} parameters ({} varying)",
            n_points,
            self.model.parameter_count(),
            self.model.varying_count()
        );

        let start = Array1::from_vec(self.model.parameters().varying_internal_values()?);

        let solver = LevenbergMarquardt::with_config(self.config.clone());
        let objective = ModelObjective::new(&self.model, pattern);
        let mut stopped = false;
        let mut snapshot_error = None;

        let outcome = solver.minimize_with_observer(&objective, start, |state: &IterationState<'_>| {
            let snapshot = match snapshot_at(&self.model, state, n_points) {
                Ok(snapshot) => Arc::new(snapshot),
                Err(e) => {
                    snapshot_error = Some(e);
                    return ControlFlow::Break(());
                }
            };
            debug!(
                "iteration {}: chi2 = {:.6e}, nfev = {}",
                snapshot.iteration, snapshot.chi2, snapshot.nfev
            );
            self.progress.publish(Arc::clone(&snapshot));

            let mut halt = false;
            for sink in self.sinks.iter_mut() {
                halt |= sink.on_progress(&snapshot).is_break();
            }
            if halt || self.stop.is_stop_requested() {
                stopped = true;
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        });

        if let Some(e) = snapshot_error {
            return Err(e);
        }

        let lm = match outcome {
            Ok(lm) => lm,
            Err(e) => return self.failed_result(pattern, e),
        };

        self.model
            .parameters_mut()
            .update_from_internal(&lm.params.to_vec())?;

        let state = if stopped {
            FitState::Cancelled
        } else if lm.success {
            FitState::Succeeded
        } else {
            FitState::Failed
        };

        let chi2 = lm.cost;
        let uncertainty = if state != FitState::Cancelled && chi2.is_finite() {
            self.estimate_uncertainty(pattern, chi2)
        } else {
            None
        };
        let stderrs = uncertainty.as_ref().map(|unc| unc.standard_errors.to_vec());
        self.model
            .parameters_mut()
            .set_varying_stderrs(stderrs.as_deref())?;

        let message = if state == FitState::Cancelled {
            format!("Fit stopped by request after {} iterations", lm.iterations)
        } else {
            lm.message.clone()
        };

        info!(
            "fit finished: {:?} after {} iterations, {} evaluations, chi2 = {:.6e}: {}",
            state, lm.iterations, lm.func_evals, chi2, message
        );

        let (covariance, correlation) = match uncertainty {
            Some(unc) => (Some(unc.covariance), Some(unc.correlation)),
            None => (None, None),
        };
        let result = FitResult {
            success: state == FitState::Succeeded,
            message,
            state,
            status: lm.status,
            parameters: self.model.parameters().clone(),
            output: project(self.model.spec(), self.model.parameters())?,
            chi2,
            red_chi2: reduced_chi_square(chi2, n_points),
            nfev: lm.func_evals,
            iterations: lm.iterations,
            residuals: lm.residuals,
            covariance,
            correlation,
        };
        self.state = state;
        Ok(result)
    }

    /// Covariance from the Jacobian w.r.t. the external varying values.
    fn estimate_uncertainty(&self, pattern: &Pattern, chi2: f64) -> Option<Uncertainty> {
        let n_varying = self.model.varying_count();
        if n_varying == 0 {
            return None;
        }

        let external = ModelObjective::new(&self.model, pattern).external();
        let jacobian = match finite_difference::jacobian(
            &external,
            &external.current(),
            Some(self.config.diff_step()),
        ) {
            Ok(jac) => jac,
            Err(e) => {
                warn!("could not estimate standard errors: {}", e);
                return None;
            }
        };

        let uncertainty = Uncertainty::estimate(&jacobian, chi2, pattern.len());
        if uncertainty.is_none() {
            warn!(
                "could not estimate standard errors: covariance is singular or undefined \
                 ({} points, {} varying parameters)",
                pattern.len(),
                n_varying
            );
        }
        uncertainty
    }

    /// Result for a solver that errored out; the starting values are kept.
    fn failed_result(&mut self, pattern: &Pattern, error: PeakFitError) -> Result<FitResult> {
        warn!("fit failed: {}", error);
        self.state = FitState::Failed;

        let objective = ModelObjective::new(&self.model, pattern);
        let residuals = objective
            .residuals(&self.model.parameters().values())
            .unwrap_or_else(|_| Array1::from_elem(pattern.len(), f64::NAN));
        let chi2 = residuals.iter().map(|r| r * r).sum::<f64>();

        Ok(FitResult {
            success: false,
            message: error.to_string(),
            state: FitState::Failed,
            status: ConvergenceStatus::NumericalError,
            parameters: self.model.parameters().clone(),
            output: project(self.model.spec(), self.model.parameters())?,
            chi2,
            red_chi2: reduced_chi_square(chi2, pattern.len()),
            nfev: 0,
            iterations: 0,
            residuals,
            covariance: None,
            correlation: None,
        })
    }
}

/// Project the solver's current point into a snapshot.
fn snapshot_at(
    model: &CompositeModel,
    state: &IterationState<'_>,
    n_points: usize,
) -> Result<ProgressSnapshot> {
    let mut parameters = model.parameters().clone();
    parameters.update_from_internal(&state.params.to_vec())?;
    Ok(ProgressSnapshot {
        iteration: state.iteration,
        nfev: state.nfev,
        residuals: state.residuals.to_vec(),
        chi2: state.cost,
        red_chi2: reduced_chi_square(state.cost, n_points),
        result: project(model.spec(), &parameters)?,
    })
}
