//! Fitting a composite model to a pattern.
//!
//! - [`FitEngine`]: one blocking run with progress snapshots and cooperative
//!   cancellation
//! - [`FitSession`]: the same on a worker thread, one fit at a time
//! - [`project`]: fitted parameters in the declared, user-facing shape

pub mod engine;
pub mod objective;
pub mod progress;
pub mod projection;
pub mod session;

pub use engine::{FitEngine, FitResult, FitState};
pub use objective::{ExternalObjective, ModelObjective};
pub use progress::{reduced_chi_square, ProgressSink, ProgressSlot, ProgressSnapshot, StopHandle};
pub use projection::{project, ComponentOutput, FitOutput, ParameterOutput};
pub use session::{FitHandle, FitSession};

use crate::error::Result;
use crate::model::{CompositeModel, ModelSpec};
use crate::pattern::Pattern;

/// Build the model for `spec` and fit it to `pattern` with default settings.
pub fn fit(spec: &ModelSpec, pattern: &Pattern) -> Result<FitResult> {
    FitEngine::new(CompositeModel::build(spec)?).run(pattern)
}
