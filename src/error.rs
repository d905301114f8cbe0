use thiserror::Error;

/// Error types for the peakfit-rs library.
///
/// Solver outcomes (non-convergence, cancellation) are not errors; they are
/// reported through [`crate::fit::FitResult`]. Errors are reserved for
/// requests that cannot be run at all and for misuse of the API.
#[derive(Error, Debug)]
pub enum PeakFitError {
    /// Malformed request: unknown component type, missing or unknown
    /// parameter name, invalid bounds or an invalid pattern.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for parameter-related problems.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// The model produced non-finite values or otherwise failed to evaluate.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the current state (for example, re-running
    /// a finished engine).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The fit worker thread panicked before producing a result.
    #[error("Fit worker panicked: {0}")]
    WorkerPanicked(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<crate::parameters::parameter::ParameterError> for PeakFitError {
    fn from(err: crate::parameters::parameter::ParameterError) -> Self {
        PeakFitError::ParameterError(format!("{}", err))
    }
}

impl PeakFitError {
    /// Returns true if the error rejects a request before any fitting work.
    pub fn is_config(&self) -> bool {
        matches!(self, PeakFitError::Config(_) | PeakFitError::JsonError(_))
    }
}

/// Result type alias for peakfit-rs operations.
pub type Result<T> = std::result::Result<T, PeakFitError>;
