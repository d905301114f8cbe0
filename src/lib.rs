//! # peakfit-rs
//!
//! `peakfit-rs` fits a smooth background plus a sum of Gaussian, Lorentzian
//! and Pseudo-Voigt peaks to a 1-D pattern with a bounded
//! Levenberg-Marquardt solver.
//!
//! The library provides:
//! - A namespaced parameter system with bounds, fixed parameters and standard errors
//! - Component models and a composite model built from a declarative [`ModelSpec`]
//! - A Levenberg-Marquardt solver with per-iteration observation and early stop
//! - A fit engine with progress snapshots, cooperative cancellation and
//!   covariance-based uncertainties
//! - JSON request/response types and a session that runs fits on a worker thread
//!
//! ## Basic Usage
//!
//! ```
//! use ndarray::Array1;
//! use peakfit_rs::model::{BackgroundSpec, ModelSpec, NamedValue, PeakSpec};
//! use peakfit_rs::models::{BackgroundKind, PeakKind};
//! use peakfit_rs::shapes::gaussian;
//! use peakfit_rs::{fit, Pattern};
//!
//! let x = Array1::linspace(0.0, 10.0, 201);
//! let sigma = PeakKind::Gaussian.sigma_from_fwhm(1.0);
//! let y = x.mapv(|x| 0.5 + gaussian(x, 8.0, 5.0, sigma));
//! let pattern = Pattern::new(x, y).unwrap();
//!
//! let spec = ModelSpec::new(BackgroundSpec::new(
//!     BackgroundKind::Linear,
//!     vec![NamedValue::new("intercept", 0.0), NamedValue::fixed("slope", 0.0)],
//! ))
//! .with_peak(PeakSpec::new(
//!     PeakKind::Gaussian,
//!     vec![
//!         NamedValue::new("amplitude", 6.0).with_bounds(Some(0.0), None),
//!         NamedValue::new("center", 5.2),
//!         NamedValue::new("fwhm", 1.2).with_bounds(Some(0.05), None),
//!     ],
//! ));
//!
//! let result = fit::fit(&spec, &pattern).unwrap();
//! assert!(result.success);
//! let fwhm = result.output.peaks[0].get("fwhm").unwrap().value;
//! assert!((fwhm - 1.0).abs() < 1e-4);
//! ```

pub mod error;
pub mod fit;
pub mod lm;
pub mod model;
pub mod models;
pub mod parameters;
pub mod pattern;
pub mod problem;
pub mod request;
pub mod shapes;
pub mod uncertainty;
pub mod utils;

// Re-exports for convenience
pub use error::{PeakFitError, Result};
pub use fit::{FitEngine, FitResult, FitSession, FitState};
pub use lm::{LevenbergMarquardt, LmConfig};
pub use model::{CompositeModel, ModelSpec};
pub use pattern::Pattern;
pub use problem::Problem;
pub use request::{FitRequest, FitResponse, ProgressEvent};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
