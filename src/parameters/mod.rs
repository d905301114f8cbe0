//! # Parameter System
//!
//! Named fit parameters with bounds and free/fixed flags, similar to lmfit-py.
//!
//! - [`Parameter`]: an individual parameter with value, bounds, vary flag and standard error
//! - [`Parameters`]: an insertion-ordered, name-indexed collection
//! - [`Bounds`] and [`BoundsTransform`]: box constraints and the Minuit-style
//!   mapping to unbounded solver coordinates
//!
//! ## Example Usage
//!
//! ```rust
//! use peakfit_rs::parameters::Parameters;
//!
//! let mut params = Parameters::new();
//! params.add_param("bkg_intercept", 1.0).unwrap();
//! params.add_param_with_bounds("p0_sigma", 0.1, 0.0, f64::INFINITY).unwrap();
//! params.get_mut("bkg_intercept").unwrap().set_vary(false);
//!
//! // Only varying parameters reach the solver
//! let internal = params.varying_internal_values().unwrap();
//! assert_eq!(internal.len(), 1);
//! ```

pub mod bounds;
pub mod parameter;
pub mod parameters;

pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use parameter::{Parameter, ParameterError};
pub use parameters::Parameters;
