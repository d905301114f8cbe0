//! Levenberg-Marquardt solver for nonlinear least-squares problems.
//!
//! The solver works on any [`Problem`](crate::problem::Problem). Bounds are
//! not handled here: callers map bounded parameters to unbounded internal
//! coordinates first (see [`BoundsTransform`](crate::parameters::BoundsTransform)).

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod trust_region;

pub use algorithm::{IterationState, LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use trust_region::TrustRegion;
