//! Progress snapshots, their single-slot publication and the stop flag.
//!
//! A running fit publishes one [`ProgressSnapshot`] per solver iteration.
//! Readers on other threads only ever need the most recent one, so the
//! [`ProgressSlot`] holds a single `Arc` that is swapped under a short lock:
//! a reader sees either the previous or the new snapshot, never a mix.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::projection::FitOutput;

/// State of a fit at one iteration boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub iteration: usize,
    pub nfev: usize,
    /// `y - model` at the current parameters
    pub residuals: Vec<f64>,
    pub chi2: f64,
    pub red_chi2: f64,
    /// Current parameters in the declared output shape
    pub result: FitOutput,
}

/// Reduced chi-square as reported to callers: `chi2 / (n - 1)`, or `chi2`
/// for a single point.
pub fn reduced_chi_square(chi2: f64, n_points: usize) -> f64 {
    if n_points > 1 {
        chi2 / (n_points - 1) as f64
    } else {
        chi2
    }
}

/// Latest-snapshot slot shared between a fit and its observers.
#[derive(Debug, Clone, Default)]
pub struct ProgressSlot {
    latest: Arc<Mutex<Option<Arc<ProgressSnapshot>>>>,
}

impl ProgressSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot.
    pub fn publish(&self, snapshot: Arc<ProgressSnapshot>) {
        *self.lock() = Some(snapshot);
    }

    /// Most recent snapshot, if any has been published.
    pub fn latest(&self) -> Option<Arc<ProgressSnapshot>> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    // A panicking publisher cannot leave a half-written Arc behind
    fn lock(&self) -> MutexGuard<'_, Option<Arc<ProgressSnapshot>>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cooperative cancellation flag.
///
/// Checked by the fit once per iteration boundary; a request never
/// interrupts an iteration that is already being computed.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Subscriber to per-iteration snapshots.
///
/// Returning [`ControlFlow::Break`] stops the fit the same way a stop
/// request does.
pub trait ProgressSink {
    fn on_progress(&mut self, snapshot: &ProgressSnapshot) -> ControlFlow<()>;
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressSnapshot) -> ControlFlow<()>,
{
    fn on_progress(&mut self, snapshot: &ProgressSnapshot) -> ControlFlow<()> {
        self(snapshot)
    }
}
