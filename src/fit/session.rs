//! Running fits off the caller's thread.
//!
//! A [`FitSession`] validates a request on the calling thread, so a
//! malformed request is rejected before any work starts, and then runs the
//! fit on a dedicated worker thread. The returned [`FitHandle`] is the
//! promise for the response. While the fit runs, the session exposes the
//! latest progress snapshot and accepts stop requests.
//!
//! A session runs one fit at a time. Independent sessions share nothing.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::debug;

use crate::error::{PeakFitError, Result};
use crate::lm::LmConfig;
use crate::request::{FitRequest, FitResponse};

use super::engine::{FitEngine, FitResult};
use super::progress::{ProgressSlot, ProgressSnapshot, StopHandle};

const WORKER_NAME: &str = "peakfit-worker";

/// Shared view of the fit a session is running.
#[derive(Debug, Clone)]
struct ActiveFit {
    stop: StopHandle,
    progress: ProgressSlot,
    finished: Arc<AtomicBool>,
}

impl ActiveFit {
    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Marks the fit finished when the worker exits, panics included.
struct FinishedGuard(Arc<AtomicBool>);

impl Drop for FinishedGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Accepts fit requests and runs them one at a time on a worker thread.
#[derive(Debug, Default)]
pub struct FitSession {
    config: LmConfig,
    current: Mutex<Option<ActiveFit>>,
}

impl FitSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session whose fits use the given solver settings.
    pub fn with_config(config: LmConfig) -> Self {
        Self {
            config,
            current: Mutex::new(None),
        }
    }

    /// Validate `request` and start fitting it.
    ///
    /// Fails with a configuration error for a malformed request and with
    /// [`PeakFitError::InvalidState`] while another fit is still running.
    pub fn submit_fit(&self, request: &FitRequest) -> Result<FitHandle> {
        let (pattern, model) = request.validate()?;

        let mut current = self.lock();
        if current.as_ref().is_some_and(|active| !active.is_finished()) {
            return Err(PeakFitError::InvalidState(
                "a fit is already running in this session".to_string(),
            ));
        }

        let active = ActiveFit {
            stop: StopHandle::new(),
            progress: ProgressSlot::new(),
            finished: Arc::new(AtomicBool::new(false)),
        };
        let mut engine = FitEngine::with_config(model, self.config.clone())
            .with_stop_handle(active.stop.clone())
            .with_progress_slot(active.progress.clone());

        let guard = FinishedGuard(Arc::clone(&active.finished));
        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let _guard = guard;
                engine.run(&pattern)
            })?;
        debug!("submitted fit with {} points", request.pattern.x.len());

        *current = Some(active.clone());
        Ok(FitHandle { worker, active })
    }

    /// Ask the running fit to stop at its next iteration boundary.
    ///
    /// Returns false if no fit is running.
    pub fn request_stop(&self) -> bool {
        match self.lock().as_ref() {
            Some(active) if !active.is_finished() => {
                active.stop.request_stop();
                true
            }
            _ => false,
        }
    }

    /// Most recent snapshot of the current (or last) fit.
    pub fn latest_progress(&self) -> Option<Arc<ProgressSnapshot>> {
        self.lock().as_ref().and_then(|active| active.progress.latest())
    }

    pub fn is_busy(&self) -> bool {
        self.lock().as_ref().is_some_and(|active| !active.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveFit>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a fit running on a worker thread.
#[derive(Debug)]
pub struct FitHandle {
    worker: JoinHandle<Result<FitResult>>,
    active: ActiveFit,
}

impl FitHandle {
    /// Block until the fit finishes and return the full result.
    pub fn join(self) -> Result<FitResult> {
        match self.worker.join() {
            Ok(result) => result,
            Err(payload) => Err(PeakFitError::WorkerPanicked(panic_message(payload.as_ref()))),
        }
    }

    /// Block until the fit finishes and return its wire response.
    pub fn wait(self) -> Result<FitResponse> {
        self.join().map(|result| FitResponse::from(&result))
    }

    pub fn is_finished(&self) -> bool {
        self.active.is_finished()
    }

    pub fn request_stop(&self) {
        self.active.stop.request_stop();
    }

    pub fn latest_progress(&self) -> Option<Arc<ProgressSnapshot>> {
        self.active.progress.latest()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
