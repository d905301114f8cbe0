//! Progress reporting and cooperative cancellation

use std::sync::{Arc, Mutex};

use peakfit_rs::fit::{FitEngine, FitState, ProgressSnapshot};
use peakfit_rs::lm::ConvergenceStatus;
use peakfit_rs::{CompositeModel, LmConfig};

use crate::test_helpers::{single_gaussian_spec, synthetic_pattern, TruePeak};

/// Never converges on tolerance, so only a stop ends the run early
fn slow_config() -> LmConfig {
    LmConfig {
        ftol: 0.0,
        xtol: 0.0,
        gtol: 0.0,
        ..LmConfig::default()
    }
}

fn slow_engine() -> FitEngine {
    let model = CompositeModel::build(&single_gaussian_spec(3.0, 2.6, 1.2)).unwrap();
    FitEngine::with_config(model, slow_config())
}

#[test]
fn test_stop_requested_from_sink() {
    let pattern = synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.5)], 0.1, 21);
    let mut engine = slow_engine();
    let stop = engine.stop_handle();
    engine.add_sink(Box::new(move |snapshot: &ProgressSnapshot| {
        if snapshot.iteration == 3 {
            stop.request_stop();
        }
        std::ops::ControlFlow::Continue(())
    }));

    let result = engine.run(&pattern).unwrap();
    assert_eq!(result.state, FitState::Cancelled);
    assert_eq!(engine.state(), FitState::Cancelled);
    assert_eq!(result.status, ConvergenceStatus::Aborted);
    assert!(!result.success);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.message, "Fit stopped by request after 3 iterations");
    assert!(result.covariance.is_none());
    assert!(result.parameters.iter().all(|p| p.stderr().is_none()));
    assert_eq!(result.residuals.len(), pattern.len());
}

#[test]
fn test_sink_break_cancels() {
    let pattern = synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.5)], 0.1, 22);
    let mut engine = slow_engine();
    engine.add_sink(Box::new(|snapshot: &ProgressSnapshot| {
        if snapshot.iteration >= 2 {
            std::ops::ControlFlow::Break(())
        } else {
            std::ops::ControlFlow::Continue(())
        }
    }));

    let result = engine.run(&pattern).unwrap();
    assert_eq!(result.state, FitState::Cancelled);
    assert_eq!(result.iterations, 2);
}

#[test]
fn test_cancelled_result_keeps_best_parameters() {
    let pattern = synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.5)], 0.1, 23);
    let mut engine = slow_engine();
    let stop = engine.stop_handle();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    engine.add_sink(Box::new(move |snapshot: &ProgressSnapshot| {
        record.lock().unwrap().push(snapshot.chi2);
        if snapshot.iteration == 4 {
            stop.request_stop();
        }
        std::ops::ControlFlow::Continue(())
    }));

    let result = engine.run(&pattern).unwrap();
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    assert_eq!(result.chi2, seen[4]);
    assert!(result.chi2 < seen[0]);
}

#[test]
fn test_snapshots_share_the_final_shape() {
    let pattern = synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.5)], 0.1, 24);
    let model = CompositeModel::build(&single_gaussian_spec(8.0, 2.15, 0.6)).unwrap();
    let mut engine = FitEngine::new(model);
    let snapshots = Arc::new(Mutex::new(Vec::<ProgressSnapshot>::new()));
    let record = Arc::clone(&snapshots);
    engine.add_sink(Box::new(move |snapshot: &ProgressSnapshot| {
        record.lock().unwrap().push(snapshot.clone());
        std::ops::ControlFlow::Continue(())
    }));

    let result = engine.run(&pattern).unwrap();
    assert!(result.success, "{}", result.message);

    let snapshots = snapshots.lock().unwrap();
    assert!(!snapshots.is_empty());
    for (i, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.iteration, i);
        assert_eq!(snapshot.residuals.len(), pattern.len());
        assert_eq!(snapshot.result.peaks.len(), result.output.peaks.len());
        assert_eq!(snapshot.result.background.kind, result.output.background.kind);
        for (a, b) in snapshot.result.peaks.iter().zip(&result.output.peaks) {
            assert_eq!(a.kind, b.kind);
            let names_a: Vec<&str> = a.parameters.iter().map(|p| p.name.as_str()).collect();
            let names_b: Vec<&str> = b.parameters.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names_a, names_b);
        }
    }

    let last = engine.progress_slot().latest().unwrap();
    assert_eq!(last.iteration, snapshots.len() - 1);
}

#[test]
fn test_mid_run_stop_from_sink_across_noise_seeds() {
    for seed in 0..30 {
        let pattern =
            synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.5)], 0.1, 100 + seed);
        // Poor guess: wide, weak and off center
        let model = CompositeModel::build(&single_gaussian_spec(2.0, 3.0, 2.0)).unwrap();
        let mut engine = FitEngine::with_config(model, slow_config());
        let stop = engine.stop_handle();
        let seen = Arc::new(Mutex::new(0usize));
        let count = Arc::clone(&seen);
        engine.add_sink(Box::new(move |snapshot: &ProgressSnapshot| {
            *count.lock().unwrap() += 1;
            if snapshot.iteration == 3 {
                stop.request_stop();
            }
            std::ops::ControlFlow::Continue(())
        }));

        let result = engine.run(&pattern).unwrap();
        assert_eq!(result.state, FitState::Cancelled, "seed {}: {}", seed, result.message);
        assert!(!result.success);
        assert_eq!(result.iterations, 3, "seed {}", seed);
        assert_eq!(*seen.lock().unwrap(), 4, "seed {}", seed);
        assert!(result.chi2.is_finite());
    }
}
