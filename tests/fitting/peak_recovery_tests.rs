//! Recovery of known peaks from noisy synthetic data

use peakfit_rs::fit::{fit, FitEngine, FitState};
use peakfit_rs::model::{CompositeModel, ModelSpec, NamedValue, PeakSpec};
use peakfit_rs::models::PeakKind;

use crate::test_helpers::{
    linear_background, peak_spec, single_gaussian_spec, synthetic_pattern, TruePeak,
};

fn assert_close(actual: f64, expected: f64, tol: f64, what: &str) {
    assert!(
        (actual - expected).abs() < tol,
        "{}: expected {} +/- {}, got {}",
        what,
        expected,
        tol,
        actual
    );
}

#[test]
fn test_single_gaussian() {
    let pattern = synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.5)], 0.1, 7);
    let result = fit(&single_gaussian_spec(8.0, 2.15, 0.6), &pattern).unwrap();

    assert!(result.success, "{}", result.message);
    assert_eq!(result.state, FitState::Succeeded);

    let peak = &result.output.peaks[0];
    assert_close(peak.get("amplitude").unwrap().value, 10.0, 0.1, "amplitude");
    assert_close(peak.get("center").unwrap().value, 2.0, 0.01, "center");
    assert_close(peak.get("fwhm").unwrap().value, 0.5, 0.01, "fwhm");

    let background = &result.output.background;
    assert_close(background.get("intercept").unwrap().value, 1.0, 0.05, "intercept");
    assert_close(background.get("slope").unwrap().value, 0.2, 0.01, "slope");

    // chi2 of pure noise with sigma 0.1 over 501 points is about 5
    assert!(result.chi2 < 7.0, "chi2 = {}", result.chi2);
    assert!(result.red_chi2 > 0.0);
    assert_close(result.red_chi2, result.chi2 / 500.0, 1e-12, "red_chi2");
}

#[test]
fn test_narrow_gaussian_from_unbounded_guess() {
    let spec = ModelSpec::new(linear_background(0.8, 0.1)).with_peak(PeakSpec::new(
        PeakKind::Gaussian,
        vec![
            NamedValue::new("amplitude", 10.5),
            NamedValue::new("center", 2.2),
            NamedValue::new("fwhm", 0.2),
        ],
    ));

    for seed in 0..10 {
        let pattern =
            synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.2)], 0.1, 300 + seed);
        let result = fit(&spec, &pattern).unwrap();
        assert!(result.success, "seed {}: {}", seed, result.message);

        let peak = &result.output.peaks[0];
        assert_close(peak.get("amplitude").unwrap().value, 10.0, 0.1, "amplitude");
        assert_close(peak.get("center").unwrap().value, 2.0, 0.1, "center");
        assert_close(peak.get("fwhm").unwrap().value, 0.2, 0.1, "fwhm");
    }
}

#[test]
fn test_two_gaussians_three_apart() {
    let truth = [TruePeak::gaussian(10.0, 2.0, 1.5), TruePeak::gaussian(7.0, 5.0, 1.5)];
    let pattern = synthetic_pattern(1.0, 0.2, &truth, 0.1, 17);
    let spec = ModelSpec::new(linear_background(0.8, 0.1))
        .with_peak(peak_spec(PeakKind::Gaussian, 9.0, 2.2, 1.3))
        .with_peak(peak_spec(PeakKind::Gaussian, 8.0, 4.8, 1.7));

    let result = fit(&spec, &pattern).unwrap();
    assert!(result.success, "{}", result.message);

    let centers: Vec<f64> = result
        .output
        .peaks
        .iter()
        .map(|p| p.get("center").unwrap().value)
        .collect();
    assert_close(centers[0], 2.0, 0.1, "first center");
    assert_close(centers[1], 5.0, 0.1, "second center");
}

#[test]
fn test_two_overlapping_gaussians() {
    let truth = [TruePeak::gaussian(10.0, 4.0, 0.8), TruePeak::gaussian(6.0, 5.0, 0.8)];
    let pattern = synthetic_pattern(0.5, 0.0, &truth, 0.05, 11);
    let spec = ModelSpec::new(linear_background(0.4, 0.0))
        .with_peak(peak_spec(PeakKind::Gaussian, 9.0, 3.9, 0.9))
        .with_peak(peak_spec(PeakKind::Gaussian, 7.0, 5.1, 0.7));

    let result = fit(&spec, &pattern).unwrap();
    assert!(result.success, "{}", result.message);

    for (peak, expected) in result.output.peaks.iter().zip(truth.iter()) {
        assert_close(peak.get("amplitude").unwrap().value, expected.amplitude, 0.3, "amplitude");
        assert_close(peak.get("center").unwrap().value, expected.center, 0.02, "center");
        assert_close(peak.get("fwhm").unwrap().value, expected.fwhm, 0.03, "fwhm");
    }
}

#[test]
fn test_mixed_peak_kinds() {
    let truth = [
        TruePeak::gaussian(8.0, 2.0, 0.6),
        TruePeak::lorentzian(6.0, 5.0, 0.5),
        TruePeak::pseudo_voigt(7.0, 8.0, 0.7, 0.4),
    ];
    let pattern = synthetic_pattern(1.0, 0.2, &truth, 0.05, 3);
    let spec = ModelSpec::new(linear_background(0.9, 0.15))
        .with_peak(peak_spec(PeakKind::Gaussian, 7.0, 2.05, 0.65))
        .with_peak(peak_spec(PeakKind::Lorentzian, 5.5, 4.95, 0.55))
        .with_peak(peak_spec(PeakKind::PseudoVoigt, 7.5, 8.05, 0.75));

    let result = fit(&spec, &pattern).unwrap();
    assert!(result.success, "{}", result.message);

    let kinds: Vec<&str> = result.output.peaks.iter().map(|p| p.kind.as_str()).collect();
    assert_eq!(kinds, ["gaussian", "lorentzian", "pseudovoigt"]);

    for (peak, expected) in result.output.peaks.iter().zip(truth.iter()) {
        assert_close(peak.get("amplitude").unwrap().value, expected.amplitude, 0.3, "amplitude");
        assert_close(peak.get("center").unwrap().value, expected.center, 0.01, "center");
        assert_close(peak.get("fwhm").unwrap().value, expected.fwhm, 0.03, "fwhm");
    }
    assert_close(result.output.peaks[2].get("fraction").unwrap().value, 0.4, 0.1, "fraction");
}

#[test]
fn test_fixed_parameters_are_untouched() {
    let pattern = synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.5)], 0.1, 5);
    let mut spec = single_gaussian_spec(8.0, 2.1, 0.6);
    spec.background.params[1] = NamedValue::fixed("slope", 0.2);
    spec.peaks[0].params[2] = NamedValue::fixed("fwhm", 0.5);

    let model = CompositeModel::build(&spec).unwrap();
    let sigma_before = model.parameters().get("p0_sigma").unwrap().value();
    let mut engine = FitEngine::new(model);
    let result = engine.run(&pattern).unwrap();
    assert!(result.success, "{}", result.message);

    let slope = result.parameters.get("bkg_slope").unwrap();
    assert_eq!(slope.value(), 0.2);
    assert!(slope.stderr().is_none());
    let sigma = result.parameters.get("p0_sigma").unwrap();
    assert_eq!(sigma.value(), sigma_before);
    assert!(sigma.stderr().is_none());

    let fwhm = result.output.peaks[0].get("fwhm").unwrap();
    assert!(!fwhm.vary);
    assert!(fwhm.error.is_none());
    assert!(result.output.peaks[0].get("center").unwrap().error.is_some());
}

#[test]
fn test_bounded_amplitude_stays_inside_bounds() {
    let pattern = synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.5)], 0.1, 9);
    let mut spec = single_gaussian_spec(8.0, 2.1, 0.6);
    spec.peaks[0].params[0] = NamedValue::new("amplitude", 4.0).with_bounds(Some(0.0), Some(20.0));

    let result = fit(&spec, &pattern).unwrap();
    assert!(result.success, "{}", result.message);
    let amplitude = result.output.peaks[0].get("amplitude").unwrap().value;
    assert!((0.0..=20.0).contains(&amplitude));
    assert_close(amplitude, 10.0, 0.2, "amplitude");
}

#[test]
fn test_start_value_outside_bounds_is_clamped() {
    let mut spec = single_gaussian_spec(8.0, 2.1, 0.6);
    spec.peaks[0].params[0] = NamedValue::new("amplitude", 50.0).with_bounds(Some(0.0), Some(20.0));
    let model = CompositeModel::build(&spec).unwrap();
    assert_eq!(model.parameters().get("p0_amplitude").unwrap().value(), 20.0);
}
