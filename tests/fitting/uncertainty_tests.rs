//! Standard errors and covariance of fitted parameters

use approx::assert_relative_eq;
use ndarray::Array1;
use peakfit_rs::fit::{fit, FitState};
use peakfit_rs::model::ModelSpec;
use peakfit_rs::models::PeakKind;

use crate::test_helpers::{
    linear_background, peak_spec, single_gaussian_spec, synthetic_pattern, x_grid, TruePeak,
};

#[test]
fn test_straight_line_errors_match_least_squares() {
    let pattern = synthetic_pattern(1.0, 0.2, &[], 0.1, 31);
    let result = fit(&ModelSpec::new(linear_background(0.5, 0.0)), &pattern).unwrap();
    assert!(result.success, "{}", result.message);

    // cov = s^2 (X^T X)^-1 with s^2 = chi2 / (n - 2)
    let x: Array1<f64> = x_grid();
    let n = x.len() as f64;
    let sx = x.sum();
    let sxx = x.mapv(|v| v * v).sum();
    let det = n * sxx - sx * sx;
    let s2 = result.chi2 / (n - 2.0);
    let intercept_err = (s2 * sxx / det).sqrt();
    let slope_err = (s2 * n / det).sqrt();

    let background = &result.output.background;
    assert_relative_eq!(
        background.get("intercept").unwrap().error.unwrap(),
        intercept_err,
        max_relative = 1e-4
    );
    assert_relative_eq!(
        background.get("slope").unwrap().error.unwrap(),
        slope_err,
        max_relative = 1e-4
    );
}

#[test]
fn test_peak_errors_are_reported_in_fwhm_units() {
    let pattern = synthetic_pattern(1.0, 0.2, &[TruePeak::gaussian(10.0, 2.0, 0.5)], 0.1, 32);
    let result = fit(&single_gaussian_spec(8.0, 2.15, 0.6), &pattern).unwrap();
    assert!(result.success, "{}", result.message);

    let sigma_err = result.parameters.get("p0_sigma").unwrap().stderr().unwrap();
    let fwhm_err = result.output.peaks[0].get("fwhm").unwrap().error.unwrap();
    assert_relative_eq!(
        fwhm_err,
        PeakKind::Gaussian.fwhm_from_sigma(sigma_err),
        max_relative = 1e-12
    );

    for param in result.output.peaks[0].parameters.iter() {
        let err = param.error.unwrap();
        assert!(err > 0.0 && err < 0.1, "{} error {}", param.name, err);
    }

    let correlation = result.correlation.unwrap();
    assert_eq!(correlation.dim(), (5, 5));
    for i in 0..5 {
        assert_relative_eq!(correlation[[i, i]], 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_singular_covariance_leaves_errors_unset() {
    // A peak far outside the data contributes exactly zero columns
    let pattern = synthetic_pattern(1.0, 0.2, &[], 0.1, 33);
    let spec = ModelSpec::new(linear_background(0.8, 0.1))
        .with_peak(peak_spec(PeakKind::Gaussian, 5.0, 100.0, 0.5));
    let result = fit(&spec, &pattern).unwrap();

    assert_eq!(result.state, FitState::Succeeded, "{}", result.message);
    assert!(result.covariance.is_none());
    assert!(result.parameters.iter().all(|p| p.stderr().is_none()));
    assert!(result
        .output
        .background
        .parameters
        .iter()
        .all(|p| p.error.is_none()));
}
