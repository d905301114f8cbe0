//! Tests for building composite models from declarations

use std::collections::HashSet;

use peakfit_rs::model::{BackgroundSpec, CompositeModel, ModelSpec, NamedValue};
use peakfit_rs::models::{BackgroundKind, PeakKind};
use peakfit_rs::{FitRequest, PeakFitError};

use crate::test_helpers::{linear_background, peak_spec};

fn polynomial(degree: usize) -> BackgroundSpec {
    let params = (0..=degree)
        .map(|i| NamedValue::new(&format!("c{}", i), 0.1 * i as f64))
        .collect();
    BackgroundSpec::new(BackgroundKind::polynomial(degree).unwrap(), params)
}

#[test]
fn test_background_parameter_counts() {
    let cases = [
        (linear_background(1.0, 0.0), 2),
        (
            BackgroundSpec::new(
                BackgroundKind::Quadratic,
                vec![
                    NamedValue::new("a", 0.0),
                    NamedValue::new("b", 0.0),
                    NamedValue::new("c", 1.0),
                ],
            ),
            3,
        ),
        (polynomial(0), 1),
        (polynomial(3), 4),
        (polynomial(7), 8),
    ];

    for (background, expected) in cases {
        let model = CompositeModel::build(&ModelSpec::new(background)).unwrap();
        assert_eq!(model.parameter_count(), expected);
    }
}

#[test]
fn test_polynomial_degree_six_names() {
    let model = CompositeModel::build(&ModelSpec::new(polynomial(6))).unwrap();
    let expected: Vec<String> = (0..=6).map(|i| format!("bkg_c{}", i)).collect();
    assert_eq!(model.parameters().names(), expected);
}

#[test]
fn test_polynomial_degree_limit() {
    let err = BackgroundKind::polynomial(8).unwrap_err();
    assert!(matches!(err, PeakFitError::Config(_)));
}

#[test]
fn test_total_count_and_unique_names() {
    let spec = ModelSpec::new(linear_background(1.0, 0.1))
        .with_peak(peak_spec(PeakKind::Gaussian, 5.0, 2.0, 0.5))
        .with_peak(peak_spec(PeakKind::Lorentzian, 5.0, 4.0, 0.5))
        .with_peak(peak_spec(PeakKind::PseudoVoigt, 5.0, 6.0, 0.5))
        .with_peak(peak_spec(PeakKind::Gaussian, 5.0, 8.0, 0.5));
    let model = CompositeModel::build(&spec).unwrap();

    // 2 + 3 + 3 + 4 + 3
    assert_eq!(model.parameter_count(), 15);
    assert_eq!(model.varying_count(), 15);

    let names = model.parameters().names();
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len());
    assert!(names.contains(&"p2_fraction"));
    assert!(names.contains(&"p3_sigma"));
}

#[test]
fn test_vary_flags_pass_through() {
    let mut peak = peak_spec(PeakKind::Gaussian, 5.0, 2.0, 0.5);
    peak.params[2] = NamedValue::fixed("fwhm", 0.5);
    let model = CompositeModel::build(&ModelSpec::new(linear_background(1.0, 0.0)).with_peak(peak))
        .unwrap();

    assert!(!model.parameters().get("p0_sigma").unwrap().vary());
    assert!(model.parameters().get("p0_center").unwrap().vary());
    assert_eq!(model.varying_count(), 4);
}

#[test]
fn test_unknown_types_are_config_errors() {
    let json = |background: &str, peak: &str| {
        format!(
            r#"{{"pattern": {{"x": [0.0, 1.0], "y": [1.0, 2.0]}},
                "background": {{"type": "{}", "parameters": [
                    {{"name": "intercept", "value": 1.0}}, {{"name": "slope", "value": 0.0}}]}},
                "peaks": [{{"type": "{}", "parameters": [
                    {{"name": "amplitude", "value": 1.0}}, {{"name": "center", "value": 0.5}},
                    {{"name": "fwhm", "value": 0.2}}]}}]}}"#,
            background, peak
        )
    };

    let ok = FitRequest::from_json(&json("Linear", "GAUSSIAN")).unwrap();
    assert!(ok.validate().is_ok());

    let err = FitRequest::from_json(&json("spline", "gaussian"))
        .unwrap()
        .validate()
        .unwrap_err();
    assert!(matches!(err, PeakFitError::Config(ref m) if m == "unknown background type: spline"));

    let err = FitRequest::from_json(&json("linear", "voigt"))
        .unwrap()
        .validate()
        .unwrap_err();
    assert!(matches!(err, PeakFitError::Config(ref m) if m == "unknown peak type: voigt"));
}

#[test]
fn test_names_are_case_insensitive_with_aliases() {
    let mut spec = ModelSpec::new(BackgroundSpec::new(
        BackgroundKind::Linear,
        vec![NamedValue::new("INTERCEPT", 1.0), NamedValue::new("Slope", 0.0)],
    ))
    .with_peak(peak_spec(PeakKind::PseudoVoigt, 1.0, 2.0, 0.3));
    spec.peaks[0].params[1].name = "Position".to_string();
    spec.peaks[0].params[3].name = "eta".to_string();

    let model = CompositeModel::build(&spec).unwrap();
    assert_eq!(model.parameters().get("p0_center").unwrap().value(), 2.0);
    assert_eq!(model.parameters().get("p0_fraction").unwrap().value(), 0.5);
}
