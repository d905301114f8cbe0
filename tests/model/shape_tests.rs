//! Tests for the line shapes and FWHM conversions

use approx::assert_relative_eq;
use peakfit_rs::models::PeakKind;

const KINDS: [PeakKind; 3] = [PeakKind::Gaussian, PeakKind::Lorentzian, PeakKind::PseudoVoigt];

#[test]
fn test_fwhm_round_trip() {
    for kind in KINDS {
        for fwhm in [1e-3, 0.2, 1.0, 37.5] {
            let sigma = kind.sigma_from_fwhm(fwhm);
            assert_relative_eq!(kind.fwhm_from_sigma(sigma), fwhm, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_gaussian_factor() {
    assert_relative_eq!(PeakKind::Gaussian.sigma_from_fwhm(2.3548), 1.0, epsilon = 1e-4);
    assert_eq!(PeakKind::Lorentzian.sigma_from_fwhm(1.0), 0.5);
    assert_eq!(PeakKind::PseudoVoigt.sigma_from_fwhm(1.0), 0.5);
}

#[test]
fn test_unbounded_widths_stay_unbounded() {
    for kind in KINDS {
        assert_eq!(kind.sigma_bound_from_fwhm(None), None);
        assert_eq!(
            kind.sigma_bound_from_fwhm(Some(f64::INFINITY)),
            Some(f64::INFINITY)
        );
    }
}

#[test]
fn test_shapes_peak_at_center_and_halve_at_fwhm() {
    for kind in KINDS {
        let fwhm = 0.8;
        let sigma = kind.sigma_from_fwhm(fwhm);
        let top = kind.evaluate(3.0, 2.0, 3.0, sigma, 0.3);
        let half = kind.evaluate(3.0 + fwhm / 2.0, 2.0, 3.0, sigma, 0.3);
        assert!(top > kind.evaluate(3.1, 2.0, 3.0, sigma, 0.3));
        assert_relative_eq!(half / top, 0.5, epsilon = 1e-9);
    }
}

#[test]
fn test_gaussian_is_area_normalized() {
    let dx = 1e-3;
    let kind = PeakKind::Gaussian;
    let sigma = kind.sigma_from_fwhm(0.5);
    let area: f64 = (0..20_000)
        .map(|i| kind.evaluate(-5.0 + i as f64 * dx, 3.0, 5.0, sigma, 0.0) * dx)
        .sum();
    assert_relative_eq!(area, 3.0, epsilon = 1e-6);
}
