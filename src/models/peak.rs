//! Peak components built on the line shapes in [`crate::shapes`].

use ndarray::Array1;

use crate::shapes::PeakKind;

impl PeakKind {
    /// User-facing parameter names, in declaration order
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            PeakKind::Gaussian | PeakKind::Lorentzian => &["amplitude", "center", "fwhm"],
            PeakKind::PseudoVoigt => &["amplitude", "center", "fwhm", "fraction"],
        }
    }

    /// Solver-side parameter names: `fwhm` is carried as `sigma`
    pub fn internal_names(&self) -> &'static [&'static str] {
        match self {
            PeakKind::Gaussian | PeakKind::Lorentzian => &["amplitude", "center", "sigma"],
            PeakKind::PseudoVoigt => &["amplitude", "center", "sigma", "fraction"],
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.internal_names().len()
    }

    /// Map a user-facing name to its solver-side name
    pub fn internal_name(name: &str) -> &str {
        if name == "fwhm" {
            "sigma"
        } else {
            name
        }
    }

    /// Add the peak curve to `out`, with `values` in
    /// [`internal_names`](Self::internal_names) order.
    pub fn eval_into(&self, x: &Array1<f64>, values: &[f64], out: &mut Array1<f64>) {
        let (amplitude, center, sigma) = (values[0], values[1], values[2]);
        let fraction = values.get(3).copied().unwrap_or(0.0);
        out.zip_mut_with(x, |y, &xv| {
            *y += self.evaluate(xv, amplitude, center, sigma, fraction);
        });
    }
}
