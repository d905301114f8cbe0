//! Damping control for the Levenberg-Marquardt algorithm.
//!
//! Uses the gain-ratio update of Nielsen (1999): on an accepted step lambda
//! shrinks by `max(1/3, 1 - (2 rho - 1)^3)`, on a rejected step it grows by a
//! factor that doubles with every consecutive rejection.

/// Trust region implementation for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone)]
pub struct TrustRegion {
    /// Current value of the damping parameter
    pub lambda: f64,

    /// Minimum allowed value for the damping parameter
    pub lambda_min: f64,

    /// Maximum allowed value for the damping parameter
    pub lambda_max: f64,

    /// Growth factor applied on the next rejection
    nu: f64,
}

impl Default for TrustRegion {
    fn default() -> Self {
        Self::new(1e-3, 1e-12, 1e16)
    }
}

impl TrustRegion {
    pub fn new(lambda: f64, lambda_min: f64, lambda_max: f64) -> Self {
        Self {
            lambda,
            lambda_min,
            lambda_max,
            nu: 2.0,
        }
    }

    /// Updates the damping parameter based on the gain ratio.
    ///
    /// Returns true if the step is accepted.
    pub fn update_lambda(&mut self, gain_ratio: f64) -> bool {
        if gain_ratio > 0.0 {
            let shrink = (1.0 - (2.0 * gain_ratio - 1.0).powi(3)).max(1.0 / 3.0);
            self.lambda = (self.lambda * shrink).max(self.lambda_min);
            self.nu = 2.0;
            true
        } else {
            self.increase();
            false
        }
    }

    /// Grow lambda after a rejected or unsolvable step.
    pub fn increase(&mut self) {
        self.lambda = (self.lambda * self.nu).min(self.lambda_max);
        self.nu *= 2.0;
    }

    /// Whether lambda has reached its ceiling
    pub fn is_exhausted(&self) -> bool {
        self.lambda >= self.lambda_max
    }

    /// Calculates the gain ratio between actual and predicted reduction.
    pub fn gain_ratio(current_cost: f64, new_cost: f64, predicted_reduction: f64) -> f64 {
        let actual_reduction = current_cost - new_cost;
        if !new_cost.is_finite() {
            return f64::NEG_INFINITY;
        }
        if predicted_reduction <= 0.0 {
            return if actual_reduction > 0.0 { 1.0 } else { 0.0 };
        }
        actual_reduction / predicted_reduction
    }
}
