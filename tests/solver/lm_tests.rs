//! Levenberg-Marquardt behaviour independent of the peak models

use std::ops::ControlFlow;

use approx::assert_relative_eq;
use ndarray::{array, Array1, Array2};
use peakfit_rs::lm::{ConvergenceStatus, LevenbergMarquardt, LmConfig};
use peakfit_rs::{PeakFitError, Problem, Result};

/// Rosenbrock's function written as residuals: `[10 (y - x^2), 1 - x]`
struct Rosenbrock;

impl Problem for Rosenbrock {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let (x, y) = (params[0], params[1]);
        Ok(array![10.0 * (y - x * x), 1.0 - x])
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        2
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        Ok(array![[-20.0 * params[0], 10.0], [-1.0, 0.0]])
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}

/// Sum of two exponentials, a classic badly-scaled problem
struct DoubleExponential {
    t: Array1<f64>,
    y: Array1<f64>,
}

impl DoubleExponential {
    fn new() -> Self {
        let t: Array1<f64> = Array1::linspace(0.0, 8.0, 60);
        let y = t.mapv(|t| 5.0 * (-0.4 * t).exp() + 2.0 * (-3.0 * t).exp());
        Self { t, y }
    }
}

impl Problem for DoubleExponential {
    fn eval(&self, p: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(&self.y - &self.t.mapv(|t| p[0] * (-p[1] * t).exp() + p[2] * (-p[3] * t).exp()))
    }

    fn parameter_count(&self) -> usize {
        4
    }

    fn residual_count(&self) -> usize {
        self.t.len()
    }
}

#[test]
fn test_rosenbrock_with_analytic_jacobian() {
    let result = LevenbergMarquardt::new()
        .minimize(&Rosenbrock, array![-1.2, 1.0])
        .unwrap();

    assert!(result.success, "{}", result.message);
    assert_relative_eq!(result.params[0], 1.0, epsilon = 1e-6);
    assert_relative_eq!(result.params[1], 1.0, epsilon = 1e-6);
}

#[test]
fn test_double_exponential() {
    let problem = DoubleExponential::new();
    let result = LevenbergMarquardt::new()
        .minimize(&problem, array![4.0, 0.5, 1.0, 2.0])
        .unwrap();

    assert!(result.success, "{}", result.message);
    assert_relative_eq!(result.params[0], 5.0, epsilon = 1e-5);
    assert_relative_eq!(result.params[1], 0.4, epsilon = 1e-6);
    assert_relative_eq!(result.params[2], 2.0, epsilon = 1e-5);
    assert_relative_eq!(result.params[3], 3.0, epsilon = 1e-5);
}

#[test]
fn test_serial_and_parallel_jacobians_agree() {
    let problem = DoubleExponential::new();
    let start = array![4.0, 0.5, 1.0, 2.0];
    let serial = LevenbergMarquardt::new()
        .with_parallel_jacobian(false)
        .minimize(&problem, start.clone())
        .unwrap();
    let parallel = LevenbergMarquardt::new()
        .with_parallel_jacobian(true)
        .minimize(&problem, start)
        .unwrap();

    assert_eq!(serial.iterations, parallel.iterations);
    assert_eq!(serial.func_evals, parallel.func_evals);
    assert_eq!(serial.params, parallel.params);
}

#[test]
fn test_config_from_json() {
    let config: LmConfig = serde_json::from_str(r#"{"max_nfev": 7, "parallel_jacobian": false}"#).unwrap();
    let result = LevenbergMarquardt::with_config(config)
        .minimize(&DoubleExponential::new(), array![4.0, 0.5, 1.0, 2.0])
        .unwrap();

    assert_eq!(result.status, ConvergenceStatus::MaxEvaluationsReached);
    assert!(result.func_evals <= 7);
}

#[test]
fn test_observer_receives_monotone_costs_until_break() {
    let problem = DoubleExponential::new();
    let mut costs = Vec::new();
    let result = LevenbergMarquardt::new()
        .minimize_with_observer(&problem, array![4.0, 0.5, 1.0, 2.0], |state| {
            assert_eq!(state.iteration, costs.len());
            costs.push(state.cost);
            if costs.len() == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

    assert_eq!(result.status, ConvergenceStatus::Aborted);
    assert_eq!(costs.len(), 4);
    assert!(costs.windows(2).all(|w| w[1] <= w[0]));
    assert_eq!(result.cost, costs[3]);
}

#[test]
fn test_problem_errors_propagate() {
    struct Broken;

    impl Problem for Broken {
        fn eval(&self, _params: &Array1<f64>) -> Result<Array1<f64>> {
            Err(PeakFitError::InvalidInput("no data".to_string()))
        }

        fn parameter_count(&self) -> usize {
            1
        }

        fn residual_count(&self) -> usize {
            1
        }
    }

    let err = LevenbergMarquardt::new().minimize(&Broken, array![1.0]).unwrap_err();
    assert!(matches!(err, PeakFitError::InvalidInput(_)));
}
