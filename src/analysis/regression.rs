use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Minimum number of points a line can be fitted through.
pub const MIN_FIT_POINTS: usize = 2;

/// Simple linear model `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regressor {
    pub slope: f64,
    pub intercept: f64,
}

impl Regressor {
    /// Closed-form ordinary least squares fit.
    ///
    /// Fails with `InsufficientData` for fewer than two points, mismatched
    /// inputs, or when every x is identical (the slope would be 0/0).
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len().min(y.len());
        if x.len() != y.len() || n < MIN_FIT_POINTS {
            return Err(EngineError::InsufficientData {
                required: MIN_FIT_POINTS,
                actual: n,
            });
        }

        let x_mean = x.iter().sum::<f64>() / n as f64;
        let y_mean = y.iter().sum::<f64>() / n as f64;

        let mut num = 0.0;
        let mut den = 0.0;
        for (xi, yi) in x.iter().zip(y) {
            let dx = xi - x_mean;
            num += dx * (yi - y_mean);
            den += dx * dx;
        }

        if den == 0.0 {
            // Distinct x values are what actually count here.
            return Err(EngineError::InsufficientData {
                required: MIN_FIT_POINTS,
                actual: 1,
            });
        }

        let slope = num / den;
        Ok(Regressor {
            slope,
            intercept: y_mean - slope * x_mean,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        x * self.slope + self.intercept
    }

    /// Applies the line pointwise.
    pub fn evaluate(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.predict(xi)).collect()
    }
}

/// Coefficient of determination as the dashboard reports it.
///
/// The residual term is the usual `Σ(ŷ - y)²`, but the total term is built
/// from the predictions, `Σ(ŷ - ȳ)²`, rather than from the observations.
/// For noisy data this is not the textbook R².
///
/// Returns `NaN` for empty or mismatched inputs and when the total term is 0.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (y, y_hat) in actual.iter().zip(predicted) {
        ss_res += (y_hat - y).powi(2);
        ss_tot += (y_hat - mean).powi(2);
    }

    if ss_tot == 0.0 {
        return f64::NAN;
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_exact_line() {
        let reg = Regressor::fit(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!((reg.slope - 2.0).abs() < 1e-9);
        assert!(reg.intercept.abs() < 1e-9);

        let y = reg.evaluate(&[4.0, 5.0]);
        assert!((y[0] - 8.0).abs() < 1e-9);
        assert!((y[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_large_ordinals() {
        // Quarterly ordinals are in the 200000 range; centering keeps this exact enough.
        let x = [202001.0, 202002.0, 202003.0, 202004.0];
        let y = [10.0, 12.0, 14.0, 16.0];
        let reg = Regressor::fit(&x, &y).unwrap();
        assert!((reg.slope - 2.0).abs() < 1e-6);
        assert!((reg.predict(202005.0) - 18.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_single_point_is_insufficient() {
        let err = Regressor::fit(&[2020.0], &[1.0]).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_fit_rejects_degenerate_inputs() {
        assert!(Regressor::fit(&[], &[]).unwrap_err().is_insufficient_data());
        assert!(Regressor::fit(&[1.0, 2.0], &[1.0]).unwrap_err().is_insufficient_data());
        // Same x twice: zero variance
        assert!(Regressor::fit(&[5.0, 5.0], &[1.0, 3.0]).unwrap_err().is_insufficient_data());
    }

    #[test]
    fn test_r2_perfect_fit() {
        let actual = [2.0, 4.0, 6.0];
        assert!((r2_score(&actual, &actual) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_r2_uses_predictions_in_total_sum() {
        // Current behavior, not textbook R² (which would be 0.25 here).
        let x = [1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 2.0];
        let reg = Regressor::fit(&x, &y).unwrap();
        let y_hat = reg.evaluate(&x);
        assert!((r2_score(&y, &y_hat) - (-2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_r2_flat_prediction_is_nan() {
        assert!(r2_score(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]).is_nan());
        assert!(r2_score(&[], &[]).is_nan());
    }
}
