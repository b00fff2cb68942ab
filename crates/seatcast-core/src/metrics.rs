//! Forecast accuracy metrics
//!
//! Standard error measures used by cross-validation scoring. Length
//! mismatches and empty inputs come back as NaN rather than panicking.

/// Mean Absolute Error (MAE)
///
/// Average absolute difference, in seats. Lower is better.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();
    sum / actual.len() as f64
}

/// Mean Squared Error (MSE)
///
/// Penalizes large misses more heavily. Lower is better.
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    sum / actual.len() as f64
}

/// Root Mean Squared Error (RMSE)
///
/// Square root of MSE, back in seats. Lower is better.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Mean Absolute Percentage Error (MAPE), as a percentage
///
/// Averaged over observations with nonzero actual enrollment; `None`
/// when every actual is zero, since the ratio is undefined there.
pub fn mape(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return None;
    }
    let mut sum = 0.0;
    let mut count = 0usize;
    for (a, p) in actual.iter().zip(predicted.iter()) {
        if a.abs() > 1e-10 {
            sum += ((a - p) / a).abs();
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mae_basic() {
        let actual = vec![10.0, 20.0, 30.0];
        let predicted = vec![12.0, 18.0, 33.0];
        assert!((mae(&actual, &predicted) - 7.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rmse_penalizes_large_errors() {
        let actual = vec![10.0, 10.0];
        let close = vec![11.0, 9.0];
        let spiky = vec![12.0, 10.0];
        assert!((rmse(&actual, &close) - 1.0).abs() < 1e-12);
        assert!(rmse(&actual, &spiky) > rmse(&actual, &close));
    }

    #[test]
    fn test_perfect_forecast_scores_zero() {
        let values = vec![5.0, 6.0, 7.0];
        assert_eq!(mae(&values, &values), 0.0);
        assert_eq!(rmse(&values, &values), 0.0);
        assert_eq!(mape(&values, &values), Some(0.0));
    }

    #[test]
    fn test_length_mismatch_is_nan() {
        assert!(mae(&[1.0, 2.0], &[1.0]).is_nan());
        assert!(mse(&[], &[]).is_nan());
        assert!(mape(&[1.0, 2.0], &[1.0]).is_none());
    }

    #[test]
    fn test_mape_skips_zero_actuals() {
        // Only the nonzero actuals contribute: |100-90|/100 = 10%.
        let actual = vec![0.0, 100.0];
        let predicted = vec![50.0, 90.0];
        let value = mape(&actual, &predicted).unwrap();
        assert!((value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_mape_all_zero_actuals_undefined() {
        assert!(mape(&[0.0, 0.0], &[1.0, 2.0]).is_none());
    }
}
