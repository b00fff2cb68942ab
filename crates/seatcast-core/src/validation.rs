//! Expanding-window temporal cross-validation
//!
//! Backtests any forecast function against held-out future windows: the
//! training window grows by `step` each fold while the test window
//! slides forward, preserving chronological causality. Folds whose
//! forecast is entirely non-finite are skipped and counted, not scored
//! as zero; a run where every fold fails is an explicit error.

use crate::error::{ForecastError, Result};
use crate::metrics::{mae, mape, rmse};
use std::ops::Range;
use tracing::warn;

/// One train/test index split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Generate expanding-window folds over a series of length `n`
///
/// Fold `k` trains on `[0, min_train_size + k * step)` and tests on the
/// next `horizon` indices; folds continue while the test window fits.
pub fn expanding_window_split(
    n: usize,
    min_train_size: usize,
    horizon: usize,
    step: usize,
) -> Result<Vec<Fold>> {
    if min_train_size == 0 {
        return Err(ForecastError::InvalidParameter {
            name: "min_train_size".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if horizon == 0 {
        return Err(ForecastError::InvalidParameter {
            name: "horizon".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if step == 0 {
        return Err(ForecastError::InvalidParameter {
            name: "step".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if n < min_train_size + horizon {
        return Err(ForecastError::InsufficientData {
            required: min_train_size + horizon,
            actual: n,
        });
    }

    let mut folds = Vec::new();
    let mut train_end = min_train_size;
    while train_end + horizon <= n {
        folds.push(Fold {
            train: 0..train_end,
            test: train_end..train_end + horizon,
        });
        train_end += step;
    }
    Ok(folds)
}

/// One fold's held-out scores
#[derive(Debug, Clone, PartialEq)]
pub struct FoldScore {
    pub fold: usize,
    pub train_size: usize,
    pub mae: f64,
    pub rmse: f64,
    pub mape: Option<f64>,
}

/// Aggregated cross-validation results
#[derive(Debug, Clone, PartialEq)]
pub struct CvReport {
    pub scores: Vec<FoldScore>,
    pub skipped_folds: usize,
    pub mae_mean: f64,
    pub mae_std: f64,
    pub rmse_mean: f64,
    pub rmse_std: f64,
    /// Mean MAPE over folds where it was defined
    pub mape_mean: Option<f64>,
}

/// Score a forecast function across expanding-window folds
///
/// The function receives the training slice and the horizon and returns
/// its point forecasts; it is expected to degrade to NaN rather than
/// panic.
pub fn cross_validate<F>(
    series: &[f64],
    min_train_size: usize,
    horizon: usize,
    step: usize,
    forecast: F,
) -> Result<CvReport>
where
    F: Fn(&[f64], usize) -> Vec<f64>,
{
    let folds = expanding_window_split(series.len(), min_train_size, horizon, step)?;
    let attempted = folds.len();

    let mut scores = Vec::new();
    let mut skipped = 0usize;
    for (index, fold) in folds.iter().enumerate() {
        let predicted = forecast(&series[fold.train.clone()], horizon);
        let usable = predicted.len() == horizon && predicted.iter().any(|v| v.is_finite());
        if !usable {
            warn!(fold = index, "fold skipped, forecast produced no finite values");
            skipped += 1;
            continue;
        }
        let actual = &series[fold.test.clone()];
        scores.push(FoldScore {
            fold: index,
            train_size: fold.train.len(),
            mae: mae(actual, &predicted),
            rmse: rmse(actual, &predicted),
            mape: mape(actual, &predicted),
        });
    }

    if scores.is_empty() {
        return Err(ForecastError::AllFoldsFailed { attempted });
    }

    let (mae_mean, mae_std) = mean_std(scores.iter().map(|s| s.mae));
    let (rmse_mean, rmse_std) = mean_std(scores.iter().map(|s| s.rmse));
    let defined_mapes: Vec<f64> = scores.iter().filter_map(|s| s.mape).collect();
    let mape_mean = if defined_mapes.is_empty() {
        None
    } else {
        Some(defined_mapes.iter().sum::<f64>() / defined_mapes.len() as f64)
    };

    Ok(CvReport {
        scores,
        skipped_folds: skipped,
        mae_mean,
        mae_std,
        rmse_mean,
        rmse_std,
        mape_mean,
    })
}

/// Population mean and standard deviation
fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let collected: Vec<f64> = values.collect();
    let n = collected.len() as f64;
    let mean = collected.iter().sum::<f64>() / n;
    let variance = collected.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_counts_and_train_sizes() {
        let folds = expanding_window_split(20, 8, 1, 1).unwrap();
        assert_eq!(folds.len(), 12);
        for (k, fold) in folds.iter().enumerate() {
            assert_eq!(fold.train.len(), 8 + k);
            assert_eq!(fold.test.start, fold.train.end);
            assert_eq!(fold.test.len(), 1);
        }
    }

    #[test]
    fn test_split_with_wider_step_and_horizon() {
        let folds = expanding_window_split(20, 8, 2, 2).unwrap();
        let train_ends: Vec<usize> = folds.iter().map(|f| f.train.end).collect();
        assert_eq!(train_ends, vec![8, 10, 12, 14, 16, 18]);
    }

    #[test]
    fn test_split_insufficient_data_is_explicit() {
        let result = expanding_window_split(8, 8, 1, 1);
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientData {
                required: 9,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_split_rejects_zero_step() {
        assert!(expanding_window_split(20, 8, 1, 0).is_err());
        assert!(expanding_window_split(20, 0, 1, 1).is_err());
        assert!(expanding_window_split(20, 8, 0, 1).is_err());
    }

    #[test]
    fn test_cross_validate_perfect_forecaster() {
        let series: Vec<f64> = (0..15).map(|i| 10.0 + i as f64).collect();
        // Extends the exact line, so every fold scores zero error.
        let report = cross_validate(&series, 8, 1, 1, |train, horizon| {
            let last = train[train.len() - 1];
            (1..=horizon).map(|h| last + h as f64).collect()
        })
        .unwrap();

        assert_eq!(report.scores.len(), 7);
        assert_eq!(report.skipped_folds, 0);
        assert!(report.mae_mean.abs() < 1e-12);
        assert!(report.rmse_mean.abs() < 1e-12);
        assert_eq!(report.mape_mean, Some(0.0));
    }

    #[test]
    fn test_cross_validate_skips_nan_folds() {
        let series: Vec<f64> = (0..12).map(|i| i as f64 + 1.0).collect();
        let report = cross_validate(&series, 8, 1, 1, |train, horizon| {
            if train.len() % 2 == 0 {
                vec![f64::NAN; horizon]
            } else {
                vec![train[train.len() - 1] + 1.0; horizon]
            }
        })
        .unwrap();

        assert_eq!(report.skipped_folds, 2);
        assert_eq!(report.scores.len(), 2);
        assert!(report.scores.iter().all(|s| s.train_size % 2 == 1));
    }

    #[test]
    fn test_cross_validate_all_folds_failed() {
        let series: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let result = cross_validate(&series, 8, 1, 1, |_, horizon| vec![f64::NAN; horizon]);
        assert!(matches!(
            result,
            Err(ForecastError::AllFoldsFailed { attempted: 4 })
        ));
    }

    #[test]
    fn test_cross_validate_std_is_population() {
        // Two folds with errors 1 and 3: mean 2, population std 1.
        let series = vec![0.0, 0.0, 0.0, 0.0, 10.0, 12.0];
        let report = cross_validate(&series, 4, 1, 1, |_, _| vec![9.0]).unwrap();
        assert_eq!(report.scores.len(), 2);
        assert!((report.mae_mean - 2.0).abs() < 1e-12);
        assert!((report.mae_std - 1.0).abs() < 1e-12);
    }
}
