//! Ensemble weight optimization
//!
//! Enumerates the discrete simplex of per-model weights (non-negative
//! multiples of a step summing to one) and scores every combination with
//! the same expanding-window folds, reusing one cached forecast per model
//! per fold. The grid is generated iteratively; ties break toward the
//! first combination enumerated.

use crate::ensemble::{combine, ModelWeights};
use crate::error::{ForecastError, Result};
use crate::metrics::{mae, mape, rmse};
use crate::models::{forecast_with, ModelKind};
use crate::validation::expanding_window_split;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Default lattice spacing for the weight search
pub const DEFAULT_WEIGHT_STEP: f64 = 0.05;

/// Error measure minimized by the search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMetric {
    MAE,
    #[default]
    RMSE,
    MAPE,
}

impl OptimizationMetric {
    pub fn name(self) -> &'static str {
        match self {
            OptimizationMetric::MAE => "mae",
            OptimizationMetric::RMSE => "rmse",
            OptimizationMetric::MAPE => "mape",
        }
    }

    pub fn from_name(name: &str) -> Option<OptimizationMetric> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mae" => Some(OptimizationMetric::MAE),
            "rmse" => Some(OptimizationMetric::RMSE),
            "mape" => Some(OptimizationMetric::MAPE),
            _ => None,
        }
    }

    /// Score one test window; `None` when undefined for this metric
    fn score(self, actual: &[f64], predicted: &[f64]) -> Option<f64> {
        let value = match self {
            OptimizationMetric::MAE => mae(actual, predicted),
            OptimizationMetric::RMSE => rmse(actual, predicted),
            OptimizationMetric::MAPE => return mape(actual, predicted),
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for OptimizationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enumerate every weight triple on the simplex lattice
///
/// All non-negative multiples of `step` summing to 1.0, generated from
/// an integer lattice so the sums are exact. The step must divide 1.0
/// evenly.
pub fn weight_grid(step: f64) -> Result<Vec<ModelWeights>> {
    if !(step > 0.0 && step <= 1.0) {
        return Err(ForecastError::InvalidParameter {
            name: "weight_step".to_string(),
            reason: "must be in (0, 1]".to_string(),
        });
    }
    let units = (1.0 / step).round() as usize;
    if units == 0 || (units as f64 * step - 1.0).abs() > 1e-9 {
        return Err(ForecastError::InvalidParameter {
            name: "weight_step".to_string(),
            reason: "must divide 1.0 evenly".to_string(),
        });
    }

    let mut grid = Vec::new();
    for prophet_units in 0..=units {
        for ets_units in 0..=(units - prophet_units) {
            let arima_units = units - prophet_units - ets_units;
            grid.push(ModelWeights::new(
                prophet_units as f64 / units as f64,
                ets_units as f64 / units as f64,
                arima_units as f64 / units as f64,
            ));
        }
    }
    Ok(grid)
}

/// Result of a weight search
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedWeights {
    pub weights: ModelWeights,
    /// Mean cross-validated error of the winning combination
    pub score: f64,
    pub metric: OptimizationMetric,
    /// Grid combinations enumerated
    pub combinations: usize,
    /// Folds each combination was scored on
    pub folds: usize,
}

/// Find the weight combination minimizing mean cross-validated error
///
/// Model forecasts are computed once per fold and shared across every
/// combination. Fails explicitly when no combination scores on any fold;
/// callers may substitute [`ModelWeights::default`] on that error.
pub fn optimize_weights(
    series: &[f64],
    min_train_size: usize,
    horizon: usize,
    step: usize,
    weight_step: f64,
    metric: OptimizationMetric,
) -> Result<OptimizedWeights> {
    let folds = expanding_window_split(series.len(), min_train_size, horizon, step)?;
    let grid = weight_grid(weight_step)?;

    let cache: BTreeMap<ModelKind, Vec<Vec<f64>>> = ModelKind::all()
        .into_iter()
        .map(|kind| {
            let per_fold = folds
                .iter()
                .map(|fold| forecast_with(kind, &series[fold.train.clone()], horizon))
                .collect();
            (kind, per_fold)
        })
        .collect();

    let mut best: Option<(ModelWeights, f64)> = None;
    for candidate in &grid {
        let mut fold_scores = Vec::new();
        for (fold_index, fold) in folds.iter().enumerate() {
            let combined: Vec<f64> = (0..horizon)
                .map(|h| {
                    let step_predictions: BTreeMap<ModelKind, f64> = cache
                        .iter()
                        .map(|(kind, per_fold)| (*kind, per_fold[fold_index][h]))
                        .collect();
                    combine(&step_predictions, candidate)
                })
                .collect();
            if combined.iter().all(|v| !v.is_finite()) {
                continue;
            }
            if let Some(score) = metric.score(&series[fold.test.clone()], &combined) {
                fold_scores.push(score);
            }
        }
        if fold_scores.is_empty() {
            continue;
        }
        let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
        // Strict comparison keeps the first combination on ties.
        let improved = match best {
            None => true,
            Some((_, best_score)) => mean_score < best_score,
        };
        if improved {
            debug!(
                prophet = candidate.prophet,
                ets = candidate.ets,
                arima = candidate.arima,
                score = mean_score,
                "new best weight combination"
            );
            best = Some((*candidate, mean_score));
        }
    }

    match best {
        Some((weights, score)) => Ok(OptimizedWeights {
            weights,
            score,
            metric,
            combinations: grid.len(),
            folds: folds.len(),
        }),
        None => Err(ForecastError::SearchFailed(format!(
            "no weight combination produced a finite {} on any of {} folds",
            metric,
            folds.len()
        ))),
    }
}
