//! NaN-tolerant ensemble combination
//!
//! Blends the three model adapters' point forecasts by weight. A model
//! that failed to fit contributes NaN and is excluded along with its
//! weight; the remaining weights renormalize to sum to one, so a partial
//! failure reshapes the blend instead of aborting it. Only when every
//! model fails does the combined value become NaN.

use crate::error::{ForecastError, Result};
use crate::models::{forecast_with, ModelKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Default weight for the seasonal trend model
pub const DEFAULT_PROPHET_WEIGHT: f64 = 0.40;
/// Default weight for the exponential smoothing model
pub const DEFAULT_ETS_WEIGHT: f64 = 0.35;
/// Default weight for the ARIMA model
pub const DEFAULT_ARIMA_WEIGHT: f64 = 0.25;

// ============================================================================
// Weights
// ============================================================================

/// Per-model blend weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub prophet: f64,
    pub ets: f64,
    pub arima: f64,
}

impl Default for ModelWeights {
    fn default() -> ModelWeights {
        ModelWeights {
            prophet: DEFAULT_PROPHET_WEIGHT,
            ets: DEFAULT_ETS_WEIGHT,
            arima: DEFAULT_ARIMA_WEIGHT,
        }
    }
}

impl ModelWeights {
    pub fn new(prophet: f64, ets: f64, arima: f64) -> ModelWeights {
        ModelWeights {
            prophet,
            ets,
            arima,
        }
    }

    pub fn get(&self, kind: ModelKind) -> f64 {
        match kind {
            ModelKind::Prophet => self.prophet,
            ModelKind::Ets => self.ets,
            ModelKind::Arima => self.arima,
        }
    }

    /// Weights paired with their models, in model order
    pub fn entries(&self) -> [(ModelKind, f64); 3] {
        [
            (ModelKind::Prophet, self.prophet),
            (ModelKind::Ets, self.ets),
            (ModelKind::Arima, self.arima),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, weight) in self.entries() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ForecastError::InvalidParameter {
                    name: kind.name().to_string(),
                    reason: "weight must be finite and non-negative".to_string(),
                });
            }
        }
        if self.entries().iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
            return Err(ForecastError::InvalidParameter {
                name: "weights".to_string(),
                reason: "at least one weight must be positive".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Combination
// ============================================================================

/// Weighted average over models with a finite prediction and positive weight
///
/// NaN when no model qualifies: the explicit "no forecast possible"
/// signal, never a silent zero.
pub fn combine(predictions: &BTreeMap<ModelKind, f64>, weights: &ModelWeights) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (kind, prediction) in predictions {
        let weight = weights.get(*kind);
        if !prediction.is_finite() || weight <= 0.0 {
            continue;
        }
        weighted_sum += prediction * weight;
        weight_total += weight;
    }
    if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        f64::NAN
    }
}

/// One ensemble run: per-model forecasts plus their blend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleForecast {
    pub predictions: BTreeMap<ModelKind, Vec<f64>>,
    pub combined: Vec<f64>,
    /// Models whose entire forecast came back non-finite
    pub failed_models: Vec<ModelKind>,
}

/// Run all three adapters over a series and blend them stepwise
pub fn ensemble_forecast(series: &[f64], periods: usize, weights: &ModelWeights) -> EnsembleForecast {
    let mut result = EnsembleForecast::default();
    for kind in ModelKind::all() {
        let forecast = forecast_with(kind, series, periods);
        if !forecast.is_empty() && forecast.iter().all(|v| !v.is_finite()) {
            warn!(model = kind.name(), "model produced no finite forecast");
            result.failed_models.push(kind);
        }
        result.predictions.insert(kind, forecast);
    }

    for step in 0..periods {
        let step_predictions: BTreeMap<ModelKind, f64> = result
            .predictions
            .iter()
            .map(|(kind, forecast)| (*kind, forecast[step]))
            .collect();
        result.combined.push(combine(&step_predictions, weights));
    }
    result
}

/// Sections needed for a projected enrollment under buffered capacity
///
/// The buffer holds back a fraction of each section's capacity, so
/// `capacity=20, buffer=10` plans sections of 18 usable seats.
pub fn calculate_sections(enrollment: f64, capacity: u32, buffer_percent: f64) -> u32 {
    if !enrollment.is_finite() || enrollment <= 0.0 || capacity == 0 {
        return 0;
    }
    let effective_capacity = capacity as f64 * (1.0 - buffer_percent / 100.0);
    if effective_capacity <= 0.0 {
        return 0;
    }
    (enrollment / effective_capacity).ceil() as u32
}
