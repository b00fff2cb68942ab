//! Model adapters with degrade-gracefully fallback chains
//!
//! Each adapter owns an ordered list of candidate strategies, tried in
//! sequence until one fits and produces a fully finite forecast; the
//! historical mean is always last. Adapters never error: a series too
//! short for any strategy comes back as NaN, the explicit
//! "no forecast possible" signal the ensemble combiner understands.

use crate::calendar::TermCode;
use crate::error::Result;
use crate::models::{
    Arima, HoltLinear, HoltWinters, MeanForecast, Predictor, SeasonalTrend, Trend,
    QUARTERS_PER_YEAR,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Level smoothing default for the smoothing strategies
const DEFAULT_ALPHA: f64 = 0.3;
/// Trend smoothing default
const DEFAULT_BETA: f64 = 0.1;
/// Seasonal smoothing default
const DEFAULT_GAMMA: f64 = 0.2;

// ============================================================================
// Model identity
// ============================================================================

/// The three named models the ensemble blends
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Seasonal trend decomposition
    Prophet,
    /// Exponential smoothing family
    Ets,
    /// ARIMA family
    Arima,
}

impl ModelKind {
    /// All models, in ensemble weight order
    pub fn all() -> [ModelKind; 3] {
        [ModelKind::Prophet, ModelKind::Ets, ModelKind::Arima]
    }

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Prophet => "prophet",
            ModelKind::Ets => "ets",
            ModelKind::Arima => "arima",
        }
    }

    pub fn from_name(name: &str) -> Option<ModelKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "prophet" => Some(ModelKind::Prophet),
            "ets" => Some(ModelKind::Ets),
            "arima" => Some(ModelKind::Arima),
            _ => None,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Fallback chains
// ============================================================================

type StrategyBuilder = fn() -> Result<Box<dyn Predictor>>;

fn seasonal_trend() -> Result<Box<dyn Predictor>> {
    Ok(Box::new(SeasonalTrend::new(QUARTERS_PER_YEAR)?))
}

fn trend() -> Result<Box<dyn Predictor>> {
    Ok(Box::new(Trend::new()))
}

fn holt_winters() -> Result<Box<dyn Predictor>> {
    Ok(Box::new(HoltWinters::new(
        DEFAULT_ALPHA,
        DEFAULT_BETA,
        DEFAULT_GAMMA,
        QUARTERS_PER_YEAR,
    )?))
}

fn holt_linear() -> Result<Box<dyn Predictor>> {
    Ok(Box::new(HoltLinear::new(DEFAULT_ALPHA, DEFAULT_BETA)?))
}

fn arima_111() -> Result<Box<dyn Predictor>> {
    Ok(Box::new(Arima::new(1, 1, 1)?))
}

fn arima_110() -> Result<Box<dyn Predictor>> {
    Ok(Box::new(Arima::new(1, 1, 0)?))
}

fn arima_011() -> Result<Box<dyn Predictor>> {
    Ok(Box::new(Arima::new(0, 1, 1)?))
}

fn mean() -> Result<Box<dyn Predictor>> {
    Ok(Box::new(MeanForecast::new()))
}

fn strategies(kind: ModelKind) -> &'static [(&'static str, StrategyBuilder)] {
    match kind {
        ModelKind::Prophet => &[
            ("seasonal_trend", seasonal_trend),
            ("trend", trend),
            ("mean", mean),
        ],
        ModelKind::Ets => &[
            ("holt_winters", holt_winters),
            ("holt", holt_linear),
            ("mean", mean),
        ],
        ModelKind::Arima => &[
            ("arima(1,1,1)", arima_111),
            ("arima(1,1,0)", arima_110),
            ("arima(0,1,1)", arima_011),
            ("mean", mean),
        ],
    }
}

// ============================================================================
// Forecast entry points
// ============================================================================

/// Collapse (term, value) observations into a chronologically sorted series
pub fn series_from_terms(observations: &[(TermCode, f64)]) -> Vec<f64> {
    let mut sorted = observations.to_vec();
    sorted.sort_by_key(|(term, _)| *term);
    sorted.into_iter().map(|(_, value)| value).collect()
}

/// Forecast `periods` steps ahead with one model's fallback chain
///
/// Non-finite observations are dropped before fitting. Fewer than two
/// usable observations, or failure of every strategy, yields all NaN.
pub fn forecast_with(kind: ModelKind, series: &[f64], periods: usize) -> Vec<f64> {
    if periods == 0 {
        return Vec::new();
    }
    let clean: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    if clean.len() < 2 {
        return vec![f64::NAN; periods];
    }

    for (label, build) in strategies(kind) {
        match try_strategy(*build, &clean, periods) {
            Ok(forecast) => return forecast,
            Err(err) => {
                debug!(model = kind.name(), strategy = label, error = %err, "strategy failed");
            }
        }
    }
    vec![f64::NAN; periods]
}

fn try_strategy(build: StrategyBuilder, series: &[f64], periods: usize) -> Result<Vec<f64>> {
    let mut model = build()?;
    model.fit(series)?;
    let forecast = model.predict(periods)?;
    if forecast.len() != periods || forecast.iter().any(|v| !v.is_finite()) {
        return Err(crate::error::ForecastError::NumericalError(
            "strategy produced a non-finite forecast".to_string(),
        ));
    }
    Ok(forecast)
}
