//! Forecast run configuration
//!
//! A plain value object passed into the core entry points. Callers own
//! persistence; the core never reads ambient state.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Parameters shared by the propagation, ratio, and ensemble runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Students per section
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Per-term retention fraction in (0, 1]
    #[serde(default = "default_progression_rate")]
    pub progression_rate: f64,
    /// Uniform demand buffer percentage
    #[serde(default)]
    pub buffer_percent: f64,
    /// Fallback target/feeder ratio when history has no qualifying pairs
    #[serde(default = "default_ratio")]
    pub default_ratio: f64,
    /// How many quarters ahead a statistical run projects
    #[serde(default = "default_quarters_to_forecast")]
    pub quarters_to_forecast: usize,
    /// Term label used when a caller does not name one
    #[serde(default = "default_term")]
    pub default_term: String,
}

fn default_capacity() -> u32 {
    20
}

fn default_progression_rate() -> f64 {
    0.95
}

fn default_ratio() -> f64 {
    0.12
}

fn default_quarters_to_forecast() -> usize {
    2
}

fn default_term() -> String {
    "Spring 2026".to_string()
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            capacity: default_capacity(),
            progression_rate: default_progression_rate(),
            buffer_percent: 0.0,
            default_ratio: default_ratio(),
            quarters_to_forecast: default_quarters_to_forecast(),
            default_term: default_term(),
        }
    }
}

impl ForecastConfig {
    /// Check value ranges before a run
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.progression_rate > 0.0 && self.progression_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter {
                name: "progression_rate".to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }
        if !self.buffer_percent.is_finite() || self.buffer_percent < 0.0 {
            return Err(ForecastError::InvalidParameter {
                name: "buffer_percent".to_string(),
                reason: "must be a non-negative number".to_string(),
            });
        }
        if !self.default_ratio.is_finite() || self.default_ratio < 0.0 {
            return Err(ForecastError::InvalidParameter {
                name: "default_ratio".to_string(),
                reason: "must be a non-negative number".to_string(),
            });
        }
        Ok(())
    }

    /// Demand multiplier from the buffer percentage
    pub fn buffer_multiplier(&self) -> f64 {
        1.0 + self.buffer_percent / 100.0
    }
}
