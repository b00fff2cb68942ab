//! Exponential smoothing over quarterly enrollment
//!
//! [`HoltLinear`] tracks level and trend with exponentially decaying
//! weights; [`HoltWinters`] adds additive seasonal components. Additive
//! seasonality only: quarters with zero enrollment are common in this
//! data and break multiplicative seasonal ratios.

use crate::error::{ForecastError, Result};
use crate::models::Predictor;
use serde::{Deserialize, Serialize};

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0 < value && value < 1.0) {
        return Err(ForecastError::InvalidParameter {
            name: name.to_string(),
            reason: "must be between 0 and 1 (exclusive)".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Holt's linear method
// ============================================================================

/// Double exponential smoothing for trending, non-seasonal series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoltLinear {
    /// Level smoothing parameter
    alpha: f64,
    /// Trend smoothing parameter
    beta: f64,
    level: f64,
    trend: f64,
    fitted: bool,
}

impl HoltLinear {
    pub fn new(alpha: f64, beta: f64) -> Result<HoltLinear> {
        check_unit_interval("alpha", alpha)?;
        check_unit_interval("beta", beta)?;
        Ok(HoltLinear {
            alpha,
            beta,
            level: 0.0,
            trend: 0.0,
            fitted: false,
        })
    }

    /// Current (level, trend) estimates
    pub fn components(&self) -> (f64, f64) {
        (self.level, self.trend)
    }
}

impl Predictor for HoltLinear {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        if data.len() < 3 {
            return Err(ForecastError::InsufficientData {
                required: 3,
                actual: data.len(),
            });
        }

        self.level = data[0];
        self.trend = data[1] - data[0];

        for &value in &data[1..] {
            let prev_level = self.level;
            self.level = self.alpha * value + (1.0 - self.alpha) * (self.level + self.trend);
            self.trend = self.beta * (self.level - prev_level) + (1.0 - self.beta) * self.trend;
        }

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::NotFitted);
        }
        Ok((1..=steps)
            .map(|h| self.level + h as f64 * self.trend)
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

// ============================================================================
// Holt-Winters (additive)
// ============================================================================

/// Triple exponential smoothing with additive quarterly seasonality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoltWinters {
    alpha: f64,
    beta: f64,
    /// Seasonal smoothing parameter
    gamma: f64,
    period: usize,
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
    n_obs: usize,
    fitted: bool,
}

impl HoltWinters {
    pub fn new(alpha: f64, beta: f64, gamma: f64, period: usize) -> Result<HoltWinters> {
        check_unit_interval("alpha", alpha)?;
        check_unit_interval("beta", beta)?;
        check_unit_interval("gamma", gamma)?;
        if period < 2 {
            return Err(ForecastError::InvalidParameter {
                name: "period".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        Ok(HoltWinters {
            alpha,
            beta,
            gamma,
            period,
            level: 0.0,
            trend: 0.0,
            seasonal: vec![0.0; period],
            n_obs: 0,
            fitted: false,
        })
    }

    pub fn seasonal_components(&self) -> &[f64] {
        &self.seasonal
    }

    /// Current (level, trend) estimates
    pub fn components(&self) -> (f64, f64) {
        (self.level, self.trend)
    }
}

impl Predictor for HoltWinters {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        let min_required = self.period * 2;
        if data.len() < min_required {
            return Err(ForecastError::InsufficientData {
                required: min_required,
                actual: data.len(),
            });
        }
        self.n_obs = data.len();

        // Level starts at the first cycle's mean, trend at the cycle-over-
        // cycle change, seasonal components at first-cycle deviations.
        let first_cycle: f64 = data[..self.period].iter().sum::<f64>() / self.period as f64;
        let second_cycle: f64 =
            data[self.period..2 * self.period].iter().sum::<f64>() / self.period as f64;
        self.level = first_cycle;
        self.trend = (second_cycle - first_cycle) / self.period as f64;
        for i in 0..self.period {
            self.seasonal[i] = data[i] - self.level;
        }

        for (i, &value) in data.iter().enumerate().skip(self.period) {
            let season_idx = i % self.period;
            let prev_level = self.level;
            let prev_seasonal = self.seasonal[season_idx];

            self.level = self.alpha * (value - prev_seasonal)
                + (1.0 - self.alpha) * (self.level + self.trend);
            self.trend = self.beta * (self.level - prev_level) + (1.0 - self.beta) * self.trend;
            self.seasonal[season_idx] =
                self.gamma * (value - self.level) + (1.0 - self.gamma) * prev_seasonal;
        }

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::NotFitted);
        }
        // Continue the seasonal cycle from where the data ended.
        Ok((1..=steps)
            .map(|h| {
                let season_idx = (self.n_obs + h - 1) % self.period;
                self.level + h as f64 * self.trend + self.seasonal[season_idx]
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_bounds_enforced() {
        assert!(HoltLinear::new(0.0, 0.1).is_err());
        assert!(HoltLinear::new(0.3, 1.0).is_err());
        assert!(HoltWinters::new(0.3, 0.1, 0.2, 1).is_err());
    }

    #[test]
    fn test_holt_tracks_perfect_line() {
        // On an exact line the level update is lossless, so the forecast
        // extends the line exactly.
        let data: Vec<f64> = (0..12).map(|i| 30.0 + 4.0 * i as f64).collect();
        let mut model = HoltLinear::new(0.3, 0.1).unwrap();
        model.fit(&data).unwrap();
        let forecast = model.predict(3).unwrap();
        assert!((forecast[0] - 78.0).abs() < 1e-9);
        assert!((forecast[1] - 82.0).abs() < 1e-9);
        assert!((forecast[2] - 86.0).abs() < 1e-9);
    }

    #[test]
    fn test_holt_needs_three_points() {
        let mut model = HoltLinear::new(0.3, 0.1).unwrap();
        assert!(model.fit(&[10.0, 12.0]).is_err());
    }

    #[test]
    fn test_holt_winters_tracks_stable_seasonal_series() {
        // Constant level plus a centered quarterly shape is a fixed point
        // of the update recursions.
        let shape = [6.0, -2.0, -1.0, -3.0];
        let data: Vec<f64> = (0..16).map(|i| 60.0 + shape[i % 4]).collect();

        let mut model = HoltWinters::new(0.3, 0.1, 0.2, 4).unwrap();
        model.fit(&data).unwrap();
        let forecast = model.predict(4).unwrap();
        for (h, value) in forecast.iter().enumerate() {
            assert!((value - (60.0 + shape[h % 4])).abs() < 1e-9);
        }
    }

    #[test]
    fn test_holt_winters_phase_continues_cycle() {
        // 17 observations end one step into the cycle; the first forecast
        // must pick up at position 1, not restart at 0.
        let shape = [6.0, -2.0, -1.0, -3.0];
        let data: Vec<f64> = (0..17).map(|i| 60.0 + shape[i % 4]).collect();

        let mut model = HoltWinters::new(0.3, 0.1, 0.2, 4).unwrap();
        model.fit(&data).unwrap();
        let forecast = model.predict(1).unwrap();
        assert!((forecast[0] - (60.0 + shape[1])).abs() < 1e-9);
    }

    #[test]
    fn test_holt_winters_needs_two_cycles() {
        let mut model = HoltWinters::new(0.3, 0.1, 0.2, 4).unwrap();
        assert!(matches!(
            model.fit(&[1.0; 7]),
            Err(ForecastError::InsufficientData { required: 8, .. })
        ));
    }
}
