//! Trend regression over the quarter index
//!
//! Ordinary least squares against the observation index captures
//! multi-year enrollment drift; [`SeasonalTrend`] layers per-quarter
//! additive offsets on top for series with a strong within-year shape.

use crate::error::{ForecastError, Result};
use crate::models::Predictor;
use serde::{Deserialize, Serialize};

/// Linear enrollment trend, `seats = intercept + slope * quarter_index`
///
/// # Example
///
/// ```rust
/// use seatcast_core::models::{Predictor, Trend};
///
/// let seats = vec![120.0, 124.0, 128.0, 132.0, 136.0, 140.0];
/// let mut model = Trend::new();
/// model.fit(&seats).unwrap();
/// let next = model.predict(2).unwrap();
/// assert!((next[0] - 144.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trend {
    intercept: f64,
    slope: f64,
    n_obs: usize,
    r_squared: f64,
    fitted: bool,
}

impl Trend {
    pub fn new() -> Trend {
        Trend::default()
    }

    /// Seats gained or lost per quarter
    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }
}

impl Predictor for Trend {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        if data.len() < 2 {
            return Err(ForecastError::InsufficientData {
                required: 2,
                actual: data.len(),
            });
        }

        let n = data.len() as f64;
        self.n_obs = data.len();

        let sum_t: f64 = (0..data.len()).map(|i| i as f64).sum();
        let sum_y: f64 = data.iter().sum();
        let sum_t2: f64 = (0..data.len()).map(|i| (i * i) as f64).sum();
        let sum_ty: f64 = data.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();

        let denominator = n * sum_t2 - sum_t * sum_t;
        if denominator.abs() < 1e-10 {
            return Err(ForecastError::NumericalError(
                "singular design matrix in trend fit".to_string(),
            ));
        }

        self.slope = (n * sum_ty - sum_t * sum_y) / denominator;
        self.intercept = (sum_y - self.slope * sum_t) / n;

        let mean_y = sum_y / n;
        let ss_tot: f64 = data.iter().map(|&y| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = data
            .iter()
            .enumerate()
            .map(|(i, &y)| (y - (self.intercept + self.slope * i as f64)).powi(2))
            .sum();
        self.r_squared = if ss_tot > 1e-10 {
            1.0 - ss_res / ss_tot
        } else {
            1.0
        };

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::NotFitted);
        }
        Ok((0..steps)
            .map(|i| self.intercept + self.slope * (self.n_obs + i) as f64)
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

/// Linear trend plus additive per-quarter offsets
///
/// Fits the trend first, then averages the detrended values by position
/// in the cycle; offsets are centered to sum to zero so they reshape the
/// year without shifting the trend line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalTrend {
    period: usize,
    trend: Trend,
    offsets: Vec<f64>,
    fitted: bool,
}

impl SeasonalTrend {
    pub fn new(period: usize) -> Result<SeasonalTrend> {
        if period < 2 {
            return Err(ForecastError::InvalidParameter {
                name: "period".to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        Ok(SeasonalTrend {
            period,
            trend: Trend::new(),
            offsets: vec![0.0; period],
            fitted: false,
        })
    }

    /// Per-quarter offsets, centered to sum to zero
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn trend(&self) -> &Trend {
        &self.trend
    }
}

impl Predictor for SeasonalTrend {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        let min_required = self.period * 2;
        if data.len() < min_required {
            return Err(ForecastError::InsufficientData {
                required: min_required,
                actual: data.len(),
            });
        }

        self.trend.fit(data)?;

        let detrended: Vec<f64> = data
            .iter()
            .enumerate()
            .map(|(i, &y)| y - (self.trend.intercept + self.trend.slope * i as f64))
            .collect();

        for s in 0..self.period {
            let mut sum = 0.0;
            let mut count = 0usize;
            for (i, value) in detrended.iter().enumerate() {
                if i % self.period == s {
                    sum += value;
                    count += 1;
                }
            }
            self.offsets[s] = if count > 0 { sum / count as f64 } else { 0.0 };
        }

        let mean_offset: f64 = self.offsets.iter().sum::<f64>() / self.period as f64;
        for offset in &mut self.offsets {
            *offset -= mean_offset;
        }

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::NotFitted);
        }
        let base = self.trend.predict(steps)?;
        Ok(base
            .iter()
            .enumerate()
            .map(|(i, &level)| level + self.offsets[(self.trend.n_obs + i) % self.period])
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
    fn test_trend_recovers_line() {
        let data: Vec<f64> = (0..10).map(|i| 50.0 + 3.0 * i as f64).collect();
        let mut model = Trend::new();
        model.fit(&data).unwrap();

        assert!((model.slope() - 3.0).abs() < 1e-10);
        assert!((model.intercept() - 50.0).abs() < 1e-10);
        assert!(model.r_squared() > 0.99);

        let forecast = model.predict(2).unwrap();
        assert!((forecast[0] - 80.0).abs() < 1e-10);
        assert!((forecast[1] - 83.0).abs() < 1e-10);
    }

    #[test]
    fn test_trend_rejects_short_series() {
        let mut model = Trend::new();
        assert!(matches!(
            model.fit(&[5.0]),
            Err(ForecastError::InsufficientData { required: 2, .. })
        ));
    }

    #[test]
    fn test_seasonal_trend_recovers_quarterly_shape() {
        // Zero-mean shape chosen orthogonal to the time index so OLS
        // recovers the trend exactly over complete cycles.
        let shape = [-1.0, 3.0, -3.0, 1.0];
        let data: Vec<f64> = (0..16)
            .map(|i| 100.0 + 1.5 * i as f64 + shape[i % 4])
            .collect();

        let mut model = SeasonalTrend::new(4).unwrap();
        model.fit(&data).unwrap();

        for (offset, raw) in model.offsets().iter().zip(shape.iter()) {
            assert!((offset - raw).abs() < 1e-9);
        }

        let forecast = model.predict(4).unwrap();
        for (h, value) in forecast.iter().enumerate() {
            let expected = 100.0 + 1.5 * (16 + h) as f64 + shape[h % 4];
            assert!((value - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_seasonal_trend_needs_two_cycles() {
        let mut model = SeasonalTrend::new(4).unwrap();
        assert!(model.fit(&[10.0, 11.0, 12.0, 13.0, 14.0]).is_err());
    }

    #[test]
    fn test_seasonal_trend_offsets_sum_to_zero() {
        let data: Vec<f64> = (0..12).map(|i| 40.0 + (i % 4) as f64 * 5.0).collect();
        let mut model = SeasonalTrend::new(4).unwrap();
        model.fit(&data).unwrap();
        assert!(model.offsets().iter().sum::<f64>().abs() < 1e-9);
    }
}
