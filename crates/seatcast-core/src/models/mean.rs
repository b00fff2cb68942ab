//! Historical-mean forecast, the last resort of every fallback chain

use crate::error::{ForecastError, Result};
use crate::models::Predictor;
use serde::{Deserialize, Serialize};

/// Flat forecast at the historical mean
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeanForecast {
    level: f64,
    fitted: bool,
}

impl MeanForecast {
    pub fn new() -> MeanForecast {
        MeanForecast::default()
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}

impl Predictor for MeanForecast {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        if data.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        self.level = data.iter().sum::<f64>() / data.len() as f64;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::NotFitted);
        }
        Ok(vec![self.level; steps])
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_forecast_is_flat() {
        let mut model = MeanForecast::new();
        model.fit(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(model.predict(3).unwrap(), vec![20.0, 20.0, 20.0]);
    }

    #[test]
    fn test_empty_series_rejected() {
        let mut model = MeanForecast::new();
        assert!(model.fit(&[]).is_err());
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = MeanForecast::new();
        assert!(matches!(model.predict(1), Err(ForecastError::NotFitted)));
    }
}
