//! ARIMA over quarterly enrollment series
//!
//! Autoregressive terms are estimated from the Yule-Walker equations via
//! Levinson-Durbin recursion, moving-average terms from residual
//! autocorrelation. Enrollment histories run short, a handful of years of
//! four quarters each, so the minimum-data requirement is `p + d + q + 4`
//! rather than the larger margins common for long series.

use crate::error::{ForecastError, Result};
use crate::models::Predictor;
use serde::{Deserialize, Serialize};

/// Largest AR or MA order accepted; quarterly histories cannot support more
const MAX_ORDER: usize = 4;

/// ARIMA(p, d, q) point forecaster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arima {
    p: usize,
    d: usize,
    q: usize,
    ar: Vec<f64>,
    ma: Vec<f64>,
    /// Mean of the differenced series
    constant: f64,
    /// Last value at each differencing level, outermost first
    tails: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    fitted: bool,
}

impl Arima {
    pub fn new(p: usize, d: usize, q: usize) -> Result<Arima> {
        if p > MAX_ORDER {
            return Err(ForecastError::InvalidParameter {
                name: "p".to_string(),
                reason: format!("AR order must be <= {}", MAX_ORDER),
            });
        }
        if d > 2 {
            return Err(ForecastError::InvalidParameter {
                name: "d".to_string(),
                reason: "differencing order must be <= 2".to_string(),
            });
        }
        if q > MAX_ORDER {
            return Err(ForecastError::InvalidParameter {
                name: "q".to_string(),
                reason: format!("MA order must be <= {}", MAX_ORDER),
            });
        }
        Ok(Arima {
            p,
            d,
            q,
            ar: vec![0.0; p],
            ma: vec![0.0; q],
            constant: 0.0,
            tails: Vec::new(),
            differenced: Vec::new(),
            residuals: Vec::new(),
            fitted: false,
        })
    }

    pub fn orders(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Integrate forecasts back to the original scale
    ///
    /// Each pass anchors on the tail of the next-shallower differencing
    /// level, innermost level first.
    fn undifference(&self, forecasts: &[f64]) -> Vec<f64> {
        let mut series = forecasts.to_vec();
        for tail in self.tails.iter().rev() {
            let mut running = *tail;
            for value in &mut series {
                running += *value;
                *value = running;
            }
        }
        series
    }

    /// Yule-Walker AR estimation via Levinson-Durbin recursion
    fn estimate_ar(&self, series: &[f64]) -> Vec<f64> {
        if self.p == 0 {
            return Vec::new();
        }

        let n = series.len();
        let mean = series.iter().sum::<f64>() / n as f64;
        let centered: Vec<f64> = series.iter().map(|x| x - mean).collect();

        let mut acf = vec![0.0; self.p + 1];
        for (k, value) in acf.iter_mut().enumerate() {
            let mut sum = 0.0;
            for i in k..n {
                sum += centered[i] * centered[i - k];
            }
            *value = sum / n as f64;
        }

        let mut phi = vec![0.0; self.p];
        if acf[0].abs() > 1e-10 {
            phi[0] = acf[1] / acf[0];
            for k in 1..self.p {
                let mut numer = acf[k + 1];
                for j in 0..k {
                    numer -= phi[j] * acf[k - j];
                }
                let mut denom = acf[0];
                for j in 0..k {
                    denom -= phi[j] * acf[j + 1];
                }
                if denom.abs() > 1e-10 {
                    let reflection = numer / denom;
                    let prev = phi.clone();
                    phi[k] = reflection;
                    for j in 0..k {
                        phi[j] = prev[j] - reflection * prev[k - 1 - j];
                    }
                }
            }
        }
        phi
    }

    /// MA estimation from lagged residual autocorrelation, clamped for
    /// stability
    fn estimate_ma(&self, residuals: &[f64]) -> Vec<f64> {
        let mut theta = vec![0.0; self.q];
        if self.q == 0 || residuals.is_empty() {
            return theta;
        }

        let n = residuals.len();
        let mean = residuals.iter().sum::<f64>() / n as f64;
        let centered: Vec<f64> = residuals.iter().map(|x| x - mean).collect();
        let var = centered.iter().map(|x| x * x).sum::<f64>() / n as f64;
        if var.abs() > 1e-10 {
            for (k, coeff) in theta.iter_mut().enumerate() {
                let mut sum = 0.0;
                for i in (k + 1)..n {
                    sum += centered[i] * centered[i - k - 1];
                }
                *coeff = ((sum / n as f64) / var).clamp(-0.99, 0.99);
            }
        }
        theta
    }
}

impl Predictor for Arima {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        let min_required = self.p + self.d + self.q + 4;
        if data.len() < min_required {
            return Err(ForecastError::InsufficientData {
                required: min_required,
                actual: data.len(),
            });
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(ForecastError::InvalidData(
                "series contains non-finite values".to_string(),
            ));
        }

        let mut level = data.to_vec();
        self.tails.clear();
        for _ in 0..self.d {
            self.tails.push(level[level.len() - 1]);
            level = level.windows(2).map(|w| w[1] - w[0]).collect();
        }
        self.differenced = level;
        self.ar = self.estimate_ar(&self.differenced);

        let n = self.differenced.len();
        self.constant = self.differenced.iter().sum::<f64>() / n as f64;
        self.residuals = vec![0.0; n];
        for i in self.p..n {
            let mut prediction = self.constant;
            for j in 0..self.p {
                prediction += self.ar[j] * (self.differenced[i - j - 1] - self.constant);
            }
            self.residuals[i] = self.differenced[i] - prediction;
        }
        self.ma = self.estimate_ma(&self.residuals);

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::NotFitted);
        }
        if steps == 0 {
            return Ok(Vec::new());
        }

        let n = self.differenced.len();
        let mut extended = self.differenced.clone();
        let mut residuals = self.residuals.clone();

        for _ in 0..steps {
            let mut forecast = self.constant;
            for j in 0..self.p {
                let idx = extended.len() - j - 1;
                forecast += self.ar[j] * (extended[idx] - self.constant);
            }
            for j in 0..self.q {
                if residuals.len() > j {
                    let idx = residuals.len() - j - 1;
                    forecast += self.ma[j] * residuals[idx];
                }
            }
            extended.push(forecast);
            // Future shocks are unknown, expected zero
            residuals.push(0.0);
        }

        Ok(self.undifference(&extended[n..]))
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}
