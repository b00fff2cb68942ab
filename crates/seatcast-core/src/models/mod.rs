//! Statistical forecast models
//!
//! Point-forecast models over a quarterly enrollment series, from naive
//! mean through trend regression, exponential smoothing, and ARIMA. All
//! implement [`Predictor`] and report failures as errors; the
//! [`adapter`] layer wraps them in degrade-gracefully fallback chains
//! that never error.

pub mod adapter;
pub mod arima;
pub mod mean;
pub mod smoothing;
pub mod trend;

pub use adapter::{forecast_with, series_from_terms, ModelKind};
pub use arima::Arima;
pub use mean::MeanForecast;
pub use smoothing::{HoltLinear, HoltWinters};
pub use trend::{SeasonalTrend, Trend};

/// Observations per seasonal cycle on the quarterly calendar
pub const QUARTERS_PER_YEAR: usize = 4;

/// Common contract for all point-forecast models
pub trait Predictor {
    /// Fit the model to a chronologically ordered series
    fn fit(&mut self, data: &[f64]) -> crate::Result<()>;

    /// Predict the next `steps` values
    fn predict(&self, steps: usize) -> crate::Result<Vec<f64>>;

    /// Whether `fit` has succeeded
    fn is_fitted(&self) -> bool;
}
