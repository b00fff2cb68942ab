//! # seatcast-core
//!
//! Course-section demand forecasting for a quarter-based academic calendar.
//! This is the core library of the seatcast toolchain.
//!
//! ## Forecasting approaches
//!
//! ### Sequence propagation
//! - **Sequence graph** - Weighted feeder edges built from curriculum maps
//! - **Propagation** - Current enrollment pushed along feeder edges with
//!   distance-based conversion decay
//! - **Ratio fallback** - Historical target-to-feeder ratios when no
//!   sequence map is available
//!
//! ### Time-series ensemble
//! - **Trend models** - Linear and seasonal-linear projections
//! - **Exponential smoothing** - Holt linear and additive Holt-Winters
//! - **ARIMA** - AutoRegressive Integrated Moving Average
//! - **Ensemble** - Weighted blend with cross-validated weight search
//!
//! ## Example
//!
//! ```rust
//! use seatcast_core::prelude::*;
//!
//! let data: Vec<f64> = (1..=20).map(|x| 40.0 + x as f64).collect();
//! let mut arima = Arima::new(1, 1, 0).unwrap();
//! arima.fit(&data).unwrap();
//! let forecast = arima.predict(3).unwrap();
//! assert_eq!(forecast.len(), 3);
//! ```

pub mod calendar;
pub mod config;
pub mod course;
pub mod diagnostics;
pub mod enrollment;
pub mod ensemble;
pub mod metrics;
pub mod models;
pub mod optimizer;
pub mod sequence;
pub mod validation;
mod error;

pub use error::{ForecastError, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::calendar::{Quarter, TermCode, TermInfo};
    pub use crate::course::{Campus, CourseCode, CoursePattern};
    pub use crate::ensemble::{ensemble_forecast, ModelWeights};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::adapter::{forecast_with, ModelKind};
    pub use crate::models::arima::Arima;
    pub use crate::models::mean::MeanForecast;
    pub use crate::models::smoothing::{HoltLinear, HoltWinters};
    pub use crate::models::trend::{SeasonalTrend, Trend};
    pub use crate::models::Predictor;
    pub use crate::sequence::{run_sequence_forecast, SequenceGraph, SequenceRow};
}
