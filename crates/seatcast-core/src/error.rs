//! Error types for forecasting operations
//!
//! Defines the standardized error type shared by the calendar, graph,
//! model, and validation modules.

use thiserror::Error;

/// Result type alias for forecasting operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur during forecasting operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Malformed term label or term code
    #[error("Invalid term '{input}': {reason}")]
    InvalidTerm { input: String, reason: String },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Insufficient data points for the operation
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Model has not been fitted yet
    #[error("Model must be fitted before prediction")]
    NotFitted,

    /// Numerical computation error
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// Invalid tabular input data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Every cross-validation fold was skipped
    #[error("All {attempted} folds failed to produce a finite forecast")]
    AllFoldsFailed { attempted: usize },

    /// Weight grid search produced no scorable combination
    #[error("Weight search failed: {0}")]
    SearchFailed(String),
}
