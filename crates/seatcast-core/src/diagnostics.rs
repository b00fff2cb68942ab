//! Series diagnostics
//!
//! Pre-forecast checks on per-course enrollment histories: a Dickey-Fuller
//! unit-root test for stationarity and a decomposition-based seasonal
//! strength score. Both degrade to explicit "not enough data" outcomes
//! instead of erroring, so a diagnostics sweep always covers every course.

use crate::course::CourseCode;
use crate::models::QUARTERS_PER_YEAR;
use serde::Serialize;
use std::collections::BTreeMap;

/// Observations required before either test runs
pub const MIN_DIAGNOSTIC_OBSERVATIONS: usize = 8;

/// MacKinnon approximate critical value at 1%
pub const CRITICAL_VALUE_1PCT: f64 = -3.43;
/// MacKinnon approximate critical value at 5%, the stationarity cutoff
pub const CRITICAL_VALUE_5PCT: f64 = -2.86;
/// MacKinnon approximate critical value at 10%
pub const CRITICAL_VALUE_10PCT: f64 = -2.57;

/// Seasonal strength at or above this is strong
pub const STRONG_SEASONALITY: f64 = 0.6;
/// Seasonal strength at or above this is moderate
pub const MODERATE_SEASONALITY: f64 = 0.3;

// ============================================================================
// Stationarity
// ============================================================================

/// A completed Dickey-Fuller test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityTest {
    pub statistic: f64,
    pub is_stationary: bool,
    pub n_observations: usize,
}

/// Outcome of the stationarity check for one series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StationarityOutcome {
    Tested(StationarityTest),
    /// Zero variance, trivially stationary
    ConstantSeries { n_observations: usize },
    InsufficientData { n_observations: usize },
    TestFailed { reason: String },
}

impl StationarityOutcome {
    /// Verdict where one exists; `None` when the test could not run
    pub fn is_stationary(&self) -> Option<bool> {
        match self {
            StationarityOutcome::Tested(test) => Some(test.is_stationary),
            StationarityOutcome::ConstantSeries { .. } => Some(true),
            StationarityOutcome::InsufficientData { .. }
            | StationarityOutcome::TestFailed { .. } => None,
        }
    }
}

/// Lag-1 Dickey-Fuller unit-root test
///
/// Regresses the first difference on the lagged level with a constant;
/// the test statistic is the t-ratio of the lag coefficient, compared
/// against the MacKinnon 5% critical value. Non-finite observations are
/// dropped first.
pub fn test_stationarity(series: &[f64]) -> StationarityOutcome {
    let clean: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    let n = clean.len();
    if n < MIN_DIAGNOSTIC_OBSERVATIONS {
        return StationarityOutcome::InsufficientData { n_observations: n };
    }

    let mean = clean.iter().sum::<f64>() / n as f64;
    if variance(&clean, mean) == 0.0 {
        return StationarityOutcome::ConstantSeries { n_observations: n };
    }

    // Regression sample: one observation per difference.
    let m = n - 1;
    let lagged = &clean[..m];
    let diffs: Vec<f64> = clean.windows(2).map(|w| w[1] - w[0]).collect();

    let lag_mean = lagged.iter().sum::<f64>() / m as f64;
    let diff_mean = diffs.iter().sum::<f64>() / m as f64;

    let sxx: f64 = lagged.iter().map(|x| (x - lag_mean).powi(2)).sum();
    if sxx <= 1e-12 {
        return StationarityOutcome::TestFailed {
            reason: "lagged levels have no variance".to_string(),
        };
    }
    let sxy: f64 = lagged
        .iter()
        .zip(diffs.iter())
        .map(|(x, y)| (x - lag_mean) * (y - diff_mean))
        .sum();

    let gamma = sxy / sxx;
    let intercept = diff_mean - gamma * lag_mean;

    let ss_res: f64 = lagged
        .iter()
        .zip(diffs.iter())
        .map(|(x, y)| (y - (intercept + gamma * x)).powi(2))
        .sum();
    if m <= 2 {
        return StationarityOutcome::TestFailed {
            reason: "too few observations for the regression".to_string(),
        };
    }
    let residual_variance = ss_res / (m - 2) as f64;
    let standard_error = (residual_variance / sxx).sqrt();
    if standard_error <= 0.0 || !standard_error.is_finite() {
        return StationarityOutcome::TestFailed {
            reason: "degenerate regression fit".to_string(),
        };
    }

    let statistic = gamma / standard_error;
    StationarityOutcome::Tested(StationarityTest {
        statistic,
        is_stationary: statistic < CRITICAL_VALUE_5PCT,
        n_observations: n,
    })
}

// ============================================================================
// Seasonality
// ============================================================================

/// How pronounced a series' seasonal pattern is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityLevel {
    Weak,
    Moderate,
    Strong,
}

impl SeasonalityLevel {
    pub fn from_strength(strength: f64) -> SeasonalityLevel {
        if strength >= STRONG_SEASONALITY {
            SeasonalityLevel::Strong
        } else if strength >= MODERATE_SEASONALITY {
            SeasonalityLevel::Moderate
        } else {
            SeasonalityLevel::Weak
        }
    }
}

/// Outcome of the seasonal-strength measurement for one series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SeasonalityOutcome {
    Measured {
        /// `1 - Var(residual) / Var(seasonal + residual)`, clamped at zero
        strength: f64,
        level: SeasonalityLevel,
    },
    InsufficientData { n_observations: usize },
}

impl SeasonalityOutcome {
    pub fn strength(&self) -> Option<f64> {
        match self {
            SeasonalityOutcome::Measured { strength, .. } => Some(*strength),
            SeasonalityOutcome::InsufficientData { .. } => None,
        }
    }
}

/// Measure seasonal strength via classical additive decomposition
///
/// The trend is a centered moving average, the seasonal component the
/// centered mean of detrended values by cycle position, and the strength
/// compares residual variance to the variance of seasonal plus residual.
pub fn measure_seasonal_strength(series: &[f64], period: usize) -> SeasonalityOutcome {
    let clean: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    let n = clean.len();
    if period < 2 || n < MIN_DIAGNOSTIC_OBSERVATIONS.max(2 * period) {
        return SeasonalityOutcome::InsufficientData { n_observations: n };
    }

    let trend = centered_moving_average(&clean, period);
    let detrended: Vec<f64> = clean
        .iter()
        .zip(trend.iter())
        .map(|(y, t)| y - t)
        .collect();

    // Mean detrended value per cycle position, then centered to sum zero.
    let mut position_sums = vec![0.0; period];
    let mut position_counts = vec![0usize; period];
    for (i, value) in detrended.iter().enumerate() {
        if value.is_finite() {
            position_sums[i % period] += value;
            position_counts[i % period] += 1;
        }
    }
    let mut position_means: Vec<f64> = position_sums
        .iter()
        .zip(position_counts.iter())
        .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { 0.0 })
        .collect();
    let grand_mean = position_means.iter().sum::<f64>() / period as f64;
    for mean in &mut position_means {
        *mean -= grand_mean;
    }

    let mut seasonal_valid = Vec::new();
    let mut residual_valid = Vec::new();
    for (i, value) in detrended.iter().enumerate() {
        if value.is_finite() {
            let seasonal = position_means[i % period];
            seasonal_valid.push(seasonal);
            residual_valid.push(value - seasonal);
        }
    }

    let residual_mean = residual_valid.iter().sum::<f64>() / residual_valid.len() as f64;
    let var_residual = variance(&residual_valid, residual_mean);
    let combined: Vec<f64> = seasonal_valid
        .iter()
        .zip(residual_valid.iter())
        .map(|(s, r)| s + r)
        .collect();
    let combined_mean = combined.iter().sum::<f64>() / combined.len() as f64;
    let var_combined = variance(&combined, combined_mean);

    let strength = if var_combined == 0.0 {
        0.0
    } else {
        (1.0 - var_residual / var_combined).max(0.0)
    };
    SeasonalityOutcome::Measured {
        strength,
        level: SeasonalityLevel::from_strength(strength),
    }
}

/// Centered moving average; NaN where the window does not fit
///
/// Even periods use the standard half-weighted endpoints so the window
/// stays centered on each observation.
fn centered_moving_average(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut trend = vec![f64::NAN; n];
    if period % 2 == 0 {
        let half = period / 2;
        for t in half..n.saturating_sub(half) {
            let mut sum = 0.5 * data[t - half] + 0.5 * data[t + half];
            for k in (t - half + 1)..(t + half) {
                sum += data[k];
            }
            trend[t] = sum / period as f64;
        }
    } else {
        let half = period / 2;
        for t in half..n.saturating_sub(half) {
            let sum: f64 = data[t - half..=t + half].iter().sum();
            trend[t] = sum / period as f64;
        }
    }
    trend
}

fn variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

// ============================================================================
// Per-course sweep
// ============================================================================

/// Both diagnostics for one course
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseDiagnostics {
    pub course: CourseCode,
    pub stationarity: StationarityOutcome,
    pub seasonality: SeasonalityOutcome,
}

/// Aggregate view over a diagnostics sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagnosticsSummary {
    pub total_courses: usize,
    pub stationary: usize,
    pub non_stationary: usize,
    /// Courses where the stationarity test could not run
    pub insufficient_data: usize,
    pub non_stationary_courses: Vec<CourseCode>,
    pub avg_seasonal_strength: Option<f64>,
    pub strong_seasonality_courses: Vec<CourseCode>,
}

/// Run both diagnostics over every course's history
pub fn analyze_courses(
    series_by_course: &BTreeMap<CourseCode, Vec<f64>>,
) -> (Vec<CourseDiagnostics>, DiagnosticsSummary) {
    let mut results = Vec::new();
    let mut summary = DiagnosticsSummary {
        total_courses: series_by_course.len(),
        ..DiagnosticsSummary::default()
    };
    let mut strengths = Vec::new();

    for (course, series) in series_by_course {
        let stationarity = test_stationarity(series);
        let seasonality = measure_seasonal_strength(series, QUARTERS_PER_YEAR);

        match stationarity.is_stationary() {
            Some(true) => summary.stationary += 1,
            Some(false) => {
                summary.non_stationary += 1;
                summary.non_stationary_courses.push(course.clone());
            }
            None => summary.insufficient_data += 1,
        }
        if let Some(strength) = seasonality.strength() {
            strengths.push(strength);
            if strength >= STRONG_SEASONALITY {
                summary.strong_seasonality_courses.push(course.clone());
            }
        }

        results.push(CourseDiagnostics {
            course: course.clone(),
            stationarity,
            seasonality,
        });
    }

    if !strengths.is_empty() {
        summary.avg_seasonal_strength =
            Some(strengths.iter().sum::<f64>() / strengths.len() as f64);
    }
    (results, summary)
}
