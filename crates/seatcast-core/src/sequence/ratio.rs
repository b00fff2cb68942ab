//! Historical-ratio fallback
//!
//! Some quarters, Summer in practice, never appear as a target column in
//! the sequencing maps, so the graph comes back empty. This engine scales
//! the closer feeder quarter's existing forecast by each course's
//! historical target/feeder enrollment ratio instead.
//!
//! The ratio is averaged over academic years where both quarters saw
//! positive enrollment for the course; courses with no qualifying year
//! fall back to the configured default ratio. Rows that scale to zero
//! sections are dropped: this engine only re-projects courses that
//! already had demand, unlike propagation which must surface first-time
//! offerings.

use crate::calendar::{Quarter, TermCode};
use crate::config::ForecastConfig;
use crate::course::CourseCode;
use crate::sequence::propagation::{seats_to_sections, ForecastRow};
use std::collections::BTreeMap;
use tracing::debug;

/// Method tag on rows produced by this engine
pub const RATIO_METHOD: &str = "ratio_based";

// ============================================================================
// Historical enrollment table
// ============================================================================

/// One course's enrollment in one historical term
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    pub course: CourseCode,
    pub term: TermCode,
    pub enrollment: f64,
}

/// Long-run per-term enrollment keyed by course and term
///
/// Duplicate (course, term) records sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalTable {
    totals: BTreeMap<(CourseCode, TermCode), f64>,
}

impl HistoricalTable {
    pub fn new() -> HistoricalTable {
        HistoricalTable::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = HistoricalRecord>) -> HistoricalTable {
        let mut table = HistoricalTable::new();
        for record in records {
            table.add(record.course, record.term, record.enrollment);
        }
        table
    }

    pub fn add(&mut self, course: CourseCode, term: TermCode, enrollment: f64) {
        *self.totals.entry((course, term)).or_insert(0.0) += enrollment;
    }

    pub fn get(&self, course: &CourseCode, term: TermCode) -> f64 {
        self.totals
            .get(&(course.clone(), term))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Courses on file, sorted
    pub fn courses(&self) -> Vec<CourseCode> {
        let mut courses: Vec<CourseCode> = Vec::new();
        for (course, _) in self.totals.keys() {
            if courses.last() != Some(course) {
                courses.push(course.clone());
            }
        }
        courses
    }

    /// One course's enrollment in chronological term order
    pub fn course_series(&self, course: &CourseCode) -> Vec<(TermCode, f64)> {
        self.totals
            .iter()
            .filter(|((c, _), _)| c == course)
            .map(|((_, term), enrollment)| (*term, *enrollment))
            .collect()
    }

    /// Average target/feeder enrollment ratio for one course
    ///
    /// Considers each academic year once, pairing the two quarters within
    /// the same `YYYY` prefix; years where either side is zero do not
    /// qualify. `None` when no year qualifies.
    pub fn quarter_ratio(
        &self,
        course: &CourseCode,
        target_quarter: Quarter,
        feeder_quarter: Quarter,
    ) -> Option<f64> {
        let mut by_year: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
        for ((c, term), enrollment) in &self.totals {
            if c != course {
                continue;
            }
            let entry = by_year.entry(term.academic_year()).or_insert((0.0, 0.0));
            if term.quarter() == target_quarter {
                entry.0 += enrollment;
            }
            if term.quarter() == feeder_quarter {
                entry.1 += enrollment;
            }
        }

        let ratios: Vec<f64> = by_year
            .values()
            .filter(|(target, feeder)| *target > 0.0 && *feeder > 0.0)
            .map(|(target, feeder)| target / feeder)
            .collect();
        if ratios.is_empty() {
            None
        } else {
            Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Degradation accounting for one ratio run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatioReport {
    pub feeder_rows: usize,
    pub emitted: usize,
    /// Rows whose scaled demand rounded to zero sections
    pub dropped_zero_sections: usize,
    /// Rows that used the default ratio for lack of history
    pub defaulted_ratio: usize,
}

/// Forecast rows plus the run's degradation accounting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatioForecast {
    pub rows: Vec<ForecastRow>,
    pub report: RatioReport,
}

/// Scale a feeder-quarter forecast into the target quarter by ratio
pub fn ratio_forecast(
    feeder_rows: &[ForecastRow],
    history: &HistoricalTable,
    target_quarter: Quarter,
    feeder_quarter: Quarter,
    config: &ForecastConfig,
) -> RatioForecast {
    let buffer = config.buffer_multiplier();
    let mut forecast = RatioForecast::default();

    for feeder in feeder_rows {
        forecast.report.feeder_rows += 1;
        let ratio = match history.quarter_ratio(&feeder.course, target_quarter, feeder_quarter) {
            Some(ratio) => ratio,
            None => {
                forecast.report.defaulted_ratio += 1;
                debug!(
                    course = feeder.course.as_str(),
                    "no qualifying history, using default ratio"
                );
                config.default_ratio
            }
        };
        let projected = feeder.projected_seats * ratio * buffer;
        let sections = seats_to_sections(projected, config.capacity);
        if sections == 0 {
            forecast.report.dropped_zero_sections += 1;
            continue;
        }
        forecast.rows.push(ForecastRow {
            course: feeder.course.clone(),
            campus: feeder.campus,
            projected_seats: projected,
            sections,
            method: RATIO_METHOD.to_string(),
        });
        forecast.report.emitted += 1;
    }
    forecast
}
