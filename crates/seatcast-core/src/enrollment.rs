//! Enrollment aggregation
//!
//! Raw per-section enrollment exports arrive in two shapes: a flat term
//! export (course/enrollment/room/section) and the master schedule
//! (term/subject/number/enrollment/campus). The schema is detected once
//! from the header row; both shapes reduce to campus × course seat totals
//! for a single term.

use crate::calendar::{self, TermCode};
use crate::course::{Campus, CourseCode, CoursePattern};
use crate::error::{ForecastError, Result};
use std::collections::BTreeMap;

// ============================================================================
// Schema detection
// ============================================================================

/// Columns required by the flat term-export schema
pub const FLAT_TERM_COLUMNS: [&str; 2] = ["Course", "Enrollment"];

/// Columns required by the master-schedule schema
pub const MASTER_SCHEDULE_COLUMNS: [&str; 4] = ["TERM", "SUBJ", "CRS NUMBER", "ACT ENR"];

/// Which of the two supported enrollment shapes a table uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentSchema {
    /// One row per section, campus derived from room/section heuristics
    FlatTerm,
    /// One row per section with explicit term and campus codes
    MasterSchedule,
}

impl EnrollmentSchema {
    /// Detect the schema from a header row by column presence
    pub fn detect(headers: &[String]) -> Result<EnrollmentSchema> {
        let has = |name: &str| {
            headers
                .iter()
                .any(|h| h.trim().eq_ignore_ascii_case(name))
        };

        if MASTER_SCHEDULE_COLUMNS.iter().all(|c| has(c)) {
            return Ok(EnrollmentSchema::MasterSchedule);
        }
        if FLAT_TERM_COLUMNS.iter().all(|c| has(c)) {
            return Ok(EnrollmentSchema::FlatTerm);
        }
        Err(ForecastError::InvalidData(format!(
            "unrecognized enrollment schema, columns: [{}]",
            headers.join(", ")
        )))
    }
}

// ============================================================================
// Row types
// ============================================================================

/// One section row from a flat term export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatSectionRow {
    pub course: String,
    pub enrollment: String,
    pub room: String,
    pub section: String,
}

/// One section row from the master schedule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterScheduleRow {
    pub term: String,
    pub subject: String,
    pub course_number: String,
    pub enrollment: String,
    pub campus: String,
}

// ============================================================================
// Totals
// ============================================================================

/// Campus × course seat totals for one term
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentTotals {
    totals: BTreeMap<(Campus, CourseCode), f64>,
}

impl EnrollmentTotals {
    pub fn new() -> EnrollmentTotals {
        EnrollmentTotals::default()
    }

    pub fn add(&mut self, campus: Campus, course: CourseCode, seats: f64) {
        *self.totals.entry((campus, course)).or_insert(0.0) += seats;
    }

    pub fn get(&self, campus: Campus, course: &CourseCode) -> f64 {
        self.totals
            .get(&(campus, course.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Course totals for one campus, in course order
    pub fn campus_totals(&self, campus: Campus) -> BTreeMap<CourseCode, f64> {
        self.totals
            .iter()
            .filter(|((c, _), _)| *c == campus)
            .map(|((_, course), seats)| (course.clone(), *seats))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Campus, CourseCode), &f64)> {
        self.totals.iter()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn total_seats(&self) -> f64 {
        self.totals.values().sum()
    }
}

/// Row accounting for one aggregation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateReport {
    pub rows_seen: usize,
    pub rows_aggregated: usize,
    /// Rows outside the tracked subject or requested term
    pub rows_filtered: usize,
    /// Rows whose campus code matched no known campus
    pub unknown_campus_rows: usize,
}

/// Aggregated totals plus the accounting for how they were built
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentLoad {
    pub totals: EnrollmentTotals,
    pub report: AggregateReport,
}

// ============================================================================
// Parsing and aggregation
// ============================================================================

/// Parse a raw seat-count cell, degrading to 0.0
///
/// Blank cells, stray text, and anything else non-numeric count as zero;
/// thousands separators are stripped first. This never errors.
pub fn parse_seat_count(raw: &str) -> f64 {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Reduce flat term-export rows to campus × course totals
///
/// Courses outside the pattern's subject are filtered out; the campus
/// comes from the room/section heuristic.
pub fn aggregate_flat_rows(rows: &[FlatSectionRow], pattern: &CoursePattern) -> EnrollmentLoad {
    let mut load = EnrollmentLoad::default();
    for row in rows {
        load.report.rows_seen += 1;
        let Some(course) = pattern.extract(&row.course).into_iter().next() else {
            load.report.rows_filtered += 1;
            continue;
        };
        let campus = Campus::from_room_and_section(&row.room, &row.section);
        let seats = parse_seat_count(&row.enrollment);
        load.totals.add(campus, course, seats);
        load.report.rows_aggregated += 1;
    }
    load
}

/// Reduce master-schedule rows to campus × course totals
///
/// With `term` set, only rows for that exact term code are kept.
pub fn aggregate_master_rows(
    rows: &[MasterScheduleRow],
    pattern: &CoursePattern,
    term: Option<TermCode>,
) -> EnrollmentLoad {
    let mut load = EnrollmentLoad::default();
    for row in rows {
        load.report.rows_seen += 1;
        if let Some(wanted) = term {
            match TermCode::parse(&row.term) {
                Ok(code) if code == wanted => {}
                _ => {
                    load.report.rows_filtered += 1;
                    continue;
                }
            }
        }
        let raw_course = format!("{} {}", row.subject.trim(), row.course_number.trim());
        let Some(course) = pattern.extract(&raw_course).into_iter().next() else {
            load.report.rows_filtered += 1;
            continue;
        };
        let Some(campus) = Campus::from_code(&row.campus) else {
            load.report.unknown_campus_rows += 1;
            continue;
        };
        let seats = parse_seat_count(&row.enrollment);
        load.totals.add(campus, course, seats);
        load.report.rows_aggregated += 1;
    }
    load
}

/// Distinct valid term codes appearing in master-schedule rows, sorted
pub fn collect_terms(rows: &[MasterScheduleRow]) -> Vec<TermCode> {
    let codes: Vec<TermCode> = rows
        .iter()
        .filter_map(|row| TermCode::parse(&row.term).ok())
        .collect();
    calendar::available_terms(&codes)
}

// ============================================================================
// Course-code crosswalk
// ============================================================================

/// Legacy → current course-code mapping applied during historical ingestion
///
/// Codes without a mapping pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crosswalk {
    mapping: BTreeMap<String, String>,
}

impl Crosswalk {
    pub fn new() -> Crosswalk {
        Crosswalk::default()
    }

    pub fn insert(&mut self, legacy: &str, current: &str) {
        self.mapping
            .insert(legacy.trim().to_string(), current.trim().to_string());
    }

    pub fn apply(&self, code: &str) -> String {
        let code = code.trim();
        self.mapping
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}
