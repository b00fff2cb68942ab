//! Feeder-enrollment propagation
//!
//! Pushes current feeder-term enrollment through the sequence graph to
//! produce target-term demand. Each feeder course's outgoing edge weights
//! are normalized to sum to one before distributing its seats, so a course
//! feeding several targets splits its students rather than duplicating
//! them. Seats decay by `progression_rate` per quarter of distance and the
//! final totals are inflated by the configured buffer.
//!
//! A feeder course with no outgoing edges contributes nothing. Its
//! students are assumed to need no tracked target course. Majors absent
//! from the sequencing map disappear the same way, which undercounts
//! their demand; the report's unmapped counter is the visibility into
//! both cases.

use crate::config::ForecastConfig;
use crate::course::{Campus, CourseCode};
use crate::enrollment::EnrollmentTotals;
use crate::sequence::graph::{CampusGraph, SequenceGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Method tag on rows produced by this engine
pub const PROPAGATION_METHOD: &str = "sequence_map_feeder_mapping";

// ============================================================================
// Output types
// ============================================================================

/// One course's projected demand at one campus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub course: CourseCode,
    pub campus: Campus,
    pub projected_seats: f64,
    pub sections: u32,
    pub method: String,
}

/// Roll-up totals over a set of forecast rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ForecastSummary {
    pub total_seats: f64,
    pub total_sections: u32,
    pub courses: usize,
}

/// Degradation accounting for one propagation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Feeder courses with positive enrollment considered for propagation
    pub feeder_courses: usize,
    /// Of those, courses with no outgoing edges in the graph
    pub unmapped_feeder_courses: usize,
}

/// Forecast rows plus the run's degradation accounting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceForecast {
    pub rows: Vec<ForecastRow>,
    pub report: PropagationReport,
}

// ============================================================================
// Engine
// ============================================================================

/// Sections needed for a seat total at a fixed per-section capacity
pub fn seats_to_sections(seats: f64, capacity: u32) -> u32 {
    if seats <= 0.0 || capacity == 0 {
        return 0;
    }
    (seats / capacity as f64).ceil() as u32
}

/// Propagate feeder enrollment through one campus graph
///
/// Deterministic given the graph, the two feeder totals, and the config
/// scalars. Every course in the graph's target set appears in the output,
/// zero-demand targets included.
pub fn propagate_campus(
    graph: &CampusGraph,
    campus: Campus,
    closer_totals: &BTreeMap<CourseCode, f64>,
    farther_totals: &BTreeMap<CourseCode, f64>,
    config: &ForecastConfig,
) -> SequenceForecast {
    let closer_multiplier = config.progression_rate;
    let farther_multiplier = config.progression_rate * config.progression_rate;

    let mut demand: BTreeMap<CourseCode, f64> = graph
        .target_counts
        .keys()
        .map(|course| (course.clone(), 0.0))
        .collect();

    let mut report = PropagationReport::default();
    distribute(
        &mut demand,
        &mut report,
        campus,
        &graph.closer_to_target,
        closer_totals,
        closer_multiplier,
    );
    distribute(
        &mut demand,
        &mut report,
        campus,
        &graph.farther_to_target,
        farther_totals,
        farther_multiplier,
    );

    let buffer = config.buffer_multiplier();
    let rows = demand
        .into_iter()
        .map(|(course, seats)| {
            let projected = seats * buffer;
            ForecastRow {
                course,
                campus,
                projected_seats: projected,
                sections: seats_to_sections(projected, config.capacity),
                method: PROPAGATION_METHOD.to_string(),
            }
        })
        .collect();

    SequenceForecast { rows, report }
}

fn distribute(
    demand: &mut BTreeMap<CourseCode, f64>,
    report: &mut PropagationReport,
    campus: Campus,
    edges: &BTreeMap<CourseCode, BTreeMap<CourseCode, f64>>,
    feeder_totals: &BTreeMap<CourseCode, f64>,
    multiplier: f64,
) {
    for (source, seats) in feeder_totals {
        if *seats <= 0.0 {
            continue;
        }
        report.feeder_courses += 1;
        let outgoing = match edges.get(source) {
            Some(outgoing) if outgoing.values().sum::<f64>() > 0.0 => outgoing,
            _ => {
                report.unmapped_feeder_courses += 1;
                debug!(course = source.as_str(), campus = %campus, "feeder course has no outgoing edges");
                continue;
            }
        };
        let total_weight: f64 = outgoing.values().sum();
        for (target, weight) in outgoing {
            *demand.entry(target.clone()).or_insert(0.0) +=
                seats * multiplier * (weight / total_weight);
        }
    }
}

/// Run propagation for every campus in the graph
///
/// Rows come back sorted by course then campus.
pub fn run_sequence_forecast(
    graph: &SequenceGraph,
    closer: &EnrollmentTotals,
    farther: &EnrollmentTotals,
    config: &ForecastConfig,
) -> SequenceForecast {
    let mut forecast = SequenceForecast::default();
    for (campus, campus_graph) in graph.campuses() {
        let result = propagate_campus(
            campus_graph,
            campus,
            &closer.campus_totals(campus),
            &farther.campus_totals(campus),
            config,
        );
        forecast.rows.extend(result.rows);
        forecast.report.feeder_courses += result.report.feeder_courses;
        forecast.report.unmapped_feeder_courses += result.report.unmapped_feeder_courses;
    }
    forecast
        .rows
        .sort_by(|a, b| (&a.course, a.campus).cmp(&(&b.course, b.campus)));
    forecast
}

/// Roll up seat, section, and distinct-course totals over forecast rows
pub fn summarize(rows: &[ForecastRow]) -> ForecastSummary {
    let courses: BTreeSet<&CourseCode> = rows.iter().map(|r| &r.course).collect();
    ForecastSummary {
        total_seats: rows.iter().map(|r| r.projected_seats).sum(),
        total_sections: rows.iter().map(|r| r.sections).sum(),
        courses: courses.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{resolve_term_info, Quarter};
    use crate::course::{CoursePattern, DEFAULT_SUBJECT};
    use crate::sequence::graph::SequenceRow;

    fn code(s: &str) -> CourseCode {
        CourseCode::from_normalized(s)
    }

    fn config(rate: f64, buffer: f64, capacity: u32) -> ForecastConfig {
        ForecastConfig {
            progression_rate: rate,
            buffer_percent: buffer,
            capacity,
            ..ForecastConfig::default()
        }
    }

    fn graph_of(edges: &[(&str, &str, f64)], targets: &[&str]) -> CampusGraph {
        let mut graph = CampusGraph::default();
        for (source, target, weight) in edges {
            *graph
                .closer_to_target
                .entry(code(source))
                .or_default()
                .entry(code(target))
                .or_insert(0.0) += weight;
        }
        for target in targets {
            *graph.target_counts.entry(code(target)).or_insert(0.0) += 1.0;
        }
        graph
    }

    fn totals(entries: &[(&str, f64)]) -> BTreeMap<CourseCode, f64> {
        entries.iter().map(|(c, s)| (code(c), *s)).collect()
    }

    #[test]
    fn test_choice_split_divides_seats_evenly() {
        let graph = graph_of(
            &[("FOUN 100", "FOUN 200", 0.5), ("FOUN 100", "FOUN 210", 0.5)],
            &["FOUN 200", "FOUN 210"],
        );
        let result = propagate_campus(
            &graph,
            Campus::Savannah,
            &totals(&[("FOUN 100", 100.0)]),
            &BTreeMap::new(),
            &config(1.0, 0.0, 20),
        );
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].projected_seats, 50.0);
        assert_eq!(result.rows[1].projected_seats, 50.0);
    }

    #[test]
    fn test_one_to_one_mapping_is_conservative() {
        let graph = graph_of(&[("FOUN 100", "FOUN 200", 1.0)], &["FOUN 200"]);
        let result = propagate_campus(
            &graph,
            Campus::Savannah,
            &totals(&[("FOUN 100", 137.0)]),
            &BTreeMap::new(),
            &config(0.95, 0.0, 20),
        );
        assert_eq!(result.rows.len(), 1);
        assert!((result.rows[0].projected_seats - 137.0 * 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_normalization_prevents_seat_duplication() {
        // Raw edge weights 2.0 and 1.0 must distribute 90 seats as 60/30.
        let graph = graph_of(
            &[("FOUN 100", "FOUN 200", 2.0), ("FOUN 100", "FOUN 210", 1.0)],
            &["FOUN 200", "FOUN 210"],
        );
        let result = propagate_campus(
            &graph,
            Campus::Savannah,
            &totals(&[("FOUN 100", 90.0)]),
            &BTreeMap::new(),
            &config(1.0, 0.0, 20),
        );
        assert!((result.rows[0].projected_seats - 60.0).abs() < 1e-9);
        assert!((result.rows[1].projected_seats - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_demand_target_is_kept() {
        let graph = graph_of(&[("FOUN 100", "FOUN 200", 1.0)], &["FOUN 200", "FOUN 290"]);
        let result = propagate_campus(
            &graph,
            Campus::Savannah,
            &totals(&[("FOUN 100", 40.0)]),
            &BTreeMap::new(),
            &config(1.0, 0.0, 20),
        );
        let first_offering = result
            .rows
            .iter()
            .find(|r| r.course == code("FOUN 290"))
            .unwrap();
        assert_eq!(first_offering.projected_seats, 0.0);
        assert_eq!(first_offering.sections, 0);
    }

    #[test]
    fn test_farther_feeder_decays_twice() {
        let mut graph = CampusGraph::default();
        *graph
            .farther_to_target
            .entry(code("FOUN 100"))
            .or_default()
            .entry(code("FOUN 200"))
            .or_insert(0.0) += 1.0;
        graph.target_counts.insert(code("FOUN 200"), 1.0);

        let result = propagate_campus(
            &graph,
            Campus::Savannah,
            &BTreeMap::new(),
            &totals(&[("FOUN 100", 100.0)]),
            &config(0.9, 0.0, 20),
        );
        assert!((result.rows[0].projected_seats - 81.0).abs() < 1e-9);
    }

    #[test]
    fn test_buffer_inflates_seats() {
        let graph = graph_of(&[("FOUN 100", "FOUN 200", 1.0)], &["FOUN 200"]);
        let result = propagate_campus(
            &graph,
            Campus::Savannah,
            &totals(&[("FOUN 100", 100.0)]),
            &BTreeMap::new(),
            &config(1.0, 10.0, 20),
        );
        assert!((result.rows[0].projected_seats - 110.0).abs() < 1e-9);
        assert_eq!(result.rows[0].sections, 6);
    }

    #[test]
    fn test_unmapped_feeder_contributes_nothing() {
        let graph = graph_of(&[("FOUN 100", "FOUN 200", 1.0)], &["FOUN 200"]);
        let result = propagate_campus(
            &graph,
            Campus::Savannah,
            &totals(&[("FOUN 100", 50.0), ("FOUN 199", 500.0)]),
            &BTreeMap::new(),
            &config(1.0, 0.0, 20),
        );
        assert!((result.rows[0].projected_seats - 50.0).abs() < 1e-9);
        assert_eq!(result.report.feeder_courses, 2);
        assert_eq!(result.report.unmapped_feeder_courses, 1);
    }

    #[test]
    fn test_seats_to_sections_edges() {
        assert_eq!(seats_to_sections(0.0, 20), 0);
        assert_eq!(seats_to_sections(-5.0, 20), 0);
        assert_eq!(seats_to_sections(0.1, 20), 1);
        assert_eq!(seats_to_sections(190.0, 20), 10);
        assert_eq!(seats_to_sections(190.5, 20), 10);
        assert_eq!(seats_to_sections(200.5, 20), 11);
    }

    #[test]
    fn test_full_run_from_sequencing_rows() {
        let info = resolve_term_info("Spring 2026").unwrap();
        let pattern = CoursePattern::new(DEFAULT_SUBJECT).unwrap();
        let rows = vec![SequenceRow {
            campus_cell: "SAVANNAH".to_string(),
            quarter_cells: [
                (Quarter::Fall, "FOUN 100".to_string()),
                (Quarter::Winter, "FOUN 150".to_string()),
                (Quarter::Spring, "FOUN 200".to_string()),
            ]
            .into_iter()
            .collect(),
        }];
        let (graph, _) = SequenceGraph::build(&rows, &info, &pattern);

        let mut closer = EnrollmentTotals::new();
        closer.add(Campus::Savannah, code("FOUN 150"), 60.0);
        let mut farther = EnrollmentTotals::new();
        farther.add(Campus::Savannah, code("FOUN 100"), 80.0);

        let forecast =
            run_sequence_forecast(&graph, &closer, &farther, &config(1.0, 0.0, 20));
        assert_eq!(forecast.rows.len(), 1);
        let row = &forecast.rows[0];
        assert_eq!(row.course, code("FOUN 200"));
        assert!((row.projected_seats - 140.0).abs() < 1e-9);
        assert_eq!(row.sections, 7);
        assert_eq!(row.method, PROPAGATION_METHOD);
    }

    #[test]
    fn test_rows_sorted_by_course_then_campus() {
        let info = resolve_term_info("Spring 2026").unwrap();
        let pattern = CoursePattern::new(DEFAULT_SUBJECT).unwrap();
        let rows = vec![SequenceRow {
            campus_cell: "GENERAL".to_string(),
            quarter_cells: [
                (Quarter::Winter, "FOUN 150".to_string()),
                (Quarter::Spring, "FOUN 200 and FOUN 180".to_string()),
            ]
            .into_iter()
            .collect(),
        }];
        let (graph, _) = SequenceGraph::build(&rows, &info, &pattern);
        let forecast = run_sequence_forecast(
            &graph,
            &EnrollmentTotals::new(),
            &EnrollmentTotals::new(),
            &config(1.0, 0.0, 20),
        );
        let order: Vec<(String, Campus)> = forecast
            .rows
            .iter()
            .map(|r| (r.course.as_str().to_string(), r.campus))
            .collect();
        assert_eq!(
            order,
            vec![
                ("FOUN 180".to_string(), Campus::Savannah),
                ("FOUN 180".to_string(), Campus::ScadNow),
                ("FOUN 200".to_string(), Campus::Savannah),
                ("FOUN 200".to_string(), Campus::ScadNow),
            ]
        );
    }

    #[test]
    fn test_summary_totals() {
        let rows = vec![
            ForecastRow {
                course: code("FOUN 200"),
                campus: Campus::Savannah,
                projected_seats: 95.0,
                sections: 5,
                method: PROPAGATION_METHOD.to_string(),
            },
            ForecastRow {
                course: code("FOUN 210"),
                campus: Campus::Savannah,
                projected_seats: 42.0,
                sections: 3,
                method: PROPAGATION_METHOD.to_string(),
            },
            ForecastRow {
                course: code("FOUN 210"),
                campus: Campus::ScadNow,
                projected_seats: 13.0,
                sections: 1,
                method: PROPAGATION_METHOD.to_string(),
            },
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.total_seats, 150.0);
        assert_eq!(summary.total_sections, 9);
        // FOUN 210 appears at both campuses but counts once
        assert_eq!(summary.courses, 2);
    }
}
