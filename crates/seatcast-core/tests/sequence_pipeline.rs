//! End-to-end tests for the sequence-forecast pipeline
//!
//! Exercises the full chain using only this crate's API: raw section rows
//! through aggregation, sequencing-map rows through graph construction,
//! then propagation and the ratio fallback.

use seatcast_core::calendar::{forecastable_terms, resolve_term_info, Quarter, TermCode};
use seatcast_core::config::ForecastConfig;
use seatcast_core::course::{Campus, CourseCode, CoursePattern, DEFAULT_SUBJECT};
use seatcast_core::enrollment::{
    aggregate_flat_rows, aggregate_master_rows, collect_terms, EnrollmentTotals, FlatSectionRow,
    MasterScheduleRow,
};
use seatcast_core::sequence::{
    ratio_forecast, run_sequence_forecast, HistoricalRecord, HistoricalTable, SequenceGraph,
    SequenceRow, PROPAGATION_METHOD, RATIO_METHOD,
};

fn code(s: &str) -> CourseCode {
    CourseCode::from_normalized(s)
}

fn pattern() -> CoursePattern {
    CoursePattern::new(DEFAULT_SUBJECT).unwrap()
}

fn master_row(term: &str, subject: &str, number: &str, enrollment: &str, campus: &str) -> MasterScheduleRow {
    MasterScheduleRow {
        term: term.to_string(),
        subject: subject.to_string(),
        course_number: number.to_string(),
        enrollment: enrollment.to_string(),
        campus: campus.to_string(),
    }
}

fn sequence_row(campus: &str, cells: &[(Quarter, &str)]) -> SequenceRow {
    SequenceRow {
        campus_cell: campus.to_string(),
        quarter_cells: cells
            .iter()
            .map(|(quarter, text)| (*quarter, text.to_string()))
            .collect(),
    }
}

#[test]
fn e2e_master_schedule_to_spring_forecast() {
    let pattern = pattern();
    let info = resolve_term_info("Spring 2026").unwrap();
    assert_eq!(info.closer.term_code.to_string(), "202620");
    assert_eq!(info.farther.term_code.to_string(), "202610");

    let schedule = vec![
        master_row("202620", "FOUN", "100", "30", "SAV"),
        master_row("202620", "FOUN", "100", "30", "SAV"),
        master_row("202620", "ARTH", "210", "95", "SAV"),
        master_row("202620", "FOUN", "100", "25", "NOW"),
        master_row("202610", "FOUN", "050", "80", "SAV"),
    ];
    let closer = aggregate_master_rows(&schedule, &pattern, Some(info.closer.term_code));
    let farther = aggregate_master_rows(&schedule, &pattern, Some(info.farther.term_code));
    assert_eq!(closer.totals.get(Campus::Savannah, &code("FOUN 100")), 60.0);
    assert_eq!(farther.totals.get(Campus::Savannah, &code("FOUN 050")), 80.0);

    let rows = vec![sequence_row(
        "SAVANNAH",
        &[
            (Quarter::Fall, "FOUN 050"),
            (Quarter::Winter, "FOUN 100"),
            (Quarter::Spring, "FOUN 200"),
        ],
    )];
    let (graph, load) = SequenceGraph::build(&rows, &info, &pattern);
    assert!(load.unknown_campus_tokens.is_empty());

    let config = ForecastConfig {
        progression_rate: 0.9,
        buffer_percent: 0.0,
        capacity: 20,
        ..ForecastConfig::default()
    };
    let forecast = run_sequence_forecast(&graph, &closer.totals, &farther.totals, &config);

    // 60 seats decay once, 80 seats decay twice: 54 + 64.8.
    assert_eq!(forecast.rows.len(), 1);
    let row = &forecast.rows[0];
    assert_eq!(row.course, code("FOUN 200"));
    assert_eq!(row.campus, Campus::Savannah);
    assert!((row.projected_seats - 118.8).abs() < 1e-9);
    assert_eq!(row.sections, 6);
    assert_eq!(row.method, PROPAGATION_METHOD);
    assert_eq!(forecast.report.feeder_courses, 2);
    assert_eq!(forecast.report.unmapped_feeder_courses, 0);
}

#[test]
fn e2e_single_required_edge_is_conservative() {
    let pattern = pattern();
    let info = resolve_term_info("Spring 2026").unwrap();
    let rows = vec![sequence_row(
        "SAVANNAH",
        &[(Quarter::Winter, "FOUN 100"), (Quarter::Spring, "FOUN 200")],
    )];
    let (graph, _) = SequenceGraph::build(&rows, &info, &pattern);

    let mut closer = EnrollmentTotals::new();
    closer.add(Campus::Savannah, code("FOUN 100"), 200.0);

    let config = ForecastConfig {
        progression_rate: 0.95,
        buffer_percent: 0.0,
        capacity: 20,
        ..ForecastConfig::default()
    };
    let forecast =
        run_sequence_forecast(&graph, &closer, &EnrollmentTotals::new(), &config);

    // 200 seats through one required edge: 200 x 0.95 = 190, 10 sections.
    assert_eq!(forecast.rows.len(), 1);
    let row = &forecast.rows[0];
    assert_eq!(row.course, code("FOUN 200"));
    assert!((row.projected_seats - 190.0).abs() < 1e-9);
    assert_eq!(row.sections, 10);
}

#[test]
fn e2e_zero_demand_kept_by_propagation_dropped_by_ratio() {
    let pattern = pattern();
    let info = resolve_term_info("Spring 2026").unwrap();
    let rows = vec![
        sequence_row(
            "SAVANNAH",
            &[(Quarter::Winter, "FOUN 100"), (Quarter::Spring, "FOUN 200")],
        ),
        // First-time offering: a target with no feeder cells at all.
        sequence_row("SAVANNAH", &[(Quarter::Spring, "FOUN 290")]),
    ];
    let (graph, _) = SequenceGraph::build(&rows, &info, &pattern);

    let mut closer = EnrollmentTotals::new();
    closer.add(Campus::Savannah, code("FOUN 100"), 100.0);
    let config = ForecastConfig::default();
    let forecast = run_sequence_forecast(&graph, &closer, &EnrollmentTotals::new(), &config);

    assert_eq!(forecast.rows.len(), 2);
    let first_offering = forecast
        .rows
        .iter()
        .find(|r| r.course == code("FOUN 290"))
        .unwrap();
    assert_eq!(first_offering.projected_seats, 0.0);
    assert_eq!(first_offering.sections, 0);

    // The ratio fallback re-projects the same rows into Summer and must
    // drop the zero-demand course instead of carrying it forward.
    let history = HistoricalTable::from_records(vec![
        HistoricalRecord {
            course: code("FOUN 200"),
            term: TermCode::parse("202530").unwrap(),
            enrollment: 100.0,
        },
        HistoricalRecord {
            course: code("FOUN 200"),
            term: TermCode::parse("202540").unwrap(),
            enrollment: 20.0,
        },
    ]);
    let summer = ratio_forecast(
        &forecast.rows,
        &history,
        Quarter::Summer,
        Quarter::Spring,
        &config,
    );
    assert_eq!(summer.rows.len(), 1);
    assert_eq!(summer.rows[0].course, code("FOUN 200"));
    assert_eq!(summer.rows[0].method, RATIO_METHOD);
    assert_eq!(summer.report.dropped_zero_sections, 1);
    assert!(summer
        .rows
        .iter()
        .all(|r| r.course != code("FOUN 290")));
}

#[test]
fn e2e_both_enrollment_schemas_agree() {
    let pattern = pattern();

    let flat = vec![
        FlatSectionRow {
            course: "FOUN 100 - Drawing I".to_string(),
            enrollment: "30".to_string(),
            room: "ANNEX 101".to_string(),
            section: "A01".to_string(),
        },
        FlatSectionRow {
            course: "FOUN 100 - Drawing I".to_string(),
            enrollment: "28".to_string(),
            room: "OLNOW".to_string(),
            section: "N01".to_string(),
        },
        FlatSectionRow {
            course: "FOUN 150 Design".to_string(),
            enrollment: "22".to_string(),
            room: "HALL 2".to_string(),
            section: "B01".to_string(),
        },
        FlatSectionRow {
            course: "ARTH 210".to_string(),
            enrollment: "95".to_string(),
            room: "HALL 3".to_string(),
            section: "C01".to_string(),
        },
        FlatSectionRow {
            course: "FOUN 100".to_string(),
            enrollment: "".to_string(),
            room: "HALL 1".to_string(),
            section: "A02".to_string(),
        },
    ];
    let from_flat = aggregate_flat_rows(&flat, &pattern);

    let schedule = vec![
        master_row("202620", "FOUN", "100", "30", "SAV"),
        master_row("202620", "FOUN", "100", "28", "NOW"),
        master_row("202620", "FOUN", "150", "22", "SAV"),
        master_row("202620", "ARTH", "210", "95", "SAV"),
        master_row("202620", "FOUN", "100", "", "SAV"),
    ];
    let from_master = aggregate_master_rows(&schedule, &pattern, None);

    assert_eq!(from_flat.totals, from_master.totals);
    assert_eq!(from_flat.totals.get(Campus::Savannah, &code("FOUN 100")), 30.0);
    assert_eq!(from_flat.totals.get(Campus::ScadNow, &code("FOUN 100")), 28.0);
    assert_eq!(from_flat.report.rows_filtered, 1);
    assert_eq!(from_master.report.rows_filtered, 1);
}

#[test]
fn e2e_forecastable_terms_require_both_feeders() {
    let schedule = vec![
        master_row("202610", "FOUN", "100", "80", "SAV"),
        master_row("202620", "FOUN", "100", "60", "SAV"),
        master_row("202620", "FOUN", "150", "40", "NOW"),
        master_row("20265X", "FOUN", "100", "10", "SAV"),
    ];
    let available = collect_terms(&schedule);
    let labels: Vec<String> = available.iter().map(|t| t.to_string()).collect();
    assert_eq!(labels, vec!["202610", "202620"]);

    // Spring 2026 is the only term with both feeders on file.
    let forecastable = forecastable_terms(&available);
    let labels: Vec<String> = forecastable.iter().map(|t| t.to_string()).collect();
    assert_eq!(labels, vec!["202630"]);
}
