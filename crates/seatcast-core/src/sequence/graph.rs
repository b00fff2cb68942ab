//! Sequence-graph construction
//!
//! Each sequencing-map row describes one cohort path: which campuses it
//! applies to and which courses that cohort takes in each quarter. For a
//! chosen target term the builder reads three cells per row (farther
//! feeder, closer feeder, target) and accumulates weighted feeder → target
//! edges per campus.
//!
//! Cell weighting: a cell containing the word `CHOICE` lists N
//! interchangeable options, each weighted `1/N`; any other cell weights
//! every extracted course `1.0`. An edge's weight is the product of its
//! source-cell and target-cell weights, summed over all rows that produce
//! it.

use crate::calendar::{Quarter, TermInfo};
use crate::course::{parse_campus_scope, Campus, CourseCode, CoursePattern};
use std::collections::BTreeMap;

/// Marker word making a cell's courses interchangeable options
const CHOICE_MARKER: &str = "CHOICE";

// ============================================================================
// Input rows
// ============================================================================

/// One sequencing-map row: a campus scope plus one course cell per quarter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceRow {
    /// Raw campus cell, pipe-delimited names or `GENERAL`
    pub campus_cell: String,
    /// Raw free-text course cells keyed by quarter
    pub quarter_cells: BTreeMap<Quarter, String>,
}

impl SequenceRow {
    fn cell(&self, quarter: Quarter) -> &str {
        self.quarter_cells
            .get(&quarter)
            .map(String::as_str)
            .unwrap_or("")
    }
}

// ============================================================================
// Graph types
// ============================================================================

/// Weighted feeder → target edges for one campus
///
/// `target_counts` records every course that appeared in a target cell,
/// weighted, so first-time offerings with no feeder demand still surface
/// in the forecast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampusGraph {
    pub farther_to_target: BTreeMap<CourseCode, BTreeMap<CourseCode, f64>>,
    pub closer_to_target: BTreeMap<CourseCode, BTreeMap<CourseCode, f64>>,
    pub target_counts: BTreeMap<CourseCode, f64>,
}

impl CampusGraph {
    pub fn is_empty(&self) -> bool {
        self.target_counts.is_empty()
    }
}

/// Per-campus sequence graphs for one target term
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceGraph {
    campuses: BTreeMap<Campus, CampusGraph>,
}

impl SequenceGraph {
    /// Build the graph from sequencing-map rows for the given target term
    pub fn build(
        rows: &[SequenceRow],
        info: &TermInfo,
        pattern: &CoursePattern,
    ) -> (SequenceGraph, GraphLoadReport) {
        let mut graph = SequenceGraph::default();
        let mut report = GraphLoadReport::default();

        for row in rows {
            report.rows_seen += 1;

            let parsed = parse_campus_scope(&row.campus_cell);
            for token in parsed.unknown_tokens {
                if !report.unknown_campus_tokens.contains(&token) {
                    report.unknown_campus_tokens.push(token);
                }
            }

            let targets = parse_cell(row.cell(info.target_quarter), pattern);
            if targets.is_empty() {
                report.rows_skipped += 1;
                continue;
            }

            let campuses = parsed.scope.expand();
            if campuses.is_empty() {
                report.rows_skipped += 1;
                continue;
            }

            let closer_sources = parse_cell(row.cell(info.closer.quarter), pattern);
            let farther_sources = parse_cell(row.cell(info.farther.quarter), pattern);

            for campus in campuses {
                let entry = graph.campuses.entry(campus).or_default();
                for (target, target_weight) in &targets {
                    *entry.target_counts.entry(target.clone()).or_insert(0.0) += target_weight;
                }
                accumulate_edges(&mut entry.closer_to_target, &closer_sources, &targets);
                accumulate_edges(&mut entry.farther_to_target, &farther_sources, &targets);
            }
            report.rows_used += 1;
        }

        (graph, report)
    }

    pub fn campus(&self, campus: Campus) -> Option<&CampusGraph> {
        self.campuses.get(&campus)
    }

    pub fn campuses(&self) -> impl Iterator<Item = (Campus, &CampusGraph)> {
        self.campuses.iter().map(|(c, g)| (*c, g))
    }

    /// True when no row produced a target course for this term
    ///
    /// An empty graph is the signal to fall back to the ratio engine.
    pub fn is_empty(&self) -> bool {
        self.campuses.values().all(CampusGraph::is_empty)
    }
}

/// Row accounting for one graph build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphLoadReport {
    pub rows_seen: usize,
    pub rows_used: usize,
    /// Rows with no target-quarter courses or no recognizable campus
    pub rows_skipped: usize,
    pub unknown_campus_tokens: Vec<String>,
}

// ============================================================================
// Cell parsing
// ============================================================================

/// Extract weighted courses from one quarter cell
///
/// Courses are deduplicated in first-seen order before weighting, so a
/// code repeated within one cell does not double its share.
fn parse_cell(text: &str, pattern: &CoursePattern) -> Vec<(CourseCode, f64)> {
    let codes = pattern.extract(text);
    if codes.is_empty() {
        return Vec::new();
    }
    let weight = if text.to_ascii_uppercase().contains(CHOICE_MARKER) {
        1.0 / codes.len() as f64
    } else {
        1.0
    };
    codes.into_iter().map(|code| (code, weight)).collect()
}

fn accumulate_edges(
    edges: &mut BTreeMap<CourseCode, BTreeMap<CourseCode, f64>>,
    sources: &[(CourseCode, f64)],
    targets: &[(CourseCode, f64)],
) {
    for (source, source_weight) in sources {
        let outgoing = edges.entry(source.clone()).or_default();
        for (target, target_weight) in targets {
            *outgoing.entry(target.clone()).or_insert(0.0) += source_weight * target_weight;
        }
    }
}
