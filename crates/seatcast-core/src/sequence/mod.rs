//! Curriculum-sequence forecasting
//!
//! The deterministic half of the system: published program sequencing maps
//! become a weighted campus-aware graph from feeder-quarter courses to
//! target-quarter courses ([`graph`]), feeder enrollment is pushed through
//! that graph with retention decay and buffer inflation ([`propagation`]),
//! and quarters with no sequencing rows fall back to historical
//! quarter-over-quarter ratios ([`ratio`]).

pub mod graph;
pub mod propagation;
pub mod ratio;

pub use graph::{CampusGraph, GraphLoadReport, SequenceGraph, SequenceRow};
pub use propagation::{
    propagate_campus, run_sequence_forecast, seats_to_sections, summarize, ForecastRow,
    ForecastSummary, PropagationReport, SequenceForecast, PROPAGATION_METHOD,
};
pub use ratio::{
    ratio_forecast, HistoricalRecord, HistoricalTable, RatioForecast, RatioReport, RATIO_METHOD,
};
