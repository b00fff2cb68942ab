//! # seatcast-cli
//!
//! Command-line interface for the seatcast forecasting library.

use clap::{Parser, Subcommand};
use seatcast_core::calendar::{forecastable_terms, resolve_term_info, Quarter, TermCode};
use seatcast_core::config::ForecastConfig;
use seatcast_core::course::{Campus, CourseCode, CoursePattern, DEFAULT_SUBJECT};
use seatcast_core::diagnostics::analyze_courses;
use seatcast_core::enrollment::{
    aggregate_flat_rows, aggregate_master_rows, collect_terms, parse_seat_count, Crosswalk,
    EnrollmentLoad, EnrollmentSchema, FlatSectionRow, MasterScheduleRow,
};
use seatcast_core::ensemble::{calculate_sections, ensemble_forecast, ModelWeights};
use seatcast_core::models::{series_from_terms, ModelKind};
use seatcast_core::optimizer::{optimize_weights, OptimizationMetric};
use seatcast_core::sequence::{
    ratio_forecast, run_sequence_forecast, summarize, ForecastRow, HistoricalTable, SequenceGraph,
    SequenceRow, PROPAGATION_METHOD, RATIO_METHOD,
};
use seatcast_core::validation::cross_validate;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = std::result::Result<T, String>;

#[derive(Parser)]
#[command(name = "seatcast")]
#[command(about = "Course-section demand forecasting CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast a target term from sequencing maps and feeder enrollment
    Forecast {
        /// Target term label, e.g. "Spring 2026" (config default when omitted)
        #[arg(short, long)]
        term: Option<String>,

        /// Sequencing-map CSV with a campus column and per-quarter course columns
        #[arg(short, long)]
        sequence_map: PathBuf,

        /// Feeder enrollment CSV, flat term export or master schedule
        #[arg(short, long)]
        enrollment: PathBuf,

        /// Farther-feeder enrollment CSV (required with flat term exports)
        #[arg(long)]
        farther_enrollment: Option<PathBuf>,

        /// Previous forecast CSV for change comparison
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Subject prefix to track
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,

        /// Config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Per-section capacity override
        #[arg(long)]
        capacity: Option<u32>,

        /// Per-quarter progression rate override
        #[arg(long)]
        rate: Option<f64>,

        /// Demand buffer percentage override
        #[arg(long)]
        buffer: Option<f64>,

        /// Output CSV file (prints JSON to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Scale a feeder-quarter forecast into an off-sequence term by historical ratio
    Ratio {
        /// Target term label, e.g. "Summer 2026"
        #[arg(short, long)]
        term: String,

        /// Forecast CSV for the target's closer feeder quarter
        #[arg(short, long)]
        feeder_forecast: PathBuf,

        /// Historical enrollment CSV (master-schedule columns)
        #[arg(long)]
        history: PathBuf,

        /// Legacy course-code crosswalk CSV
        #[arg(long)]
        crosswalk: Option<PathBuf>,

        /// Subject prefix to track
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,

        /// Config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Per-section capacity override
        #[arg(long)]
        capacity: Option<u32>,

        /// Fallback ratio override
        #[arg(long)]
        default_ratio: Option<f64>,

        /// Demand buffer percentage override
        #[arg(long)]
        buffer: Option<f64>,

        /// Output CSV file (prints JSON to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Blend prophet, ets, and arima forecasts over historical enrollment
    Ensemble {
        /// Historical enrollment CSV (master-schedule columns)
        #[arg(long)]
        history: PathBuf,

        /// Single course, e.g. "FOUN 110" (all courses when omitted)
        #[arg(long)]
        course: Option<String>,

        /// Quarters ahead to forecast (config default when omitted)
        #[arg(short, long)]
        periods: Option<usize>,

        /// Blend weights as "prophet,ets,arima"
        #[arg(short, long)]
        weights: Option<String>,

        /// Legacy course-code crosswalk CSV
        #[arg(long)]
        crosswalk: Option<PathBuf>,

        /// Subject prefix to track
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,

        /// Config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Cross-validate the ensemble on one course's history
    Validate {
        /// Historical enrollment CSV (master-schedule columns)
        #[arg(long)]
        history: PathBuf,

        /// Course to score, e.g. "FOUN 110"
        #[arg(long)]
        course: String,

        /// Minimum training observations per fold
        #[arg(long, default_value = "8")]
        min_train: usize,

        /// Forecast horizon per fold
        #[arg(long, default_value = "1")]
        horizon: usize,

        /// Fold step size
        #[arg(long, default_value = "1")]
        step: usize,

        /// Blend weights as "prophet,ets,arima"
        #[arg(short, long)]
        weights: Option<String>,

        /// Legacy course-code crosswalk CSV
        #[arg(long)]
        crosswalk: Option<PathBuf>,

        /// Subject prefix to track
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Search the weight grid for the best cross-validated blend
    Optimize {
        /// Historical enrollment CSV (master-schedule columns)
        #[arg(long)]
        history: PathBuf,

        /// Course to tune on, e.g. "FOUN 110"
        #[arg(long)]
        course: String,

        /// Minimum training observations per fold
        #[arg(long, default_value = "8")]
        min_train: usize,

        /// Forecast horizon per fold
        #[arg(long, default_value = "1")]
        horizon: usize,

        /// Fold step size
        #[arg(long, default_value = "1")]
        step: usize,

        /// Weight grid spacing
        #[arg(long, default_value = "0.05")]
        weight_step: f64,

        /// Error metric to minimize (mae, rmse, mape)
        #[arg(short, long, default_value = "rmse")]
        metric: String,

        /// Legacy course-code crosswalk CSV
        #[arg(long)]
        crosswalk: Option<PathBuf>,

        /// Subject prefix to track
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available and forecastable terms in an enrollment history
    Terms {
        /// Master-schedule enrollment CSV
        #[arg(short, long)]
        enrollment: PathBuf,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run stationarity and seasonality diagnostics over course histories
    Diagnose {
        /// Historical enrollment CSV (master-schedule columns)
        #[arg(long)]
        history: PathBuf,

        /// Single course, e.g. "FOUN 110" (all courses when omitted)
        #[arg(long)]
        course: Option<String>,

        /// Legacy course-code crosswalk CSV
        #[arg(long)]
        crosswalk: Option<PathBuf>,

        /// Subject prefix to track
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,

        /// Output file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or update the config file
    Config {
        /// Config JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Override an entry as KEY=VALUE (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Open a CSV file behind a buffered reader
fn open_csv(path: &PathBuf) -> CliResult<csv::Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| format!("Failed to open {:?}: {}", path, e))?;
    Ok(csv::Reader::from_reader(BufReader::new(file)))
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn cell(record: &csv::StringRecord, index: Option<usize>) -> String {
    index
        .and_then(|i| record.get(i))
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Seat column of a forecast CSV
///
/// `projected_seats` when present, otherwise the first column with the
/// older `<quarter>_projected_seats` naming.
fn seats_column(headers: &csv::StringRecord) -> Option<usize> {
    column_index(headers, "projected_seats").or_else(|| {
        headers
            .iter()
            .position(|h| h.trim().to_ascii_lowercase().ends_with("_projected_seats"))
    })
}

/// Load sequencing-map rows from a CSV with campus and quarter columns
fn load_sequence_rows(path: &PathBuf) -> CliResult<Vec<SequenceRow>> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read headers: {}", e))?
        .clone();
    let campus_idx = column_index(&headers, "campus")
        .ok_or_else(|| format!("{:?} has no 'campus' column", path))?;
    let quarter_indices: Vec<(Quarter, usize)> = Quarter::all()
        .into_iter()
        .filter_map(|quarter| column_index(&headers, quarter.name()).map(|i| (quarter, i)))
        .collect();
    if quarter_indices.is_empty() {
        return Err(format!("{:?} has no quarter columns", path));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| format!("Failed to read record: {}", e))?;
        rows.push(SequenceRow {
            campus_cell: cell(&record, Some(campus_idx)),
            quarter_cells: quarter_indices
                .iter()
                .map(|(quarter, i)| (*quarter, cell(&record, Some(*i))))
                .collect(),
        });
    }
    Ok(rows)
}

/// Enrollment CSV rows in whichever schema the header row declared
enum EnrollmentFile {
    Flat(Vec<FlatSectionRow>),
    Master(Vec<MasterScheduleRow>),
}

/// Load an enrollment CSV, detecting the schema from its header row
fn load_enrollment_rows(path: &PathBuf) -> CliResult<EnrollmentFile> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read headers: {}", e))?
        .clone();
    let names: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let schema = EnrollmentSchema::detect(&names).map_err(|e| e.to_string())?;

    match schema {
        EnrollmentSchema::FlatTerm => {
            let course_idx = column_index(&headers, "Course");
            let enrollment_idx = column_index(&headers, "Enrollment");
            let room_idx = column_index(&headers, "Room");
            let section_idx = column_index(&headers, "Section #");
            let mut rows = Vec::new();
            for result in reader.records() {
                let record = result.map_err(|e| format!("Failed to read record: {}", e))?;
                rows.push(FlatSectionRow {
                    course: cell(&record, course_idx),
                    enrollment: cell(&record, enrollment_idx),
                    room: cell(&record, room_idx),
                    section: cell(&record, section_idx),
                });
            }
            Ok(EnrollmentFile::Flat(rows))
        }
        EnrollmentSchema::MasterSchedule => {
            let term_idx = column_index(&headers, "TERM");
            let subject_idx = column_index(&headers, "SUBJ");
            let number_idx = column_index(&headers, "CRS NUMBER");
            let enrollment_idx = column_index(&headers, "ACT ENR");
            let campus_idx = column_index(&headers, "CAMPUS");
            let mut rows = Vec::new();
            for result in reader.records() {
                let record = result.map_err(|e| format!("Failed to read record: {}", e))?;
                rows.push(MasterScheduleRow {
                    term: cell(&record, term_idx),
                    subject: cell(&record, subject_idx),
                    course_number: cell(&record, number_idx),
                    enrollment: cell(&record, enrollment_idx),
                    campus: cell(&record, campus_idx),
                });
            }
            Ok(EnrollmentFile::Master(rows))
        }
    }
}

/// Reduce loaded enrollment rows to campus × course totals
///
/// The term filter applies to master schedules only; a flat export is a
/// single-term file by construction.
fn aggregate_enrollment(
    file: &EnrollmentFile,
    pattern: &CoursePattern,
    term: Option<TermCode>,
) -> EnrollmentLoad {
    match file {
        EnrollmentFile::Flat(rows) => aggregate_flat_rows(rows, pattern),
        EnrollmentFile::Master(rows) => aggregate_master_rows(rows, pattern, term),
    }
}

/// Load master-schedule rows, rejecting flat exports
fn load_master_rows(path: &PathBuf) -> CliResult<Vec<MasterScheduleRow>> {
    match load_enrollment_rows(path)? {
        EnrollmentFile::Master(rows) => Ok(rows),
        EnrollmentFile::Flat(_) => Err(format!(
            "{:?} is a flat term export; this command needs master-schedule columns (TERM)",
            path
        )),
    }
}

/// Load a legacy → current course-code crosswalk CSV
fn load_crosswalk(path: &PathBuf) -> CliResult<Crosswalk> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read headers: {}", e))?
        .clone();
    let legacy_idx = column_index(&headers, "legacy_code")
        .ok_or_else(|| format!("{:?} has no 'legacy_code' column", path))?;
    let current_idx = column_index(&headers, "foun_code")
        .ok_or_else(|| format!("{:?} has no 'foun_code' column", path))?;

    let mut crosswalk = Crosswalk::new();
    for result in reader.records() {
        let record = result.map_err(|e| format!("Failed to read record: {}", e))?;
        let legacy = cell(&record, Some(legacy_idx));
        let current = cell(&record, Some(current_idx));
        if !legacy.is_empty() && !current.is_empty() {
            crosswalk.insert(&legacy, &current);
        }
    }
    Ok(crosswalk)
}

fn load_optional_crosswalk(path: Option<&PathBuf>) -> CliResult<Crosswalk> {
    match path {
        Some(path) => load_crosswalk(path),
        None => Ok(Crosswalk::new()),
    }
}

/// Build the historical table from master-schedule rows
///
/// The crosswalk applies to the raw subject + number string before the
/// course filter, so remapped legacy codes survive it. Returns the table
/// and the count of rows skipped for an unusable course or term.
fn load_history(
    path: &PathBuf,
    pattern: &CoursePattern,
    crosswalk: &Crosswalk,
) -> CliResult<(HistoricalTable, usize)> {
    let rows = load_master_rows(path)?;
    let mut table = HistoricalTable::new();
    let mut skipped = 0usize;
    for row in &rows {
        let raw = format!("{} {}", row.subject.trim(), row.course_number.trim());
        let mapped = crosswalk.apply(&raw);
        let Some(course) = pattern.extract(&mapped).into_iter().next() else {
            skipped += 1;
            continue;
        };
        let Ok(term) = TermCode::parse(&row.term) else {
            skipped += 1;
            continue;
        };
        table.add(course, term, parse_seat_count(&row.enrollment));
    }
    if skipped > 0 {
        debug!(rows = skipped, "history rows skipped");
    }
    Ok((table, skipped))
}

/// Load forecast rows written by an earlier run
fn load_forecast_rows(path: &PathBuf) -> CliResult<(Vec<ForecastRow>, usize)> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read headers: {}", e))?
        .clone();
    let course_idx = column_index(&headers, "course")
        .ok_or_else(|| format!("{:?} has no 'course' column", path))?;
    let campus_idx = column_index(&headers, "campus")
        .ok_or_else(|| format!("{:?} has no 'campus' column", path))?;
    let seats_idx =
        seats_column(&headers).ok_or_else(|| format!("{:?} has no projected_seats column", path))?;
    let sections_idx = column_index(&headers, "sections");
    let method_idx = column_index(&headers, "method");

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let record = result.map_err(|e| format!("Failed to read record: {}", e))?;
        let course = cell(&record, Some(course_idx));
        let Some(campus) = Campus::from_code(&cell(&record, Some(campus_idx))) else {
            skipped += 1;
            continue;
        };
        if course.is_empty() {
            skipped += 1;
            continue;
        }
        let method = cell(&record, method_idx);
        rows.push(ForecastRow {
            course: CourseCode::from_normalized(course),
            campus,
            projected_seats: parse_seat_count(&cell(&record, Some(seats_idx))),
            sections: cell(&record, sections_idx).parse().unwrap_or(0),
            method: if method.is_empty() {
                PROPAGATION_METHOD.to_string()
            } else {
                method
            },
        });
    }
    Ok((rows, skipped))
}

/// Load a previous forecast keyed by (course, campus) for change deltas
fn load_previous_forecast(path: &PathBuf) -> CliResult<BTreeMap<(String, String), f64>> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read headers: {}", e))?
        .clone();
    let course_idx = column_index(&headers, "course")
        .ok_or_else(|| format!("{:?} has no 'course' column", path))?;
    let campus_idx = column_index(&headers, "campus")
        .ok_or_else(|| format!("{:?} has no 'campus' column", path))?;
    let seats_idx =
        seats_column(&headers).ok_or_else(|| format!("{:?} has no projected_seats column", path))?;

    let mut previous = BTreeMap::new();
    for result in reader.records() {
        let record = result.map_err(|e| format!("Failed to read record: {}", e))?;
        let course = cell(&record, Some(course_idx));
        if course.is_empty() {
            continue;
        }
        if let Ok(seats) = cell(&record, Some(seats_idx)).parse::<f64>() {
            previous.insert((course, cell(&record, Some(campus_idx))), seats);
        }
    }
    Ok(previous)
}

/// Load the config file when given, falling back to defaults
fn load_config(path: Option<&PathBuf>) -> CliResult<ForecastConfig> {
    match path {
        Some(path) => {
            let file =
                File::open(path).map_err(|e| format!("Failed to open config {:?}: {}", path, e))?;
            serde_json::from_reader(BufReader::new(file))
                .map_err(|e| format!("Failed to parse config: {}", e))
        }
        None => Ok(ForecastConfig::default()),
    }
}

/// Parse a "prophet,ets,arima" weight triple
fn parse_weights(raw: Option<&str>) -> CliResult<ModelWeights> {
    let Some(raw) = raw else {
        return Ok(ModelWeights::default());
    };
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("Expected 'prophet,ets,arima' weights, got '{}'", raw));
    }
    let mut values = [0.0f64; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("Invalid weight '{}'", part))?;
    }
    let weights = ModelWeights::new(values[0], values[1], values[2]);
    weights.validate().map_err(|e| e.to_string())?;
    Ok(weights)
}

fn parse_course(raw: &str, pattern: &CoursePattern) -> CliResult<CourseCode> {
    pattern
        .extract(raw)
        .into_iter()
        .next()
        .ok_or_else(|| format!("'{}' contains no {} course code", raw, pattern.subject()))
}

/// One forecast row as JSON, with change columns when a previous run is given
fn row_json(
    row: &ForecastRow,
    previous: Option<&BTreeMap<(String, String), f64>>,
) -> serde_json::Value {
    let mut value = serde_json::json!({
        "course": row.course.as_str(),
        "campus": row.campus.to_string(),
        "projected_seats": round2(row.projected_seats),
        "sections": row.sections,
        "method": row.method,
    });
    if let Some(previous) = previous {
        let prev = previous
            .get(&(row.course.as_str().to_string(), row.campus.to_string()))
            .copied();
        value["previous_seats"] = serde_json::json!(prev.map(round2));
        value["change"] = serde_json::json!(prev.map(|p| round2(row.projected_seats - p)));
        value["change_percent"] = serde_json::json!(prev
            .filter(|p| *p > 0.0)
            .map(|p| round1((row.projected_seats - p) / p * 100.0)));
    }
    value
}

/// Write forecast rows as CSV, seats to two decimals
fn write_forecast_csv(
    path: &PathBuf,
    rows: &[ForecastRow],
    previous: Option<&BTreeMap<(String, String), f64>>,
) -> CliResult<()> {
    let file = File::create(path).map_err(|e| format!("Failed to create output: {}", e))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec!["course", "campus", "projected_seats", "sections", "method"];
    if previous.is_some() {
        header.extend(["previous_seats", "change", "change_percent"]);
    }
    writer
        .write_record(&header)
        .map_err(|e| format!("Failed to write CSV: {}", e))?;

    for row in rows {
        let mut record = vec![
            row.course.as_str().to_string(),
            row.campus.to_string(),
            format!("{:.2}", row.projected_seats),
            row.sections.to_string(),
            row.method.clone(),
        ];
        if let Some(previous) = previous {
            match previous.get(&(row.course.as_str().to_string(), row.campus.to_string())) {
                Some(prev) => {
                    let change = row.projected_seats - prev;
                    record.push(format!("{:.2}", prev));
                    record.push(format!("{:.2}", change));
                    record.push(if *prev > 0.0 {
                        format!("{:.1}", change / prev * 100.0)
                    } else {
                        String::new()
                    });
                }
                None => record.extend([String::new(), String::new(), String::new()]),
            }
        }
        writer
            .write_record(&record)
            .map_err(|e| format!("Failed to write CSV: {}", e))?;
    }
    writer
        .flush()
        .map_err(|e| format!("Failed to write CSV: {}", e))
}

/// Write a JSON document to a file or stdout
fn write_json(document: &serde_json::Value, output: Option<&PathBuf>) -> CliResult<()> {
    if let Some(path) = output {
        let mut file = File::create(path).map_err(|e| format!("Failed to create output: {}", e))?;
        serde_json::to_writer_pretty(&mut file, document)
            .map_err(|e| format!("Failed to write JSON: {}", e))?;
        println!("Results written to {:?}", path);
    } else {
        println!("{}", serde_json::to_string_pretty(document).unwrap());
    }
    Ok(())
}

/// Run the sequence-propagation forecast command
#[allow(clippy::too_many_arguments)]
fn run_forecast(
    term: Option<String>,
    sequence_map: PathBuf,
    enrollment: PathBuf,
    farther_enrollment: Option<PathBuf>,
    previous: Option<PathBuf>,
    subject: String,
    config_path: Option<PathBuf>,
    capacity: Option<u32>,
    rate: Option<f64>,
    buffer: Option<f64>,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let mut config = load_config(config_path.as_ref())?;
    if let Some(capacity) = capacity {
        config.capacity = capacity;
    }
    if let Some(rate) = rate {
        config.progression_rate = rate;
    }
    if let Some(buffer) = buffer {
        config.buffer_percent = buffer;
    }
    config.validate().map_err(|e| e.to_string())?;

    let term = term.unwrap_or_else(|| config.default_term.clone());
    let info = resolve_term_info(&term).map_err(|e| e.to_string())?;
    let pattern = CoursePattern::new(&subject).map_err(|e| e.to_string())?;

    let sequence_rows = load_sequence_rows(&sequence_map)?;
    let (graph, graph_report) = SequenceGraph::build(&sequence_rows, &info, &pattern);
    println!(
        "Loaded {} sequencing rows ({} used) from {:?}",
        graph_report.rows_seen,
        graph_report.rows_used,
        sequence_map.file_name().unwrap_or_default()
    );
    if !graph_report.unknown_campus_tokens.is_empty() {
        println!(
            "Unknown campus tokens: {}",
            graph_report.unknown_campus_tokens.join(", ")
        );
    }
    if graph.is_empty() {
        return Err(format!(
            "no sequencing rows produce {} targets; use the ratio command for off-sequence quarters",
            info.target_quarter
        ));
    }

    let enrollment_file = load_enrollment_rows(&enrollment)?;
    let (closer, farther) = match &enrollment_file {
        EnrollmentFile::Master(_) => {
            let closer =
                aggregate_enrollment(&enrollment_file, &pattern, Some(info.closer.term_code));
            let farther = match &farther_enrollment {
                Some(path) => aggregate_enrollment(
                    &load_enrollment_rows(path)?,
                    &pattern,
                    Some(info.farther.term_code),
                ),
                None => {
                    aggregate_enrollment(&enrollment_file, &pattern, Some(info.farther.term_code))
                }
            };
            (closer, farther)
        }
        EnrollmentFile::Flat(_) => {
            let farther_path = farther_enrollment.as_ref().ok_or_else(|| {
                "flat term exports carry no term column; pass --farther-enrollment for the farther feeder"
                    .to_string()
            })?;
            let closer = aggregate_enrollment(&enrollment_file, &pattern, None);
            let farther = aggregate_enrollment(
                &load_enrollment_rows(farther_path)?,
                &pattern,
                Some(info.farther.term_code),
            );
            (closer, farther)
        }
    };
    println!(
        "Feeder seats: {:.0} in {} ({}), {:.0} in {} ({})",
        closer.totals.total_seats(),
        info.closer.term_code.label(),
        info.closer.term_code,
        farther.totals.total_seats(),
        info.farther.term_code.label(),
        info.farther.term_code
    );

    let forecast = run_sequence_forecast(&graph, &closer.totals, &farther.totals, &config);
    let summary = summarize(&forecast.rows);
    println!(
        "{}: {:.1} seats across {} sections for {} courses ({})",
        info.target_code.label(),
        summary.total_seats,
        summary.total_sections,
        summary.courses,
        PROPAGATION_METHOD
    );
    if forecast.report.unmapped_feeder_courses > 0 {
        println!(
            "{} of {} feeder courses had no sequence mapping",
            forecast.report.unmapped_feeder_courses, forecast.report.feeder_courses
        );
    }

    let previous_map = match &previous {
        Some(path) => Some(load_previous_forecast(path)?),
        None => None,
    };

    match &output {
        Some(path) => {
            write_forecast_csv(path, &forecast.rows, previous_map.as_ref())?;
            println!("Forecast written to {:?}", path);
        }
        None => {
            let rows: Vec<serde_json::Value> = forecast
                .rows
                .iter()
                .map(|row| row_json(row, previous_map.as_ref()))
                .collect();
            let document = serde_json::json!({
                "term": info.target_code.label(),
                "term_code": info.target_code.to_string(),
                "method": PROPAGATION_METHOD,
                "rows": rows,
                "summary": {
                    "total_seats": round2(summary.total_seats),
                    "total_sections": summary.total_sections,
                    "courses": summary.courses,
                },
                "report": {
                    "sequence_rows_seen": graph_report.rows_seen,
                    "sequence_rows_used": graph_report.rows_used,
                    "sequence_rows_skipped": graph_report.rows_skipped,
                    "unknown_campus_tokens": graph_report.unknown_campus_tokens,
                    "enrollment_rows_filtered":
                        closer.report.rows_filtered + farther.report.rows_filtered,
                    "unknown_campus_rows":
                        closer.report.unknown_campus_rows + farther.report.unknown_campus_rows,
                    "feeder_courses": forecast.report.feeder_courses,
                    "unmapped_feeder_courses": forecast.report.unmapped_feeder_courses,
                },
            });
            println!("{}", serde_json::to_string_pretty(&document).unwrap());
        }
    }
    Ok(())
}

/// Run the historical-ratio fallback command
#[allow(clippy::too_many_arguments)]
fn run_ratio(
    term: String,
    feeder_forecast: PathBuf,
    history: PathBuf,
    crosswalk: Option<PathBuf>,
    subject: String,
    config_path: Option<PathBuf>,
    capacity: Option<u32>,
    default_ratio: Option<f64>,
    buffer: Option<f64>,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let mut config = load_config(config_path.as_ref())?;
    if let Some(capacity) = capacity {
        config.capacity = capacity;
    }
    if let Some(default_ratio) = default_ratio {
        config.default_ratio = default_ratio;
    }
    if let Some(buffer) = buffer {
        config.buffer_percent = buffer;
    }
    config.validate().map_err(|e| e.to_string())?;

    let info = resolve_term_info(&term).map_err(|e| e.to_string())?;
    let pattern = CoursePattern::new(&subject).map_err(|e| e.to_string())?;

    let (feeder_rows, feeder_skipped) = load_forecast_rows(&feeder_forecast)?;
    println!(
        "Loaded {} feeder rows from {:?} ({} skipped)",
        feeder_rows.len(),
        feeder_forecast.file_name().unwrap_or_default(),
        feeder_skipped
    );

    let crosswalk = load_optional_crosswalk(crosswalk.as_ref())?;
    let (table, history_skipped) = load_history(&history, &pattern, &crosswalk)?;
    println!(
        "Loaded {} course-term totals from {:?} ({} rows skipped)",
        table.len(),
        history.file_name().unwrap_or_default(),
        history_skipped
    );

    let result = ratio_forecast(
        &feeder_rows,
        &table,
        info.target_quarter,
        info.closer.quarter,
        &config,
    );
    let summary = summarize(&result.rows);
    println!(
        "{}: {:.1} seats across {} sections for {} courses ({})",
        info.target_code.label(),
        summary.total_seats,
        summary.total_sections,
        summary.courses,
        RATIO_METHOD
    );
    if result.report.defaulted_ratio > 0 {
        println!(
            "{} courses used the default ratio {:.2}",
            result.report.defaulted_ratio, config.default_ratio
        );
    }
    if result.report.dropped_zero_sections > 0 {
        println!(
            "{} rows dropped at zero sections",
            result.report.dropped_zero_sections
        );
    }

    match &output {
        Some(path) => {
            write_forecast_csv(path, &result.rows, None)?;
            println!("Forecast written to {:?}", path);
        }
        None => {
            let rows: Vec<serde_json::Value> =
                result.rows.iter().map(|row| row_json(row, None)).collect();
            let document = serde_json::json!({
                "term": info.target_code.label(),
                "term_code": info.target_code.to_string(),
                "method": RATIO_METHOD,
                "feeder_quarter": info.closer.quarter.name(),
                "rows": rows,
                "summary": {
                    "total_seats": round2(summary.total_seats),
                    "total_sections": summary.total_sections,
                    "courses": summary.courses,
                },
                "report": {
                    "feeder_rows": result.report.feeder_rows,
                    "emitted": result.report.emitted,
                    "dropped_zero_sections": result.report.dropped_zero_sections,
                    "defaulted_ratio": result.report.defaulted_ratio,
                    "history_rows_skipped": history_skipped,
                },
            });
            println!("{}", serde_json::to_string_pretty(&document).unwrap());
        }
    }
    Ok(())
}

/// Run the ensemble forecast command
#[allow(clippy::too_many_arguments)]
fn run_ensemble(
    history: PathBuf,
    course: Option<String>,
    periods: Option<usize>,
    weights: Option<String>,
    crosswalk: Option<PathBuf>,
    subject: String,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let config = load_config(config_path.as_ref())?;
    config.validate().map_err(|e| e.to_string())?;
    let periods = periods.unwrap_or(config.quarters_to_forecast);
    let weights = parse_weights(weights.as_deref())?;
    let pattern = CoursePattern::new(&subject).map_err(|e| e.to_string())?;

    let crosswalk = load_optional_crosswalk(crosswalk.as_ref())?;
    let (table, skipped) = load_history(&history, &pattern, &crosswalk)?;
    println!(
        "Loaded {} course-term totals from {:?} ({} rows skipped)",
        table.len(),
        history.file_name().unwrap_or_default(),
        skipped
    );

    let courses = match &course {
        Some(raw) => {
            let course = parse_course(raw, &pattern)?;
            if table.course_series(&course).is_empty() {
                return Err(format!("No history for {}", course));
            }
            vec![course]
        }
        None => table.courses(),
    };
    if courses.is_empty() {
        return Err("History contains no matching courses".to_string());
    }

    let mut documents = Vec::new();
    for course in &courses {
        let observations = table.course_series(course);
        let Some(&(last_term, _)) = observations.last() else {
            continue;
        };
        let series = series_from_terms(&observations);
        let result = ensemble_forecast(&series, periods, &weights);

        let mut term = last_term;
        let mut forecasts = Vec::new();
        for step in 0..periods {
            term = term.next();
            let combined = result.combined[step];
            forecasts.push(serde_json::json!({
                "term_code": term.to_string(),
                "term": term.label(),
                "prophet": round2(result.predictions[&ModelKind::Prophet][step]),
                "ets": round2(result.predictions[&ModelKind::Ets][step]),
                "arima": round2(result.predictions[&ModelKind::Arima][step]),
                "combined": round2(combined),
                "sections": calculate_sections(combined, config.capacity, config.buffer_percent),
            }));
        }

        println!("{}: {} observations", course, series.len());
        if !result.failed_models.is_empty() {
            let names: Vec<&str> = result.failed_models.iter().map(|k| k.name()).collect();
            println!("  Failed models: {}", names.join(", "));
        }
        for (step, value) in result.combined.iter().enumerate() {
            println!("  Step {}: {:.2} seats", step + 1, value);
        }

        documents.push(serde_json::json!({
            "course": course.as_str(),
            "observations": series.len(),
            "failed_models": result.failed_models.iter().map(|k| k.name()).collect::<Vec<_>>(),
            "forecasts": forecasts,
        }));
    }

    let document = serde_json::json!({
        "method": "ensemble",
        "periods": periods,
        "weights": weights,
        "courses": documents,
    });
    write_json(&document, output.as_ref())
}

/// Run the cross-validation command
#[allow(clippy::too_many_arguments)]
fn run_validate(
    history: PathBuf,
    course: String,
    min_train: usize,
    horizon: usize,
    step: usize,
    weights: Option<String>,
    crosswalk: Option<PathBuf>,
    subject: String,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let weights = parse_weights(weights.as_deref())?;
    let pattern = CoursePattern::new(&subject).map_err(|e| e.to_string())?;
    let crosswalk = load_optional_crosswalk(crosswalk.as_ref())?;
    let (table, _) = load_history(&history, &pattern, &crosswalk)?;

    let course = parse_course(&course, &pattern)?;
    let series = series_from_terms(&table.course_series(&course));
    if series.is_empty() {
        return Err(format!("No history for {}", course));
    }
    println!("{}: {} observations", course, series.len());

    let report = cross_validate(&series, min_train, horizon, step, |train, h| {
        ensemble_forecast(train, h, &weights).combined
    })
    .map_err(|e| e.to_string())?;

    println!(
        "Scored {} folds ({} skipped)",
        report.scores.len(),
        report.skipped_folds
    );
    println!("MAE:  {:.3} ± {:.3}", report.mae_mean, report.mae_std);
    println!("RMSE: {:.3} ± {:.3}", report.rmse_mean, report.rmse_std);
    if let Some(mape) = report.mape_mean {
        println!("MAPE: {:.2}%", mape);
    }

    let scores: Vec<serde_json::Value> = report
        .scores
        .iter()
        .map(|s| {
            serde_json::json!({
                "fold": s.fold,
                "train_size": s.train_size,
                "mae": s.mae,
                "rmse": s.rmse,
                "mape": s.mape,
            })
        })
        .collect();
    let document = serde_json::json!({
        "course": course.as_str(),
        "observations": series.len(),
        "weights": weights,
        "folds": report.scores.len(),
        "skipped_folds": report.skipped_folds,
        "mae_mean": report.mae_mean,
        "mae_std": report.mae_std,
        "rmse_mean": report.rmse_mean,
        "rmse_std": report.rmse_std,
        "mape_mean": report.mape_mean,
        "scores": scores,
    });
    write_json(&document, output.as_ref())
}

/// Run the weight-search command
#[allow(clippy::too_many_arguments)]
fn run_optimize(
    history: PathBuf,
    course: String,
    min_train: usize,
    horizon: usize,
    step: usize,
    weight_step: f64,
    metric: String,
    crosswalk: Option<PathBuf>,
    subject: String,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let metric = OptimizationMetric::from_name(&metric)
        .ok_or_else(|| format!("Unknown metric: {}. Use 'mae', 'rmse', or 'mape'", metric))?;
    let pattern = CoursePattern::new(&subject).map_err(|e| e.to_string())?;
    let crosswalk = load_optional_crosswalk(crosswalk.as_ref())?;
    let (table, _) = load_history(&history, &pattern, &crosswalk)?;

    let course = parse_course(&course, &pattern)?;
    let series = series_from_terms(&table.course_series(&course));
    if series.is_empty() {
        return Err(format!("No history for {}", course));
    }
    println!("{}: {} observations", course, series.len());

    let result = optimize_weights(&series, min_train, horizon, step, weight_step, metric)
        .map_err(|e| e.to_string())?;

    println!(
        "Best weights: prophet={:.2} ets={:.2} arima={:.2}",
        result.weights.prophet, result.weights.ets, result.weights.arima
    );
    println!(
        "Score: {:.4} {} over {} folds ({} combinations)",
        result.score, result.metric, result.folds, result.combinations
    );

    let document = serde_json::json!({
        "course": course.as_str(),
        "observations": series.len(),
        "weights": result.weights,
        "score": result.score,
        "metric": result.metric.name(),
        "combinations": result.combinations,
        "folds": result.folds,
    });
    write_json(&document, output.as_ref())
}

/// Run the term-listing command
fn run_terms(enrollment: PathBuf, output: Option<PathBuf>) -> CliResult<()> {
    let rows = load_master_rows(&enrollment)?;
    let available = collect_terms(&rows);
    let forecastable = forecastable_terms(&available);

    let labels = |codes: &[TermCode]| {
        codes
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("Available terms: {}", labels(&available));
    println!("Forecastable terms: {}", labels(&forecastable));

    let terms_json = |codes: &[TermCode]| {
        codes
            .iter()
            .map(|c| serde_json::json!({"code": c.to_string(), "label": c.label()}))
            .collect::<Vec<_>>()
    };
    let document = serde_json::json!({
        "available": terms_json(&available),
        "forecastable": terms_json(&forecastable),
    });
    write_json(&document, output.as_ref())
}

/// Run the series-diagnostics command
fn run_diagnose(
    history: PathBuf,
    course: Option<String>,
    crosswalk: Option<PathBuf>,
    subject: String,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let pattern = CoursePattern::new(&subject).map_err(|e| e.to_string())?;
    let crosswalk = load_optional_crosswalk(crosswalk.as_ref())?;
    let (table, skipped) = load_history(&history, &pattern, &crosswalk)?;
    println!(
        "Loaded {} course-term totals from {:?} ({} rows skipped)",
        table.len(),
        history.file_name().unwrap_or_default(),
        skipped
    );

    let mut series_by_course: BTreeMap<CourseCode, Vec<f64>> = BTreeMap::new();
    match &course {
        Some(raw) => {
            let course = parse_course(raw, &pattern)?;
            let observations = table.course_series(&course);
            if observations.is_empty() {
                return Err(format!("No history for {}", course));
            }
            series_by_course.insert(course, series_from_terms(&observations));
        }
        None => {
            for course in table.courses() {
                let observations = table.course_series(&course);
                series_by_course.insert(course, series_from_terms(&observations));
            }
        }
    }

    let (results, summary) = analyze_courses(&series_by_course);
    println!(
        "Analyzed {} courses: {} stationary, {} non-stationary, {} insufficient data",
        summary.total_courses, summary.stationary, summary.non_stationary, summary.insufficient_data
    );
    if let Some(strength) = summary.avg_seasonal_strength {
        println!("Average seasonal strength: {:.2}", strength);
    }
    if !summary.strong_seasonality_courses.is_empty() {
        let names: Vec<&str> = summary
            .strong_seasonality_courses
            .iter()
            .map(|c| c.as_str())
            .collect();
        println!("Strong seasonality: {}", names.join(", "));
    }

    let document = serde_json::json!({
        "courses": results,
        "summary": summary,
    });
    write_json(&document, output.as_ref())
}

/// Run the config show/update command
fn run_config(file: PathBuf, set: Vec<String>) -> CliResult<()> {
    let mut config = match File::open(&file) {
        Ok(f) => serde_json::from_reader(BufReader::new(f))
            .map_err(|e| format!("Failed to parse config: {}", e))?,
        Err(_) => ForecastConfig::default(),
    };

    for entry in &set {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", entry))?;
        apply_config_entry(&mut config, key.trim(), value.trim())?;
    }
    config.validate().map_err(|e| e.to_string())?;

    if !set.is_empty() {
        let mut out =
            File::create(&file).map_err(|e| format!("Failed to create config {:?}: {}", file, e))?;
        serde_json::to_writer_pretty(&mut out, &config)
            .map_err(|e| format!("Failed to write config: {}", e))?;
        println!("Config written to {:?}", file);
    }
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
    Ok(())
}

fn apply_config_entry(config: &mut ForecastConfig, key: &str, value: &str) -> CliResult<()> {
    match key {
        "capacity" => {
            config.capacity = value
                .parse()
                .map_err(|_| format!("Invalid capacity '{}'", value))?;
        }
        "progression_rate" => {
            config.progression_rate = value
                .parse()
                .map_err(|_| format!("Invalid progression_rate '{}'", value))?;
        }
        "buffer_percent" => {
            config.buffer_percent = value
                .parse()
                .map_err(|_| format!("Invalid buffer_percent '{}'", value))?;
        }
        "default_ratio" => {
            config.default_ratio = value
                .parse()
                .map_err(|_| format!("Invalid default_ratio '{}'", value))?;
        }
        "quarters_to_forecast" => {
            config.quarters_to_forecast = value
                .parse()
                .map_err(|_| format!("Invalid quarters_to_forecast '{}'", value))?;
        }
        "default_term" => config.default_term = value.to_string(),
        _ => {
            return Err(format!(
                "Unknown config key '{}'. Known keys: capacity, progression_rate, buffer_percent, default_ratio, quarters_to_forecast, default_term",
                key
            ))
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatcast=info,seatcast_core=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Forecast {
            term,
            sequence_map,
            enrollment,
            farther_enrollment,
            previous,
            subject,
            config,
            capacity,
            rate,
            buffer,
            output,
        } => run_forecast(
            term,
            sequence_map,
            enrollment,
            farther_enrollment,
            previous,
            subject,
            config,
            capacity,
            rate,
            buffer,
            output,
        ),

        Commands::Ratio {
            term,
            feeder_forecast,
            history,
            crosswalk,
            subject,
            config,
            capacity,
            default_ratio,
            buffer,
            output,
        } => run_ratio(
            term,
            feeder_forecast,
            history,
            crosswalk,
            subject,
            config,
            capacity,
            default_ratio,
            buffer,
            output,
        ),

        Commands::Ensemble {
            history,
            course,
            periods,
            weights,
            crosswalk,
            subject,
            config,
            output,
        } => run_ensemble(
            history, course, periods, weights, crosswalk, subject, config, output,
        ),

        Commands::Validate {
            history,
            course,
            min_train,
            horizon,
            step,
            weights,
            crosswalk,
            subject,
            output,
        } => run_validate(
            history, course, min_train, horizon, step, weights, crosswalk, subject, output,
        ),

        Commands::Optimize {
            history,
            course,
            min_train,
            horizon,
            step,
            weight_step,
            metric,
            crosswalk,
            subject,
            output,
        } => run_optimize(
            history,
            course,
            min_train,
            horizon,
            step,
            weight_step,
            metric,
            crosswalk,
            subject,
            output,
        ),

        Commands::Terms { enrollment, output } => run_terms(enrollment, output),

        Commands::Diagnose {
            history,
            course,
            crosswalk,
            subject,
            output,
        } => run_diagnose(history, course, crosswalk, subject, output),

        Commands::Config { file, set } => run_config(file, set),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
