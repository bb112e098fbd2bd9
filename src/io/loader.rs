//! CSV loaders for the three line exports
//!
//! The exports use `;` as field delimiter and `,` as decimal separator by
//! default. Row-level problems (unparseable timestamp, missing value,
//! unresolvable arepa type) skip the row and are counted in a `LoadReport`;
//! file-level problems (unreadable file, missing required column, malformed
//! CSV) are fatal `LoadError`s.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::StringRecord;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::defaults;
use crate::io::timestamp::parse_timestamp;
use crate::types::{
    BatchRegistryEntry, CookingMetricRecord, CookingMetrics, FaultyInterval, MetricSchema,
};

// ============================================================================
// Column Names
// ============================================================================

pub const MACHINE_ID: &str = "machine_id";
pub const AREPA_TYPE: &str = "arepa_type";
pub const TIMESTAMP: &str = "timestamp";
pub const BATCH_ID: &str = "batch_id";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";

/// Only this many row-level problems are logged individually per file
const MAX_LOGGED_ROW_ERRORS: usize = 10;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("malformed CSV in {origin}: {source}")]
    Csv { origin: String, source: csv::Error },

    #[error("{origin} is missing required column '{column}'")]
    MissingColumn { origin: String, column: &'static str },
}

// ============================================================================
// CSV Format
// ============================================================================

/// Delimiter and decimal separator of the input exports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub decimal_separator: char,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: defaults::CSV_DELIMITER,
            decimal_separator: defaults::DECIMAL_SEPARATOR,
        }
    }
}

impl CsvFormat {
    /// Parse a numeric cell honouring the decimal separator.
    ///
    /// Returns `None` for non-numeric and non-finite values.
    pub fn parse_number(&self, cell: &str) -> Option<f64> {
        let cell = cell.trim();
        let value = if self.decimal_separator == '.' {
            cell.parse::<f64>().ok()?
        } else {
            cell.replace(self.decimal_separator, ".").parse::<f64>().ok()?
        };
        value.is_finite().then_some(value)
    }

    fn reader<R: Read>(&self, reader: R) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader)
    }
}

/// Cell carries no value (pandas-style missing markers included)
fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty()
        || cell.eq_ignore_ascii_case("nan")
        || cell.eq_ignore_ascii_case("null")
        || cell == "-"
}

// ============================================================================
// Load Report
// ============================================================================

/// Row accounting for one loaded file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub origin: String,
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub bad_timestamp: usize,
    pub missing_value: usize,
    pub unresolved_arepa_type: usize,
}

impl LoadReport {
    fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            ..Self::default()
        }
    }

    pub fn skipped(&self) -> usize {
        self.bad_timestamp + self.missing_value + self.unresolved_arepa_type
    }

    fn skip(&mut self, line: u64, reason: SkipReason) {
        match reason {
            SkipReason::BadTimestamp => self.bad_timestamp += 1,
            SkipReason::MissingValue => self.missing_value += 1,
            SkipReason::UnresolvedArepaType => self.unresolved_arepa_type += 1,
        }
        if self.skipped() <= MAX_LOGGED_ROW_ERRORS {
            warn!(file = %self.origin, line, reason = reason.as_str(), "Skipping row");
        }
    }

    fn log(&self) {
        info!(
            file = %self.origin,
            rows = self.rows_read,
            loaded = self.rows_loaded,
            skipped = self.skipped(),
            "Loaded"
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum SkipReason {
    BadTimestamp,
    MissingValue,
    UnresolvedArepaType,
}

impl SkipReason {
    fn as_str(self) -> &'static str {
        match self {
            SkipReason::BadTimestamp => "unparseable timestamp",
            SkipReason::MissingValue => "missing value",
            SkipReason::UnresolvedArepaType => "arepa type not resolvable from batch registry",
        }
    }
}

// ============================================================================
// Header Mapping
// ============================================================================

/// Header names (trimmed) and a case-insensitive lookup
struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    fn from_record(record: &StringRecord) -> Self {
        let names: Vec<String> = record.iter().map(|h| h.trim().to_string()).collect();
        let mut index = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            index.entry(name.to_lowercase()).or_insert(i);
        }
        Self { names, index }
    }

    fn find(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    fn require(&self, column: &'static str, origin: &str) -> Result<usize, LoadError> {
        self.find(column).ok_or_else(|| LoadError::MissingColumn {
            origin: origin.to_string(),
            column,
        })
    }
}

fn read_all<R: Read>(
    reader: R,
    origin: &str,
    format: &CsvFormat,
) -> Result<(Header, Vec<StringRecord>), LoadError> {
    let csv_err = |source| LoadError::Csv {
        origin: origin.to_string(),
        source,
    };
    let mut rdr = format.reader(reader);
    let header = Header::from_record(rdr.headers().map_err(csv_err)?);
    let rows = rdr
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)?;
    Ok((header, rows))
}

fn open(path: &Path) -> Result<(File, String), LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((file, path.display().to_string()))
}

fn cell(row: &StringRecord, idx: usize) -> &str {
    row.get(idx).unwrap_or("")
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map_or(0, csv::Position::line)
}

// ============================================================================
// Cooking Metrics
// ============================================================================

/// Load the cooking-metrics export.
///
/// `arepa_type` comes from its own column when present; otherwise (or when
/// the cell is empty) it is resolved through the batch registry by `batch_id`.
pub fn load_cooking_metrics(
    path: impl AsRef<Path>,
    format: &CsvFormat,
    registry: &[BatchRegistryEntry],
) -> Result<(CookingMetrics, LoadReport), LoadError> {
    let (file, origin) = open(path.as_ref())?;
    read_cooking_metrics(file, &origin, format, registry)
}

pub fn read_cooking_metrics<R: Read>(
    reader: R,
    origin: &str,
    format: &CsvFormat,
    registry: &[BatchRegistryEntry],
) -> Result<(CookingMetrics, LoadReport), LoadError> {
    let (header, rows) = read_all(reader, origin, format)?;

    let machine_col = header.require(MACHINE_ID, origin)?;
    let timestamp_col = header.require(TIMESTAMP, origin)?;
    let arepa_col = header.find(AREPA_TYPE);
    let batch_col = header.find(BATCH_ID);
    if arepa_col.is_none() && batch_col.is_none() {
        return Err(LoadError::MissingColumn {
            origin: origin.to_string(),
            column: AREPA_TYPE,
        });
    }

    let reserved = [Some(machine_col), Some(timestamp_col), arepa_col, batch_col];
    let metric_cols: Vec<usize> = (0..header.names.len())
        .filter(|i| !reserved.contains(&Some(*i)))
        .filter(|&i| is_metric_column(&rows, i, format))
        .collect();
    let schema = MetricSchema::new(metric_cols.iter().map(|&i| header.names[i].clone()));

    let ignored: Vec<&str> = (0..header.names.len())
        .filter(|i| !reserved.contains(&Some(*i)) && !metric_cols.contains(i))
        .map(|i| header.names[i].as_str())
        .collect();
    debug!(file = %origin, metrics = ?schema.names(), ignored = ?ignored, "Metric schema detected");

    let arepa_by_batch: HashMap<&str, &str> = registry
        .iter()
        .filter_map(|e| Some((e.batch_id.as_deref()?, e.arepa_type.as_deref()?)))
        .collect();

    let mut report = LoadReport::new(origin);
    let mut records = Vec::with_capacity(rows.len());

    for row in &rows {
        report.rows_read += 1;
        let line = line_of(row);

        let machine_id = cell(row, machine_col);
        if is_missing(machine_id) {
            report.skip(line, SkipReason::MissingValue);
            continue;
        }

        let Ok(timestamp) = parse_timestamp(cell(row, timestamp_col)) else {
            report.skip(line, SkipReason::BadTimestamp);
            continue;
        };

        let batch_id = batch_col
            .map(|i| cell(row, i))
            .filter(|c| !is_missing(c))
            .map(str::to_string);

        let arepa_type = arepa_col
            .map(|i| cell(row, i))
            .filter(|c| !is_missing(c))
            .or_else(|| {
                batch_id
                    .as_deref()
                    .and_then(|b| arepa_by_batch.get(b).copied())
            });
        let Some(arepa_type) = arepa_type else {
            report.skip(line, SkipReason::UnresolvedArepaType);
            continue;
        };

        let metrics: Option<Vec<f64>> = metric_cols
            .iter()
            .map(|&i| format.parse_number(cell(row, i)))
            .collect();
        let Some(metrics) = metrics else {
            report.skip(line, SkipReason::MissingValue);
            continue;
        };

        records.push(CookingMetricRecord {
            machine_id: machine_id.to_string(),
            arepa_type: arepa_type.to_string(),
            timestamp,
            batch_id,
            metrics,
        });
    }

    report.rows_loaded = records.len();
    report.log();
    Ok((CookingMetrics::new(schema, records), report))
}

/// A column is a metric when every present cell is numeric.
///
/// Columns with no values at all are only metrics when the file has no rows
/// (nothing to judge them by).
fn is_metric_column(rows: &[StringRecord], idx: usize, format: &CsvFormat) -> bool {
    let mut seen_value = false;
    for row in rows {
        let c = cell(row, idx);
        if is_missing(c) {
            continue;
        }
        if format.parse_number(c).is_none() {
            return false;
        }
        seen_value = true;
    }
    seen_value || rows.is_empty()
}

// ============================================================================
// Faulty Intervals
// ============================================================================

/// Load the faulty-intervals export (`machine_id`, `start_time`, `end_time`).
pub fn load_faulty_intervals(
    path: impl AsRef<Path>,
    format: &CsvFormat,
) -> Result<(Vec<FaultyInterval>, LoadReport), LoadError> {
    let (file, origin) = open(path.as_ref())?;
    read_faulty_intervals(file, &origin, format)
}

pub fn read_faulty_intervals<R: Read>(
    reader: R,
    origin: &str,
    format: &CsvFormat,
) -> Result<(Vec<FaultyInterval>, LoadReport), LoadError> {
    let (header, rows) = read_all(reader, origin, format)?;
    let machine_col = header.require(MACHINE_ID, origin)?;
    let start_col = header.require(START_TIME, origin)?;
    let end_col = header.require(END_TIME, origin)?;

    let mut report = LoadReport::new(origin);
    let mut intervals = Vec::with_capacity(rows.len());

    for row in &rows {
        report.rows_read += 1;
        let line = line_of(row);

        let machine_id = cell(row, machine_col);
        if is_missing(machine_id) {
            report.skip(line, SkipReason::MissingValue);
            continue;
        }
        let bounds: Result<(NaiveDateTime, NaiveDateTime), _> = parse_timestamp(cell(row, start_col))
            .and_then(|s| Ok((s, parse_timestamp(cell(row, end_col))?)));
        let Ok((start, end)) = bounds else {
            report.skip(line, SkipReason::BadTimestamp);
            continue;
        };

        intervals.push(FaultyInterval::new(machine_id, start, end));
    }

    report.rows_loaded = intervals.len();
    report.log();
    Ok((intervals, report))
}

// ============================================================================
// Batch Registry
// ============================================================================

/// Load the batch registry. Only `machine_id` is required; every column other
/// than `batch_id`, `machine_id` and `arepa_type` is kept as metadata.
pub fn load_batch_registry(
    path: impl AsRef<Path>,
    format: &CsvFormat,
) -> Result<(Vec<BatchRegistryEntry>, LoadReport), LoadError> {
    let (file, origin) = open(path.as_ref())?;
    read_batch_registry(file, &origin, format)
}

pub fn read_batch_registry<R: Read>(
    reader: R,
    origin: &str,
    format: &CsvFormat,
) -> Result<(Vec<BatchRegistryEntry>, LoadReport), LoadError> {
    let (header, rows) = read_all(reader, origin, format)?;
    let machine_col = header.require(MACHINE_ID, origin)?;
    let batch_col = header.find(BATCH_ID);
    let arepa_col = header.find(AREPA_TYPE);
    let keys = [Some(machine_col), batch_col, arepa_col];

    let mut report = LoadReport::new(origin);
    let mut entries = Vec::with_capacity(rows.len());

    for row in &rows {
        report.rows_read += 1;

        let machine_id = cell(row, machine_col);
        if is_missing(machine_id) {
            report.skip(line_of(row), SkipReason::MissingValue);
            continue;
        }

        let optional = |col: Option<usize>| {
            col.map(|i| cell(row, i))
                .filter(|c| !is_missing(c))
                .map(str::to_string)
        };
        let metadata = header
            .names
            .iter()
            .enumerate()
            .filter(|(i, _)| !keys.contains(&Some(*i)))
            .map(|(i, name)| (name.clone(), cell(row, i).to_string()))
            .collect();

        entries.push(BatchRegistryEntry {
            batch_id: optional(batch_col),
            machine_id: machine_id.to_string(),
            arepa_type: optional(arepa_col),
            metadata,
        });
    }

    report.rows_loaded = entries.len();
    report.log();
    Ok((entries, report))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_number_with_decimal_comma() {
        let fmt = CsvFormat::default();
        assert_eq!(fmt.parse_number("12,5"), Some(12.5));
        assert_eq!(fmt.parse_number(" 7 "), Some(7.0));
        assert_eq!(fmt.parse_number("abc"), None);
        assert_eq!(fmt.parse_number("inf"), None);

        let dot = CsvFormat {
            delimiter: b',',
            decimal_separator: '.',
        };
        assert_eq!(dot.parse_number("12.5"), Some(12.5));
        assert_eq!(dot.parse_number("12,5"), None);
    }

    #[test]
    fn test_cooking_metrics_schema_follows_header() {
        let csv = "\
machine_id;arepa_type;timestamp;temperature;operator;humidity
m1;a1;2024-03-01 10:15:00;180,5;ana;40
m1;a1;2024-03-01 10:45:00;181;luis;41,5
";
        let (data, report) =
            read_cooking_metrics(csv.as_bytes(), "test", &CsvFormat::default(), &[]).unwrap();

        assert_eq!(data.schema.names(), &["temperature", "humidity"]);
        assert_eq!(data.records.len(), 2);
        assert_eq!(data.records[0].metrics, vec![180.5, 40.0]);
        assert_eq!(data.records[1].metrics, vec![181.0, 41.5]);
        assert_eq!(data.records[0].timestamp, at(10, 15));
        assert_eq!(report.rows_loaded, 2);
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn test_bad_timestamp_and_missing_metric_rows_skipped() {
        let csv = "\
machine_id;arepa_type;timestamp;metric_1
m1;a1;not-a-date;1
m1;a1;2024-03-01 10:00:00;
m1;a1;2024-03-01 11:00:00;3
";
        let (data, report) =
            read_cooking_metrics(csv.as_bytes(), "test", &CsvFormat::default(), &[]).unwrap();

        assert_eq!(data.records.len(), 1);
        assert_eq!(report.bad_timestamp, 1);
        assert_eq!(report.missing_value, 1);
        assert_eq!(report.rows_read, 3);
    }

    #[test]
    fn test_row_with_one_empty_metric_is_dropped_whole() {
        let csv = "\
machine_id;arepa_type;timestamp;metric_1;metric_2
m1;a1;2024-03-01 10:00:00;10;100
m1;a1;2024-03-01 10:30:00;;200
";
        let (data, report) =
            read_cooking_metrics(csv.as_bytes(), "test", &CsvFormat::default(), &[]).unwrap();

        // metric_2 of the second row is not kept on its own
        assert_eq!(data.schema.names(), &["metric_1", "metric_2"]);
        assert_eq!(data.records.len(), 1);
        assert_eq!(data.records[0].metrics, vec![10.0, 100.0]);
        assert_eq!(report.missing_value, 1);
    }

    #[test]
    fn test_arepa_type_resolved_through_batch_id() {
        let registry = vec![BatchRegistryEntry {
            batch_id: Some("B-01".to_string()),
            machine_id: "m1".to_string(),
            arepa_type: Some("queso".to_string()),
            metadata: Vec::new(),
        }];
        let csv = "\
machine_id;batch_id;timestamp;metric_1
m1;B-01;2024-03-01 10:00:00;1
m1;B-99;2024-03-01 10:05:00;2
";
        let (data, report) =
            read_cooking_metrics(csv.as_bytes(), "test", &CsvFormat::default(), &registry)
                .unwrap();

        assert_eq!(data.records.len(), 1);
        assert_eq!(data.records[0].arepa_type, "queso");
        assert_eq!(data.records[0].batch_id.as_deref(), Some("B-01"));
        assert_eq!(data.schema.names(), &["metric_1"]);
        assert_eq!(report.unresolved_arepa_type, 1);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let csv = "machine_id;arepa_type;metric_1\nm1;a1;3\n";
        let err = read_cooking_metrics(csv.as_bytes(), "test", &CsvFormat::default(), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingColumn {
                column: TIMESTAMP,
                ..
            }
        ));
    }

    #[test]
    fn test_header_only_file_keeps_metric_columns() {
        let csv = "machine_id;arepa_type;timestamp;metric_1;metric_2\n";
        let (data, _) =
            read_cooking_metrics(csv.as_bytes(), "test", &CsvFormat::default(), &[]).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.schema.names(), &["metric_1", "metric_2"]);
    }

    #[test]
    fn test_faulty_intervals_loaded() {
        let csv = "\
machine_id;start_time;end_time
m1;2024-03-01 10:00:00;2024-03-01 10:30:00
m2;garbage;2024-03-01 10:30:00
";
        let (intervals, report) =
            read_faulty_intervals(csv.as_bytes(), "test", &CsvFormat::default()).unwrap();
        assert_eq!(intervals, vec![FaultyInterval::new("m1", at(10, 0), at(10, 30))]);
        assert_eq!(report.bad_timestamp, 1);
    }

    #[test]
    fn test_batch_registry_keeps_metadata_in_order() {
        let csv = "\
batch_id;machine_id;arepa_type;operator;start_time
B-01;m1;queso;ana;2024-03-01 06:00:00
B-02;m2;;luis;2024-03-01 07:00:00
";
        let (entries, _) =
            read_batch_registry(csv.as_bytes(), "test", &CsvFormat::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].covers("m1", "queso"));
        assert_eq!(entries[1].arepa_type, None);
        assert_eq!(
            entries[0].metadata,
            vec![
                ("operator".to_string(), "ana".to_string()),
                ("start_time".to_string(), "2024-03-01 06:00:00".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_faulty_intervals("/nonexistent/faulty.csv", &CsvFormat::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/faulty.csv"));
    }
}
