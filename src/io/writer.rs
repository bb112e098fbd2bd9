//! CSV writer for the aggregated dataset

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::types::{HourlyAggregate, MetricSchema};

/// Layout of `hour_start` in the output file
pub const HOUR_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("row has {found} averages, schema has {expected} metrics")]
    SchemaMismatch { expected: usize, found: usize },
}

/// Output header: keys, one `<metric>_avg` per schema metric, then the count.
pub fn header(schema: &MetricSchema) -> Vec<String> {
    let mut columns = vec![
        "machine_id".to_string(),
        "arepa_type".to_string(),
        "hour_start".to_string(),
    ];
    columns.extend(schema.average_columns());
    columns.push("sample_count".to_string());
    columns
}

/// Write the dataset as comma-delimited CSV with `.` decimals.
///
/// The header is written even when there are no rows.
pub fn write_dataset<W: Write>(
    writer: W,
    schema: &MetricSchema,
    rows: &[HourlyAggregate],
) -> Result<(), WriteError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(schema))?;

    for row in rows {
        if row.metric_averages.len() != schema.len() {
            return Err(WriteError::SchemaMismatch {
                expected: schema.len(),
                found: row.metric_averages.len(),
            });
        }
        let mut record = Vec::with_capacity(schema.len() + 4);
        record.push(row.machine_id.clone());
        record.push(row.arepa_type.clone());
        record.push(row.hour_start.format(HOUR_FORMAT).to_string());
        record.extend(row.metric_averages.iter().map(|v| format_float(*v)));
        record.push(row.sample_count.to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| WriteError::Csv(e.into()))?;
    Ok(())
}

/// Write the dataset to `path` through a sibling temp file and a rename, so a
/// failed run never leaves a truncated dataset behind.
pub fn write_dataset_to_path(
    path: impl AsRef<Path>,
    schema: &MetricSchema,
    rows: &[HourlyAggregate],
) -> Result<(), WriteError> {
    let path = path.as_ref();
    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let file = fs::File::create(&tmp).map_err(io_err)?;
    if let Err(e) = write_dataset(std::io::BufWriter::new(file), schema, rows) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %cleanup, "Failed to remove partial dataset file");
        }
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(io_err)?;

    info!(path = %path.display(), rows = rows.len(), "Dataset written");
    Ok(())
}

/// Shortest representation that round-trips; integral values keep one
/// decimal (`15.0`) so the column always reads as floating point.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
