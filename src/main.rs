//! arepa-dataset - hourly training dataset builder
//!
//! Reads the cooking-metrics, faulty-intervals and batch-registry exports,
//! keeps one machine's readings for one arepa type inside a time window,
//! drops readings taken during faulty intervals and writes hourly means.
//!
//! # Usage
//!
//! ```bash
//! arepa-dataset --machine M-01 --arepa-type queso \
//!     --start-time "2024-03-01 06:00:00" --end-time "2024-03-01 18:00:00" \
//!     --output training_dataset.csv
//! ```
//!
//! # Environment Variables
//!
//! - `AREPA_DATASET_CONFIG`: Path to a TOML config file (default: ./arepa_dataset.toml)
//! - `AREPA_LOG_JSON`: Set to "true" for JSON log lines
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use tracing::info;

use arepa_dataset::config::DatasetConfig;
use arepa_dataset::io::{
    load_batch_registry, load_cooking_metrics, load_faulty_intervals, parse_timestamp,
    write_dataset, write_dataset_to_path,
};
use arepa_dataset::{BoundaryPolicy, Pipeline, RunConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "arepa-dataset")]
#[command(about = "Build an hourly training dataset from cooking-line metrics")]
#[command(version)]
struct CliArgs {
    /// Cooking metrics CSV (default: input_dataset/cooking_metrics.csv)
    #[arg(short = 'c', long, alias = "cooking_metrics", value_name = "PATH")]
    cooking_metrics: Option<PathBuf>,

    /// Faulty intervals CSV (default: input_dataset/faulty_intervals.csv)
    #[arg(short = 'f', long, alias = "faulty_intervals", value_name = "PATH")]
    faulty_intervals: Option<PathBuf>,

    /// Batch registry CSV (default: input_dataset/batch_registry.csv)
    #[arg(short = 'b', long, alias = "batch_registry", value_name = "PATH")]
    batch_registry: Option<PathBuf>,

    /// Machine to build the dataset for
    #[arg(short = 'm', long, alias = "machine_id")]
    machine: String,

    /// Arepa type to build the dataset for
    #[arg(short = 'a', long, alias = "arepa_type")]
    arepa_type: String,

    /// Window start, e.g. "2024-03-01 06:00:00"
    #[arg(short = 's', long, alias = "start_time", value_parser = parse_instant)]
    start_time: NaiveDateTime,

    /// Window end, e.g. "2024-03-01 18:00:00"
    #[arg(short = 'e', long, alias = "end_time", value_parser = parse_instant)]
    end_time: NaiveDateTime,

    /// Output CSV path; the dataset goes to stdout when omitted
    #[arg(short = 'o', long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// TOML config file (overrides the AREPA_DATASET_CONFIG / ./arepa_dataset.toml lookup)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Window end bound: inclusive or half_open
    #[arg(long, alias = "window_bounds", value_name = "POLICY")]
    window_bounds: Option<BoundaryPolicy>,

    /// Faulty interval end bound: inclusive or half_open
    #[arg(long, alias = "interval_bounds", value_name = "POLICY")]
    interval_bounds: Option<BoundaryPolicy>,

    /// Emit logs as JSON lines
    #[arg(long, env = "AREPA_LOG_JSON")]
    log_json: bool,
}

fn parse_instant(s: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(s).map_err(|e| e.to_string())
}

// ============================================================================
// Setup
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// File config with command-line overrides applied on top.
fn resolve_config(args: &CliArgs) -> Result<DatasetConfig> {
    let mut config = match &args.config {
        Some(path) => DatasetConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DatasetConfig::load().context("Failed to load configuration")?,
    };

    if let Some(p) = &args.cooking_metrics {
        config.inputs.cooking_metrics.clone_from(p);
    }
    if let Some(p) = &args.faulty_intervals {
        config.inputs.faulty_intervals.clone_from(p);
    }
    if let Some(p) = &args.batch_registry {
        config.inputs.batch_registry.clone_from(p);
    }
    if let Some(p) = &args.output {
        config.output.path = Some(p.clone());
    }
    if let Some(policy) = args.window_bounds {
        config.boundaries.window = policy;
    }
    if let Some(policy) = args.interval_bounds {
        config.boundaries.faulty_interval = policy;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = resolve_config(&args)?;
    let format = config.csv_format().context("Invalid CSV settings")?;
    let inputs = &config.inputs;

    // Registry first: cooking metrics may need it to resolve arepa types
    let (registry, _) = load_batch_registry(&inputs.batch_registry, &format)
        .context("Failed to load batch registry")?;
    let (metrics, _) = load_cooking_metrics(&inputs.cooking_metrics, &format, &registry)
        .context("Failed to load cooking metrics")?;
    let (intervals, _) = load_faulty_intervals(&inputs.faulty_intervals, &format)
        .context("Failed to load faulty intervals")?;

    let run_config = RunConfig::new(&args.machine, &args.arepa_type, args.start_time, args.end_time)
        .with_window_policy(config.boundaries.window)
        .with_interval_policy(config.boundaries.faulty_interval);

    let output = Pipeline::new(run_config)
        .run(&metrics, &intervals, &registry)
        .context("Dataset generation failed")?;

    match &config.output.path {
        Some(path) => {
            write_dataset_to_path(path, &output.schema, &output.rows)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), rows = output.rows.len(), "Training dataset saved");
        }
        None => {
            write_dataset(std::io::stdout().lock(), &output.schema, &output.rows)
                .context("Failed to write dataset to stdout")?;
            info!(rows = output.rows.len(), "Training dataset written to stdout");
        }
    }

    if !output.warnings.is_empty() {
        info!(warnings = output.warnings.len(), "Run finished with data-integrity warnings");
    }
    Ok(())
}
