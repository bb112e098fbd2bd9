//! Arepa Dataset: hourly training datasets from cooking-line telemetry
//!
//! Selects one machine's readings for one arepa type inside a time window,
//! drops readings taken while the machine was in a faulty interval and
//! averages the remaining metrics per calendar hour.
//!
//! ## Architecture
//!
//! - **types**: records, time window, boundary policy, hourly aggregates
//! - **pipeline**: interval excluder, record filter, hourly aggregator, runner
//! - **io**: CSV loaders and writer
//! - **config**: TOML-backed defaults with typo detection

pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod types;

// Re-export configuration
pub use config::DatasetConfig;

// Re-export errors
pub use error::{ConfigurationError, DataIntegrityWarning, PipelineError};

// Re-export commonly used types
pub use types::{
    BatchRegistryEntry, BoundaryPolicy, CookingMetricRecord, CookingMetrics, FaultyInterval,
    HourlyAggregate, MetricSchema, TimeWindow,
};

// Re-export pipeline
pub use pipeline::{
    FilterResult, FilterStats, HourlyAggregator, IntervalExcluder, Pipeline, PipelineOutput,
    RecordFilter, RunConfig,
};
