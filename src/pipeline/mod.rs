//! Filtering-and-aggregation pipeline
//!
//! Leaf to root:
//! - `excluder`: faulty-interval lookup per machine
//! - `filter`: machine / arepa type / window selection minus faulty readings
//! - `aggregator`: hourly means per (machine, arepa type, hour)
//! - `runner`: validation, registry cross-check and stage wiring

pub mod aggregator;
pub mod excluder;
pub mod filter;
pub mod runner;

pub use aggregator::HourlyAggregator;
pub use excluder::IntervalExcluder;
pub use filter::{FilterResult, FilterStats, RecordFilter};
pub use runner::{run, Pipeline, PipelineOutput, RunConfig};
