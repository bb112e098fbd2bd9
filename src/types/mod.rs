//! Shared data structures for the cooking-line dataset builder
//!
//! This module defines the core types flowing through the pipeline:
//! - Inputs: CookingMetricRecord (+ MetricSchema), FaultyInterval, BatchRegistryEntry
//! - Run scope: TimeWindow, BoundaryPolicy
//! - Output: HourlyAggregate (one row of the training dataset)

mod records;
mod window;
mod aggregate;

pub use records::*;
pub use window::*;
pub use aggregate::*;
