//! Input records: cooking metrics, faulty intervals, batch registry

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// Metric Schema
// ============================================================================

/// Ordered list of metric column names present in the cooking-metrics input.
///
/// Derived once by the loader and threaded through filtering, aggregation and
/// output. Every `CookingMetricRecord::metrics` vector is aligned with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSchema {
    names: Vec<String>,
}

impl MetricSchema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Metric names in input column order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a metric column, if present
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Output column names for the averaged metrics (`<metric>_avg`)
    pub fn average_columns(&self) -> Vec<String> {
        self.names.iter().map(|n| format!("{n}_avg")).collect()
    }
}

// ============================================================================
// Cooking Metrics
// ============================================================================

/// One sensor reading event from the cooking line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookingMetricRecord {
    pub machine_id: String,
    pub arepa_type: String,
    pub timestamp: NaiveDateTime,
    /// Production batch the reading belongs to, when the source carries one
    pub batch_id: Option<String>,
    /// Metric values, aligned with the dataset's `MetricSchema`
    pub metrics: Vec<f64>,
}

impl CookingMetricRecord {
    /// Value of the metric at `index` in the schema
    pub fn metric(&self, index: usize) -> Option<f64> {
        self.metrics.get(index).copied()
    }
}

/// Cooking-metric records together with the schema describing their metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookingMetrics {
    pub schema: MetricSchema,
    pub records: Vec<CookingMetricRecord>,
}

impl CookingMetrics {
    pub fn new(schema: MetricSchema, records: Vec<CookingMetricRecord>) -> Self {
        Self { schema, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Faulty Intervals
// ============================================================================

/// A time span during which a machine's readings are unreliable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultyInterval {
    pub machine_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl FaultyInterval {
    pub fn new(machine_id: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            machine_id: machine_id.into(),
            start,
            end,
        }
    }

    /// `start > end`: such an interval never excludes anything
    pub fn is_degenerate(&self) -> bool {
        self.start > self.end
    }
}

// ============================================================================
// Batch Registry
// ============================================================================

/// Reference row associating a production batch with a machine and arepa type.
///
/// Columns other than the keys are carried verbatim and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchRegistryEntry {
    pub batch_id: Option<String>,
    pub machine_id: String,
    pub arepa_type: Option<String>,
    /// Pass-through columns as (header, value), in input order
    pub metadata: Vec<(String, String)>,
}

impl BatchRegistryEntry {
    /// Whether this entry registers the given machine / arepa type pair
    pub fn covers(&self, machine_id: &str, arepa_type: &str) -> bool {
        self.machine_id == machine_id && self.arepa_type.as_deref() == Some(arepa_type)
    }
}
