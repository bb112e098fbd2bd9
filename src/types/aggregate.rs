//! Output rows of the training dataset

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Hourly aggregate for one (machine, arepa type, hour) bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyAggregate {
    pub machine_id: String,
    pub arepa_type: String,
    /// Start of the calendar hour the bucket covers
    pub hour_start: NaiveDateTime,
    /// Arithmetic mean per metric, aligned with the run's `MetricSchema`
    pub metric_averages: Vec<f64>,
    /// Number of readings averaged (always >= 1)
    pub sample_count: usize,
}

impl HourlyAggregate {
    /// Average of the metric at `index` in the schema
    pub fn average(&self, index: usize) -> Option<f64> {
        self.metric_averages.get(index).copied()
    }
}
