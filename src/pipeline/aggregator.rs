//! Hourly aggregation of filtered readings

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::error::PipelineError;
use crate::types::{floor_to_hour, CookingMetricRecord, HourlyAggregate, MetricSchema};

/// Bucket key. Field order gives the output ordering:
/// hour_start, then machine_id, then arepa_type.
type BucketKey = (NaiveDateTime, String, String);

/// Buckets readings by calendar hour and averages every schema metric.
#[derive(Debug, Clone)]
pub struct HourlyAggregator<'s> {
    schema: &'s MetricSchema,
}

impl<'s> HourlyAggregator<'s> {
    pub fn new(schema: &'s MetricSchema) -> Self {
        Self { schema }
    }

    /// Aggregate readings into one row per (machine, arepa type, hour).
    ///
    /// Rows come out sorted by hour_start, machine_id, arepa_type. Buckets are
    /// only created from existing readings, so every row has sample_count >= 1.
    pub fn aggregate(
        &self,
        records: &[&CookingMetricRecord],
    ) -> Result<Vec<HourlyAggregate>, PipelineError> {
        let width = self.schema.len();

        let mut buckets: BTreeMap<BucketKey, Vec<&CookingMetricRecord>> = BTreeMap::new();
        for (index, record) in records.iter().enumerate() {
            if record.metrics.len() != width {
                return Err(PipelineError::SchemaMismatch {
                    index,
                    expected: width,
                    found: record.metrics.len(),
                });
            }
            let key = (
                floor_to_hour(record.timestamp),
                record.machine_id.clone(),
                record.arepa_type.clone(),
            );
            buckets.entry(key).or_default().push(record);
        }

        let rows = buckets
            .into_iter()
            .map(|((hour_start, machine_id, arepa_type), mut members)| {
                // Canonical summation order: result must not depend on input order
                members.sort_by(|a, b| canonical_order(a, b));
                let count = members.len();
                let metric_averages = (0..width)
                    .map(|i| members.iter().map(|r| r.metrics[i]).sum::<f64>() / count as f64)
                    .collect();

                HourlyAggregate {
                    machine_id,
                    arepa_type,
                    hour_start,
                    metric_averages,
                    sample_count: count,
                }
            })
            .collect();

        Ok(rows)
    }
}

/// Total order over readings of one bucket: timestamp, then metric values.
fn canonical_order(a: &CookingMetricRecord, b: &CookingMetricRecord) -> Ordering {
    a.timestamp.cmp(&b.timestamp).then_with(|| {
        a.metrics
            .iter()
            .zip(&b.metrics)
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}
