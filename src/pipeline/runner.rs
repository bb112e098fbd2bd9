//! Pipeline orchestrator
//!
//! Validates the run configuration, cross-checks the batch registry, then runs
//! exclusion → filtering → aggregation in that fixed order. A run is
//! all-or-nothing: any error aborts before output is produced.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::error::{ConfigurationError, DataIntegrityWarning, PipelineError};
use crate::pipeline::aggregator::HourlyAggregator;
use crate::pipeline::excluder::IntervalExcluder;
use crate::pipeline::filter::{FilterStats, RecordFilter};
use crate::types::{
    BatchRegistryEntry, BoundaryPolicy, CookingMetricRecord, CookingMetrics, FaultyInterval,
    HourlyAggregate, MetricSchema, TimeWindow,
};

/// Explicit configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub machine_id: String,
    pub arepa_type: String,
    pub window: TimeWindow,
    /// Boundary convention for faulty intervals
    pub interval_policy: BoundaryPolicy,
}

impl RunConfig {
    /// Run configuration with inclusive window and interval bounds
    pub fn new(
        machine_id: impl Into<String>,
        arepa_type: impl Into<String>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> Self {
        Self {
            machine_id: machine_id.into(),
            arepa_type: arepa_type.into(),
            window: TimeWindow::new(start_time, end_time),
            interval_policy: BoundaryPolicy::Inclusive,
        }
    }

    pub fn with_window_policy(mut self, policy: BoundaryPolicy) -> Self {
        self.window.policy = policy;
        self
    }

    pub fn with_interval_policy(mut self, policy: BoundaryPolicy) -> Self {
        self.interval_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.machine_id.trim().is_empty() {
            return Err(ConfigurationError::EmptyMachineId);
        }
        if self.arepa_type.trim().is_empty() {
            return Err(ConfigurationError::EmptyArepaType);
        }
        if self.window.is_inverted() {
            return Err(ConfigurationError::InvertedWindow {
                start: self.window.start,
                end: self.window.end,
            });
        }
        Ok(())
    }
}

/// Everything a run hands back to its caller.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub schema: MetricSchema,
    /// Dataset rows ordered by hour_start, machine_id, arepa_type
    pub rows: Vec<HourlyAggregate>,
    /// Non-fatal data-quality conditions met during the run
    pub warnings: Vec<DataIntegrityWarning>,
    pub filter_stats: FilterStats,
}

impl PipelineOutput {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Filtering-and-aggregation pipeline for one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the pipeline over already-loaded inputs.
    pub fn run(
        &self,
        cooking_metrics: &CookingMetrics,
        faulty_intervals: &[FaultyInterval],
        batch_registry: &[BatchRegistryEntry],
    ) -> Result<PipelineOutput, PipelineError> {
        let cfg = &self.config;
        cfg.validate()?;

        info!(
            machine = %cfg.machine_id,
            arepa_type = %cfg.arepa_type,
            start = %cfg.window.start,
            end = %cfg.window.end,
            window_bounds = %cfg.window.policy,
            interval_bounds = %cfg.interval_policy,
            "Generating training dataset"
        );

        let mut warnings = Vec::new();
        if let Some(w) = check_registry_coverage(cfg, batch_registry) {
            warnings.push(w);
        }

        // Phase 1: faulty-interval index
        let excluder = IntervalExcluder::with_policy(faulty_intervals, cfg.interval_policy);
        warnings.extend(excluder.warnings().iter().cloned());
        debug!(
            intervals = faulty_intervals.len(),
            machine_spans = excluder.span_count(&cfg.machine_id),
            "Faulty intervals indexed"
        );

        // Phase 2: record filtering
        let filtered = RecordFilter::new(&cfg.machine_id, &cfg.arepa_type, cfg.window, &excluder)
            .filter(&cooking_metrics.records);
        let stats = filtered.stats;
        info!(
            examined = stats.examined,
            kept = stats.kept,
            faulty = stats.faulty,
            outside_window = stats.outside_window,
            "Cooking metrics filtered"
        );
        if let Some(reason) = stats.primary_rejection_reason() {
            debug!(reason = %reason, "Primary rejection reason");
        }

        if let Some(w) = check_unregistered_batches(&filtered.records, batch_registry) {
            warnings.push(w);
        }

        // Phase 3: hourly aggregation
        let rows = HourlyAggregator::new(&cooking_metrics.schema).aggregate(&filtered.records)?;
        if rows.is_empty() {
            info!("No readings survived filtering; dataset is empty");
        } else {
            info!(
                rows = rows.len(),
                first_hour = %rows[0].hour_start,
                last_hour = %rows[rows.len() - 1].hour_start,
                "Hourly averages computed"
            );
        }

        for w in &warnings {
            warn!("{}", w);
        }

        Ok(PipelineOutput {
            schema: cooking_metrics.schema.clone(),
            rows,
            warnings,
            filter_stats: stats,
        })
    }
}

/// Run the pipeline with inclusive bounds.
///
/// Parameter list mirrors the orchestrator contract; callers needing other
/// boundary conventions build a `RunConfig` and use `Pipeline` directly.
#[allow(clippy::too_many_arguments)]
pub fn run(
    cooking_metrics: &CookingMetrics,
    faulty_intervals: &[FaultyInterval],
    batch_registry: &[BatchRegistryEntry],
    machine_id: &str,
    arepa_type: &str,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
) -> Result<PipelineOutput, PipelineError> {
    Pipeline::new(RunConfig::new(machine_id, arepa_type, start_time, end_time)).run(
        cooking_metrics,
        faulty_intervals,
        batch_registry,
    )
}

/// Warn when no registry entry registers the requested machine / arepa type.
fn check_registry_coverage(
    cfg: &RunConfig,
    registry: &[BatchRegistryEntry],
) -> Option<DataIntegrityWarning> {
    if registry
        .iter()
        .any(|e| e.covers(&cfg.machine_id, &cfg.arepa_type))
    {
        return None;
    }
    Some(DataIntegrityWarning::NoBatchRegistryMatch {
        machine_id: cfg.machine_id.clone(),
        arepa_type: cfg.arepa_type.clone(),
    })
}

/// Warn when kept readings reference batch ids missing from the registry.
fn check_unregistered_batches(
    kept: &[&CookingMetricRecord],
    registry: &[BatchRegistryEntry],
) -> Option<DataIntegrityWarning> {
    let known: HashSet<&str> = registry
        .iter()
        .filter_map(|e| e.batch_id.as_deref())
        .collect();
    if known.is_empty() {
        return None;
    }

    let mut unknown = BTreeSet::new();
    let mut records = 0;
    for record in kept {
        if let Some(batch) = record.batch_id.as_deref() {
            if !known.contains(batch) {
                unknown.insert(batch.to_string());
                records += 1;
            }
        }
    }

    (records > 0).then(|| DataIntegrityWarning::UnregisteredBatches {
        batch_ids: unknown.into_iter().collect(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn reading(t: NaiveDateTime, v: f64, batch: Option<&str>) -> CookingMetricRecord {
        CookingMetricRecord {
            machine_id: "m1".to_string(),
            arepa_type: "a1".to_string(),
            timestamp: t,
            batch_id: batch.map(str::to_string),
            metrics: vec![v],
        }
    }

    fn registry_entry(batch: &str, machine: &str, arepa: &str) -> BatchRegistryEntry {
        BatchRegistryEntry {
            batch_id: Some(batch.to_string()),
            machine_id: machine.to_string(),
            arepa_type: Some(arepa.to_string()),
            metadata: Vec::new(),
        }
    }

    fn day_config() -> RunConfig {
        RunConfig::new("m1", "a1", at(1, 0, 0), at(1, 23, 59))
    }

    #[test]
    fn test_empty_machine_id_rejected() {
        let cfg = RunConfig::new("  ", "a1", at(1, 0, 0), at(1, 1, 0));
        assert_eq!(cfg.validate(), Err(ConfigurationError::EmptyMachineId));
    }

    #[test]
    fn test_empty_arepa_type_rejected() {
        let cfg = RunConfig::new("m1", "", at(1, 0, 0), at(1, 1, 0));
        assert_eq!(cfg.validate(), Err(ConfigurationError::EmptyArepaType));
    }

    #[test]
    fn test_equal_bounds_are_valid() {
        let cfg = RunConfig::new("m1", "a1", at(1, 5, 0), at(1, 5, 0));
        assert!(cfg.validate().is_ok());
        let half_open = cfg.with_window_policy(BoundaryPolicy::HalfOpen);
        assert!(half_open.validate().is_ok());
    }

    #[test]
    fn test_missing_registry_entry_warns_but_runs() {
        let data = CookingMetrics::new(
            MetricSchema::new(["metric_1"]),
            vec![reading(at(1, 10, 0), 5.0, None)],
        );
        let registry = vec![registry_entry("b1", "m1", "a2")];
        let out = Pipeline::new(day_config()).run(&data, &[], &registry).unwrap();

        assert_eq!(out.rows.len(), 1);
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, DataIntegrityWarning::NoBatchRegistryMatch { .. })));
    }

    #[test]
    fn test_empty_registry_warns_once() {
        let data = CookingMetrics::new(
            MetricSchema::new(["metric_1"]),
            vec![reading(at(1, 10, 0), 5.0, Some("b1"))],
        );
        let out = Pipeline::new(day_config()).run(&data, &[], &[]).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(
            out.warnings,
            vec![DataIntegrityWarning::NoBatchRegistryMatch {
                machine_id: "m1".to_string(),
                arepa_type: "a1".to_string(),
            }]
        );
    }

    #[test]
    fn test_unregistered_batches_reported() {
        let data = CookingMetrics::new(
            MetricSchema::new(["metric_1"]),
            vec![
                reading(at(1, 10, 0), 5.0, Some("b1")),
                reading(at(1, 10, 5), 6.0, Some("b7")),
                reading(at(1, 10, 9), 7.0, Some("b7")),
            ],
        );
        let registry = vec![registry_entry("b1", "m1", "a1")];
        let out = Pipeline::new(day_config()).run(&data, &[], &registry).unwrap();

        assert_eq!(
            out.warnings,
            vec![DataIntegrityWarning::UnregisteredBatches {
                batch_ids: vec!["b7".to_string()],
                records: 2,
            }]
        );
    }

    #[test]
    fn test_degenerate_interval_surfaces_as_warning() {
        let data = CookingMetrics::new(
            MetricSchema::new(["metric_1"]),
            vec![reading(at(1, 10, 15), 5.0, None)],
        );
        let intervals = vec![FaultyInterval::new("m1", at(1, 11, 0), at(1, 10, 0))];
        let registry = vec![registry_entry("b1", "m1", "a1")];
        let out = Pipeline::new(day_config())
            .run(&data, &intervals, &registry)
            .unwrap();

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].sample_count, 1);
        assert!(matches!(
            out.warnings.as_slice(),
            [DataIntegrityWarning::DegenerateInterval { .. }]
        ));
    }

    #[test]
    fn test_inverted_window_aborts_run() {
        let data = CookingMetrics::new(MetricSchema::new(["metric_1"]), Vec::new());
        let err = run(&data, &[], &[], "m1", "a1", at(2, 0, 0), at(1, 0, 0)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::InvertedWindow { .. })
        ));
    }
}
