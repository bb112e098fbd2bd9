//! Error and warning types for a pipeline run
//!
//! Fatal conditions abort the whole run (nothing is written). Data-integrity
//! conditions are non-fatal: they are returned to the caller alongside the
//! output and logged at warn level.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Invalid run configuration. The run fails before touching any data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("machine_id must not be empty")]
    EmptyMachineId,

    #[error("arepa_type must not be empty")]
    EmptyArepaType,

    #[error("start_time {start} is after end_time {end}")]
    InvertedWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// Errors raised by the filtering-and-aggregation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("record {index} has {found} metric values, schema expects {expected}")]
    SchemaMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Non-fatal data-quality condition surfaced by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataIntegrityWarning {
    /// Faulty interval whose start is after its end; it excludes nothing.
    DegenerateInterval {
        machine_id: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// No batch-registry entry registers the requested machine / arepa type.
    NoBatchRegistryMatch {
        machine_id: String,
        arepa_type: String,
    },
    /// Kept readings reference batch ids the registry does not know.
    UnregisteredBatches {
        batch_ids: Vec<String>,
        records: usize,
    },
}

impl std::fmt::Display for DataIntegrityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataIntegrityWarning::DegenerateInterval {
                machine_id,
                start,
                end,
            } => write!(
                f,
                "faulty interval for machine '{machine_id}' has start {start} after end {end}; ignored"
            ),
            DataIntegrityWarning::NoBatchRegistryMatch {
                machine_id,
                arepa_type,
            } => write!(
                f,
                "no batch registry entry for machine '{machine_id}' and arepa type '{arepa_type}'"
            ),
            DataIntegrityWarning::UnregisteredBatches { batch_ids, records } => write!(
                f,
                "{records} readings reference unregistered batches: {}",
                batch_ids.join(", ")
            ),
        }
    }
}
