//! Record filter for the training dataset
//!
//! Selects cooking-metric readings for one machine and arepa type inside the
//! requested window, then drops readings covered by a faulty interval.
//! Rejects, in order:
//! - Readings from another machine
//! - Readings of another arepa type
//! - Readings outside the time window
//! - Readings inside a faulty interval of their machine

use crate::pipeline::excluder::IntervalExcluder;
use crate::types::{CookingMetricRecord, TimeWindow};

/// Result of record filtering
#[derive(Debug, Clone)]
pub struct FilterResult<'a> {
    /// Readings that passed every criterion, in input order
    pub records: Vec<&'a CookingMetricRecord>,
    /// Rejection counts per criterion
    pub stats: FilterStats,
}

impl FilterResult<'_> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-criterion rejection counts. Each reading is counted once, under the
/// first criterion it fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub examined: usize,
    pub kept: usize,
    pub wrong_machine: usize,
    pub wrong_arepa_type: usize,
    pub outside_window: usize,
    pub faulty: usize,
}

impl FilterStats {
    pub fn rejected(&self) -> usize {
        self.examined - self.kept
    }

    /// Most frequent rejection reason, for logging
    pub fn primary_rejection_reason(&self) -> Option<String> {
        [
            (self.wrong_machine, "other machine"),
            (self.wrong_arepa_type, "other arepa type"),
            (self.outside_window, "outside time window"),
            (self.faulty, "inside faulty interval"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .max_by_key(|(count, _)| *count)
        .map(|(count, reason)| format!("{reason} ({count} readings)"))
    }
}

/// Selection criteria for one pipeline run
pub struct RecordFilter<'e> {
    machine_id: &'e str,
    arepa_type: &'e str,
    window: TimeWindow,
    excluder: &'e IntervalExcluder,
}

impl<'e> RecordFilter<'e> {
    pub fn new(
        machine_id: &'e str,
        arepa_type: &'e str,
        window: TimeWindow,
        excluder: &'e IntervalExcluder,
    ) -> Self {
        Self {
            machine_id,
            arepa_type,
            window,
            excluder,
        }
    }

    /// Keep the readings that match machine, arepa type and window and are
    /// not inside a faulty interval.
    ///
    /// An empty result is not an error.
    pub fn filter<'a>(&self, records: &'a [CookingMetricRecord]) -> FilterResult<'a> {
        let mut kept = Vec::new();
        let mut stats = FilterStats {
            examined: records.len(),
            ..FilterStats::default()
        };

        for record in records {
            match self.validate(record) {
                Ok(()) => kept.push(record),
                Err(reason) => match reason {
                    RejectionReason::WrongMachine => stats.wrong_machine += 1,
                    RejectionReason::WrongArepaType => stats.wrong_arepa_type += 1,
                    RejectionReason::OutsideWindow => stats.outside_window += 1,
                    RejectionReason::Faulty => stats.faulty += 1,
                },
            }
        }

        stats.kept = kept.len();
        FilterResult {
            records: kept,
            stats,
        }
    }

    /// Check a single reading against every criterion
    fn validate(&self, record: &CookingMetricRecord) -> Result<(), RejectionReason> {
        if record.machine_id != self.machine_id {
            return Err(RejectionReason::WrongMachine);
        }

        if record.arepa_type != self.arepa_type {
            return Err(RejectionReason::WrongArepaType);
        }

        if !self.window.contains(record.timestamp) {
            return Err(RejectionReason::OutsideWindow);
        }

        if self.excluder.is_excluded(&record.machine_id, record.timestamp) {
            return Err(RejectionReason::Faulty);
        }

        Ok(())
    }
}

/// Free-function form: `filter(records, machine_id, arepa_type, window, excluder)`
pub fn filter<'a>(
    records: &'a [CookingMetricRecord],
    machine_id: &str,
    arepa_type: &str,
    window: TimeWindow,
    excluder: &IntervalExcluder,
) -> FilterResult<'a> {
    RecordFilter::new(machine_id, arepa_type, window, excluder).filter(records)
}

/// Reasons for reading rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RejectionReason {
    WrongMachine,
    WrongArepaType,
    OutsideWindow,
    Faulty,
}
