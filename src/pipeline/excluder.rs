//! Faulty-interval exclusion
//!
//! Intervals are grouped by machine once, degenerate ones (start > end) are
//! dropped, and the rest are merged into a sorted, disjoint union. A lookup is
//! then a binary search over that machine's spans, so overlapping intervals
//! can never exclude a reading twice.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::error::DataIntegrityWarning;
use crate::types::{BoundaryPolicy, FaultyInterval};

/// One merged span of faulty time for a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

/// Answers "is this reading inside a faulty interval of its machine?"
#[derive(Debug, Clone, Default)]
pub struct IntervalExcluder {
    spans_by_machine: HashMap<String, Vec<Span>>,
    policy: BoundaryPolicy,
    warnings: Vec<DataIntegrityWarning>,
}

impl IntervalExcluder {
    /// Build an excluder with inclusive interval bounds
    pub fn new(intervals: &[FaultyInterval]) -> Self {
        Self::with_policy(intervals, BoundaryPolicy::Inclusive)
    }

    pub fn with_policy(intervals: &[FaultyInterval], policy: BoundaryPolicy) -> Self {
        let mut grouped: HashMap<String, Vec<Span>> = HashMap::new();
        let mut warnings = Vec::new();

        for interval in intervals {
            if interval.is_degenerate() {
                warnings.push(DataIntegrityWarning::DegenerateInterval {
                    machine_id: interval.machine_id.clone(),
                    start: interval.start,
                    end: interval.end,
                });
                continue;
            }
            grouped
                .entry(interval.machine_id.clone())
                .or_default()
                .push(Span {
                    start: interval.start,
                    end: interval.end,
                });
        }

        let spans_by_machine = grouped
            .into_iter()
            .map(|(machine, spans)| (machine, merge_spans(spans)))
            .collect();

        Self {
            spans_by_machine,
            policy,
            warnings,
        }
    }

    /// Whether `timestamp` falls inside any faulty interval of `machine_id`
    pub fn is_excluded(&self, machine_id: &str, timestamp: NaiveDateTime) -> bool {
        let Some(spans) = self.spans_by_machine.get(machine_id) else {
            return false;
        };

        // Last span starting at or before the timestamp is the only candidate
        let idx = spans.partition_point(|s| s.start <= timestamp);
        if idx == 0 {
            return false;
        }
        let span = spans[idx - 1];
        self.policy.contains(span.start, span.end, timestamp)
    }

    /// Degenerate intervals dropped during construction
    pub fn warnings(&self) -> &[DataIntegrityWarning] {
        &self.warnings
    }

    /// Number of disjoint faulty spans kept for a machine
    pub fn span_count(&self, machine_id: &str) -> usize {
        self.spans_by_machine.get(machine_id).map_or(0, Vec::len)
    }

    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }
}

/// Sort spans and merge every pair that overlaps or touches.
///
/// Touching spans (`a.end == b.start`) are merged for both policies: under
/// `HalfOpen` the shared instant belongs to `b`, under `Inclusive` to both.
fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => {
                if span.end > last.end {
                    last.end = span.end;
                }
            }
            _ => merged.push(span),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_inclusive_bounds_are_excluded() {
        let ex = IntervalExcluder::new(&[FaultyInterval::new("m1", at(10, 0), at(10, 30))]);
        assert!(ex.is_excluded("m1", at(10, 0)));
        assert!(ex.is_excluded("m1", at(10, 15)));
        assert!(ex.is_excluded("m1", at(10, 30)));
        assert!(!ex.is_excluded("m1", at(10, 31)));
        assert!(!ex.is_excluded("m1", at(9, 59)));
    }

    #[test]
    fn test_half_open_end_is_kept() {
        let ex = IntervalExcluder::with_policy(
            &[FaultyInterval::new("m1", at(10, 0), at(10, 30))],
            BoundaryPolicy::HalfOpen,
        );
        assert!(ex.is_excluded("m1", at(10, 0)));
        assert!(ex.is_excluded("m1", at(10, 29)));
        assert!(!ex.is_excluded("m1", at(10, 30)));
    }

    #[test]
    fn test_machine_without_intervals_is_never_excluded() {
        let ex = IntervalExcluder::new(&[FaultyInterval::new("m1", at(0, 0), at(23, 59))]);
        assert!(!ex.is_excluded("m2", at(12, 0)));
        assert_eq!(ex.span_count("m2"), 0);
    }

    #[test]
    fn test_overlapping_intervals_merge_into_union() {
        let ex = IntervalExcluder::new(&[
            FaultyInterval::new("m1", at(10, 0), at(10, 40)),
            FaultyInterval::new("m1", at(10, 20), at(11, 0)),
            FaultyInterval::new("m1", at(10, 5), at(10, 10)),
            FaultyInterval::new("m1", at(13, 0), at(14, 0)),
        ]);
        assert_eq!(ex.span_count("m1"), 2);
        assert!(ex.is_excluded("m1", at(10, 50)));
        assert!(ex.is_excluded("m1", at(11, 0)));
        assert!(!ex.is_excluded("m1", at(12, 0)));
        assert!(ex.is_excluded("m1", at(13, 30)));
    }

    #[test]
    fn test_degenerate_interval_excludes_nothing_and_warns() {
        let ex = IntervalExcluder::new(&[
            FaultyInterval::new("m1", at(11, 0), at(10, 0)),
            FaultyInterval::new("m1", at(15, 0), at(15, 10)),
        ]);
        assert!(!ex.is_excluded("m1", at(10, 30)));
        assert!(!ex.is_excluded("m1", at(11, 0)));
        assert!(ex.is_excluded("m1", at(15, 5)));
        assert_eq!(ex.warnings().len(), 1);
        assert!(matches!(
            ex.warnings()[0],
            DataIntegrityWarning::DegenerateInterval { .. }
        ));
    }

    #[test]
    fn test_intervals_are_scoped_per_machine() {
        let ex = IntervalExcluder::new(&[
            FaultyInterval::new("m1", at(8, 0), at(9, 0)),
            FaultyInterval::new("m2", at(9, 30), at(10, 0)),
        ]);
        assert!(ex.is_excluded("m1", at(8, 30)));
        assert!(!ex.is_excluded("m2", at(8, 30)));
        assert!(ex.is_excluded("m2", at(9, 45)));
        assert!(!ex.is_excluded("m1", at(9, 45)));
    }

    #[test]
    fn test_touching_half_open_spans_cover_shared_instant() {
        let ex = IntervalExcluder::with_policy(
            &[
                FaultyInterval::new("m1", at(10, 0), at(10, 30)),
                FaultyInterval::new("m1", at(10, 30), at(11, 0)),
            ],
            BoundaryPolicy::HalfOpen,
        );
        assert_eq!(ex.span_count("m1"), 1);
        assert!(ex.is_excluded("m1", at(10, 30)));
        assert!(!ex.is_excluded("m1", at(11, 0)));
    }
}
