//! Time window and boundary policy

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// How the end bound of a time span is treated.
///
/// The start bound is always inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// `start <= t <= end`
    #[default]
    Inclusive,
    /// `start <= t < end`
    HalfOpen,
}

impl BoundaryPolicy {
    /// Whether `t` lies inside the span `[start, end]` / `[start, end)`
    pub fn contains(self, start: NaiveDateTime, end: NaiveDateTime, t: NaiveDateTime) -> bool {
        match self {
            BoundaryPolicy::Inclusive => start <= t && t <= end,
            BoundaryPolicy::HalfOpen => start <= t && t < end,
        }
    }
}

impl std::fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryPolicy::Inclusive => write!(f, "inclusive"),
            BoundaryPolicy::HalfOpen => write!(f, "half_open"),
        }
    }
}

impl std::str::FromStr for BoundaryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "inclusive" | "closed" => Ok(BoundaryPolicy::Inclusive),
            "half_open" | "halfopen" => Ok(BoundaryPolicy::HalfOpen),
            other => Err(format!(
                "unknown boundary policy '{other}' (expected 'inclusive' or 'half_open')"
            )),
        }
    }
}

/// The requested time window of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub policy: BoundaryPolicy,
}

impl TimeWindow {
    /// Window with both bounds inclusive
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self::with_policy(start, end, BoundaryPolicy::Inclusive)
    }

    pub fn with_policy(start: NaiveDateTime, end: NaiveDateTime, policy: BoundaryPolicy) -> Self {
        Self { start, end, policy }
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.policy.contains(self.start, self.end, t)
    }

    /// `start > end`
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// Truncate an instant to the start of its calendar hour.
pub fn floor_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    t.date()
        .and_hms_opt(t.hour(), 0, 0)
        .unwrap_or(t)
}
