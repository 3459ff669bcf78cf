//! Elapsed-time calculation for start/stop intervals and compact formatting.
//!
//! An interval with no stop is open and is measured against the supplied
//! clock, so the same record yields a growing value on every refresh. Pass a
//! captured instant as the clock when many records must agree on "now".

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Clock;
use crate::domain::{MechanicAssignment, Task};

/// Anything with a `(startedAt, stoppedAt)` pair.
pub trait Interval {
    fn started_at(&self) -> Option<DateTime<Utc>>;
    fn stopped_at(&self) -> Option<DateTime<Utc>>;
}

impl Interval for Task {
    fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }
}

impl Interval for MechanicAssignment {
    fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }
}

impl Interval for (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    fn started_at(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.1
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    #[default]
    Seconds,
    Minutes,
}

impl DurationUnit {
    fn millis(self) -> i64 {
        match self {
            DurationUnit::Seconds => 1_000,
            DurationUnit::Minutes => 60_000,
        }
    }

    /// Converts an amount in this unit to whole seconds.
    pub fn to_seconds(self, amount: i64) -> i64 {
        match self {
            DurationUnit::Seconds => amount,
            DurationUnit::Minutes => amount.saturating_mul(60),
        }
    }
}

impl Display for DurationUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationUnit::Seconds => f.write_str("seconds"),
            DurationUnit::Minutes => f.write_str("minutes"),
        }
    }
}

/// `Coarse` shows whole minutes and hours; `Fine` keeps seconds below an hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Coarse,
    #[default]
    Fine,
}

/// Whole elapsed units between start and stop (or the clock when still open).
///
/// Never started means zero. A stop earlier than its start is bad upstream
/// data; it is logged and counted as zero rather than going negative.
pub fn compute_duration(record: &impl Interval, unit: DurationUnit, clock: &impl Clock) -> i64 {
    let Some(start) = record.started_at() else {
        return 0;
    };
    let end = record.stopped_at().unwrap_or_else(|| clock.now());

    let elapsed = (end - start).num_milliseconds();
    if elapsed < 0 {
        warn!(%start, %end, "interval ends before it starts");
        return 0;
    }

    elapsed / unit.millis()
}

pub fn format_duration(seconds: i64, granularity: Granularity) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let rest = seconds % 60;

    if hours > 0 {
        return if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        };
    }

    match granularity {
        Granularity::Coarse => format!("{minutes}m"),
        Granularity::Fine if minutes == 0 => format!("{rest}s"),
        Granularity::Fine if rest == 0 => format!("{minutes}m"),
        Granularity::Fine => format!("{minutes}m {rest}s"),
    }
}
