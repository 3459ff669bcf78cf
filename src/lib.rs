//! Activity execution and work-time accounting for fleet maintenance.
//!
//! Mechanics assigned to a maintenance activity each move through their own
//! lifecycle ([`assignment`]), work an ordered checklist ([`sequencer`]), and
//! accrue time that is derived on read ([`duration`], [`aggregate`],
//! [`report`]). Records come from, and go back to, the surrounding
//! application; nothing here persists them.

pub mod aggregate;
pub mod assignment;
pub mod clock;
pub mod config;
pub mod domain;
pub mod duration;
pub mod error;
pub mod report;
pub mod sequencer;
pub mod storage;

pub use aggregate::{
    MechanicTotals, Snapshot, activity_total, aggregate_mechanic_totals, mechanic_task_time,
    my_total_work_time, snapshot,
};
pub use assignment::{AssignmentAction, transition_assignment};
pub use clock::{Clock, SystemClock};
pub use domain::{
    Activity, ActivityStatus, AssignmentStatus, MechanicAssignment, Task, TaskName, Unit,
    UnitStatus,
};
pub use duration::{DurationUnit, Granularity, Interval, compute_duration, format_duration};
pub use error::{Error, Result};
pub use report::{RankMetric, RankedMechanic, rank_mechanics};
pub use sequencer::{TaskNamePolicy, TaskNames, TaskState, can_start_task, start_task, stop_task};
