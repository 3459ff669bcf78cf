//! Per-mechanic assignment lifecycle.
//!
//! ```text
//! PENDING --start--> IN_PROGRESS --pause--> PAUSED --resume--> IN_PROGRESS
//! IN_PROGRESS | PAUSED --stop--> COMPLETED (terminal)
//! PENDING | PAUSED --delay--> DELAYED
//! ```
//!
//! Each mechanic on an activity moves through this independently. Pausing
//! the assignment leaves its running task running; the task keeps accruing
//! time until it is stopped.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::mechanic_task_time;
use crate::clock::Clock;
use crate::domain::{Activity, AssignmentStatus, MechanicAssignment};
use crate::duration::DurationUnit;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AssignmentAction {
    Start,
    Pause {
        #[serde(default)]
        reason: Option<String>,
    },
    Resume,
    Stop,
    /// Raised by the planning side, e.g. when the estimated start is missed.
    Delay,
}

impl Display for AssignmentAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AssignmentAction::Start => "start",
            AssignmentAction::Pause { .. } => "pause",
            AssignmentAction::Resume => "resume",
            AssignmentAction::Stop => "stop",
            AssignmentAction::Delay => "delay",
        };
        f.write_str(label)
    }
}

/// Status the action leads to, or `InvalidStateTransition`.
///
/// DELAYED remembers nothing about where it came from, so `started_at`
/// decides: a never-started assignment may only start, a started one may
/// resume or stop.
pub fn next_status(
    assignment: &MechanicAssignment,
    action: &AssignmentAction,
) -> Result<AssignmentStatus> {
    use AssignmentAction as A;
    use AssignmentStatus as S;

    let started = assignment.started_at.is_some();
    let next = match (assignment.status, action) {
        (S::Pending, A::Start) => S::InProgress,
        (S::Delayed, A::Start) if !started => S::InProgress,
        (S::InProgress, A::Pause { .. }) => S::Paused,
        (S::Paused, A::Resume) => S::InProgress,
        (S::Delayed, A::Resume) if started => S::InProgress,
        (S::InProgress | S::Paused, A::Stop) => S::Completed,
        (S::Delayed, A::Stop) if started => S::Completed,
        (S::Pending | S::Paused, A::Delay) => S::Delayed,
        (from, action) => {
            return Err(Error::InvalidStateTransition {
                from,
                action: action.clone(),
            });
        }
    };

    Ok(next)
}

impl MechanicAssignment {
    /// Applies the action in place. On error nothing is touched.
    pub fn apply(&mut self, action: AssignmentAction, clock: &impl Clock) -> Result<()> {
        let next = next_status(self, &action)?;
        let now = clock.now();

        match action {
            AssignmentAction::Start => {
                self.started_at.get_or_insert(now);
            }
            AssignmentAction::Pause { reason } => {
                self.paused_at = Some(now);
                self.pause_reason = reason;
            }
            AssignmentAction::Resume => {
                self.paused_at = None;
                self.pause_reason = None;
            }
            AssignmentAction::Stop => {
                self.stopped_at = Some(now);
                self.total_work_time = Some(mechanic_task_time(self, DurationUnit::Minutes, &now));
            }
            AssignmentAction::Delay => {}
        }

        info!(
            mechanic_id = %self.mechanic_id,
            from = %self.status,
            to = %next,
            "assignment transition"
        );
        self.status = next;
        Ok(())
    }
}

pub fn transition_assignment(
    assignment: &MechanicAssignment,
    action: AssignmentAction,
    clock: &impl Clock,
) -> Result<MechanicAssignment> {
    let mut next = assignment.clone();
    next.apply(action, clock)?;
    Ok(next)
}

impl Activity {
    /// Routes an action to one mechanic's assignment and returns its new state.
    pub fn apply(
        &mut self,
        mechanic_id: &str,
        action: AssignmentAction,
        clock: &impl Clock,
    ) -> Result<MechanicAssignment> {
        let assignment = self.mechanic_mut(mechanic_id)?;
        assignment.apply(action, clock)?;
        let updated = assignment.clone();
        self.updated_at = clock.now();
        Ok(updated)
    }
}
