//! Error types for activity and task commands.
//!
//! Every rejected command comes back as an [`Error`]; nothing in the core
//! panics on bad input, and a failed command never mutates the record it was
//! applied to.

use thiserror::Error;

use crate::assignment::AssignmentAction;
use crate::domain::AssignmentStatus;

/// Result type for the fleetwork core
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The action is not legal from the assignment's current status
    #[error("invalid state transition: cannot {action} from {from}")]
    InvalidStateTransition {
        from: AssignmentStatus,
        action: AssignmentAction,
    },

    /// A lower-order task for the same mechanic is not completed yet
    #[error("task {task_id} is locked until order {blocking_order} is completed")]
    TaskLocked { task_id: String, blocking_order: u32 },

    #[error("task {task_id} has already been started")]
    TaskAlreadyStarted { task_id: String },

    #[error("task {task_id} is not running")]
    TaskNotActive { task_id: String },

    /// Task actions are only accepted while the assignment is in progress
    #[error("assignment is not active (status {status})")]
    AssignmentNotActive { status: AssignmentStatus },

    #[error("data inconsistency: {detail}")]
    DataInconsistency { detail: String },

    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("mechanic {mechanic_id} is not assigned to activity {activity_id}")]
    AssignmentNotFound {
        activity_id: String,
        mechanic_id: String,
    },

    #[error("mechanic {mechanic_id} is already assigned to activity {activity_id}")]
    DuplicateAssignment {
        activity_id: String,
        mechanic_id: String,
    },

    /// Only units that are broken down or inactive take new activities
    #[error("unit {unit_id} is {status} and cannot receive new activities")]
    UnitNotEligible { unit_id: String, status: String },

    #[error("unknown task name: {name}")]
    UnknownTaskName { name: String },

    #[error("malformed task name: {name:?}")]
    MalformedTaskName { name: String },
}

impl Error {
    pub(crate) fn inconsistency(detail: impl Into<String>) -> Self {
        Error::DataInconsistency {
            detail: detail.into(),
        }
    }
}
