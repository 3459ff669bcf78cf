use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::error::{Error, Result};

const ID_LEN: usize = 8;

/// Checklist steps the planning backend knows about.
pub const KNOWN_TASK_NAMES: [&str; 10] = [
    "PREPARING_TOOLS",
    "PREPARING_PART",
    "WASHING_UNIT",
    "INSPECTION",
    "TROUBLESHOOTING",
    "PELAKSANAAN_PS",
    "REPAIR",
    "TESTING",
    "CLEANING_AREA",
    "REPORTING",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Active,
    Breakdown,
    Inactive,
}

impl Display for UnitStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UnitStatus::Active => "ACTIVE",
            UnitStatus::Breakdown => "BREAKDOWN",
            UnitStatus::Inactive => "INACTIVE",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub code: String,
    #[serde(rename = "type")]
    pub unit_type: String,
    pub brand: String,
    pub status: UnitStatus,
}

impl Unit {
    pub fn accepts_new_activity(&self) -> bool {
        matches!(self.status, UnitStatus::Breakdown | UnitStatus::Inactive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    Pending,
    InProgress,
    Paused,
    Completed,
    Delayed,
    Cancelled,
}

impl ActivityStatus {
    pub const ALL: [ActivityStatus; 6] = [
        ActivityStatus::Pending,
        ActivityStatus::InProgress,
        ActivityStatus::Paused,
        ActivityStatus::Completed,
        ActivityStatus::Delayed,
        ActivityStatus::Cancelled,
    ];
}

impl Display for ActivityStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ActivityStatus::Pending => "PENDING",
            ActivityStatus::InProgress => "IN_PROGRESS",
            ActivityStatus::Paused => "PAUSED",
            ActivityStatus::Completed => "COMPLETED",
            ActivityStatus::Delayed => "DELAYED",
            ActivityStatus::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    InProgress,
    Paused,
    Completed,
    Delayed,
}

impl Display for AssignmentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AssignmentStatus::Pending => "PENDING",
            AssignmentStatus::InProgress => "IN_PROGRESS",
            AssignmentStatus::Paused => "PAUSED",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::Delayed => "DELAYED",
        };
        f.write_str(label)
    }
}

/// Name of a checklist step, e.g. `WASHING_UNIT`.
///
/// Any string deserializes; whether an unknown name is accepted is decided
/// by the sequencer's [`TaskNamePolicy`](crate::sequencer::TaskNamePolicy).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        KNOWN_TASK_NAMES.contains(&self.0.as_str())
    }

    /// Uppercase words joined by single underscores.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.split('_').all(|word| {
                !word.is_empty()
                    && word
                        .chars()
                        .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
            })
    }
}

impl Display for TaskName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub task_name: TaskName,
    pub order: u32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(task_name: TaskName, order: u32) -> Self {
        Self {
            id: generate_id(),
            task_name,
            order,
            started_at: None,
            stopped_at: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicAssignment {
    pub id: String,
    pub mechanic_id: String,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pause_reason: Option<String>,
    /// Minutes, frozen when the assignment is stopped.
    #[serde(default)]
    pub total_work_time: Option<i64>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl MechanicAssignment {
    pub fn new(mechanic_id: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            id: generate_id(),
            mechanic_id: mechanic_id.into(),
            status: AssignmentStatus::Pending,
            started_at: None,
            paused_at: None,
            stopped_at: None,
            pause_reason: None,
            total_work_time: None,
            tasks,
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    /// Tasks in execution order. Equal orders keep their stored order.
    pub fn sorted_tasks(&self) -> Vec<&Task> {
        let mut tasks = self.tasks.iter().collect::<Vec<_>>();
        tasks.sort_by_key(|task| task.order);
        tasks
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub unit_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    pub status: ActivityStatus,
    #[serde(default)]
    pub estimated_start: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_group_leader: Option<String>,
    #[serde(default)]
    pub mechanics: Vec<MechanicAssignment>,
}

impl Activity {
    /// Plans a new activity against a unit that is down for maintenance.
    pub fn plan(
        unit: &Unit,
        name: impl Into<String>,
        description: Option<String>,
        estimated_start: Option<DateTime<Utc>>,
        clock: &impl Clock,
    ) -> Result<Self> {
        if !unit.accepts_new_activity() {
            return Err(Error::UnitNotEligible {
                unit_id: unit.id.clone(),
                status: unit.status.to_string(),
            });
        }

        let now = clock.now();
        Ok(Self {
            id: generate_id(),
            unit_id: unit.id.clone(),
            name: name.into(),
            description,
            remarks: None,
            status: ActivityStatus::Pending,
            estimated_start,
            created_at: now,
            updated_at: now,
            assigned_group_leader: None,
            mechanics: Vec::new(),
        })
    }

    pub fn mechanic(&self, mechanic_id: &str) -> Option<&MechanicAssignment> {
        self.mechanics
            .iter()
            .find(|assignment| assignment.mechanic_id == mechanic_id)
    }

    pub(crate) fn mechanic_mut(&mut self, mechanic_id: &str) -> Result<&mut MechanicAssignment> {
        let activity_id = self.id.clone();
        self.mechanics
            .iter_mut()
            .find(|assignment| assignment.mechanic_id == mechanic_id)
            .ok_or_else(|| Error::AssignmentNotFound {
                activity_id,
                mechanic_id: mechanic_id.to_string(),
            })
    }

    pub fn assign_group_leader(&mut self, leader_id: impl Into<String>, clock: &impl Clock) {
        self.assigned_group_leader = Some(leader_id.into());
        self.updated_at = clock.now();
    }

    /// Adds a mechanic with a checklist ordered 1..=n in the given sequence.
    pub fn assign_mechanic(
        &mut self,
        mechanic_id: &str,
        task_names: Vec<TaskName>,
        clock: &impl Clock,
    ) -> Result<&MechanicAssignment> {
        if self.mechanic(mechanic_id).is_some() {
            return Err(Error::DuplicateAssignment {
                activity_id: self.id.clone(),
                mechanic_id: mechanic_id.to_string(),
            });
        }

        let tasks = task_names
            .into_iter()
            .zip(1..)
            .map(|(name, order)| Task::new(name, order))
            .collect();

        debug!(activity_id = %self.id, mechanic_id, "mechanic assigned");
        self.mechanics.push(MechanicAssignment::new(mechanic_id, tasks));
        self.updated_at = clock.now();
        Ok(&self.mechanics[self.mechanics.len() - 1])
    }
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}
