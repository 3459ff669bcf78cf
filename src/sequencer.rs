//! Ordered checklist execution for one mechanic's assignment.
//!
//! A task unlocks once every task with a strictly lower `order` is completed.
//! Tasks that share an order (bad upstream data) unlock together.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::domain::{Activity, AssignmentStatus, MechanicAssignment, Task, TaskName};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskNamePolicy {
    /// Well-formed unknown names are accepted with a warning; the backend
    /// does the final validation.
    #[default]
    Lenient,
    Strict,
}

/// Task-name vocabulary plus the policy for names outside it.
#[derive(Debug, Clone, Default)]
pub struct TaskNames {
    policy: TaskNamePolicy,
    extra: Vec<String>,
}

impl TaskNames {
    pub fn new(policy: TaskNamePolicy, extra: Vec<String>) -> Self {
        Self { policy, extra }
    }

    pub fn policy(&self) -> TaskNamePolicy {
        self.policy
    }

    pub fn validate(&self, raw: &str) -> Result<TaskName> {
        let name = TaskName::new(raw.trim());
        if name.is_known() || self.extra.iter().any(|extra| extra == name.as_str()) {
            return Ok(name);
        }

        if !name.is_well_formed() {
            return Err(Error::MalformedTaskName {
                name: raw.to_string(),
            });
        }

        match self.policy {
            TaskNamePolicy::Lenient => {
                warn!(task_name = %name, "unrecognized task name passed through");
                Ok(name)
            }
            TaskNamePolicy::Strict => Err(Error::UnknownTaskName {
                name: name.as_str().to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Locked,
    Ready,
    Active,
    Completed,
}

impl Display for TaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskState::Locked => "locked",
            TaskState::Ready => "ready",
            TaskState::Active => "active",
            TaskState::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Lowest order below `task` that is not completed yet.
pub fn blocking_order(task: &Task, tasks: &[Task]) -> Option<u32> {
    tasks
        .iter()
        .filter(|other| other.order < task.order && !other.is_completed())
        .map(|other| other.order)
        .min()
}

pub fn task_state(task: &Task, tasks: &[Task]) -> TaskState {
    if task.is_completed() {
        TaskState::Completed
    } else if task.is_active() {
        TaskState::Active
    } else if blocking_order(task, tasks).is_some() {
        TaskState::Locked
    } else {
        TaskState::Ready
    }
}

pub fn can_start_task(task: &Task, tasks: &[Task], status: AssignmentStatus) -> bool {
    status == AssignmentStatus::InProgress && blocking_order(task, tasks).is_none()
}

pub fn start_task(
    assignment: &mut MechanicAssignment,
    task_id: &str,
    clock: &impl Clock,
) -> Result<Task> {
    let index = task_index(assignment, task_id)?;
    if assignment.status != AssignmentStatus::InProgress {
        return Err(Error::AssignmentNotActive {
            status: assignment.status,
        });
    }

    let task = &assignment.tasks[index];
    if task.is_started() {
        return Err(Error::TaskAlreadyStarted {
            task_id: task_id.to_string(),
        });
    }
    if task.stopped_at.is_some() {
        return Err(Error::inconsistency(format!(
            "task {task_id} has a stop time but was never started"
        )));
    }
    if let Some(blocking_order) = blocking_order(task, &assignment.tasks) {
        return Err(Error::TaskLocked {
            task_id: task_id.to_string(),
            blocking_order,
        });
    }

    let order = task.order;
    if assignment
        .tasks
        .iter()
        .filter(|other| other.order == order)
        .count()
        > 1
    {
        warn!(
            mechanic_id = %assignment.mechanic_id,
            order,
            "several tasks share this order; starting them in parallel"
        );
    }

    let now = clock.now();
    let task = &mut assignment.tasks[index];
    task.started_at = Some(now);
    debug!(task_id, task_name = %task.task_name, %now, "task started");
    Ok(task.clone())
}

/// Stops a running task. Stopping twice is rejected so time is never
/// counted twice.
pub fn stop_task(
    assignment: &mut MechanicAssignment,
    task_id: &str,
    clock: &impl Clock,
) -> Result<Task> {
    let index = task_index(assignment, task_id)?;
    if assignment.status != AssignmentStatus::InProgress {
        return Err(Error::AssignmentNotActive {
            status: assignment.status,
        });
    }

    let now = clock.now();
    let task = &mut assignment.tasks[index];
    let Some(started_at) = task.started_at.filter(|_| task.stopped_at.is_none()) else {
        return Err(Error::TaskNotActive {
            task_id: task_id.to_string(),
        });
    };
    if now < started_at {
        return Err(Error::inconsistency(format!(
            "task {task_id} would stop at {now}, before its start at {started_at}"
        )));
    }

    task.stopped_at = Some(now);
    debug!(task_id, task_name = %task.task_name, %now, "task stopped");
    Ok(task.clone())
}

fn task_index(assignment: &MechanicAssignment, task_id: &str) -> Result<usize> {
    assignment
        .tasks
        .iter()
        .position(|task| task.id == task_id)
        .ok_or_else(|| Error::TaskNotFound {
            task_id: task_id.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    DuplicateOrder { order: u32, task_ids: Vec<String> },
    ZeroOrder { task_id: String },
    StoppedWithoutStart { task_id: String },
    StoppedBeforeStart { task_id: String },
}

impl Display for Inconsistency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Inconsistency::DuplicateOrder { order, task_ids } => {
                write!(f, "order {order} is shared by tasks {}", task_ids.join(", "))
            }
            Inconsistency::ZeroOrder { task_id } => {
                write!(f, "task {task_id} has order 0")
            }
            Inconsistency::StoppedWithoutStart { task_id } => {
                write!(f, "task {task_id} has a stop time but no start time")
            }
            Inconsistency::StoppedBeforeStart { task_id } => {
                write!(f, "task {task_id} stops before it starts")
            }
        }
    }
}

/// Reports every data problem in a task list without correcting anything.
pub fn inspect_task_list(tasks: &[Task]) -> Vec<Inconsistency> {
    let mut problems = Vec::new();
    let mut by_order: BTreeMap<u32, Vec<String>> = BTreeMap::new();

    for task in tasks {
        by_order.entry(task.order).or_default().push(task.id.clone());

        if task.order == 0 {
            problems.push(Inconsistency::ZeroOrder {
                task_id: task.id.clone(),
            });
        }

        match (task.started_at, task.stopped_at) {
            (None, Some(_)) => problems.push(Inconsistency::StoppedWithoutStart {
                task_id: task.id.clone(),
            }),
            (Some(start), Some(stop)) if stop < start => {
                problems.push(Inconsistency::StoppedBeforeStart {
                    task_id: task.id.clone(),
                })
            }
            _ => {}
        }
    }

    for (order, task_ids) in by_order {
        if task_ids.len() > 1 {
            problems.push(Inconsistency::DuplicateOrder { order, task_ids });
        }
    }

    problems
}

pub fn ensure_consistent(tasks: &[Task]) -> Result<()> {
    match inspect_task_list(tasks).into_iter().next() {
        Some(problem) => Err(Error::inconsistency(problem.to_string())),
        None => Ok(()),
    }
}

impl Activity {
    pub fn start_task(&mut self, mechanic_id: &str, task_id: &str, clock: &impl Clock) -> Result<Task> {
        let task = start_task(self.mechanic_mut(mechanic_id)?, task_id, clock)?;
        self.updated_at = clock.now();
        Ok(task)
    }

    pub fn stop_task(&mut self, mechanic_id: &str, task_id: &str, clock: &impl Clock) -> Result<Task> {
        let task = stop_task(self.mechanic_mut(mechanic_id)?, task_id, clock)?;
        self.updated_at = clock.now();
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{
        Inconsistency, TaskNamePolicy, TaskNames, TaskState, can_start_task, ensure_consistent,
        inspect_task_list, start_task, stop_task, task_state,
    };
    use crate::domain::{AssignmentStatus, MechanicAssignment, Task, TaskName};
    use crate::error::Error;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 8, 0, 0).unwrap()
    }

    fn task(id: &str, order: u32) -> Task {
        Task {
            id: id.to_string(),
            task_name: TaskName::new("PREPARING_PART"),
            order,
            started_at: None,
            stopped_at: None,
        }
    }

    fn assignment(orders: &[u32]) -> MechanicAssignment {
        let tasks = orders
            .iter()
            .enumerate()
            .map(|(index, order)| task(&format!("t{}", index + 1), *order))
            .collect();
        let mut assignment = MechanicAssignment::new("mech-a", tasks);
        assignment.status = AssignmentStatus::InProgress;
        assignment.started_at = Some(t0());
        assignment
    }

    #[test]
    fn first_completed_unlocks_only_the_next() {
        let mut assignment = assignment(&[1, 2, 3]);
        start_task(&mut assignment, "t1", &t0()).expect("start t1");
        stop_task(&mut assignment, "t1", &(t0() + Duration::minutes(5))).expect("stop t1");

        let tasks = &assignment.tasks;
        let status = assignment.status;
        assert!(can_start_task(&tasks[1], tasks, status));
        assert!(!can_start_task(&tasks[2], tasks, status));
        assert_eq!(task_state(&tasks[0], tasks), TaskState::Completed);
        assert_eq!(task_state(&tasks[1], tasks), TaskState::Ready);
        assert_eq!(task_state(&tasks[2], tasks), TaskState::Locked);
    }

    #[test]
    fn locked_task_reports_blocking_order() {
        let mut assignment = assignment(&[1, 2, 3]);
        let err = start_task(&mut assignment, "t3", &t0()).expect_err("t3 should be locked");
        assert_eq!(
            err,
            Error::TaskLocked {
                task_id: "t3".to_string(),
                blocking_order: 1,
            }
        );
        assert!(assignment.tasks.iter().all(|task| task.started_at.is_none()));
    }

    #[test]
    fn shared_order_unlocks_together() {
        let mut assignment = assignment(&[1, 2, 2, 3]);
        start_task(&mut assignment, "t1", &t0()).expect("start t1");
        stop_task(&mut assignment, "t1", &t0()).expect("stop t1");

        start_task(&mut assignment, "t2", &t0()).expect("start t2");
        start_task(&mut assignment, "t3", &t0()).expect("start t3 alongside t2");
        let err = start_task(&mut assignment, "t4", &t0()).expect_err("t4 waits for both");
        assert!(matches!(err, Error::TaskLocked { blocking_order: 2, .. }));
    }

    #[test]
    fn task_actions_need_in_progress_assignment() {
        let mut assignment = assignment(&[1]);
        start_task(&mut assignment, "t1", &t0()).expect("start t1");
        assignment.status = AssignmentStatus::Paused;

        let err = stop_task(&mut assignment, "t1", &t0()).expect_err("paused should reject");
        assert_eq!(
            err,
            Error::AssignmentNotActive {
                status: AssignmentStatus::Paused,
            }
        );
        assert!(assignment.tasks[0].is_active());
        assert!(!can_start_task(&assignment.tasks[0], &assignment.tasks, AssignmentStatus::Pending));
    }

    #[test]
    fn every_inactive_status_rejects_task_actions() {
        let inactive = [
            AssignmentStatus::Pending,
            AssignmentStatus::Paused,
            AssignmentStatus::Delayed,
            AssignmentStatus::Completed,
        ];

        for status in inactive {
            // t1 open, t2 ready behind it once t1 stops
            let mut assignment = assignment(&[1, 2]);
            start_task(&mut assignment, "t1", &t0()).expect("start t1");
            assignment.status = status;
            let before = assignment.tasks.clone();
            let later = t0() + Duration::minutes(30);

            let err = start_task(&mut assignment, "t2", &later).expect_err("start should be rejected");
            assert_eq!(err, Error::AssignmentNotActive { status }, "start while {status}");
            let err = stop_task(&mut assignment, "t1", &later).expect_err("stop should be rejected");
            assert_eq!(err, Error::AssignmentNotActive { status }, "stop while {status}");

            assert_eq!(assignment.tasks, before, "tasks touched while {status}");
            assert!(!can_start_task(&assignment.tasks[1], &assignment.tasks, status));
        }
    }

    #[test]
    fn stopping_twice_is_rejected() {
        let mut assignment = assignment(&[1]);
        start_task(&mut assignment, "t1", &t0()).expect("start");
        let stopped_at = t0() + Duration::minutes(10);
        stop_task(&mut assignment, "t1", &stopped_at).expect("stop");

        let err = stop_task(&mut assignment, "t1", &(t0() + Duration::hours(1)))
            .expect_err("second stop should fail");
        assert!(matches!(err, Error::TaskNotActive { .. }));
        assert_eq!(assignment.tasks[0].stopped_at, Some(stopped_at));

        let err = start_task(&mut assignment, "t1", &t0()).expect_err("restart should fail");
        assert!(matches!(err, Error::TaskAlreadyStarted { .. }));
    }

    #[test]
    fn unknown_task_id() {
        let mut assignment = assignment(&[1]);
        let err = start_task(&mut assignment, "missing", &t0()).expect_err("should fail");
        assert!(matches!(err, Error::TaskNotFound { .. }));
    }

    #[test]
    fn lenient_names_pass_through() {
        let lenient = TaskNames::default();
        assert_eq!(lenient.policy(), TaskNamePolicy::Lenient);
        assert!(lenient.validate("REPORTING").is_ok());
        assert_eq!(
            lenient.validate("CHECK_TIRE_PRESSURE").expect("lenient accepts").as_str(),
            "CHECK_TIRE_PRESSURE"
        );
        assert!(matches!(
            lenient.validate("check tires"),
            Err(Error::MalformedTaskName { .. })
        ));

        let strict = TaskNames::new(TaskNamePolicy::Strict, vec!["GREASING".to_string()]);
        assert!(strict.validate("GREASING").is_ok());
        assert!(matches!(
            strict.validate("CHECK_TIRE_PRESSURE"),
            Err(Error::UnknownTaskName { .. })
        ));
    }

    #[test]
    fn inspection_reports_without_fixing() {
        let mut tasks = vec![task("a", 1), task("b", 1), task("c", 0)];
        tasks[0].stopped_at = Some(t0());
        tasks[1].started_at = Some(t0());
        tasks[1].stopped_at = Some(t0() - Duration::minutes(1));

        let problems = inspect_task_list(&tasks);
        assert!(problems.contains(&Inconsistency::StoppedWithoutStart {
            task_id: "a".to_string()
        }));
        assert!(problems.contains(&Inconsistency::StoppedBeforeStart {
            task_id: "b".to_string()
        }));
        assert!(problems.contains(&Inconsistency::ZeroOrder {
            task_id: "c".to_string()
        }));
        assert!(problems.contains(&Inconsistency::DuplicateOrder {
            order: 1,
            task_ids: vec!["a".to_string(), "b".to_string()],
        }));
        assert!(matches!(
            ensure_consistent(&tasks),
            Err(Error::DataInconsistency { .. })
        ));
        assert!(ensure_consistent(&[task("x", 1), task("y", 2)]).is_ok());
    }
}
