//! Read-side roll-ups: task time per mechanic, per activity and per unit,
//! plus a point-in-time [`Snapshot`] of every activity.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::domain::{Activity, ActivityStatus, AssignmentStatus, MechanicAssignment, TaskName};
use crate::duration::{DurationUnit, compute_duration};
use crate::sequencer::{TaskState, task_state};

/// Sum of the mechanic's task durations. Each task is floored on its own.
pub fn mechanic_task_time(
    assignment: &MechanicAssignment,
    unit: DurationUnit,
    clock: &impl Clock,
) -> i64 {
    let end = work_cutoff(assignment, clock);
    assignment
        .tasks
        .iter()
        .map(|task| compute_duration(task, unit, &end))
        .sum()
}

/// Instant open tasks are measured against. A stopped assignment stops
/// accruing at its own stop time even if a task was left running.
pub fn work_cutoff(assignment: &MechanicAssignment, clock: &impl Clock) -> DateTime<Utc> {
    let now = clock.now();
    match assignment.stopped_at {
        Some(stopped_at) if stopped_at < now => stopped_at,
        _ => now,
    }
}

/// Work time recorded on one activity, across all of its mechanics.
pub fn activity_total(activity: &Activity, unit: DurationUnit, clock: &impl Clock) -> i64 {
    activity
        .mechanics
        .iter()
        .map(|assignment| mechanic_task_time(assignment, unit, clock))
        .sum()
}

/// Everything assigned to one mechanic, across every activity given.
pub fn my_total_work_time(
    activities: &[Activity],
    mechanic_id: &str,
    unit: DurationUnit,
    clock: &impl Clock,
) -> i64 {
    activities
        .iter()
        .filter_map(|activity| activity.mechanic(mechanic_id))
        .map(|assignment| mechanic_task_time(assignment, unit, clock))
        .sum()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicTotal {
    pub mechanic_id: String,
    pub work_time: i64,
    pub activity_count: usize,
    pub completed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTotal {
    pub activity_id: String,
    pub unit_id: String,
    pub work_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTotal {
    pub unit_id: String,
    pub work_time: i64,
    pub activity_count: usize,
}

/// Rows keep first-seen order, which rankings use to break ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MechanicTotals {
    pub unit: DurationUnit,
    pub per_mechanic: Vec<MechanicTotal>,
    pub per_activity: Vec<ActivityTotal>,
    pub per_unit: Vec<UnitTotal>,
    pub grand_total: i64,
}

pub fn aggregate_mechanic_totals(
    activities: &[Activity],
    unit: DurationUnit,
    clock: &impl Clock,
) -> MechanicTotals {
    let now = clock.now();
    let mut per_mechanic: Vec<MechanicTotal> = Vec::new();
    let mut per_activity = Vec::with_capacity(activities.len());
    let mut per_unit: Vec<UnitTotal> = Vec::new();

    for activity in activities {
        let mut activity_time = 0;
        for assignment in &activity.mechanics {
            let work_time = mechanic_task_time(assignment, unit, &now);
            activity_time += work_time;

            let index = match per_mechanic
                .iter()
                .position(|row| row.mechanic_id == assignment.mechanic_id)
            {
                Some(index) => index,
                None => {
                    per_mechanic.push(MechanicTotal {
                        mechanic_id: assignment.mechanic_id.clone(),
                        work_time: 0,
                        activity_count: 0,
                        completed_count: 0,
                    });
                    per_mechanic.len() - 1
                }
            };
            let row = &mut per_mechanic[index];
            row.work_time += work_time;
            row.activity_count += 1;
            if assignment.status == AssignmentStatus::Completed {
                row.completed_count += 1;
            }
        }

        match per_unit.iter_mut().find(|row| row.unit_id == activity.unit_id) {
            Some(row) => {
                row.work_time += activity_time;
                row.activity_count += 1;
            }
            None => per_unit.push(UnitTotal {
                unit_id: activity.unit_id.clone(),
                work_time: activity_time,
                activity_count: 1,
            }),
        }

        per_activity.push(ActivityTotal {
            activity_id: activity.id.clone(),
            unit_id: activity.unit_id.clone(),
            work_time: activity_time,
        });
    }

    let grand_total = per_activity.iter().map(|row| row.work_time).sum();
    MechanicTotals {
        unit,
        per_mechanic,
        per_activity,
        per_unit,
        grand_total,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub task_id: String,
    pub task_name: TaskName,
    pub order: u32,
    pub state: TaskState,
    pub elapsed: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub mechanic_id: String,
    pub status: AssignmentStatus,
    /// Time on the assignment itself, pauses included.
    pub on_shift: i64,
    pub task_time: i64,
    pub total_work_time: Option<i64>,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub activity_id: String,
    pub unit_id: String,
    pub name: String,
    pub status: ActivityStatus,
    pub group_leader: Option<String>,
    pub work_time: i64,
    pub mechanics: Vec<AssignmentView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub as_of: DateTime<Utc>,
    pub unit: DurationUnit,
    pub activities: Vec<ActivityView>,
}

/// Derives every displayed figure against a single instant.
pub fn snapshot(activities: &[Activity], unit: DurationUnit, as_of: DateTime<Utc>) -> Snapshot {
    let activities = activities
        .iter()
        .map(|activity| {
            let mechanics = activity
                .mechanics
                .iter()
                .map(|assignment| assignment_view(assignment, unit, &as_of))
                .collect::<Vec<_>>();

            ActivityView {
                activity_id: activity.id.clone(),
                unit_id: activity.unit_id.clone(),
                name: activity.name.clone(),
                status: activity.status,
                group_leader: activity.assigned_group_leader.clone(),
                work_time: mechanics.iter().map(|view| view.task_time).sum(),
                mechanics,
            }
        })
        .collect();

    Snapshot {
        as_of,
        unit,
        activities,
    }
}

fn assignment_view(
    assignment: &MechanicAssignment,
    unit: DurationUnit,
    as_of: &DateTime<Utc>,
) -> AssignmentView {
    let end = work_cutoff(assignment, as_of);
    let tasks = assignment
        .sorted_tasks()
        .into_iter()
        .map(|task| TaskView {
            task_id: task.id.clone(),
            task_name: task.task_name.clone(),
            order: task.order,
            state: task_state(task, &assignment.tasks),
            elapsed: compute_duration(task, unit, &end),
        })
        .collect::<Vec<_>>();

    AssignmentView {
        mechanic_id: assignment.mechanic_id.clone(),
        status: assignment.status,
        on_shift: compute_duration(assignment, unit, as_of),
        task_time: tasks.iter().map(|task| task.elapsed).sum(),
        total_work_time: assignment.total_work_time,
        tasks,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{
        activity_total, aggregate_mechanic_totals, mechanic_task_time, my_total_work_time,
        snapshot,
    };
    use crate::domain::{
        Activity, ActivityStatus, AssignmentStatus, MechanicAssignment, Task, TaskName,
    };
    use crate::duration::DurationUnit;
    use crate::sequencer::TaskState;

    pub(crate) fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
    }

    /// A task that ran from `t0 + start` for `minutes`, or is still open.
    pub(crate) fn worked(id: &str, order: u32, start: i64, minutes: Option<i64>) -> Task {
        let started_at = t0() + Duration::minutes(start);
        Task {
            id: id.to_string(),
            task_name: TaskName::new("REPAIR"),
            order,
            started_at: Some(started_at),
            stopped_at: minutes.map(|minutes| started_at + Duration::minutes(minutes)),
        }
    }

    pub(crate) fn mechanic(id: &str, status: AssignmentStatus, tasks: Vec<Task>) -> MechanicAssignment {
        let mut assignment = MechanicAssignment::new(id, tasks);
        assignment.status = status;
        assignment.started_at = Some(t0());
        assignment
    }

    pub(crate) fn activity(id: &str, unit_id: &str, mechanics: Vec<MechanicAssignment>) -> Activity {
        Activity {
            id: id.to_string(),
            unit_id: unit_id.to_string(),
            name: "GENERAL_SERVICE".to_string(),
            description: None,
            remarks: None,
            status: ActivityStatus::InProgress,
            estimated_start: None,
            created_at: t0(),
            updated_at: t0(),
            assigned_group_leader: None,
            mechanics,
        }
    }

    fn fleet() -> Vec<Activity> {
        vec![
            activity(
                "act-1",
                "unit-1",
                vec![
                    mechanic(
                        "mech-a",
                        AssignmentStatus::Completed,
                        vec![worked("a1", 1, 0, Some(30)), worked("a2", 2, 30, Some(15))],
                    ),
                    mechanic(
                        "mech-b",
                        AssignmentStatus::InProgress,
                        vec![worked("b1", 1, 0, None)],
                    ),
                ],
            ),
            activity(
                "act-2",
                "unit-1",
                vec![mechanic(
                    "mech-a",
                    AssignmentStatus::InProgress,
                    vec![worked("a3", 1, 60, Some(20))],
                )],
            ),
        ]
    }

    #[test]
    fn per_activity_and_per_mechanic_totals_differ() {
        let now = t0() + Duration::minutes(90);
        let activities = fleet();

        assert_eq!(activity_total(&activities[0], DurationUnit::Minutes, &now), 45 + 90);
        assert_eq!(
            my_total_work_time(&activities, "mech-a", DurationUnit::Minutes, &now),
            65
        );
        assert_eq!(
            my_total_work_time(&activities, "mech-z", DurationUnit::Minutes, &now),
            0
        );
    }

    #[test]
    fn rolls_up_mechanics_activities_and_units() {
        let now = t0() + Duration::minutes(90);
        let totals = aggregate_mechanic_totals(&fleet(), DurationUnit::Minutes, &now);

        let mechanics = totals
            .per_mechanic
            .iter()
            .map(|row| (row.mechanic_id.as_str(), row.work_time, row.activity_count, row.completed_count))
            .collect::<Vec<_>>();
        assert_eq!(mechanics, vec![("mech-a", 65, 2, 1), ("mech-b", 90, 1, 0)]);

        let activities = totals
            .per_activity
            .iter()
            .map(|row| (row.activity_id.as_str(), row.work_time))
            .collect::<Vec<_>>();
        assert_eq!(activities, vec![("act-1", 135), ("act-2", 20)]);

        assert_eq!(totals.per_unit.len(), 1);
        assert_eq!(totals.per_unit[0].activity_count, 2);
        assert_eq!(totals.per_unit[0].work_time, 155);
        assert_eq!(totals.grand_total, 155);
    }

    #[test]
    fn snapshot_is_pinned_to_as_of() {
        let mut activities = fleet();
        activities[1].mechanics[0].tasks.push(Task::new(TaskName::new("REPORTING"), 2));
        let as_of = t0() + Duration::minutes(10);

        let view = snapshot(&activities, DurationUnit::Seconds, as_of);
        assert_eq!(view.as_of, as_of);

        let mech_b = &view.activities[0].mechanics[1];
        assert_eq!(mech_b.tasks[0].state, TaskState::Active);
        assert_eq!(mech_b.task_time, 600);
        assert_eq!(mech_b.on_shift, 600);

        let act_2 = &view.activities[1].mechanics[0];
        assert_eq!(act_2.tasks[0].state, TaskState::Completed);
        assert_eq!(act_2.tasks[1].state, TaskState::Ready);
        assert_eq!(act_2.tasks[1].elapsed, 0);
    }

    #[test]
    fn stopped_assignment_caps_its_open_task() {
        let mut assignment = mechanic(
            "mech-a",
            AssignmentStatus::Completed,
            vec![worked("a1", 1, 0, None)],
        );
        assignment.stopped_at = Some(t0() + Duration::minutes(40));
        assignment.total_work_time = Some(40);
        let activities = vec![activity("act-1", "unit-1", vec![assignment])];

        let day_later = t0() + Duration::hours(24);
        let minutes = DurationUnit::Minutes;
        assert_eq!(mechanic_task_time(&activities[0].mechanics[0], minutes, &day_later), 40);
        assert_eq!(my_total_work_time(&activities, "mech-a", minutes, &day_later), 40);
        assert_eq!(aggregate_mechanic_totals(&activities, minutes, &day_later).grand_total, 40);

        let view = snapshot(&activities, minutes, day_later);
        let mech_a = &view.activities[0].mechanics[0];
        assert_eq!(mech_a.task_time, 40);
        assert_eq!(mech_a.tasks[0].elapsed, 40);
        assert_eq!(mech_a.on_shift, 40);

        let before_stop = t0() + Duration::minutes(25);
        assert_eq!(mechanic_task_time(&activities[0].mechanics[0], minutes, &before_stop), 25);
    }
}
