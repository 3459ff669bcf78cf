//! Report-level summaries over many activities.

use serde::{Deserialize, Serialize};

use crate::aggregate::{MechanicTotal, aggregate_mechanic_totals};
use crate::clock::Clock;
use crate::domain::{Activity, ActivityStatus, Unit, UnitStatus};
use crate::duration::DurationUnit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    #[default]
    WorkTime,
    ActivityCount,
    CompletedCount,
}

impl RankMetric {
    fn value(self, entry: &MechanicTotal) -> i64 {
        match self {
            RankMetric::WorkTime => entry.work_time,
            RankMetric::ActivityCount => entry.activity_count as i64,
            RankMetric::CompletedCount => entry.completed_count as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMechanic {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: MechanicTotal,
}

/// Highest metric first. Ties keep input order and still get distinct
/// ranks: `[7, 7, 5]` ranks `1, 2, 3`.
pub fn rank_mechanics(entries: &[MechanicTotal], metric: RankMetric) -> Vec<RankedMechanic> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|left, right| metric.value(right).cmp(&metric.value(left)));

    sorted
        .into_iter()
        .enumerate()
        .map(|(index, entry)| RankedMechanic {
            rank: index + 1,
            entry,
        })
        .collect()
}

/// `count / total`, zero when there is nothing to divide by.
pub fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64
}

/// Percentage with one decimal, or `"0"` for an empty population.
pub fn format_rate(count: usize, total: usize) -> String {
    if total == 0 {
        return "0".to_string();
    }
    format!("{:.1}%", rate(count, total) * 100.0)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReport {
    pub unit: DurationUnit,
    pub total_activities: usize,
    pub by_status: Vec<(ActivityStatus, usize)>,
    pub completion_rate: f64,
    pub in_progress_rate: f64,
    pub total_work_time: i64,
    pub top_mechanics: Vec<RankedMechanic>,
}

impl ActivityReport {
    pub fn count(&self, status: ActivityStatus) -> usize {
        self.by_status
            .iter()
            .find(|(candidate, _)| *candidate == status)
            .map_or(0, |(_, count)| *count)
    }
}

pub fn summarize_activities(
    activities: &[Activity],
    unit: DurationUnit,
    metric: RankMetric,
    top: usize,
    clock: &impl Clock,
) -> ActivityReport {
    let totals = aggregate_mechanic_totals(activities, unit, clock);
    let by_status = ActivityStatus::ALL
        .iter()
        .map(|status| {
            let count = activities
                .iter()
                .filter(|activity| activity.status == *status)
                .count();
            (*status, count)
        })
        .collect::<Vec<_>>();

    let count = |status: ActivityStatus| {
        by_status
            .iter()
            .find(|(candidate, _)| *candidate == status)
            .map_or(0, |(_, count)| *count)
    };
    let total_activities = activities.len();
    let completion_rate = rate(count(ActivityStatus::Completed), total_activities);
    let in_progress_rate = rate(count(ActivityStatus::InProgress), total_activities);

    let mut top_mechanics = rank_mechanics(&totals.per_mechanic, metric);
    top_mechanics.truncate(top);

    ActivityReport {
        unit,
        total_activities,
        by_status,
        completion_rate,
        in_progress_rate,
        total_work_time: totals.grand_total,
        top_mechanics,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitReport {
    pub total_units: usize,
    pub active: usize,
    pub breakdown: usize,
    pub inactive: usize,
    pub active_rate: f64,
}

pub fn summarize_units(units: &[Unit]) -> UnitReport {
    let count = |status: UnitStatus| units.iter().filter(|unit| unit.status == status).count();
    let active = count(UnitStatus::Active);

    UnitReport {
        total_units: units.len(),
        active,
        breakdown: count(UnitStatus::Breakdown),
        inactive: count(UnitStatus::Inactive),
        active_rate: rate(active, units.len()),
    }
}
