use crate::models::{Priority, Task};
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Reported as the average completion time whenever there are recent
/// completions. Placeholder until per-task `actual_time` is averaged.
pub const PLACEHOLDER_AVG_COMPLETION_HOURS: f64 = 2.5;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high_priority: usize,
    pub high_priority_completed: usize,
    /// Completions per day, oldest first; the last slot is today.
    pub weekly_completion: [usize; 7],
    /// Completions per day over the trailing week, one decimal.
    pub velocity: f64,
    pub avg_completion_time: f64,
    /// Percentage of tasks completed, rounded.
    pub completion_rate: u32,
}

fn completed_on(task: &Task) -> Option<NaiveDate> {
    task.completed_at.map(|at| at.date_naive())
}

pub fn compute_statistics(tasks: &[Task], today: NaiveDate) -> Statistics {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let high_priority = tasks
        .iter()
        .filter(|t| t.priority == Priority::High && !t.completed)
        .count();
    let high_priority_completed = tasks
        .iter()
        .filter(|t| t.priority == Priority::High && t.completed)
        .count();

    let mut weekly_completion = [0usize; 7];
    for (i, slot) in weekly_completion.iter_mut().enumerate() {
        let day = today - Duration::days(6 - i as i64);
        *slot = tasks
            .iter()
            .filter(|t| completed_on(t) == Some(day))
            .count();
    }

    let week_start = today - Duration::days(6);
    let recent = tasks
        .iter()
        .filter_map(completed_on)
        .filter(|day| *day >= week_start && *day <= today)
        .count();

    let velocity = (recent as f64 / 7.0 * 10.0).round() / 10.0;
    let avg_completion_time = if recent > 0 {
        PLACEHOLDER_AVG_COMPLETION_HOURS
    } else {
        0.0
    };
    let completion_rate = if total > 0 {
        (completed as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };

    Statistics {
        total,
        completed,
        pending: total - completed,
        high_priority,
        high_priority_completed,
        weekly_completion,
        velocity,
        avg_completion_time,
        completion_rate,
    }
}
