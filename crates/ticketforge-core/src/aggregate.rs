//! Estimate aggregation and summary statistics.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::model::{ProcessType, ProjectData, TaskEstimate};

/// Build [`ProjectData`] from validated task rows.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyEstimates`] when `tasks` is empty and
/// [`ValidationError::ZeroTotalEffort`] when no process has any effort.
pub fn aggregate(tasks: Vec<TaskEstimate>) -> Result<ProjectData, ValidationError> {
    if tasks.is_empty() {
        return Err(ValidationError::EmptyEstimates);
    }
    let data = ProjectData::from_tasks(tasks);
    if data.grand_total() <= 0.0 {
        return Err(ValidationError::ZeroTotalEffort);
    }
    tracing::debug!(
        tasks = data.tasks().len(),
        total_hours = data.grand_total(),
        "aggregated estimates"
    );
    Ok(data)
}

/// Per-process slice of [`ProjectStatistics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessStatistics {
    pub hours: f64,
    /// Tasks with a positive effort for this process.
    pub task_count: usize,
    /// Share of the grand total, rounded to a whole percent.
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStatistics {
    pub total_tasks: usize,
    pub total_hours: f64,
    pub per_process: BTreeMap<ProcessType, ProcessStatistics>,
}

/// Summarize `data`. Percentages are rounded independently, so they need not
/// add up to exactly 100.
#[must_use]
pub fn statistics(data: &ProjectData) -> ProjectStatistics {
    let total_hours = data.grand_total();
    let per_process = ProcessType::ALL
        .into_iter()
        .map(|process| {
            let hours = data.total(process);
            let task_count = data
                .tasks()
                .iter()
                .filter(|t| t.effort(process) > 0.0)
                .count();
            let stats = ProcessStatistics {
                hours,
                task_count,
                percentage: percentage(hours, total_hours),
            };
            (process, stats)
        })
        .collect();

    ProjectStatistics {
        total_tasks: data.tasks().len(),
        total_hours,
        per_process,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentage(hours: f64, total: f64) -> u32 {
    if total > 0.0 {
        (hours / total * 100.0).round() as u32
    } else {
        0
    }
}

/// Distinct group names among tasks, in first-seen order.
#[must_use]
pub fn group_names(data: &ProjectData) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for name in data.tasks().iter().filter_map(|t| t.group_name.as_deref()) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, group: Option<&str>, efforts: &[(ProcessType, f64)]) -> TaskEstimate {
        efforts.iter().fold(
            TaskEstimate::new(name, group.map(str::to_string)),
            |t, &(p, h)| t.with_effort(p, h),
        )
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(aggregate(Vec::new()), Err(ValidationError::EmptyEstimates));
    }

    #[test]
    fn all_zero_input_is_rejected() {
        let tasks = vec![task("Login", None, &[(ProcessType::DetailDesign, 0.0)])];
        assert_eq!(aggregate(tasks), Err(ValidationError::ZeroTotalEffort));
    }

    #[test]
    fn statistics_round_percentages() {
        let data = aggregate(vec![
            task("A", None, &[(ProcessType::DetailDesign, 1.0)]),
            task("B", None, &[(ProcessType::Implementation, 1.0)]),
            task("C", None, &[(ProcessType::UnitTest, 1.0)]),
        ])
        .expect("aggregate");
        let stats = statistics(&data);
        assert_eq!(stats.total_tasks, 3);
        assert!((stats.total_hours - 3.0).abs() < f64::EPSILON);
        assert_eq!(stats.per_process[&ProcessType::DetailDesign].percentage, 33);
        assert_eq!(stats.per_process[&ProcessType::IntegrationTest].percentage, 0);
        assert_eq!(stats.per_process[&ProcessType::IntegrationTest].task_count, 0);
        let sum: u32 = stats.per_process.values().map(|s| s.percentage).sum();
        assert_eq!(sum, 99);
    }

    #[test]
    fn group_names_keep_first_seen_order() {
        let data = ProjectData::from_tasks(vec![
            task("a", Some("Settings"), &[(ProcessType::DetailDesign, 1.0)]),
            task("b", Some("Home"), &[(ProcessType::DetailDesign, 1.0)]),
            task("c", Some("Settings"), &[(ProcessType::DetailDesign, 1.0)]),
            task("d", None, &[(ProcessType::DetailDesign, 1.0)]),
        ]);
        assert_eq!(group_names(&data), vec!["Settings", "Home"]);
    }
}
