use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

/// Largest effort accepted for a single task/process cell.
pub const MAX_CELL_EFFORT: f64 = 1000.0;

/// Development process a unit of effort belongs to.
///
/// The declaration order is the canonical order used for tree building,
/// statistics and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    DetailDesign,
    Implementation,
    UnitTest,
    /// Implementation and unit test estimated as one figure.
    ImplementationUnit,
    IntegrationTest,
}

impl ProcessType {
    pub const ALL: [Self; 5] = [
        Self::DetailDesign,
        Self::Implementation,
        Self::UnitTest,
        Self::ImplementationUnit,
        Self::IntegrationTest,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DetailDesign => "detail_design",
            Self::Implementation => "implementation",
            Self::UnitTest => "unit_test",
            Self::ImplementationUnit => "implementation_unit",
            Self::IntegrationTest => "integration_test",
        }
    }

    /// Human-readable name used in subjects and previews.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DetailDesign => "Detail design",
            Self::Implementation => "Implementation",
            Self::UnitTest => "Unit test",
            Self::ImplementationUnit => "Implementation & unit test",
            Self::IntegrationTest => "Integration test",
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown process type '{0}' (expected one of: detail_design, implementation, unit_test, implementation_unit, integration_test)")]
pub struct ParseProcessError(pub String);

impl FromStr for ProcessType {
    type Err = ParseProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParseProcessError(s.to_string()))
    }
}

/// Reason a spreadsheet row was not turned into an estimate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowRejection {
    #[error("task name is empty")]
    EmptyTaskName,

    #[error("{process} effort is negative ({hours})")]
    NegativeEffort { process: ProcessType, hours: f64 },

    #[error("{process} effort is not a finite number")]
    NonFiniteEffort { process: ProcessType },

    #[error("{process} effort {hours} exceeds the 1000 hour limit")]
    EffortTooLarge { process: ProcessType, hours: f64 },

    #[error("every process effort is zero")]
    NoEffort,
}

/// Effort estimate for one task, keyed by process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEstimate {
    pub task_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub efforts: BTreeMap<ProcessType, f64>,
}

impl TaskEstimate {
    #[must_use]
    pub fn new(task_name: impl Into<String>, group_name: Option<String>) -> Self {
        Self {
            task_name: task_name.into(),
            group_name,
            efforts: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_effort(mut self, process: ProcessType, hours: f64) -> Self {
        self.efforts.insert(process, hours);
        self
    }

    /// Effort for `process`, zero when the process was not estimated.
    #[must_use]
    pub fn effort(&self, process: ProcessType) -> f64 {
        self.efforts.get(&process).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.efforts.values().sum()
    }

    /// Check the row-level invariants: a name, finite non-negative efforts
    /// within range, and at least one positive effort.
    ///
    /// # Errors
    ///
    /// Returns the first [`RowRejection`] that applies.
    pub fn validate(&self) -> Result<(), RowRejection> {
        if self.task_name.trim().is_empty() {
            return Err(RowRejection::EmptyTaskName);
        }
        for (&process, &hours) in &self.efforts {
            if !hours.is_finite() {
                return Err(RowRejection::NonFiniteEffort { process });
            }
            if hours < 0.0 {
                return Err(RowRejection::NegativeEffort { process, hours });
            }
            if hours > MAX_CELL_EFFORT {
                return Err(RowRejection::EffortTooLarge { process, hours });
            }
        }
        if self.efforts.values().all(|&h| h <= 0.0) {
            return Err(RowRejection::NoEffort);
        }
        Ok(())
    }
}

/// Ordered task estimates plus the per-process totals derived from them.
///
/// Totals are recomputed whenever the task list changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectData {
    tasks: Vec<TaskEstimate>,
    totals: BTreeMap<ProcessType, f64>,
}

impl ProjectData {
    #[must_use]
    pub fn from_tasks(tasks: Vec<TaskEstimate>) -> Self {
        let mut data = Self {
            tasks,
            totals: BTreeMap::new(),
        };
        data.recompute();
        data
    }

    pub fn push(&mut self, task: TaskEstimate) {
        self.tasks.push(task);
        self.recompute();
    }

    #[must_use]
    pub fn tasks(&self) -> &[TaskEstimate] {
        &self.tasks
    }

    #[must_use]
    pub const fn totals(&self) -> &BTreeMap<ProcessType, f64> {
        &self.totals
    }

    #[must_use]
    pub fn total(&self, process: ProcessType) -> f64 {
        self.totals.get(&process).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn grand_total(&self) -> f64 {
        self.totals.values().sum()
    }

    fn recompute(&mut self) {
        self.totals = ProcessType::ALL
            .into_iter()
            .map(|p| (p, self.tasks.iter().map(|t| t.effort(p)).sum()))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_order_is_fixed() {
        let mut shuffled = vec![
            ProcessType::IntegrationTest,
            ProcessType::DetailDesign,
            ProcessType::ImplementationUnit,
            ProcessType::UnitTest,
            ProcessType::Implementation,
        ];
        shuffled.sort();
        assert_eq!(shuffled, ProcessType::ALL.to_vec());
    }

    #[test]
    fn process_parses_loose_spellings() {
        assert_eq!(
            "detail-design".parse::<ProcessType>(),
            Ok(ProcessType::DetailDesign)
        );
        assert_eq!(
            "Integration Test".parse::<ProcessType>(),
            Ok(ProcessType::IntegrationTest)
        );
        assert!("qa".parse::<ProcessType>().is_err());
    }

    #[test]
    fn validate_rejects_bad_rows() {
        let empty = TaskEstimate::new("  ", None).with_effort(ProcessType::DetailDesign, 1.0);
        assert_eq!(empty.validate(), Err(RowRejection::EmptyTaskName));

        let zero = TaskEstimate::new("Login", None).with_effort(ProcessType::DetailDesign, 0.0);
        assert_eq!(zero.validate(), Err(RowRejection::NoEffort));

        let none = TaskEstimate::new("Login", None);
        assert_eq!(none.validate(), Err(RowRejection::NoEffort));

        let negative = TaskEstimate::new("Login", None)
            .with_effort(ProcessType::DetailDesign, 4.0)
            .with_effort(ProcessType::UnitTest, -1.0);
        assert!(matches!(
            negative.validate(),
            Err(RowRejection::NegativeEffort { .. })
        ));

        let huge = TaskEstimate::new("Login", None).with_effort(ProcessType::Implementation, 1000.5);
        assert!(matches!(
            huge.validate(),
            Err(RowRejection::EffortTooLarge { .. })
        ));

        let nan = TaskEstimate::new("Login", None).with_effort(ProcessType::Implementation, f64::NAN);
        assert!(matches!(
            nan.validate(),
            Err(RowRejection::NonFiniteEffort { .. })
        ));
    }

    #[test]
    fn totals_follow_pushes() {
        let mut data = ProjectData::from_tasks(vec![
            TaskEstimate::new("Login", None).with_effort(ProcessType::DetailDesign, 8.0),
        ]);
        assert!((data.total(ProcessType::DetailDesign) - 8.0).abs() < f64::EPSILON);

        data.push(
            TaskEstimate::new("Logout", None)
                .with_effort(ProcessType::DetailDesign, 2.0)
                .with_effort(ProcessType::Implementation, 5.0),
        );
        assert!((data.total(ProcessType::DetailDesign) - 10.0).abs() < f64::EPSILON);
        assert!((data.total(ProcessType::Implementation) - 5.0).abs() < f64::EPSILON);
        assert!((data.grand_total() - 15.0).abs() < f64::EPSILON);
        assert_eq!(data.totals().len(), ProcessType::ALL.len());
    }
}
