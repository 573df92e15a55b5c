//! Derivation of the ticket tree from aggregated estimates.

use std::fmt::Write as _;

use crate::model::{ProcessType, ProjectData, TaskEstimate, TicketNode};

/// Group label for tasks without a group when grouping is enabled.
pub const UNGROUPED: &str = "Ungrouped";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyOptions {
    /// Insert a group level between processes and tasks.
    pub grouping: bool,
}

impl Default for HierarchyOptions {
    fn default() -> Self {
        Self { grouping: true }
    }
}

/// Build one process tree per process type with positive total effort, in
/// [`ProcessType::ALL`] order.
///
/// Groups and tasks keep the first-seen order of the input rows. Tasks with
/// no effort for a process are left out of that process, and so are groups
/// left empty by that rule.
#[must_use]
pub fn build(data: &ProjectData, options: &HierarchyOptions) -> Vec<TicketNode> {
    let roots: Vec<TicketNode> = ProcessType::ALL
        .into_iter()
        .filter(|&p| data.total(p) > 0.0)
        .map(|p| build_process(data, p, options))
        .collect();
    tracing::debug!(
        processes = roots.len(),
        grouping = options.grouping,
        "built ticket hierarchy"
    );
    roots
}

fn build_process(data: &ProjectData, process: ProcessType, options: &HierarchyOptions) -> TicketNode {
    let tasks: Vec<&TaskEstimate> = data
        .tasks()
        .iter()
        .filter(|t| t.effort(process) > 0.0)
        .collect();

    let children = if options.grouping {
        partition_by_group(&tasks)
            .into_iter()
            .map(|(group, members)| build_group(process, group, &members))
            .collect()
    } else {
        tasks.iter().map(|t| build_task(process, t)).collect()
    };

    let mut description = String::new();
    let _ = writeln!(description, "Process: {}", process.label());
    let _ = writeln!(description, "Total estimated effort: {}h", data.total(process));
    let _ = write!(description, "Tasks: {}", tasks.len());

    TicketNode::process(process, process.label(), description, children)
}

fn partition_by_group<'a>(tasks: &[&'a TaskEstimate]) -> Vec<(&'a str, Vec<&'a TaskEstimate>)> {
    let mut groups: Vec<(&str, Vec<&TaskEstimate>)> = Vec::new();
    for &task in tasks {
        let name = task.group_name.as_deref().unwrap_or(UNGROUPED);
        match groups.iter_mut().find(|(g, _)| *g == name) {
            Some((_, members)) => members.push(task),
            None => groups.push((name, vec![task])),
        }
    }
    groups
}

fn build_group(process: ProcessType, group: &str, members: &[&TaskEstimate]) -> TicketNode {
    let hours: f64 = members.iter().map(|t| t.effort(process)).sum();
    let mut description = String::new();
    let _ = writeln!(description, "Group: {group}");
    let _ = writeln!(description, "Process: {}", process.label());
    let _ = writeln!(description, "Total estimated effort: {hours}h");
    let _ = write!(description, "Tasks: {}", members.len());

    let children = members.iter().map(|t| build_task(process, t)).collect();
    TicketNode::group(
        group,
        format!("{} - {group}", process.label()),
        description,
        children,
    )
}

fn build_task(process: ProcessType, task: &TaskEstimate) -> TicketNode {
    let hours = task.effort(process);
    let mut description = String::new();
    let _ = writeln!(description, "Task: {}", task.task_name);
    if let Some(group) = &task.group_name {
        let _ = writeln!(description, "Group: {group}");
    }
    let _ = writeln!(description, "Process: {}", process.label());
    let _ = write!(description, "Estimated effort: {hours}h");

    TicketNode::task(
        task.task_name.clone(),
        process,
        format!("{} - {}", process.label(), task.task_name),
        description,
        hours,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    fn login_logout() -> ProjectData {
        ProjectData::from_tasks(vec![
            TaskEstimate::new("Login", Some("Home".into()))
                .with_effort(ProcessType::DetailDesign, 8.0)
                .with_effort(ProcessType::Implementation, 16.0),
            TaskEstimate::new("Logout", Some("Home".into()))
                .with_effort(ProcessType::DetailDesign, 8.0)
                .with_effort(ProcessType::Implementation, 16.0),
        ])
    }

    #[test]
    fn grouped_tree_shape() {
        let tree = build(&login_logout(), &HierarchyOptions { grouping: true });
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].process_type(), Some(ProcessType::DetailDesign));
        assert_eq!(tree[1].process_type(), Some(ProcessType::Implementation));
        assert!(tree[0].description.contains("16h"));
        assert!(tree[1].description.contains("32h"));

        for process in &tree {
            assert!(process.estimated_hours.abs() < f64::EPSILON);
            assert_eq!(process.children.len(), 1);
            let group = &process.children[0];
            assert_eq!(
                group.kind,
                NodeKind::Group {
                    group_name: "Home".into()
                }
            );
            let names: Vec<&str> = group.children.iter().map(TicketNode::display_name).collect();
            assert_eq!(names, vec!["Login", "Logout"]);
        }
        assert!((tree[1].children[0].children[0].estimated_hours - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ungrouped_tree_puts_tasks_under_processes() {
        let tree = build(&login_logout(), &HierarchyOptions { grouping: false });
        assert_eq!(tree[0].children.len(), 2);
        assert!(matches!(tree[0].children[0].kind, NodeKind::Task { .. }));
    }

    #[test]
    fn zero_effort_branches_are_pruned() {
        let data = ProjectData::from_tasks(vec![
            TaskEstimate::new("Login", Some("Home".into()))
                .with_effort(ProcessType::DetailDesign, 8.0)
                .with_effort(ProcessType::UnitTest, 0.0),
            TaskEstimate::new("Export", Some("Reports".into()))
                .with_effort(ProcessType::UnitTest, 2.0),
        ]);
        let tree = build(&data, &HierarchyOptions::default());
        assert_eq!(tree.len(), 2);

        let detail = &tree[0];
        assert_eq!(detail.children.len(), 1);
        assert_eq!(detail.children[0].display_name(), "Home");

        let unit = &tree[1];
        assert_eq!(unit.process_type(), Some(ProcessType::UnitTest));
        assert_eq!(unit.children.len(), 1);
        assert_eq!(unit.children[0].display_name(), "Reports");
    }

    #[test]
    fn tasks_without_group_land_in_fallback_group() {
        let data = ProjectData::from_tasks(vec![
            TaskEstimate::new("Ping", None).with_effort(ProcessType::IntegrationTest, 1.0),
        ]);
        let tree = build(&data, &HierarchyOptions::default());
        assert_eq!(tree[0].children[0].display_name(), UNGROUPED);
    }

    #[test]
    fn build_is_deterministic() {
        let data = login_logout();
        let options = HierarchyOptions::default();
        assert_eq!(build(&data, &options), build(&data, &options));
    }
}
