use proptest::prelude::*;
use ticketforge_core::aggregate::{aggregate, statistics};
use ticketforge_core::document;
use ticketforge_core::hierarchy::{self, HierarchyOptions};
use ticketforge_core::model::{NodeKind, ProcessType};
use ticketforge_core::source::{MAX_COLUMN, column_to_number, number_to_column};
use ticketforge_core::submit::{CreationOptions, DryRunApi, Submitter};
use ticketforge_core::walk;

use generators::*;

const OPTIONS: CreationOptions = CreationOptions {
    tracker_id: 1,
    status_id: 1,
    priority_id: 2,
};

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn document_round_trip(forest in arb_forest()) {
        let text = document::serialize(&forest).expect("serialize");
        let decoded = document::deserialize(&text).expect("deserialize");
        prop_assert_eq!(decoded, forest);
    }

    #[test]
    fn column_round_trip(n in 1u32..=MAX_COLUMN) {
        let letters = number_to_column(n).expect("in range");
        prop_assert_eq!(column_to_number(&letters).expect("letters"), n);
    }

    #[test]
    fn aggregation_sums_agree(tasks in arb_task_estimates()) {
        let expected: f64 = tasks.iter().map(|t| t.efforts.values().sum::<f64>()).sum();
        let data = aggregate(tasks).expect("valid tasks aggregate");
        let stats = statistics(&data);
        let per_process: f64 = stats.per_process.values().map(|s| s.hours).sum();
        prop_assert_eq!(stats.total_hours, expected);
        prop_assert_eq!(per_process, expected);
    }

    #[test]
    fn hierarchy_keeps_every_hour(tasks in arb_task_estimates(), grouping in any::<bool>()) {
        let data = aggregate(tasks).expect("aggregate");
        let tree = hierarchy::build(&data, &HierarchyOptions { grouping });

        for process in &tree {
            let Some(process_type) = process.process_type() else {
                return Err(TestCaseError::fail("root must be a process"));
            };
            prop_assert!(data.total(process_type) > 0.0);
            let mut task_hours = 0.0;
            walk::walk(std::slice::from_ref(process), |node, _| {
                if matches!(node.kind, NodeKind::Task { .. }) {
                    task_hours += node.estimated_hours;
                }
            });
            prop_assert_eq!(task_hours, data.total(process_type));
        }
        let present: Vec<ProcessType> = tree.iter().filter_map(|n| n.process_type()).collect();
        let expected: Vec<ProcessType> = ProcessType::ALL
            .into_iter()
            .filter(|&p| data.total(p) > 0.0)
            .collect();
        prop_assert_eq!(present, expected);
    }

    #[test]
    fn creation_links_point_backwards(tasks in arb_task_estimates(), grouping in any::<bool>()) {
        let data = aggregate(tasks).expect("aggregate");
        let tree = hierarchy::build(&data, &HierarchyOptions { grouping });
        let mut api = DryRunApi::starting_at(1);
        let report = Submitter::new(&mut api).submit(&tree, &OPTIONS).expect("submit");

        prop_assert_eq!(report.created_tickets.len(), walk::count(&tree));
        for (index, ticket) in report.created_tickets.iter().enumerate() {
            match ticket.parent_id {
                None => {
                    prop_assert_eq!(ticket.level, 0);
                }
                Some(parent) => {
                    let earlier = report.created_tickets[..index]
                        .iter()
                        .find(|t| t.id == parent);
                    prop_assert!(earlier.is_some(), "parent #{} not created before #{}", parent, ticket.id);
                    prop_assert_eq!(earlier.map(|t| t.level + 1), Some(ticket.level));
                }
            }
        }
    }
}
