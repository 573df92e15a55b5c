//! Depth-first traversal over ticket forests.
//!
//! Every tree consumer (counting, hour totals, validation, preview rendering
//! and submission) goes through [`try_walk`], so they all agree on the visit
//! order: pre-order, siblings left to right, depth 0 for roots.

use std::convert::Infallible;

use crate::model::TicketNode;

/// Visit every node in pre-order, stopping at the first error.
///
/// The traversal uses an explicit stack, so arbitrarily deep documents do not
/// grow the call stack.
///
/// # Errors
///
/// Returns the first error produced by `visit`.
pub fn try_walk<'a, E, F>(roots: &'a [TicketNode], mut visit: F) -> Result<(), E>
where
    F: FnMut(&'a TicketNode, usize) -> Result<(), E>,
{
    let mut stack: Vec<(&'a TicketNode, usize)> = roots.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        visit(node, depth)?;
        stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
    }
    Ok(())
}

/// Infallible variant of [`try_walk`].
pub fn walk<'a, F>(roots: &'a [TicketNode], mut visit: F)
where
    F: FnMut(&'a TicketNode, usize),
{
    let result: Result<(), Infallible> = try_walk(roots, |node, depth| {
        visit(node, depth);
        Ok(())
    });
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Number of nodes in the forest, roots included.
#[must_use]
pub fn count(roots: &[TicketNode]) -> usize {
    let mut n = 0;
    walk(roots, |_, _| n += 1);
    n
}

/// Sum of `estimated_hours` over every node.
#[must_use]
pub fn total_hours(roots: &[TicketNode]) -> f64 {
    let mut sum = 0.0;
    walk(roots, |node, _| sum += node.estimated_hours);
    sum
}

/// Deepest zero-based depth, or `None` for an empty forest.
#[must_use]
pub fn max_depth(roots: &[TicketNode]) -> Option<usize> {
    let mut deepest = None;
    walk(roots, |_, depth| {
        deepest = Some(deepest.map_or(depth, |d: usize| d.max(depth)));
    });
    deepest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcessType;

    fn sample() -> Vec<TicketNode> {
        let p = ProcessType::DetailDesign;
        vec![
            TicketNode::process(
                p,
                "A",
                "",
                vec![
                    TicketNode::group(
                        "G",
                        "B",
                        "",
                        vec![
                            TicketNode::task("t1", p, "C", "", 1.0),
                            TicketNode::task("t2", p, "D", "", 2.0),
                        ],
                    ),
                    TicketNode::task("t3", p, "E", "", 4.0),
                ],
            ),
            TicketNode::process(ProcessType::UnitTest, "F", "", Vec::new()),
        ]
    }

    #[test]
    fn visits_in_preorder_with_depths() {
        let tree = sample();
        let mut seen = Vec::new();
        walk(&tree, |node, depth| seen.push((node.subject.as_str(), depth)));
        assert_eq!(
            seen,
            vec![("A", 0), ("B", 1), ("C", 2), ("D", 2), ("E", 1), ("F", 0)]
        );
    }

    #[test]
    fn try_walk_stops_at_first_error() {
        let tree = sample();
        let mut visited = 0;
        let result = try_walk(&tree, |node, _| {
            visited += 1;
            if node.subject == "C" { Err("stop") } else { Ok(()) }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(visited, 3);
    }

    #[test]
    fn aggregates() {
        let tree = sample();
        assert_eq!(count(&tree), 6);
        assert!((total_hours(&tree) - 7.0).abs() < f64::EPSILON);
        assert_eq!(max_depth(&tree), Some(2));
        assert_eq!(max_depth(&[]), None);
    }
}
