//! Ticket submission: validate a tree, then create it on the tracker
//! parent-first.

use serde::Serialize;
use std::fmt::Write as _;

use crate::error::{ApiError, Result, TicketError, ValidationError};
use crate::model::{CreatedTicket, NodeKind, TicketNode};
use crate::retry::RetryPolicy;
use crate::walk;

/// Maximum number of levels a submitted tree may have.
pub const MAX_DEPTH: usize = 10;

/// Payload for one remote create call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIssue {
    pub subject: String,
    pub description: String,
    pub tracker_id: u64,
    pub status_id: u64,
    pub priority_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_issue_id: Option<u64>,
    pub estimated_hours: f64,
}

/// Remote issue-creation seam.
pub trait IssueApi {
    /// Create one issue and return its remote id.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the tracker rejects or cannot be reached.
    fn create_issue(&mut self, issue: &NewIssue) -> Result<u64, ApiError>;
}

impl<T: IssueApi + ?Sized> IssueApi for &mut T {
    fn create_issue(&mut self, issue: &NewIssue) -> Result<u64, ApiError> {
        (**self).create_issue(issue)
    }
}

/// Issue API that creates nothing and hands out sequential ids.
#[derive(Debug, Clone, Default)]
pub struct DryRunApi {
    next_id: u64,
    /// Every issue "created", in call order.
    pub issues: Vec<NewIssue>,
}

impl DryRunApi {
    #[must_use]
    pub const fn starting_at(first_id: u64) -> Self {
        Self {
            next_id: first_id,
            issues: Vec::new(),
        }
    }
}

impl IssueApi for DryRunApi {
    fn create_issue(&mut self, issue: &NewIssue) -> Result<u64, ApiError> {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.issues.push(issue.clone());
        Ok(id)
    }
}

/// Tracker-side identifiers applied to every created ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreationOptions {
    pub tracker_id: i64,
    pub status_id: i64,
    pub priority_id: i64,
}

impl CreationOptions {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOption`] for the first id that is
    /// not positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ids().map(|_| ())
    }

    fn ids(&self) -> Result<(u64, u64, u64), ValidationError> {
        let positive = |name: &'static str, value: i64| {
            u64::try_from(value)
                .ok()
                .filter(|&v| v > 0)
                .ok_or(ValidationError::InvalidOption { name, value })
        };
        Ok((
            positive("tracker_id", self.tracker_id)?,
            positive("status_id", self.status_id)?,
            positive("priority_id", self.priority_id)?,
        ))
    }
}

/// Tickets created by one submission, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreationReport {
    pub created_tickets: Vec<CreatedTicket>,
}

/// Check the structural invariants of `tree` without touching the network:
/// non-empty subjects, finite non-negative hours, at most [`MAX_DEPTH`]
/// levels, and tasks as leaves.
///
/// # Errors
///
/// Returns the first violation found in pre-order.
pub fn validate_tree(tree: &[TicketNode]) -> Result<(), ValidationError> {
    walk::try_walk(tree, |node, depth| {
        if depth >= MAX_DEPTH {
            return Err(ValidationError::DepthExceeded {
                subject: node.subject.clone(),
                depth,
                max: MAX_DEPTH,
            });
        }
        if node.subject.trim().is_empty() {
            return Err(ValidationError::EmptySubject { depth });
        }
        if !node.estimated_hours.is_finite() || node.estimated_hours < 0.0 {
            return Err(ValidationError::InvalidHours {
                subject: node.subject.clone(),
                depth,
                hours: node.estimated_hours,
            });
        }
        if matches!(node.kind, NodeKind::Task { .. }) && !node.children.is_empty() {
            return Err(ValidationError::TaskHasChildren {
                subject: node.subject.clone(),
                depth,
            });
        }
        Ok(())
    })
}

/// Drives ticket creation through an [`IssueApi`].
#[derive(Debug)]
pub struct Submitter<A> {
    api: A,
    retry: RetryPolicy,
}

impl<A: IssueApi> Submitter<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create every node of `tree` in pre-order, one call at a time, linking
    /// each child to the id returned for its parent.
    ///
    /// Options and tree are fully validated before the first call. A failed
    /// call stops the traversal; tickets created before it stay on the
    /// tracker and are listed in the returned [`TicketError::Submission`].
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Validation`] for bad options or tree shape and
    /// [`TicketError::Submission`] when a create call fails.
    pub fn submit(&mut self, tree: &[TicketNode], options: &CreationOptions) -> Result<CreationReport> {
        let (tracker_id, status_id, priority_id) = options.ids()?;
        validate_tree(tree)?;

        let api = &mut self.api;
        let retry = self.retry;
        let mut created: Vec<CreatedTicket> = Vec::new();
        // Remote ids of the current node's ancestors, indexed by depth.
        let mut lineage: Vec<u64> = Vec::new();

        let outcome = walk::try_walk(tree, |node, depth| {
            lineage.truncate(depth);
            let parent_id = lineage.last().copied();
            let issue = NewIssue {
                subject: node.subject.clone(),
                description: node.description.clone(),
                tracker_id,
                status_id,
                priority_id,
                parent_issue_id: parent_id,
                estimated_hours: node.estimated_hours,
            };
            let id = retry
                .run(&node.subject, || api.create_issue(&issue))
                .map_err(|source| (node.subject.clone(), source))?;

            tracing::info!(id, level = depth, parent = ?parent_id, subject = %node.subject, "created ticket");
            created.push(CreatedTicket {
                id,
                subject: node.subject.clone(),
                level: depth,
                parent_id,
            });
            lineage.push(id);
            Ok(())
        });

        match outcome {
            Ok(()) => Ok(CreationReport {
                created_tickets: created,
            }),
            Err((failed_subject, source)) => {
                tracing::error!(
                    subject = %failed_subject,
                    created = created.len(),
                    error = %source,
                    "ticket creation stopped"
                );
                Err(TicketError::Submission {
                    failed_subject,
                    created,
                    source,
                })
            }
        }
    }
}

/// Human-readable summary of a report, grouped by level.
#[must_use]
pub fn summarize(report: &CreationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Created {} ticket(s)", report.created_tickets.len());

    let deepest = report
        .created_tickets
        .iter()
        .map(|t| t.level)
        .max()
        .unwrap_or(0);
    for level in 0..=deepest {
        let at_level: Vec<&CreatedTicket> = report
            .created_tickets
            .iter()
            .filter(|t| t.level == level)
            .collect();
        if at_level.is_empty() {
            continue;
        }
        let _ = writeln!(out, "Level {level} ({}):", at_level.len());
        for ticket in at_level {
            match ticket.parent_id {
                Some(parent) => {
                    let _ = writeln!(out, "  #{} {} (parent #{parent})", ticket.id, ticket.subject);
                }
                None => {
                    let _ = writeln!(out, "  #{} {}", ticket.id, ticket.subject);
                }
            }
        }
    }
    out
}
