//! `tkf create`: submit a ticket document to the tracker.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use ticketforge_core::TicketError;
use ticketforge_core::config::TicketConfig;
use ticketforge_core::document::load_document;
use ticketforge_core::model::{CreatedTicket, TicketNode};
use ticketforge_core::retry::RetryPolicy;
use ticketforge_core::submit::{
    CreationOptions, CreationReport, DryRunApi, IssueApi, Submitter, summarize, validate_tree,
};

use super::Context;
use crate::output::{OutputMode, render};
use crate::redmine;
use crate::validate::{require, validate_connection};

/// Arguments for `tkf create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Ticket document (.yml) to submit.
    pub document: PathBuf,

    /// Tracker id for every ticket; defaults to `tickets.tracker_id`.
    #[arg(long, allow_negative_numbers = true)]
    pub tracker_id: Option<i64>,

    /// Status id for every ticket; defaults to `tickets.status_id`.
    #[arg(long, allow_negative_numbers = true)]
    pub status_id: Option<i64>,

    /// Priority id for every ticket; defaults to `tickets.priority_id`.
    #[arg(long, allow_negative_numbers = true)]
    pub priority_id: Option<i64>,

    /// Run the whole submission with local ids instead of a tracker.
    #[arg(long)]
    pub dry_run: bool,

    /// First id handed out by `--dry-run`.
    #[arg(long, value_name = "ID", default_value_t = 1, requires = "dry_run")]
    pub first_id: u64,

    /// Give up on the first failed request instead of retrying.
    #[arg(long)]
    pub no_retry: bool,
}

/// Result payload for `tkf create`.
#[derive(Debug, Serialize)]
pub struct CreateReport {
    pub dry_run: bool,
    /// False when submission stopped part way.
    pub complete: bool,
    pub created_tickets: Vec<CreatedTicket>,
}

/// Flags first, then `[tickets]`.
///
/// # Errors
///
/// Fails when an id is set nowhere.
pub fn creation_options(args: &CreateArgs, defaults: &TicketConfig) -> Result<CreationOptions> {
    Ok(CreationOptions {
        tracker_id: require(
            args.tracker_id.or(defaults.tracker_id),
            "tracker id",
            "pass --tracker-id or set tickets.tracker_id in ticketforge.toml",
        )?,
        status_id: require(
            args.status_id.or(defaults.status_id),
            "status id",
            "pass --status-id or set tickets.status_id in ticketforge.toml",
        )?,
        priority_id: require(
            args.priority_id.or(defaults.priority_id),
            "priority id",
            "pass --priority-id or set tickets.priority_id in ticketforge.toml",
        )?,
    })
}

/// Execute `tkf create`.
pub fn run_create(args: &CreateArgs, ctx: &Context) -> Result<()> {
    let tree = load_document(&args.document)?;
    let config = ctx.config()?;
    let options = creation_options(args, &config.project.tickets)?;
    options.validate().map_err(TicketError::from)?;
    validate_tree(&tree).map_err(TicketError::from)?;

    let retry = if args.no_retry {
        RetryPolicy::never()
    } else {
        config.project.retry.policy()
    };

    let outcome = if args.dry_run {
        let mut api = DryRunApi::starting_at(args.first_id);
        submit(&mut api, retry, &tree, &options)
    } else {
        let connection = validate_connection(&config.connection)?;
        let mut client = redmine::connect(&connection)?;
        submit(&mut client, retry, &tree, &options)
    };

    match outcome {
        Ok(report) => {
            let payload = CreateReport {
                dry_run: args.dry_run,
                complete: true,
                created_tickets: report.created_tickets,
            };
            render(ctx.output, &payload, render_human)
        }
        Err(err) => {
            let created = match &err {
                TicketError::Submission { created, .. } => created.as_slice(),
                _ => &[],
            };
            if !created.is_empty() {
                report_partial(ctx.output, args.dry_run, created)?;
            }
            Err(err.into())
        }
    }
}

fn submit<A: IssueApi>(
    api: A,
    retry: RetryPolicy,
    tree: &[TicketNode],
    options: &CreationOptions,
) -> Result<CreationReport, TicketError> {
    Submitter::new(api).with_retry(retry).submit(tree, options)
}

/// Tickets that reached the tracker before a failure: JSON on stdout, or a
/// human summary on stderr next to the error.
fn report_partial(output: OutputMode, dry_run: bool, created: &[CreatedTicket]) -> Result<()> {
    let payload = CreateReport {
        dry_run,
        complete: false,
        created_tickets: created.to_vec(),
    };
    if output.is_json() {
        return render(output, &payload, |_, _| Ok(()));
    }
    let stderr = io::stderr();
    let mut err = stderr.lock();
    writeln!(err, "submission stopped; these tickets were already created:")?;
    write!(err, "{}", summary_text(&payload))?;
    Ok(())
}

fn summary_text(payload: &CreateReport) -> String {
    summarize(&CreationReport {
        created_tickets: payload.created_tickets.clone(),
    })
}

fn render_human(payload: &CreateReport, w: &mut dyn Write) -> io::Result<()> {
    if payload.dry_run {
        writeln!(w, "Dry run: nothing was sent to the tracker.")?;
    }
    write!(w, "{}", summary_text(payload))
}
