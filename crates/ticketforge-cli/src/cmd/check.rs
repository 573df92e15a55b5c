//! `tkf check`: validate the Redmine connection and ticket ids.

use anyhow::{Result, bail};
use clap::Args;
use std::io::{self, Write};

use ticketforge_core::config::TicketConfig;

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};
use crate::redmine::{ConfigurationCheck, NamedRecord, RedmineClient};
use crate::validate::validate_connection;

/// Arguments for `tkf check`.
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Also list every tracker, status and priority.
    #[arg(long)]
    pub list: bool,
}

/// Warn about configured ticket ids the server does not know.
pub fn check_ticket_ids(check: &mut ConfigurationCheck, tickets: &TicketConfig) {
    let lookups: [(&str, Option<i64>, &[NamedRecord]); 3] = [
        ("tracker", tickets.tracker_id, check.trackers.as_slice()),
        ("status", tickets.status_id, check.statuses.as_slice()),
        ("priority", tickets.priority_id, check.priorities.as_slice()),
    ];
    let mut warnings = Vec::new();
    for (kind, id, known) in lookups {
        let Some(id) = id else { continue };
        if known.is_empty() {
            continue;
        }
        let found = u64::try_from(id).is_ok_and(|id| known.iter().any(|r| r.id == id));
        if !found {
            warnings.push(format!("configured {kind} id {id} does not exist on the server"));
        }
    }
    check.warnings.extend(warnings);
}

/// Execute `tkf check`.
pub fn run_check(args: &CheckArgs, ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let connection = validate_connection(&config.connection)?;
    let client = RedmineClient::new(&connection);

    let mut check = client.validate_configuration();
    check_ticket_ids(&mut check, &config.project.tickets);
    for warning in &check.warnings {
        tracing::warn!(%warning, "configuration warning");
    }

    let list = args.list;
    let masked_key = connection.masked_key();
    render_mode(
        ctx.output,
        &check,
        render_text,
        |c, w| render_pretty(c, connection.base_url.as_str(), &masked_key, list, w),
    )?;

    if !check.is_valid() {
        bail!(
            "configuration check failed with {} error(s)",
            check.errors.len()
        );
    }
    Ok(())
}

fn render_text(check: &ConfigurationCheck, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "valid={}", check.is_valid())?;
    if let Some(project) = &check.project {
        writeln!(w, "project={} {}", project.id, project.name)?;
    }
    for error in &check.errors {
        writeln!(w, "error: {error}")?;
    }
    for warning in &check.warnings {
        writeln!(w, "warning: {warning}")?;
    }
    Ok(())
}

fn render_pretty(
    check: &ConfigurationCheck,
    base_url: &str,
    masked_key: &str,
    list: bool,
    w: &mut dyn Write,
) -> io::Result<()> {
    pretty_section(w, "Redmine configuration")?;
    pretty_kv(w, "Server", base_url)?;
    pretty_kv(w, "API key", masked_key)?;
    if let Some(project) = &check.project {
        pretty_kv(
            w,
            "Project",
            format!("{} (#{}, {})", project.name, project.id, project.identifier),
        )?;
    }
    pretty_kv(w, "Status", if check.is_valid() { "ok" } else { "failed" })?;

    for error in &check.errors {
        writeln!(w, "  error: {error}")?;
    }
    for warning in &check.warnings {
        writeln!(w, "  warning: {warning}")?;
    }

    if list {
        for (heading, records) in [
            ("Trackers", &check.trackers),
            ("Statuses", &check.statuses),
            ("Priorities", &check.priorities),
        ] {
            writeln!(w)?;
            pretty_section(w, heading)?;
            for record in records {
                writeln!(w, "  {:>4}  {}", record.id, record.name)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, name: &str) -> NamedRecord {
        NamedRecord {
            id,
            name: name.into(),
        }
    }

    #[test]
    fn unknown_ids_become_warnings() {
        let mut check = ConfigurationCheck {
            trackers: vec![record(1, "Bug"), record(2, "Feature")],
            statuses: vec![record(1, "New")],
            ..ConfigurationCheck::default()
        };
        let tickets = TicketConfig {
            tracker_id: Some(2),
            status_id: Some(5),
            priority_id: Some(3),
        };
        check_ticket_ids(&mut check, &tickets);
        assert_eq!(
            check.warnings,
            ["configured status id 5 does not exist on the server"]
        );
        assert!(check.is_valid());
    }

    #[test]
    fn text_output_lists_problems() {
        let check = ConfigurationCheck {
            errors: vec!["cannot reach the Redmine server".into()],
            ..ConfigurationCheck::default()
        };
        let mut out = Vec::new();
        render_text(&check, &mut out).expect("render");
        let text = String::from_utf8(out).expect("utf-8");
        assert!(text.starts_with("valid=false"));
        assert!(text.contains("error: cannot reach"));
    }
}
