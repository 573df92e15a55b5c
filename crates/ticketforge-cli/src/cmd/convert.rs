//! `tkf convert`: spreadsheet estimates to a ticket document and preview.

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ticketforge_core::TicketError;
use ticketforge_core::aggregate::{self, ProjectStatistics};
use ticketforge_core::config::SourceConfig;
use ticketforge_core::document::save_document;
use ticketforge_core::hierarchy::{self, HierarchyOptions};
use ticketforge_core::model::{ProcessType, TicketNode};
use ticketforge_core::render::write_html;
use ticketforge_core::sanitize::validate_source_path;
use ticketforge_core::source::{
    SkippedRow, SourceLayout, TabularSource, Workbook, read_task_estimates,
};
use ticketforge_core::walk;

use super::Context;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use crate::validate::{ValidationError, parse_process_mapping, require, validate_column};

/// Arguments for `tkf convert`.
#[derive(Args, Debug, Default)]
pub struct ConvertArgs {
    /// Spreadsheet to read (.xlsx, .xlsm, .xls or .ods).
    pub source: PathBuf,

    /// Output path without extension; `.yml` and `.html` are appended.
    /// Defaults to the source path without its extension.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Worksheet to read; defaults to `source.sheet` or the first sheet.
    #[arg(long)]
    pub sheet: Option<String>,

    /// First data row (1-based).
    #[arg(long, value_name = "ROW")]
    pub start_row: Option<u32>,

    /// Last data row; defaults to the last used row.
    #[arg(long, value_name = "ROW")]
    pub end_row: Option<u32>,

    /// Column holding task names.
    #[arg(long, value_name = "COL")]
    pub task_column: Option<String>,

    /// Column holding group names (blank cells inherit from above).
    #[arg(long, value_name = "COL")]
    pub group_column: Option<String>,

    /// Process column mapping such as `implementation=F`. Repeatable;
    /// overrides `[source.processes]`.
    #[arg(long = "process", value_name = "PROCESS=COL", value_parser = parse_process_mapping)]
    pub processes: Vec<(ProcessType, String)>,

    /// Put tasks directly under their process ticket.
    #[arg(long)]
    pub no_group: bool,
}

#[derive(Debug, Serialize)]
struct SkippedEntry {
    row: u32,
    task_name: String,
    reason: String,
}

impl From<&SkippedRow> for SkippedEntry {
    fn from(row: &SkippedRow) -> Self {
        Self {
            row: row.row,
            task_name: row.task_name.clone(),
            reason: row.reason.to_string(),
        }
    }
}

/// Result payload for `tkf convert`.
#[derive(Debug, Serialize)]
pub struct ConvertReport {
    source: String,
    sheet: String,
    document: String,
    preview: String,
    tickets: usize,
    grouping: bool,
    groups: Vec<String>,
    statistics: ProjectStatistics,
    skipped: Vec<SkippedEntry>,
}

/// Tree and bookkeeping produced from one sheet.
#[derive(Debug)]
pub struct Conversion {
    pub tree: Vec<TicketNode>,
    /// Group names in first-seen order.
    pub groups: Vec<String>,
    pub statistics: ProjectStatistics,
    pub skipped: Vec<SkippedRow>,
}

/// Read, aggregate and shape estimates from `source`.
///
/// # Errors
///
/// Fails on unreadable sheets, bad columns, or when no usable effort is
/// left after row validation.
pub fn convert_source(
    source: &dyn TabularSource,
    layout: &SourceLayout,
    options: &HierarchyOptions,
) -> Result<Conversion> {
    let sheet = read_task_estimates(source, layout)?;
    let data = aggregate::aggregate(sheet.tasks)
        .map_err(TicketError::from)
        .with_context(|| format!("no usable estimates in sheet '{}'", layout.sheet))?;
    Ok(Conversion {
        tree: hierarchy::build(&data, options),
        groups: aggregate::group_names(&data)
            .into_iter()
            .map(str::to_string)
            .collect(),
        statistics: aggregate::statistics(&data),
        skipped: sheet.skipped,
    })
}

/// Merge command-line flags over `[source]` defaults.
///
/// # Errors
///
/// Fails when the task column or every process column is missing, or a
/// column reference is malformed.
pub fn resolve_layout(
    args: &ConvertArgs,
    defaults: &SourceConfig,
    source: &dyn TabularSource,
) -> Result<SourceLayout> {
    let sheet = match args.sheet.clone().or_else(|| defaults.sheet.clone()) {
        Some(sheet) => sheet,
        None => source
            .sheet_names()
            .into_iter()
            .next()
            .ok_or_else(|| TicketError::SourceRead("workbook has no sheets".into()))?,
    };

    let task_column = require(
        args.task_column.as_deref().or(defaults.task_column.as_deref()),
        "task column",
        "pass --task-column or set source.task_column in ticketforge.toml",
    )?;
    let task_column = validate_column("task column", task_column)?;

    let group_column = args
        .group_column
        .as_deref()
        .or(defaults.group_column.as_deref())
        .map(|col| validate_column("group column", col))
        .transpose()?;

    let mut process_columns = defaults
        .processes
        .iter()
        .map(|(&process, col)| validate_column("process column", col).map(|c| (process, c)))
        .collect::<Result<std::collections::BTreeMap<_, _>, _>>()?;
    process_columns.extend(args.processes.iter().cloned());

    let start_row = args.start_row.unwrap_or(defaults.start_row);
    let end_row = args.end_row.or(defaults.end_row);
    if let Some(end) = end_row.filter(|&end| end < start_row) {
        return Err(ValidationError::new(
            "end row",
            end.to_string(),
            format!("is before the start row {start_row}"),
            "check --start-row and --end-row",
            ticketforge_core::ErrorCode::InvalidColumn.code(),
        )
        .into());
    }

    Ok(SourceLayout {
        sheet,
        start_row,
        end_row,
        task_column,
        group_column,
        process_columns,
    })
}

/// `base` with `suffix` appended, keeping any dots already in the name.
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Execute `tkf convert`.
pub fn run_convert(args: &ConvertArgs, ctx: &Context) -> Result<()> {
    validate_source_path(&args.source).map_err(|e| TicketError::SourceRead(e.to_string()))?;
    let config = ctx.config()?;

    let workbook = Workbook::open(&args.source)?;
    let layout = resolve_layout(args, &config.project.source, &workbook)?;
    let options = HierarchyOptions {
        grouping: !args.no_group && config.project.source.grouping,
    };
    let conversion = convert_source(&workbook, &layout, &options)?;

    let base = args
        .output
        .clone()
        .unwrap_or_else(|| args.source.with_extension(""));
    let document = with_suffix(&base, ".yml");
    let preview = with_suffix(&base, ".html");
    save_document(&document, &conversion.tree)?;
    write_html(&preview, &conversion.tree)?;
    tracing::info!(
        document = %document.display(),
        preview = %preview.display(),
        tickets = walk::count(&conversion.tree),
        "wrote ticket document"
    );

    let report = ConvertReport {
        source: args.source.display().to_string(),
        sheet: layout.sheet,
        document: document.display().to_string(),
        preview: preview.display().to_string(),
        tickets: walk::count(&conversion.tree),
        grouping: options.grouping,
        groups: conversion.groups,
        statistics: conversion.statistics,
        skipped: conversion.skipped.iter().map(SkippedEntry::from).collect(),
    };

    let quiet = ctx.quiet;
    render_mode(
        ctx.output,
        &report,
        render_text,
        |r, w| render_pretty(r, quiet, w),
    )
}

fn render_text(report: &ConvertReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "document={}", report.document)?;
    writeln!(w, "preview={}", report.preview)?;
    writeln!(w, "tickets={}", report.tickets)?;
    writeln!(w, "total_hours={}", report.statistics.total_hours)?;
    for (process, stats) in &report.statistics.per_process {
        writeln!(w, "{process}={} ({}%)", stats.hours, stats.percentage)?;
    }
    for skipped in &report.skipped {
        writeln!(w, "skipped row {}: {}", skipped.row, skipped.reason)?;
    }
    Ok(())
}

fn render_pretty(report: &ConvertReport, quiet: bool, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Converted {}", report.source))?;
    pretty_kv(w, "Sheet", &report.sheet)?;
    pretty_kv(w, "Document", &report.document)?;
    pretty_kv(w, "Preview", &report.preview)?;
    pretty_kv(w, "Tickets", report.tickets.to_string())?;
    if quiet {
        return Ok(());
    }

    writeln!(w)?;
    pretty_section(w, "Estimates")?;
    pretty_kv(w, "Tasks", report.statistics.total_tasks.to_string())?;
    pretty_kv(w, "Total", format!("{}h", report.statistics.total_hours))?;
    if !report.groups.is_empty() {
        pretty_kv(w, "Groups", report.groups.join(", "))?;
    }
    for (process, stats) in &report.statistics.per_process {
        if stats.task_count == 0 {
            continue;
        }
        writeln!(
            w,
            "  {:<28} {:>8}h {:>4}%  {} task(s)",
            process.label(),
            stats.hours,
            stats.percentage,
            stats.task_count
        )?;
    }

    if !report.skipped.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Skipped rows ({})", report.skipped.len()))?;
        for skipped in &report.skipped {
            writeln!(
                w,
                "  row {:<5} {}: {}",
                skipped.row, skipped.task_name, skipped.reason
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use ticketforge_core::model::NodeKind;
    use ticketforge_core::source::{CellValue, MemorySource};

    fn sheet() -> MemorySource {
        let rows = vec![
            vec!["Screen".into(), "Task".into(), "Impl".into(), "Test".into()],
            vec!["Auth".into(), "Login".into(), 8.0.into(), 4.0.into()],
            vec![CellValue::Empty, "Logout".into(), 2.0.into(), CellValue::Empty],
            vec!["Admin".into(), "Users".into(), 0.0.into(), 0.0.into()],
        ];
        MemorySource::new().with_sheet("Estimates", rows)
    }

    fn args() -> ConvertArgs {
        ConvertArgs {
            source: PathBuf::from("estimates.xlsx"),
            task_column: Some("b".into()),
            group_column: Some("A".into()),
            processes: vec![
                (ProcessType::Implementation, "C".into()),
                (ProcessType::UnitTest, "D".into()),
            ],
            ..ConvertArgs::default()
        }
    }

    #[test]
    fn layout_defaults_to_first_sheet_and_config_rows() {
        let layout = resolve_layout(&args(), &SourceConfig::default(), &sheet()).expect("layout");
        assert_eq!(layout.sheet, "Estimates");
        assert_eq!(layout.start_row, 2);
        assert_eq!(layout.task_column, "B");
        assert_eq!(layout.process_columns.len(), 2);
    }

    #[test]
    fn flags_override_config_processes() {
        let defaults = SourceConfig {
            task_column: Some("B".into()),
            processes: BTreeMap::from([
                (ProcessType::Implementation, "X".into()),
                (ProcessType::DetailDesign, "E".into()),
            ]),
            ..SourceConfig::default()
        };
        let only_impl = ConvertArgs {
            processes: vec![(ProcessType::Implementation, "C".into())],
            ..ConvertArgs::default()
        };
        let layout = resolve_layout(&only_impl, &defaults, &sheet()).expect("layout");
        assert_eq!(layout.process_columns[&ProcessType::Implementation], "C");
        assert_eq!(layout.process_columns[&ProcessType::DetailDesign], "E");
    }

    #[test]
    fn missing_task_column_is_reported() {
        let err = resolve_layout(&ConvertArgs::default(), &SourceConfig::default(), &sheet())
            .expect_err("no task column");
        let validation = err.downcast_ref::<ValidationError>().expect("validation error");
        assert_eq!(validation.field, "task column");
    }

    #[test]
    fn end_row_before_start_row_is_rejected() {
        let backwards = ConvertArgs {
            start_row: Some(5),
            end_row: Some(3),
            ..args()
        };
        assert!(resolve_layout(&backwards, &SourceConfig::default(), &sheet()).is_err());
    }

    #[test]
    fn sheet_converts_to_grouped_tree() {
        let source = sheet();
        let layout = resolve_layout(&args(), &SourceConfig::default(), &source).expect("layout");
        let conversion =
            convert_source(&source, &layout, &HierarchyOptions::default()).expect("convert");

        assert_eq!(conversion.groups, ["Auth"]);
        assert_eq!(conversion.skipped.len(), 1);
        assert_eq!(conversion.skipped[0].row, 4);
        assert_eq!(conversion.statistics.total_hours, 14.0);

        let roots: Vec<_> = conversion.tree.iter().map(|n| n.subject.as_str()).collect();
        assert_eq!(roots, ["Implementation", "Unit test"]);
        assert!(matches!(conversion.tree[0].children[0].kind, NodeKind::Group { .. }));
        assert_eq!(walk::total_hours(&conversion.tree), 14.0);
    }

    #[test]
    fn zero_effort_sheet_fails_with_context() {
        let source = MemorySource::new().with_sheet(
            "Estimates",
            vec![
                vec!["Screen".into(), "Task".into(), "Impl".into()],
                vec!["Auth".into(), "Login".into(), 0.0.into()],
            ],
        );
        let layout = resolve_layout(&args(), &SourceConfig::default(), &source).expect("layout");
        let err = convert_source(&source, &layout, &HierarchyOptions::default())
            .expect_err("nothing to convert");
        assert!(err.to_string().contains("no usable estimates"));
        assert!(err.chain().any(|e| e.downcast_ref::<TicketError>().is_some()));
    }

    #[test]
    fn suffix_keeps_existing_dots() {
        assert_eq!(
            with_suffix(Path::new("out/plan.v2"), ".yml"),
            PathBuf::from("out/plan.v2.yml")
        );
    }
}
