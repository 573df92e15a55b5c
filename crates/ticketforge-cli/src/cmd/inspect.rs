//! `tkf inspect`: list sheets and header columns of a spreadsheet.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

use ticketforge_core::TicketError;
use ticketforge_core::sanitize::validate_source_path;
use ticketforge_core::source::{ColumnLabel, TabularSource, Workbook, column_labels};

use super::Context;
use crate::output::{pretty_section, render_mode};

/// Arguments for `tkf inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Spreadsheet to inspect.
    pub source: PathBuf,

    /// Sheet whose header row is listed; defaults to every sheet.
    #[arg(long)]
    pub sheet: Option<String>,

    /// Row holding column headers; defaults to `source.header_row`.
    #[arg(long, value_name = "ROW")]
    pub header_row: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub rows: u32,
    pub columns: u32,
    pub headers: Vec<ColumnLabel>,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub source: String,
    pub header_row: u32,
    pub sheets: Vec<SheetSummary>,
}

/// Summaries for `sheet`, or for every sheet when `None`.
///
/// # Errors
///
/// Returns [`TicketError::SheetNotFound`] for an unknown sheet.
pub fn summarize_sheets(
    source: &dyn TabularSource,
    sheet: Option<&str>,
    header_row: u32,
) -> Result<Vec<SheetSummary>, TicketError> {
    let names = match sheet {
        Some(name) => vec![name.to_string()],
        None => source.sheet_names(),
    };
    names
        .into_iter()
        .map(|name| {
            let (rows, columns) = source.dimensions(&name)?;
            let headers = column_labels(source, &name, header_row)?;
            Ok(SheetSummary {
                name,
                rows,
                columns,
                headers,
            })
        })
        .collect()
}

/// Execute `tkf inspect`.
pub fn run_inspect(args: &InspectArgs, ctx: &Context) -> Result<()> {
    validate_source_path(&args.source).map_err(|e| TicketError::SourceRead(e.to_string()))?;
    let header_row = match args.header_row {
        Some(row) => row,
        None => ctx.config()?.project.source.header_row,
    };
    let workbook = Workbook::open(&args.source)?;
    let report = InspectReport {
        source: args.source.display().to_string(),
        header_row,
        sheets: summarize_sheets(&workbook, args.sheet.as_deref(), header_row)?,
    };

    render_mode(ctx.output, &report, render_text, render_pretty)
}

fn render_text(report: &InspectReport, w: &mut dyn Write) -> io::Result<()> {
    for sheet in &report.sheets {
        writeln!(w, "{}\t{}x{}", sheet.name, sheet.rows, sheet.columns)?;
        for label in &sheet.headers {
            writeln!(w, "{}\t{}\t{}", sheet.name, label.column, label.header)?;
        }
    }
    Ok(())
}

fn render_pretty(report: &InspectReport, w: &mut dyn Write) -> io::Result<()> {
    for (i, sheet) in report.sheets.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        pretty_section(
            w,
            &format!("{} ({} rows, {} columns)", sheet.name, sheet.rows, sheet.columns),
        )?;
        if sheet.headers.is_empty() {
            writeln!(w, "  (no header cells)")?;
        }
        for label in &sheet.headers {
            writeln!(w, "  {:<4} {}", label.column, label.header)?;
        }
    }
    Ok(())
}
