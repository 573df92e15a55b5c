//! `tkf preview`: render a ticket document as an HTML page.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use ticketforge_core::document::load_document;
use ticketforge_core::render::write_html;
use ticketforge_core::walk;

use super::Context;
use crate::output::render;

/// Arguments for `tkf preview`.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Ticket document (.yml) to render.
    pub document: PathBuf,

    /// Where to write the page; defaults to the document path with `.html`.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PreviewReport {
    document: String,
    preview: String,
    tickets: usize,
    levels: usize,
    total_hours: f64,
}

/// Execute `tkf preview`.
pub fn run_preview(args: &PreviewArgs, ctx: &Context) -> Result<()> {
    let tree = load_document(&args.document)?;
    let preview = args
        .output
        .clone()
        .unwrap_or_else(|| args.document.with_extension("html"));
    write_html(&preview, &tree)?;
    tracing::info!(preview = %preview.display(), "wrote preview");

    let report = PreviewReport {
        document: args.document.display().to_string(),
        preview: preview.display().to_string(),
        tickets: walk::count(&tree),
        levels: walk::max_depth(&tree).map_or(0, |depth| depth + 1),
        total_hours: walk::total_hours(&tree),
    };
    render(ctx.output, &report, |r, w| {
        writeln!(
            w,
            "{} ({} tickets in {} levels, {}h)",
            r.preview, r.tickets, r.levels, r.total_hours
        )
    })
}
