#![forbid(unsafe_code)]

mod cmd;
mod output;
mod redmine;
mod validate;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ticketforge_core::config::load_user_config;

#[derive(Parser, Debug)]
#[command(
    name = "tkf",
    author,
    version,
    about = "ticketforge: turn spreadsheet effort estimates into Redmine tickets",
    long_about = None
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors and keep human output short.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Output format (defaults to pretty on a terminal, text when piped).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Project config file to use instead of ./ticketforge.toml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Convert",
        about = "Convert a spreadsheet into a ticket document",
        long_about = "Read task estimates from a spreadsheet, total them per process, and write \
                      the ticket tree as <base>.yml plus an HTML preview <base>.html.",
        after_help = "EXAMPLES:\n    # Use the layout from ticketforge.toml\n    tkf convert estimates.xlsx\n\n    # Spell the layout out\n    tkf convert estimates.xlsx --sheet Estimates --task-column C --group-column B \\\n        --process detail_design=E --process implementation=F\n\n    # Tasks directly under process tickets\n    tkf convert estimates.xlsx --no-group -o plan"
    )]
    Convert(cmd::convert::ConvertArgs),

    #[command(
        next_help_heading = "Convert",
        about = "List sheets and header columns of a spreadsheet",
        after_help = "EXAMPLES:\n    # Every sheet\n    tkf inspect estimates.xlsx\n\n    # Headers on row 3 of one sheet\n    tkf inspect estimates.xlsx --sheet Estimates --header-row 3"
    )]
    Inspect(cmd::inspect::InspectArgs),

    #[command(
        next_help_heading = "Convert",
        about = "Render an edited ticket document as HTML",
        after_help = "EXAMPLES:\n    # Writes plan.html next to plan.yml\n    tkf preview plan.yml"
    )]
    Preview(cmd::preview::PreviewArgs),

    #[command(
        next_help_heading = "Submit",
        about = "Create the tickets of a document on Redmine",
        long_about = "Create every ticket of a document on Redmine, parents before children. \
                      Creation stops at the first failure; tickets created before it are reported.",
        after_help = "EXAMPLES:\n    # Preview ids and nesting without contacting Redmine\n    tkf create plan.yml --dry-run\n\n    # Submit with explicit ids\n    tkf create plan.yml --tracker-id 2 --status-id 1 --priority-id 2"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Submit",
        about = "Check the Redmine connection and configured ids",
        after_help = "EXAMPLES:\n    # Show trackers, statuses and priorities too\n    tkf check --list"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Show configuration",
        after_help = "EXAMPLES:\n    # Effective settings, API key masked\n    tkf config show\n\n    # Raw user file\n    tkf config show --user"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    tkf completions bash > /etc/bash_completion.d/tkf"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("TICKETFORGE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "ticketforge=debug,tkf=debug,info"
        } else if quiet {
            "error"
        } else {
            "ticketforge=info,warn"
        })
    });

    let format = env::var("TICKETFORGE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(command: Commands, ctx: &cmd::Context) -> anyhow::Result<()> {
    match command {
        Commands::Convert(ref args) => cmd::convert::run_convert(args, ctx),
        Commands::Inspect(ref args) => cmd::inspect::run_inspect(args, ctx),
        Commands::Preview(ref args) => cmd::preview::run_preview(args, ctx),
        Commands::Create(ref args) => cmd::create::run_create(args, ctx),
        Commands::Check(ref args) => cmd::check::run_check(args, ctx),
        Commands::Config(ref args) => cmd::config::run_config(args, ctx),
        Commands::Completions(ref args) => {
            cmd::completions::write_completions(args, Cli::command(), &mut std::io::stdout());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let user_output = match load_user_config() {
        Ok(user) => user.output,
        Err(err) => {
            debug!(error = %err, "user config unavailable for output mode");
            None
        }
    };
    let output = resolve_output_mode(cli.format, cli.json, user_output.as_deref());

    let project_root = match env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            let _ = render_error(
                output,
                &CliError::new(format!("cannot determine working directory: {err}")),
            );
            return ExitCode::FAILURE;
        }
    };

    let ctx = cmd::Context {
        output,
        quiet: cli.quiet,
        project_root,
        config_path: cli.config,
    };

    match run(cli.command, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "command failed");
            let cli_error = CliError::from_anyhow(&err);
            if render_error(output, &cli_error).is_err() {
                eprintln!("error: {}", cli_error.message);
            }
            ExitCode::FAILURE
        }
    }
}
