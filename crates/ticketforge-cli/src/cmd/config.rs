use anyhow::{Context as _, Result, anyhow};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use toml::Value;

use ticketforge_core::config::{
    EffectiveConfig, PROJECT_CONFIG_FILE, RetryConfig, SourceConfig, TicketConfig,
    user_config_path,
};
use ticketforge_core::TicketError;
use ticketforge_core::sanitize::mask_secret;

use super::Context;
use crate::output::OutputMode;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show resolved or raw configuration
    Show(ShowArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Show the raw project config file only
    #[arg(long, conflicts_with = "user")]
    project: bool,

    /// Show the raw user config file only
    #[arg(long)]
    user: bool,
}

#[derive(Debug, Serialize)]
struct ShownConnection {
    base_url: Option<String>,
    project_id: Option<String>,
    api_key: Option<String>,
    timeout_secs: u64,
}

/// Effective configuration as displayed; the API key is masked.
#[derive(Debug, Serialize)]
struct ShownConfig {
    project_file: Option<String>,
    output: Option<String>,
    redmine: ShownConnection,
    source: SourceConfig,
    tickets: TicketConfig,
    retry: RetryConfig,
}

impl From<&EffectiveConfig> for ShownConfig {
    fn from(config: &EffectiveConfig) -> Self {
        let connection = &config.connection;
        Self {
            project_file: config
                .project_path
                .as_ref()
                .map(|p| p.display().to_string()),
            output: config.user.output.clone(),
            redmine: ShownConnection {
                base_url: connection.base_url.clone(),
                project_id: connection.project_id.clone(),
                api_key: connection.api_key.as_deref().map(|k| mask_secret(k, 4)),
                timeout_secs: connection.timeout_secs,
            },
            source: config.project.source.clone(),
            tickets: config.project.tickets,
            retry: config.project.retry,
        }
    }
}

pub fn run_config(args: &ConfigArgs, ctx: &Context) -> Result<()> {
    match &args.command {
        ConfigCommand::Show(show) => run_show(show, ctx),
    }
}

fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    if args.project {
        return print_value(&load_masked(&project_config_file(ctx))?, ctx.output);
    }

    if args.user {
        let path = user_config_path().ok_or_else(|| anyhow!("no user config directory"))?;
        return print_value(&load_masked(&path)?, ctx.output);
    }

    let effective = ctx.config()?;
    let shown = Value::try_from(ShownConfig::from(&effective))
        .context("failed to convert configuration for display")?;
    print_value(&shown, ctx.output)
}

/// Parse a TOML file, masking `redmine.api_key`. A missing file is an
/// empty table.
fn load_masked(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Table(toml::map::Map::new()));
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut value: Value = toml::from_str(&content).map_err(|source| TicketError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    mask_api_key(&mut value);
    Ok(value)
}

fn mask_api_key(value: &mut Value) {
    if let Some(Value::String(key)) = value
        .get_mut("redmine")
        .and_then(|redmine| redmine.get_mut("api_key"))
    {
        *key = mask_secret(key, 4);
    }
}

fn print_value(value: &Value, output: OutputMode) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match output {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => {
            let mut lines = Vec::new();
            flatten("", value, &mut lines);
            for line in lines {
                writeln!(out, "{line}")?;
            }
        }
        OutputMode::Pretty => {
            write!(out, "{}", toml::to_string_pretty(value)?)?;
        }
    }
    Ok(())
}

/// `a.b.c=value` lines for every leaf of `value`.
fn flatten(prefix: &str, value: &Value, lines: &mut Vec<String>) {
    match value {
        Value::Table(table) => {
            for (key, child) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, lines);
            }
        }
        Value::String(s) => lines.push(format!("{prefix}={s}")),
        other => lines.push(format!("{prefix}={other}")),
    }
}

/// `--config` when given, otherwise `ticketforge.toml` in the project root.
fn project_config_file(ctx: &Context) -> PathBuf {
    ctx.config_path
        .clone()
        .unwrap_or_else(|| ctx.project_root.join(PROJECT_CONFIG_FILE))
}
