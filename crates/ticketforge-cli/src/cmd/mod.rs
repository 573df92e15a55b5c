pub mod check;
pub mod completions;
pub mod config;
pub mod convert;
pub mod create;
pub mod inspect;
pub mod preview;

use anyhow::Result;
use std::path::PathBuf;

use ticketforge_core::config::{EffectiveConfig, resolve_config};

use crate::output::OutputMode;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub output: OutputMode,
    pub quiet: bool,
    pub project_root: PathBuf,
    /// Explicit `--config` file.
    pub config_path: Option<PathBuf>,
}

impl Context {
    /// Load configuration layers for this invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be read or parsed.
    pub fn config(&self) -> Result<EffectiveConfig> {
        resolve_config(&self.project_root, self.config_path.as_deref())
    }
}
