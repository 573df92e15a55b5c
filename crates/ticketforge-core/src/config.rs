use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::TicketError;
use crate::model::ProcessType;
use crate::retry::RetryPolicy;

/// File name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "ticketforge.toml";

pub const ENV_BASE_URL: &str = "TICKETFORGE_BASE_URL";
pub const ENV_PROJECT: &str = "TICKETFORGE_PROJECT";
pub const ENV_API_KEY: &str = "TICKETFORGE_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub redmine: RedmineConfig,
    #[serde(default)]
    pub tickets: TicketConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Spreadsheet layout defaults for `convert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default = "default_header_row")]
    pub header_row: u32,
    #[serde(default = "default_start_row")]
    pub start_row: u32,
    #[serde(default)]
    pub end_row: Option<u32>,
    #[serde(default)]
    pub task_column: Option<String>,
    #[serde(default)]
    pub group_column: Option<String>,
    #[serde(default = "default_true")]
    pub grouping: bool,
    /// Process → column letter.
    #[serde(default)]
    pub processes: BTreeMap<ProcessType, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sheet: None,
            header_row: default_header_row(),
            start_row: default_start_row(),
            end_row: None,
            task_column: None,
            group_column: None,
            grouping: default_true(),
            processes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedmineConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RedmineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            project_id: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Tracker ids applied to every created ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketConfig {
    #[serde(default)]
    pub tracker_id: Option<i64>,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[serde(default)]
    pub priority_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Per-user settings, typically credentials shared by every project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub redmine: Option<RedmineConfig>,
}

/// Connection settings after merging files and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionSettings {
    pub base_url: Option<String>,
    pub project_id: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Values read from `TICKETFORGE_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub base_url: Option<String>,
    pub project_id: Option<String>,
    pub api_key: Option<String>,
}

impl EnvOverrides {
    #[must_use]
    pub fn from_env() -> Self {
        let read = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            base_url: read(ENV_BASE_URL),
            project_id: read(ENV_PROJECT),
            api_key: read(ENV_API_KEY),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    /// File the project config came from, if any.
    pub project_path: Option<PathBuf>,
    pub connection: ConnectionSettings,
}

/// Load `ticketforge.toml` from `dir`; defaults when the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(dir: &Path) -> Result<ProjectConfig> {
    let path = dir.join(PROJECT_CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    load_config_file(&path)
}

/// Load a project config from an explicit path, which must exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config =
        toml::from_str::<ProjectConfig>(&content).map_err(|source| TicketError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(config)
}

/// `<config dir>/ticketforge/config.toml`, when the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ticketforge").join("config.toml"))
}

/// Load the user config file; defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(path) = user_config_path() else {
        return Ok(UserConfig::default());
    };
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config =
        toml::from_str::<UserConfig>(&content).map_err(|source| TicketError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(config)
}

/// Merge connection settings. Environment beats the project file, which
/// beats the user file.
#[must_use]
pub fn resolve_connection(
    project: &RedmineConfig,
    user: Option<&RedmineConfig>,
    overrides: &EnvOverrides,
) -> ConnectionSettings {
    let pick = |env: &Option<String>, get: fn(&RedmineConfig) -> &Option<String>| {
        env.clone()
            .or_else(|| get(project).clone())
            .or_else(|| user.and_then(|u| get(u).clone()))
    };
    ConnectionSettings {
        base_url: pick(&overrides.base_url, |c| &c.base_url),
        project_id: pick(&overrides.project_id, |c| &c.project_id),
        api_key: pick(&overrides.api_key, |c| &c.api_key),
        timeout_secs: project.timeout_secs,
    }
}

/// Load every configuration layer.
///
/// `explicit` names a project config file that must exist; otherwise
/// `ticketforge.toml` in `dir` is used when present.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed.
pub fn resolve_config(dir: &Path, explicit: Option<&Path>) -> Result<EffectiveConfig> {
    let (project, project_path) = match explicit {
        Some(path) => (load_config_file(path)?, Some(path.to_path_buf())),
        None => {
            let path = dir.join(PROJECT_CONFIG_FILE);
            let found = path.exists().then_some(path);
            (load_project_config(dir)?, found)
        }
    };
    let user = load_user_config()?;
    let connection = resolve_connection(
        &project.redmine,
        user.redmine.as_ref(),
        &EnvOverrides::from_env(),
    );
    tracing::debug!(
        project_config = ?project_path,
        base_url = ?connection.base_url,
        "resolved configuration"
    );

    Ok(EffectiveConfig {
        project,
        user,
        project_path,
        connection,
    })
}

const fn default_true() -> bool {
    true
}

const fn default_header_row() -> u32 {
    1
}

const fn default_start_row() -> u32 {
    2
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_project_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.source.header_row, 1);
        assert_eq!(cfg.source.start_row, 2);
        assert!(cfg.source.grouping);
        assert_eq!(cfg.redmine.timeout_secs, 30);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.tickets, TicketConfig::default());
    }

    #[test]
    fn project_config_parses_all_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            r#"
[source]
sheet = "Estimates"
start_row = 3
task_column = "B"
group_column = "A"
grouping = false

[source.processes]
detail_design = "C"
implementation = "D"
integration_test = "F"

[redmine]
base_url = "https://redmine.example.com"
project_id = "web-portal"
timeout_secs = 10

[tickets]
tracker_id = 2
status_id = 1
priority_id = 4

[retry]
max_attempts = 5
initial_backoff_ms = 100
"#,
        )
        .expect("write config");

        let cfg = load_project_config(dir.path()).expect("parse");
        assert_eq!(cfg.source.sheet.as_deref(), Some("Estimates"));
        assert_eq!(cfg.source.start_row, 3);
        assert!(!cfg.source.grouping);
        assert_eq!(cfg.source.processes.len(), 3);
        assert_eq!(
            cfg.source.processes.get(&ProcessType::IntegrationTest).map(String::as_str),
            Some("F")
        );
        assert_eq!(cfg.redmine.timeout_secs, 10);
        assert_eq!(cfg.tickets.tracker_id, Some(2));
        let policy = cfg.retry.policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_backoff, Duration::from_millis(100));
        assert_eq!(policy.max_backoff, Duration::from_millis(5_000));
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "[source\nsheet = 1").expect("write");
        let err = load_project_config(dir.path()).expect_err("must fail");
        assert!(err.to_string().starts_with("failed to parse"));
        let coded = err.downcast_ref::<TicketError>().expect("coded config error");
        assert_eq!(coded.code(), crate::error::ErrorCode::ConfigParseError);
    }

    #[test]
    fn unknown_process_key_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[source.processes]\nqa = \"C\"\n",
        )
        .expect("write");
        assert!(load_project_config(dir.path()).is_err());
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(resolve_config(dir.path(), Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn connection_precedence_env_project_user() {
        let project = RedmineConfig {
            base_url: Some("https://project.example.com".into()),
            project_id: None,
            api_key: None,
            timeout_secs: 12,
        };
        let user = RedmineConfig {
            base_url: Some("https://user.example.com".into()),
            project_id: Some("from-user".into()),
            api_key: Some("user-key-0123456789".into()),
            timeout_secs: 99,
        };
        let overrides = EnvOverrides {
            api_key: Some("env-key-0123456789".into()),
            ..EnvOverrides::default()
        };

        let resolved = resolve_connection(&project, Some(&user), &overrides);
        assert_eq!(resolved.base_url.as_deref(), Some("https://project.example.com"));
        assert_eq!(resolved.project_id.as_deref(), Some("from-user"));
        assert_eq!(resolved.api_key.as_deref(), Some("env-key-0123456789"));
        assert_eq!(resolved.timeout_secs, 12);

        let bare = resolve_connection(&RedmineConfig::default(), None, &EnvOverrides::default());
        assert_eq!(bare, ConnectionSettings {
            timeout_secs: 30,
            ..ConnectionSettings::default()
        });
    }

    #[test]
    fn user_config_parses_credentials() {
        let cfg: UserConfig = toml::from_str(
            r#"
output = "json"

[redmine]
base_url = "https://redmine.example.com"
api_key = "0123456789abcdef"
"#,
        )
        .expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
        let redmine = cfg.redmine.expect("redmine section");
        assert_eq!(redmine.api_key.as_deref(), Some("0123456789abcdef"));
        assert_eq!(redmine.timeout_secs, 30);
    }
}
