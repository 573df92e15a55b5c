use std::fmt;

use crate::output::CliError;
use ticketforge_core::ErrorCode;
use ticketforge_core::config::{ConnectionSettings, ENV_API_KEY, ENV_BASE_URL, ENV_PROJECT};
use ticketforge_core::model::ProcessType;
use ticketforge_core::sanitize::{self, mask_secret};
use ticketforge_core::source::column_to_number;
use url::Url;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
    pub code: &'static str,
}

impl ValidationError {
    pub fn new(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
        code: &'static str,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
            code,
        }
    }

    pub fn to_cli_error(&self) -> CliError {
        CliError::with_details(self.to_string(), self.suggestion.clone(), self.code)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "{} {}", self.field, self.reason)
        } else {
            write!(f, "invalid {} '{}': {}", self.field, self.value, self.reason)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Normalize a column reference such as `f` or `AA` to upper case.
pub fn validate_column(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let column = raw.trim().to_ascii_uppercase();
    column_to_number(&column).map_err(|_| {
        ValidationError::new(
            field,
            raw,
            "must be column letters between A and XFD",
            "use column letters such as A, F or AA",
            ErrorCode::InvalidColumn.code(),
        )
    })?;
    Ok(column)
}

/// Parse a `PROCESS=COLUMN` pair given to `--process`.
pub fn parse_process_mapping(raw: &str) -> Result<(ProcessType, String), ValidationError> {
    let Some((process, column)) = raw.split_once('=') else {
        return Err(ValidationError::new(
            "process mapping",
            raw,
            "expected PROCESS=COLUMN",
            "for example --process implementation=F",
            ErrorCode::InvalidColumn.code(),
        ));
    };
    let process = process.parse::<ProcessType>().map_err(|err| {
        ValidationError::new(
            "process mapping",
            raw,
            err.to_string(),
            "for example --process unit_test=G",
            ErrorCode::InvalidColumn.code(),
        )
    })?;
    Ok((process, validate_column("process column", column)?))
}

/// Fail with a "missing setting" error naming the flag and config key.
pub fn require<T>(
    value: Option<T>,
    field: &'static str,
    suggestion: &str,
) -> Result<T, ValidationError> {
    value.ok_or_else(|| {
        ValidationError::new(
            field,
            "",
            "is not configured",
            suggestion,
            ErrorCode::ConfigMissing.code(),
        )
    })
}

/// Connection settings that passed input validation.
#[derive(Debug, Clone)]
pub struct Connection {
    pub base_url: Url,
    pub project_id: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Connection {
    pub fn masked_key(&self) -> String {
        mask_secret(&self.api_key, 4)
    }
}

/// Check that every connection setting is present and well formed.
pub fn validate_connection(settings: &ConnectionSettings) -> Result<Connection, ValidationError> {
    let raw_url = require(
        settings.base_url.clone(),
        "redmine.base_url",
        &format!("set redmine.base_url in ticketforge.toml or {ENV_BASE_URL}"),
    )?;
    let base_url = sanitize::validate_base_url(&raw_url).map_err(|err| {
        ValidationError::new(
            "redmine.base_url",
            raw_url.as_str(),
            err.to_string(),
            "use an http:// or https:// URL such as https://redmine.example.com",
            ErrorCode::ConfigMissing.code(),
        )
    })?;

    let project_id = require(
        settings.project_id.clone(),
        "redmine.project_id",
        &format!("set redmine.project_id in ticketforge.toml or {ENV_PROJECT}"),
    )?;
    sanitize::validate_project_id(&project_id).map_err(|err| {
        ValidationError::new(
            "redmine.project_id",
            project_id.as_str(),
            err.to_string(),
            "use the numeric id or the identifier shown in the project URL",
            ErrorCode::ConfigMissing.code(),
        )
    })?;

    let api_key = require(
        settings.api_key.clone(),
        "redmine.api_key",
        &format!("set {ENV_API_KEY} or redmine.api_key in the user config"),
    )?;
    sanitize::validate_api_key(&api_key).map_err(|err| {
        ValidationError::new(
            "redmine.api_key",
            mask_secret(&api_key, 4),
            err.to_string(),
            "copy the key from 'My account' in Redmine",
            ErrorCode::ConfigMissing.code(),
        )
    })?;

    Ok(Connection {
        base_url,
        project_id,
        api_key,
        timeout_secs: settings.timeout_secs,
    })
}
