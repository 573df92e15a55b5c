//! Blocking Redmine REST client.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use ticketforge_core::error::ApiError;
use ticketforge_core::submit::{IssueApi, NewIssue};

use crate::validate::Connection;

const API_KEY_HEADER: &str = "X-Redmine-API-Key";
const MAX_ERROR_BODY: usize = 200;

/// A named record from one of Redmine's enumeration endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRecord {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub identifier: String,
}

#[derive(Deserialize)]
struct ProjectEnvelope {
    project: Project,
}

#[derive(Deserialize)]
struct TrackersEnvelope {
    trackers: Vec<NamedRecord>,
}

#[derive(Deserialize)]
struct StatusesEnvelope {
    issue_statuses: Vec<NamedRecord>,
}

#[derive(Deserialize)]
struct PrioritiesEnvelope {
    issue_priorities: Vec<NamedRecord>,
}

#[derive(Deserialize)]
struct CreatedIssue {
    id: u64,
}

#[derive(Deserialize)]
struct CreatedEnvelope {
    issue: CreatedIssue,
}

/// Outcome of [`RedmineClient::validate_configuration`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigurationCheck {
    pub project: Option<Project>,
    pub trackers: Vec<NamedRecord>,
    pub statuses: Vec<NamedRecord>,
    pub priorities: Vec<NamedRecord>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConfigurationCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct RedmineClient {
    agent: ureq::Agent,
    base_url: Url,
    project_id: String,
    api_key: String,
}

impl std::fmt::Debug for RedmineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedmineClient")
            .field("base_url", &self.base_url.as_str())
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl RedmineClient {
    pub fn new(connection: &Connection) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(connection.timeout_secs.max(1)))
            .user_agent(concat!("ticketforge/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: with_trailing_slash(connection.base_url.clone()),
            project_id: connection.project_id.clone(),
            api_key: connection.api_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        tracing::debug!(url = %url, "GET");
        let response = self
            .agent
            .get(url.as_str())
            .set(API_KEY_HEADER, &self.api_key)
            .set("Accept", "application/json")
            .call()
            .map_err(map_error)?;
        response
            .into_json::<T>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Cheap authenticated request used to tell "unreachable" from
    /// "misconfigured".
    pub fn test_connection(&self) -> Result<(), ApiError> {
        self.get_json::<Value>("projects.json?limit=1").map(|_| ())
    }

    pub fn project(&self) -> Result<Project, ApiError> {
        let path = format!("projects/{}.json", self.project_id);
        self.get_json::<ProjectEnvelope>(&path).map(|e| e.project)
    }

    pub fn trackers(&self) -> Result<Vec<NamedRecord>, ApiError> {
        self.get_json::<TrackersEnvelope>("trackers.json")
            .map(|e| e.trackers)
    }

    pub fn statuses(&self) -> Result<Vec<NamedRecord>, ApiError> {
        self.get_json::<StatusesEnvelope>("issue_statuses.json")
            .map(|e| e.issue_statuses)
    }

    pub fn priorities(&self) -> Result<Vec<NamedRecord>, ApiError> {
        self.get_json::<PrioritiesEnvelope>("enumerations/issue_priorities.json")
            .map(|e| e.issue_priorities)
    }

    /// Check connectivity, the project, and the enumerations a submission
    /// depends on. Only an unreachable server or a missing project is an
    /// error; empty or unavailable enumerations are warnings.
    pub fn validate_configuration(&self) -> ConfigurationCheck {
        let mut check = ConfigurationCheck::default();

        if let Err(err) = self.test_connection() {
            tracing::warn!(error = %err, "connection test failed");
            check
                .errors
                .push(format!("cannot reach the Redmine server: {err}"));
            return check;
        }

        match self.project() {
            Ok(project) => check.project = Some(project),
            Err(err) => check.errors.push(format!(
                "project '{}' not found or not accessible: {err}",
                self.project_id
            )),
        }

        match self.trackers() {
            Ok(trackers) if trackers.is_empty() => check.warnings.push("no trackers available".into()),
            Ok(trackers) => check.trackers = trackers,
            Err(err) => check.warnings.push(format!("could not list trackers: {err}")),
        }

        match self.statuses() {
            Ok(statuses) if statuses.is_empty() => check.warnings.push("no issue statuses available".into()),
            Ok(statuses) => check.statuses = statuses,
            Err(err) => check.warnings.push(format!("could not list issue statuses: {err}")),
        }

        match self.priorities() {
            Ok(priorities) => check.priorities = priorities,
            Err(err) => check.warnings.push(format!("could not list priorities: {err}")),
        }

        check
    }
}

impl IssueApi for RedmineClient {
    fn create_issue(&mut self, issue: &NewIssue) -> Result<u64, ApiError> {
        let url = self.endpoint("issues.json")?;
        let response = self
            .agent
            .post(url.as_str())
            .set(API_KEY_HEADER, &self.api_key)
            .send_json(issue_payload(&self.project_id, issue))
            .map_err(map_error)?;
        response
            .into_json::<CreatedEnvelope>()
            .map(|e| e.issue.id)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Request body for `POST /issues.json`. Numeric project ids are sent as
/// numbers, identifiers as strings.
fn issue_payload(project_id: &str, issue: &NewIssue) -> Value {
    let project = project_id
        .parse::<u64>()
        .map_or_else(|_| Value::from(project_id), Value::from);
    let mut body = match serde_json::to_value(issue) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    body.insert("project_id".into(), project);
    json!({ "issue": body })
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn map_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            ApiError::Status {
                status,
                body: describe_errors(&body),
            }
        }
        ureq::Error::Transport(transport) => {
            transport_error(transport.kind(), transport.to_string())
        }
    }
}

/// Only failures before the request was written are safe to repeat.
fn transport_error(kind: ureq::ErrorKind, message: String) -> ApiError {
    match kind {
        ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
            ApiError::Unreachable(message)
        }
        _ => ApiError::Transport(message),
    }
}

/// Redmine reports validation failures as `{"errors": [...]}`; anything
/// else is passed through, shortened.
fn describe_errors(body: &str) -> String {
    #[derive(Deserialize)]
    struct Errors {
        errors: Vec<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<Errors>(body) {
        return parsed.errors.join("; ");
    }
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Connect and fail early when the server is unreachable.
pub fn connect(connection: &Connection) -> Result<RedmineClient> {
    let client = RedmineClient::new(connection);
    client
        .test_connection()
        .with_context(|| format!("failed to connect to {}", connection.base_url))?;
    tracing::info!(base_url = %connection.base_url, "connected to Redmine");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(parent: Option<u64>) -> NewIssue {
        NewIssue {
            subject: "Implementation - Login".into(),
            description: "Task: Login".into(),
            tracker_id: 2,
            status_id: 1,
            priority_id: 3,
            parent_issue_id: parent,
            estimated_hours: 6.5,
        }
    }

    #[test]
    fn payload_wraps_issue_and_types_project_id() {
        let numeric = issue_payload("42", &issue(Some(7)));
        assert_eq!(numeric["issue"]["project_id"], json!(42));
        assert_eq!(numeric["issue"]["parent_issue_id"], json!(7));
        assert_eq!(numeric["issue"]["estimated_hours"], json!(6.5));

        let named = issue_payload("webshop", &issue(None));
        assert_eq!(named["issue"]["project_id"], json!("webshop"));
        assert!(named["issue"].get("parent_issue_id").is_none());
    }

    #[test]
    fn base_url_keeps_sub_path() {
        let base = with_trailing_slash(Url::parse("https://example.com/redmine").expect("url"));
        assert_eq!(
            base.join("issues.json").expect("join").as_str(),
            "https://example.com/redmine/issues.json"
        );
    }

    #[test]
    fn redmine_error_list_is_joined() {
        let body = r#"{"errors":["Subject cannot be blank","Tracker is not included in the list"]}"#;
        assert_eq!(
            describe_errors(body),
            "Subject cannot be blank; Tracker is not included in the list"
        );
    }

    #[test]
    fn long_bodies_are_shortened() {
        let body = "x".repeat(500);
        let described = describe_errors(&body);
        assert_eq!(described.len(), MAX_ERROR_BODY + 3);
        assert!(described.ends_with("..."));
    }

    #[test]
    fn only_pre_send_failures_are_retryable() {
        let refused = transport_error(ureq::ErrorKind::ConnectionFailed, "refused".into());
        assert!(matches!(refused, ApiError::Unreachable(_)));
        assert!(refused.is_transient());

        assert!(transport_error(ureq::ErrorKind::Dns, "no such host".into()).is_transient());

        let lost = transport_error(ureq::ErrorKind::Io, "timed out reading response".into());
        assert!(matches!(lost, ApiError::Transport(_)));
        assert!(!lost.is_transient());
    }
}
