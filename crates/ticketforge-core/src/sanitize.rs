//! Input validation for user-supplied connection settings and paths, plus
//! scrubbing of secrets from messages before they are printed.

use regex::Regex;
use std::path::{Component, Path};
use std::sync::LazyLock;
use url::Url;

/// Spreadsheet extensions the workbook reader understands.
pub const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("{0} is empty")]
    Empty(&'static str),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("API key {0}")]
    InvalidApiKey(&'static str),

    #[error("invalid project id '{0}'")]
    InvalidProjectId(String),

    #[error("{path}: {reason}")]
    InvalidSourcePath { path: String, reason: &'static str },
}

static SECRET_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)api[_-]?key[=:\s]+[A-Za-z0-9_-]+", "api_key: [MASKED]"),
        (r"(?i)password[=:\s]+\S+", "password: [MASKED]"),
        (r"(?i)\btoken[=:\s]+[A-Za-z0-9_-]+", "token: [MASKED]"),
        (
            r"(?i)authorization[=:\s]+(?:(?:basic|bearer)\s+)?\S+",
            "authorization: [MASKED]",
        ),
        (r"/[^/\s]+/[^/\s]+/[^/\s]+", "/***/***/***"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

static IDENTIFIER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").ok());

fn is_identifier(text: &str) -> bool {
    IDENTIFIER.as_ref().is_some_and(|re| re.is_match(text))
}

/// Remove credentials and deep filesystem paths from `message`.
#[must_use]
pub fn sanitize_message(message: &str) -> String {
    SECRET_PATTERNS
        .iter()
        .fold(message.to_string(), |text, (re, replacement)| {
            re.replace_all(&text, *replacement).into_owned()
        })
}

/// Mask `value`, keeping `visible` characters at each end when it is long
/// enough to do so safely.
#[must_use]
pub fn mask_secret(value: &str, visible: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= visible * 2 {
        return "*".repeat(8);
    }
    let start: String = chars[..visible].iter().collect();
    let end: String = chars[chars.len() - visible..].iter().collect();
    let middle = "*".repeat((chars.len() - visible * 2).max(4));
    format!("{start}{middle}{end}")
}

/// Parse a tracker base URL. Only http and https are accepted.
///
/// # Errors
///
/// Returns [`InputError`] for empty, unparsable or non-HTTP URLs.
pub fn validate_base_url(raw: &str) -> Result<Url, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty("base URL"));
    }
    let invalid = |reason: &str| InputError::InvalidUrl {
        url: trimmed.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https are supported"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if url.port() == Some(0) {
        return Err(invalid("port must be between 1 and 65535"));
    }
    if matches!(url.host_str(), Some("localhost" | "127.0.0.1")) {
        tracing::warn!(url = %url, "tracker URL points at the local machine");
    }
    Ok(url)
}

/// Check the shape of a tracker API key: 16 to 128 characters drawn from
/// ASCII letters, digits, `-` and `_`.
///
/// # Errors
///
/// Returns [`InputError`] describing the first problem.
pub fn validate_api_key(raw: &str) -> Result<(), InputError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(InputError::Empty("API key"));
    }
    if key.len() < 16 {
        return Err(InputError::InvalidApiKey("is too short (minimum 16 characters)"));
    }
    if key.len() > 128 {
        return Err(InputError::InvalidApiKey("is too long (maximum 128 characters)"));
    }
    if !is_identifier(key) {
        return Err(InputError::InvalidApiKey("contains invalid characters"));
    }
    Ok(())
}

/// Accept a numeric project id in `1..=999_999` or a textual identifier of
/// 1 to 100 identifier characters.
///
/// # Errors
///
/// Returns [`InputError`] when neither form applies.
pub fn validate_project_id(raw: &str) -> Result<(), InputError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(InputError::Empty("project id"));
    }
    let valid = if id.bytes().all(|b| b.is_ascii_digit()) {
        id.parse::<u32>().is_ok_and(|n| (1..=999_999).contains(&n))
    } else {
        id.len() <= 100 && is_identifier(id)
    };
    if valid {
        Ok(())
    } else {
        Err(InputError::InvalidProjectId(id.to_string()))
    }
}

/// Check that `path` names an existing regular spreadsheet file, with no
/// parent-directory components and not a symlink.
///
/// # Errors
///
/// Returns [`InputError::InvalidSourcePath`] describing the problem.
pub fn validate_source_path(path: &Path) -> Result<(), InputError> {
    let fail = |reason| InputError::InvalidSourcePath {
        path: path.display().to_string(),
        reason,
    };
    if path.as_os_str().is_empty() {
        return Err(InputError::Empty("source path"));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(fail("parent directory components are not allowed"));
    }
    let meta = std::fs::symlink_metadata(path).map_err(|_| fail("file does not exist"))?;
    if meta.file_type().is_symlink() {
        return Err(fail("symbolic links are not allowed"));
    }
    if !meta.is_file() {
        return Err(fail("not a regular file"));
    }
    let supported = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        });
    if !supported {
        return Err(fail("unsupported file type (expected .xlsx, .xlsm, .xls or .ods)"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        let msg = "request failed: api_key=abcdef0123456789 password: hunter2 token abc-123";
        let clean = sanitize_message(msg);
        assert!(!clean.contains("abcdef0123456789"));
        assert!(!clean.contains("hunter2"));
        assert!(!clean.contains("abc-123"));
        assert!(clean.contains("api_key: [MASKED]"));
        assert!(clean.contains("password: [MASKED]"));
        assert!(clean.contains("token: [MASKED]"));
    }

    #[test]
    fn authorization_header_is_masked() {
        let clean = sanitize_message("Authorization: Bearer sekrit");
        assert_eq!(clean, "authorization: [MASKED]");
        let clean = sanitize_message("X-Redmine-API-Key: 0123456789abcdef");
        assert!(!clean.contains("0123456789abcdef"));
    }

    #[test]
    fn deep_paths_are_masked() {
        let clean = sanitize_message("cannot open /home/alice/work/estimates.xlsx");
        assert_eq!(clean, "cannot open /***/***/***/estimates.xlsx");
        assert_eq!(sanitize_message("plain message"), "plain message");
    }

    #[test]
    fn mask_secret_keeps_ends() {
        assert_eq!(mask_secret("abcd1234efgh5678", 4), "abcd********5678");
        assert_eq!(mask_secret("short", 4), "********");
        assert_eq!(mask_secret("abcdefghij", 4), "abcd****ghij");
    }

    #[test]
    fn base_url_rules() {
        assert!(validate_base_url("https://redmine.example.com").is_ok());
        assert!(validate_base_url("http://localhost:3000/redmine").is_ok());
        assert_eq!(
            validate_base_url("  "),
            Err(InputError::Empty("base URL"))
        );
        assert!(validate_base_url("ftp://example.com").is_err());
        assert!(validate_base_url("not a url").is_err());
        assert!(validate_base_url("http://example.com:0").is_err());
    }

    #[test]
    fn api_key_rules() {
        assert!(validate_api_key("0123456789abcdef").is_ok());
        assert!(validate_api_key("0123456789abcde").is_err());
        assert!(validate_api_key(&"a".repeat(129)).is_err());
        assert!(validate_api_key("0123456789abcdef!").is_err());
        assert_eq!(validate_api_key(""), Err(InputError::Empty("API key")));
    }

    #[test]
    fn project_id_rules() {
        assert!(validate_project_id("42").is_ok());
        assert!(validate_project_id("web-portal_2").is_ok());
        assert!(validate_project_id("0").is_err());
        assert!(validate_project_id("1000000").is_err());
        assert!(validate_project_id("has space").is_err());
        assert!(validate_project_id(&"x".repeat(101)).is_err());
    }

    #[test]
    fn source_path_rules() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("estimates.XLSX");
        std::fs::write(&good, b"stub").expect("write");
        assert!(validate_source_path(&good).is_ok());

        let csv = dir.path().join("estimates.csv");
        std::fs::write(&csv, b"a,b").expect("write");
        assert!(validate_source_path(&csv).is_err());

        assert!(validate_source_path(&dir.path().join("missing.xlsx")).is_err());
        assert!(validate_source_path(dir.path()).is_err());
        assert!(validate_source_path(Path::new("../estimates.xlsx")).is_err());
    }
}
