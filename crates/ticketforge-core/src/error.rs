use std::fmt;
use std::path::PathBuf;

use crate::model::CreatedTicket;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ConfigMissing,
    SourceUnreadable,
    SheetNotFound,
    InvalidColumn,
    NoEstimates,
    ZeroTotalEffort,
    InvalidOption,
    InvalidTree,
    DocumentFormat,
    DocumentIo,
    RemoteRejected,
    RemoteUnreachable,
    PartialSubmission,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ConfigMissing => "E1002",
            Self::SourceUnreadable => "E2001",
            Self::SheetNotFound => "E2002",
            Self::InvalidColumn => "E2003",
            Self::NoEstimates => "E3001",
            Self::ZeroTotalEffort => "E3002",
            Self::InvalidOption => "E3003",
            Self::InvalidTree => "E3004",
            Self::DocumentFormat => "E4001",
            Self::DocumentIo => "E4002",
            Self::RemoteRejected => "E5001",
            Self::RemoteUnreachable => "E5002",
            Self::PartialSubmission => "E5003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ConfigMissing => "Required setting missing",
            Self::SourceUnreadable => "Spreadsheet could not be read",
            Self::SheetNotFound => "Sheet not found",
            Self::InvalidColumn => "Invalid column reference",
            Self::NoEstimates => "No usable estimate rows",
            Self::ZeroTotalEffort => "Total effort is zero",
            Self::InvalidOption => "Invalid creation option",
            Self::InvalidTree => "Invalid ticket tree",
            Self::DocumentFormat => "Malformed ticket document",
            Self::DocumentIo => "Ticket document I/O failed",
            Self::RemoteRejected => "Issue tracker rejected the request",
            Self::RemoteUnreachable => "Issue tracker unreachable",
            Self::PartialSubmission => "Submission stopped part way",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in ticketforge.toml and retry."),
            Self::ConfigMissing => {
                Some("Set it in ticketforge.toml, the user config, or a TICKETFORGE_* variable.")
            }
            Self::SourceUnreadable => Some("Check the path and that the file is a spreadsheet."),
            Self::SheetNotFound => Some("Run `tkf inspect <file>` to list sheet names."),
            Self::InvalidColumn => Some("Use column letters such as A, F or AA."),
            Self::NoEstimates => Some("Check the start row and the task column."),
            Self::ZeroTotalEffort => Some("Check that the process columns point at effort cells."),
            Self::InvalidOption => Some("Tracker, status and priority IDs must be positive."),
            Self::InvalidTree => None,
            Self::DocumentFormat => {
                Some("The document must have a top-level `tickets` list. Regenerate it with `tkf convert`.")
            }
            Self::DocumentIo => Some("Check the path and file permissions."),
            Self::RemoteRejected => Some("Run `tkf check` to verify IDs and permissions."),
            Self::RemoteUnreachable => Some("Check the base URL and network connectivity."),
            Self::PartialSubmission => {
                Some("Tickets listed as created remain on the server; remove or reuse them before retrying.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Validation failures for estimates, options and ticket trees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("no task estimates to aggregate")]
    EmptyEstimates,

    #[error("total effort across all processes is zero")]
    ZeroTotalEffort,

    #[error("no process columns configured")]
    NoProcessColumns,

    #[error("{name} must be a positive integer, got {value}")]
    InvalidOption { name: &'static str, value: i64 },

    #[error("ticket at depth {depth} has an empty subject")]
    EmptySubject { depth: usize },

    #[error("ticket '{subject}' at depth {depth} has invalid estimated hours {hours}")]
    InvalidHours {
        subject: String,
        depth: usize,
        hours: f64,
    },

    #[error("ticket '{subject}' at depth {depth} exceeds the maximum depth of {max}")]
    DepthExceeded {
        subject: String,
        depth: usize,
        max: usize,
    },

    #[error("task ticket '{subject}' at depth {depth} must not have children")]
    TaskHasChildren { subject: String, depth: usize },
}

impl ValidationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyEstimates => ErrorCode::NoEstimates,
            Self::ZeroTotalEffort => ErrorCode::ZeroTotalEffort,
            Self::NoProcessColumns => ErrorCode::InvalidColumn,
            Self::InvalidOption { .. } => ErrorCode::InvalidOption,
            Self::EmptySubject { .. }
            | Self::InvalidHours { .. }
            | Self::DepthExceeded { .. }
            | Self::TaskHasChildren { .. } => ErrorCode::InvalidTree,
        }
    }
}

/// Failure of a single remote issue-tracker call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never left the client: name resolution or connect failed.
    #[error("cannot reach server: {0}")]
    Unreachable(String),

    /// The request may have reached the server before the exchange broke.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Failures where the server did not act on the request, so repeating a
    /// create cannot duplicate it.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Status { status, .. } => matches!(*status, 429 | 503),
            Self::Transport(_) | Self::Decode(_) => false,
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Status { .. } | Self::Decode(_) => ErrorCode::RemoteRejected,
            Self::Unreachable(_) | Self::Transport(_) => ErrorCode::RemoteUnreachable,
        }
    }
}

/// Top-level error for the conversion and submission pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed ticket document: {0}")]
    Format(String),

    #[error("failed to read spreadsheet: {0}")]
    SourceRead(String),

    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("invalid column reference '{0}'")]
    InvalidColumn(String),

    /// Creation stopped at `failed_subject`; `created` lists what reached the server.
    #[error("failed to create ticket '{failed_subject}' after {} created: {source}", .created.len())]
    Submission {
        failed_subject: String,
        created: Vec<CreatedTicket>,
        #[source]
        source: ApiError,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TicketError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(err) => err.code(),
            Self::Format(_) => ErrorCode::DocumentFormat,
            Self::SourceRead(_) => ErrorCode::SourceUnreadable,
            Self::SheetNotFound(_) => ErrorCode::SheetNotFound,
            Self::InvalidColumn(_) => ErrorCode::InvalidColumn,
            Self::Submission { created, source, .. } => {
                if created.is_empty() {
                    source.code()
                } else {
                    ErrorCode::PartialSubmission
                }
            }
            Self::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Self::Io { .. } => ErrorCode::DocumentIo,
        }
    }
}

pub type Result<T, E = TicketError> = std::result::Result<T, E>;
