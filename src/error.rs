// src/error.rs
//! Application error types with structured error handling.
//!
//! Each variant names one failure mode of the modeling layer: a tag nobody
//! registered, a value of the wrong shape, a remote call that failed, or a
//! duplication whose branches did not all complete.

use std::fmt;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
///
/// Stores report failures with one of these codes so callers can decide
/// whether a failure is transient without matching on message strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded; back off and retry
    RateLimited,
    /// The requested object does not exist or is inaccessible
    ObjectNotFound,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    /// Request body contains invalid JSON
    InvalidJson,
    /// Request parameters failed Notion's validation
    ValidationFailed,
    /// Conflict with current state of the resource
    Conflict,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            404 => Self::ObjectNotFound,
            429 => Self::RateLimited,
            503 => Self::ServiceUnavailable,
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::ServiceUnavailable
                | Self::InternalError
                | Self::HttpStatus(500..=599)
        )
    }

    /// Whether this error means the resource simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound)
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// The remote primitive that was being invoked when a store call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Retrieve,
    Children,
    Create,
    Update,
    AppendChildren,
    Delete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Retrieve => "retrieve",
            Self::Children => "children",
            Self::Create => "create",
            Self::Update => "update",
            Self::AppendChildren => "append_children",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Which registry rejected a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Property,
    Block,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property => f.write_str("property"),
            Self::Block => f.write_str("block"),
        }
    }
}

/// One branch of a duplication that did not complete.
#[derive(Debug)]
pub struct SubtreeFailure {
    /// Id of the source block whose subtree failed to replicate.
    pub source_id: String,
    pub error: AppError,
}

impl fmt::Display for SubtreeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_id, self.error)
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unsupported {kind} type '{tag}'")]
    UnsupportedType { kind: RecordKind, tag: String },

    #[error("Cannot insert {found} into '{tag}' property: expected {expected}")]
    TypeMismatch {
        tag: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Remote {operation} on '{target}' failed: {message}")]
    RemoteOperation {
        operation: StoreOperation,
        target: String,
        code: Option<NotionErrorCode>,
        message: String,
    },

    #[error(
        "Duplication incomplete: {} subtree(s) failed: {}",
        failures.len(),
        failures.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
    )]
    DuplicationIncomplete { failures: Vec<SubtreeFailure> },

    #[error("Replication task panicked: {0}")]
    TaskPanicked(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("No property named '{0}'")]
    UnknownProperty(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),
}

impl AppError {
    /// Builds a store failure for `operation` against `target`.
    pub fn remote(
        operation: StoreOperation,
        target: impl Into<String>,
        code: Option<NotionErrorCode>,
        message: impl Into<String>,
    ) -> Self {
        AppError::RemoteOperation {
            operation,
            target: target.into(),
            code,
            message: message.into(),
        }
    }

    /// Whether a retry of the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::RemoteOperation { code: Some(code), .. } => code.is_retryable(),
            AppError::NetworkFailure(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether the failure reports a missing remote object.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::RemoteOperation { code: Some(code), .. } if code.is_not_found()
        )
    }

    /// Folds this error into a list of failed duplication branches.
    ///
    /// Aggregates coming up from deeper levels are flattened so the caller
    /// sees every failed branch exactly once.
    pub(crate) fn collect_into(self, source_id: &str, failures: &mut Vec<SubtreeFailure>) {
        match self {
            AppError::DuplicationIncomplete { failures: nested } => failures.extend(nested),
            error => failures.push(SubtreeFailure {
                source_id: source_id.to_string(),
                error,
            }),
        }
    }
}

// Allow converting from anyhow::Error, preserving error chain
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError {
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedRecord(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_classify_retryability() {
        assert!(NotionErrorCode::from_api_response("rate_limited").is_retryable());
        assert!(NotionErrorCode::from_http_status(502).is_retryable());
        assert!(!NotionErrorCode::from_api_response("validation_error").is_retryable());
        assert_eq!(
            NotionErrorCode::from_api_response("something_new"),
            NotionErrorCode::Unknown("something_new".to_string())
        );
    }

    #[test]
    fn nested_duplication_failures_are_flattened() {
        let inner = AppError::DuplicationIncomplete {
            failures: vec![SubtreeFailure {
                source_id: "grandchild".to_string(),
                error: AppError::remote(StoreOperation::AppendChildren, "x", None, "boom"),
            }],
        };

        let mut failures = Vec::new();
        inner.collect_into("child", &mut failures);
        AppError::MalformedRecord("bad".to_string()).collect_into("sibling", &mut failures);

        let ids: Vec<_> = failures.iter().map(|f| f.source_id.as_str()).collect();
        assert_eq!(ids, vec!["grandchild", "sibling"]);
    }

    #[test]
    fn type_mismatch_names_expected_kind() {
        let err = AppError::TypeMismatch {
            tag: "number".to_string(),
            expected: "an integer or float",
            found: "a string",
        };
        assert_eq!(
            err.to_string(),
            "Cannot insert a string into 'number' property: expected an integer or float"
        );
    }
}
