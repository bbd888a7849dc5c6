//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! Two layers live here:
//!
//! - **AttemptFailure**: the closed taxonomy of what can go wrong during a
//!   single outbound generation attempt. These never escape the dispatcher as
//!   errors; they are folded into a `GenerationOutcome`.
//! - **RelayError**: application errors (config, IO, storage) propagated with
//!   `?` through the rest of the crate.

use thiserror::Error;

use crate::constants::dispatch as dispatch_constants;

// =============================================================================
// Attempt Failures
// =============================================================================

/// Transport-level failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// Request did not complete within the per-attempt timeout
    Timeout,
    /// Connection refused, reset, DNS failure and similar
    Connection,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Connection => write!(f, "CONNECTION"),
        }
    }
}

/// Failure of one attempt against one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Provider answered with a non-200 status
    Status { status: u16, detail: String },
    /// Request never produced an HTTP response
    Network {
        kind: NetworkErrorKind,
        detail: String,
    },
    /// Provider answered 200 but the body was unusable
    Malformed { status: u16, detail: String },
    /// Provider answered 200 with an error message in the body
    Reported { detail: String },
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { status, detail } => write!(f, "[HTTP {}] {}", status, detail),
            Self::Network { kind, detail } => write!(f, "[{}] {}", kind, detail),
            Self::Malformed { status, detail } => {
                write!(f, "[MALFORMED {}] {}", status, detail)
            }
            Self::Reported { detail } => write!(f, "[REPORTED] {}", detail),
        }
    }
}

impl AttemptFailure {
    /// Whether the same provider may be tried again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => StatusClassifier::is_retryable(*status),
            Self::Network { .. } => true,
            Self::Malformed { .. } | Self::Reported { .. } => false,
        }
    }

    /// HTTP status carried by the failure, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Malformed { status, .. } => Some(*status),
            Self::Reported { .. } => Some(200),
            Self::Network { .. } => None,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::Status { detail, .. }
            | Self::Network { detail, .. }
            | Self::Malformed { detail, .. }
            | Self::Reported { detail } => detail,
        }
    }
}

// =============================================================================
// Status Classifier
// =============================================================================

/// Routing class of an HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200: hand the body to the extractor
    Success,
    /// Transient: retry the same provider after backoff
    Retryable,
    /// Anything else: give up on this provider
    Fatal,
}

/// Classifies HTTP statuses for retry and fallback decisions
pub struct StatusClassifier;

impl StatusClassifier {
    pub fn classify(status: u16) -> StatusClass {
        match status {
            200 => StatusClass::Success,
            s if Self::is_retryable(s) => StatusClass::Retryable,
            _ => StatusClass::Fatal,
        }
    }

    pub fn is_retryable(status: u16) -> bool {
        dispatch_constants::RETRYABLE_STATUSES.contains(&status)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum RelayError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| RelayError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| RelayError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(StatusClassifier::classify(200), StatusClass::Success);
        for status in [429, 500, 502, 503, 504] {
            assert_eq!(StatusClassifier::classify(status), StatusClass::Retryable);
        }
        for status in [400, 401, 403, 404, 422, 501, 201] {
            assert_eq!(StatusClassifier::classify(status), StatusClass::Fatal);
        }
    }

    #[test]
    fn test_attempt_failure_retryable() {
        let busy = AttemptFailure::Status {
            status: 503,
            detail: "busy".into(),
        };
        assert!(busy.is_retryable());

        let auth = AttemptFailure::Status {
            status: 401,
            detail: "bad key".into(),
        };
        assert!(!auth.is_retryable());

        let timeout = AttemptFailure::Network {
            kind: NetworkErrorKind::Timeout,
            detail: "elapsed".into(),
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.status(), None);

        let reported = AttemptFailure::Reported {
            detail: "nsfw".into(),
        };
        assert!(!reported.is_retryable());
        assert_eq!(reported.status(), Some(200));
    }

    #[test]
    fn test_attempt_failure_display() {
        let err = AttemptFailure::Status {
            status: 502,
            detail: "Bad Gateway".into(),
        };
        assert_eq!(err.to_string(), "[HTTP 502] Bad Gateway");

        let err = AttemptFailure::Network {
            kind: NetworkErrorKind::Connection,
            detail: "refused".into(),
        };
        assert_eq!(err.to_string(), "[CONNECTION] refused");
    }

    #[test]
    fn test_result_ext_context() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk full"));
        let err = res.with_context("Failed to write").unwrap_err();
        assert_eq!(err.to_string(), "Storage error: Failed to write: disk full");
    }
}
