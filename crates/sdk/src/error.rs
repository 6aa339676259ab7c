//! SDK-specific error types with recovery context.
//!
//! Provides a two-tier error model:
//! - **Transport errors**: Connection failures, timeouts, HTTP status codes, decode failures
//! - **Engine errors**: Failed list/count fetches, failed vote mutations, ledger storage
//!
//! A response superseded by a newer query is not an error; see
//! [`FetchOutcome::Superseded`](crate::FetchOutcome::Superseded).

use std::fmt;

use snafu::{Location, Snafu};
use tracklist_types::RecordId;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Which kind of list fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchPhase {
    /// First page after a query change; the list stays empty.
    Reset,
    /// A "load more" page; accumulated records stay visible.
    Append,
    /// The total-count query.
    Count,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::Append => write!(f, "append"),
            Self::Count => write!(f, "count"),
        }
    }
}

/// SDK error types with context-rich error messages.
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub))]
pub enum SdkError {
    /// Failed to reach the collection endpoint.
    #[snafu(display("Connection error at {location}: {message}"))]
    Connection {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The endpoint answered with a non-success HTTP status.
    #[snafu(display("HTTP error (status={status}): {message}"))]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The response body could not be decoded.
    #[snafu(display("Decode error: {message}"))]
    Decode {
        /// Error description.
        message: String,
    },

    /// Operation timed out.
    #[snafu(display("Operation timed out after {duration_ms}ms"))]
    Timeout {
        /// Timeout duration in milliseconds.
        duration_ms: u64,
    },

    /// Retry attempts exhausted.
    #[snafu(display("Retry exhausted after {attempts} attempts: {last_error}"))]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last error message before giving up.
        last_error: String,
    },

    /// Configuration validation error.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// URL parsing error.
    #[snafu(display("Invalid URL '{url}': {message}"))]
    InvalidUrl {
        /// The invalid URL.
        url: String,
        /// Parse error description.
        message: String,
    },

    /// The vote ledger could not be read or written.
    #[snafu(display("Ledger storage error: {message}"))]
    Storage {
        /// Error description.
        message: String,
    },

    /// A list or count query failed.
    #[snafu(display("Failed to load records ({phase}): {message}"))]
    FetchFailed {
        /// Which fetch failed.
        phase: FetchPhase,
        /// Underlying failure.
        message: String,
    },

    /// A vote patch failed and the optimistic count was rolled back.
    #[snafu(display("Vote on record {record} failed: {message}"))]
    MutationFailed {
        /// Record whose vote was rolled back.
        record: RecordId,
        /// Underlying failure.
        message: String,
    },

    /// Session is shutting down.
    #[snafu(display("Session shutting down"))]
    Shutdown,
}

impl SdkError {
    /// Returns true if the error is transient and the operation should be retried.
    ///
    /// Retryable errors:
    /// - Connection failures and timeouts
    /// - HTTP `408`, `429` and any `5xx`
    ///
    /// Everything else (bad requests, decode failures, configuration, ledger
    /// storage, engine-level failures) is returned immediately.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::Http { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Decode { .. }
            | Self::RetryExhausted { .. }
            | Self::Config { .. }
            | Self::InvalidUrl { .. }
            | Self::Storage { .. }
            | Self::FetchFailed { .. }
            | Self::MutationFailed { .. }
            | Self::Shutdown => false,
        }
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns a short classification label suitable for metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Http { .. } => "http",
            Self::Decode { .. } => "decode",
            Self::Timeout { .. } => "timeout",
            Self::RetryExhausted { .. } => "retry_exhausted",
            Self::Config { .. } => "config",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Storage { .. } => "storage",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::MutationFailed { .. } => "mutation_failed",
            Self::Shutdown => "shutdown",
        }
    }

    /// Wraps this error as a failed fetch of the given phase.
    pub(crate) fn into_fetch_failed(self, phase: FetchPhase) -> Self {
        match self {
            already @ Self::FetchFailed { .. } => already,
            other => Self::FetchFailed { phase, message: other.to_string() },
        }
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout { duration_ms: 0 };
        }
        if let Some(status) = err.status() {
            return Self::Http { status: status.as_u16(), message: err.to_string() };
        }
        if err.is_decode() {
            return Self::Decode { message: err.to_string() };
        }
        Self::Connection { message: err.to_string(), location: Location::default() }
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode { message: err.to_string() }
    }
}
