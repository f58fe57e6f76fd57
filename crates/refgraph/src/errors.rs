//! Error and retry-policy types for the reference-graph domain.
//!
//! [`ForgeError`] is the error every [`crate::Forge`] operation returns. Each
//! variant names the operation and endpoint that failed so a single message
//! is enough to diagnose a broken crawl. [`GraphError`] wraps it with the
//! crawl step that was running.
//!
//! [`RetryPolicy`] is the rate-limit decision derived from response headers;
//! the transport layer consults it before its single retry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether a rate-limited response is safe to retry and, if so, after what delay.
///
/// - `Retryable`: the forge told us how long to wait (`retry-after` or
///   `x-ratelimit-reset`).
/// - `NonRetryable`: no usable wait hint; the response is returned as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The request may be retried once.
    Retryable {
        /// Delay before the retry, before clamping to the configured maximum.
        after: Duration,
    },
    /// The request must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Forge errors
// ---------------------------------------------------------------------------

/// Errors produced by a [`crate::Forge`] implementation.
///
/// All variants are fatal for the operation that produced them. Rate limiting
/// is recovered inside the transport; a response that is still rate-limited
/// after the retry surfaces here as an ordinary [`ForgeError::HttpStatus`].
#[derive(Debug, Error)]
pub enum ForgeError {
    /// The transport process was killed after exceeding its wall-clock timeout.
    #[error("{operation} {endpoint}: transport timed out after {timeout:?}")]
    TransportTimeout {
        operation: String,
        endpoint: String,
        timeout: Duration,
    },

    /// The transport process could not run or produced no usable output.
    #[error("{operation} {endpoint}: transport failed: {message}")]
    TransportProcess {
        operation: String,
        endpoint: String,
        message: String,
    },

    /// A page of the response carried HTTP status >= 400.
    #[error("{operation} {endpoint}: HTTP {status}")]
    HttpStatus {
        operation: String,
        endpoint: String,
        status: u16,
    },

    /// The response had no parseable HTTP status line.
    #[error("{operation} {endpoint}: response has no HTTP status")]
    MalformedResponse { operation: String, endpoint: String },

    /// The GraphQL response carried a non-empty `errors` array.
    #[error("{operation} {endpoint}: GraphQL errors: {}", .messages.join("; "))]
    GraphQl {
        operation: String,
        endpoint: String,
        messages: Vec<String>,
    },

    /// The response body did not have the expected shape.
    #[error("{operation} {endpoint}: unexpected payload: {message}")]
    Decode {
        operation: String,
        endpoint: String,
        message: String,
    },
}

impl ForgeError {
    /// The operation name carried by every variant.
    pub fn operation(&self) -> &str {
        match self {
            ForgeError::TransportTimeout { operation, .. }
            | ForgeError::TransportProcess { operation, .. }
            | ForgeError::HttpStatus { operation, .. }
            | ForgeError::MalformedResponse { operation, .. }
            | ForgeError::GraphQl { operation, .. }
            | ForgeError::Decode { operation, .. } => operation,
        }
    }
}

// ---------------------------------------------------------------------------
// Crawl errors
// ---------------------------------------------------------------------------

/// Errors that abort a graph build. No partial graph is ever returned.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A required forge fetch failed during the named crawl step.
    #[error("{step} #{number}: {source}")]
    Fetch {
        /// Crawl step that issued the fetch (e.g. `"root pull request"`).
        step: &'static str,
        /// Issue or pull request number being fetched.
        number: u64,
        #[source]
        source: ForgeError,
    },
}
