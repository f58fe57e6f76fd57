//! Transport-level failures and their mapping onto [`refgraph::ForgeError`].

use std::path::PathBuf;
use std::time::Duration;

use refgraph::ForgeError;
use thiserror::Error;

/// Errors raised while executing one API request.
///
/// These carry no operation context; the client attaches it with
/// [`TransportError::into_forge_error`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exceeded its wall-clock timeout and was killed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Captured stdout or stderr grew past the configured limit.
    #[error("output exceeded {limit} bytes")]
    OutputOverflow { limit: usize },

    /// The process exited unsuccessfully without writing a response.
    #[error("exited with status {code:?} and no output: {stderr}")]
    ProcessFailure { code: Option<i32>, stderr: String },

    /// A success response carried a body that is not JSON.
    #[error("response body is not JSON: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// A replay transport has no canned response left for the request.
    #[error("no recorded response for {method} {endpoint}")]
    NoRecordedResponse { method: String, endpoint: String },

    /// A replay fixture file could not be loaded.
    #[error("cannot load fixture {}: {message}", .path.display())]
    Fixture { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Attaches the failing operation and endpoint.
    pub fn into_forge_error(self, operation: &str, endpoint: &str) -> ForgeError {
        let operation = operation.to_string();
        let endpoint = endpoint.to_string();
        match self {
            TransportError::Timeout(timeout) => ForgeError::TransportTimeout {
                operation,
                endpoint,
                timeout,
            },
            TransportError::MalformedBody(e) => ForgeError::Decode {
                operation,
                endpoint,
                message: e.to_string(),
            },
            other => ForgeError::TransportProcess {
                operation,
                endpoint,
                message: other.to_string(),
            },
        }
    }
}
