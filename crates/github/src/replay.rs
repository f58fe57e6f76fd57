//! A [`Transport`] that answers from recorded responses.
//!
//! Responses are queued per `(method, endpoint)` and served first-in,
//! first-out. Every request is logged so callers can assert on exactly what
//! was sent. Clones share the same queues and log.
//!
//! Fixture files are JSON arrays of
//! `{ "method": "GET", "endpoint": "...", "response": { "status": 200, "headers": {}, "body": ... } }`.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiRequest, Method, RawHttpResponse, Transport, TransportError};

/// One recorded exchange in a fixture file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedExchange {
    /// Method the response answers.
    pub method: Method,
    /// Endpoint exactly as the client requests it.
    pub endpoint: String,
    /// The response to serve.
    pub response: RawHttpResponse,
}

#[derive(Debug, Default)]
struct ReplayState {
    queues: HashMap<(Method, String), VecDeque<RawHttpResponse>>,
    requests: Vec<ApiRequest>,
}

/// A [`Transport`] answering from queued responses.
///
/// Responses are served first-in first-out per `(method, endpoint)`, and every
/// request is recorded. Clones share the same queues.
#[derive(Debug, Clone, Default)]
pub struct ReplayTransport {
    state: Arc<Mutex<ReplayState>>,
}

impl ReplayTransport {
    /// A transport with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a fixture file.
    pub fn from_file(path: &Path) -> Result<Self, TransportError> {
        let fixture_error = |message: String| TransportError::Fixture {
            path: path.to_path_buf(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
        let exchanges: Vec<RecordedExchange> =
            serde_json::from_str(&text).map_err(|e| fixture_error(e.to_string()))?;

        let replay = Self::new();
        for exchange in exchanges {
            replay.push(exchange.method, &exchange.endpoint, exchange.response);
        }
        Ok(replay)
    }

    /// Queues `response` for the next `method endpoint` request.
    pub fn push(&self, method: Method, endpoint: &str, mut response: RawHttpResponse) -> &Self {
        response.normalize_headers();
        self.state
            .lock()
            .queues
            .entry((method, endpoint.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// Shorthand for queueing a `GET` response.
    pub fn on_get(&self, endpoint: &str, response: RawHttpResponse) -> &Self {
        self.push(Method::Get, endpoint, response)
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests executed so far.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Number of queued responses not yet served.
    pub fn pending(&self) -> usize {
        self.state.lock().queues.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawHttpResponse, TransportError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        let next = state
            .queues
            .get_mut(&(request.method, request.endpoint.clone()))
            .and_then(VecDeque::pop_front);
        debug!(
            method = %request.method,
            endpoint = %request.endpoint,
            hit = next.is_some(),
            "replaying response"
        );
        next.ok_or_else(|| TransportError::NoRecordedResponse {
            method: request.method.to_string(),
            endpoint: request.endpoint.clone(),
        })
    }
}
