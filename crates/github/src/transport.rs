//! The [`Transport`] seam and its `gh` CLI implementation.
//!
//! A transport executes exactly one API request and returns the raw
//! response. It knows nothing about pagination, caching or rate limits;
//! [`crate::Backoff`] and [`crate::GithubClient`] layer those on top.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{parse_raw_response, RawHttpResponse, TransportError};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// The method name as `gh --method` expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request parameter.
///
/// `Raw` values are always sent as strings (`gh api -f`); `Typed` values are
/// converted by the CLI, so `5` becomes a number (`gh api -F`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiField {
    Raw { name: String, value: String },
    Typed { name: String, value: String },
}

impl ApiField {
    fn name(&self) -> &str {
        match self {
            ApiField::Raw { name, .. } | ApiField::Typed { name, .. } => name,
        }
    }

    fn value(&self) -> &str {
        match self {
            ApiField::Raw { value, .. } | ApiField::Typed { value, .. } => value,
        }
    }
}

/// One API call: method, endpoint (path or absolute URL), headers and fields.
///
/// For `GET` the fields become query parameters; for `POST` they form the
/// JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API root, or an absolute `next` URL.
    pub endpoint: String,
    /// Extra request headers, in order.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Query parameters or GraphQL variables.
    #[serde(default)]
    pub fields: Vec<ApiField>,
}

impl ApiRequest {
    /// A `GET` of `endpoint` with no headers or fields.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            endpoint: endpoint.into(),
            headers: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// A `POST` to the GraphQL endpoint.
    pub fn graphql() -> Self {
        Self {
            method: Method::Post,
            endpoint: "graphql".to_string(),
            headers: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Adds a request header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Adds a string field (`gh -f`).
    pub fn raw_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push(ApiField::Raw {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    /// Adds a field that `gh -F` converts to a number, boolean or null when it
    /// looks like one.
    pub fn typed_field(mut self, name: &str, value: impl ToString) -> Self {
        self.fields.push(ApiField::Typed {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// The request for a follow-up page at `endpoint`.
    ///
    /// Headers carry over; fields do not, since a `next` link already
    /// encodes the query.
    pub fn next_page(&self, endpoint: impl Into<String>) -> Self {
        Self {
            method: self.method,
            endpoint: endpoint.into(),
            headers: self.headers.clone(),
            fields: Vec::new(),
        }
    }

    /// Fields as a JSON object, for cache keys.
    pub fn params(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name().to_string(), Value::String(f.value().to_string())))
            .collect();
        Value::Object(map)
    }

    /// Command-line arguments for `gh`.
    pub fn to_gh_args(&self) -> Vec<String> {
        let mut args = vec![
            "api".to_string(),
            "--include".to_string(),
            "--method".to_string(),
            self.method.as_str().to_string(),
            self.endpoint.clone(),
        ];
        for (name, value) in &self.headers {
            args.push("-H".to_string());
            args.push(format!("{name}: {value}"));
        }
        for field in &self.fields {
            let flag = match field {
                ApiField::Raw { .. } => "-f",
                ApiField::Typed { .. } => "-F",
            };
            args.push(flag.to_string());
            args.push(format!("{}={}", field.name(), field.value()));
        }
        args
    }
}

// ---------------------------------------------------------------------------
// Transport port
// ---------------------------------------------------------------------------

/// Executes single API requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs `request` once.
    ///
    /// HTTP error statuses are returned as responses, not errors; only
    /// failures to obtain a response at all are `Err`.
    async fn execute(&self, request: &ApiRequest) -> Result<RawHttpResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// gh CLI
// ---------------------------------------------------------------------------

/// Runs `gh api --include` as a subprocess.
///
/// The CLI supplies authentication and host selection. Output is captured
/// with a byte ceiling on each stream, and the process is killed when the
/// timeout or the ceiling is hit.
#[derive(Debug, Clone)]
pub struct GhCliTransport {
    program: String,
    timeout: Duration,
    max_output_bytes: usize,
}

impl GhCliTransport {
    /// Runs `program` with a wall-clock `timeout` and a per-stream output
    /// ceiling of `max_output_bytes`.
    pub fn new(program: impl Into<String>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            program: program.into(),
            timeout,
            max_output_bytes,
        }
    }
}

#[async_trait]
impl Transport for GhCliTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawHttpResponse, TransportError> {
        debug!(
            program = %self.program,
            method = %request.method,
            endpoint = %request.endpoint,
            "running transport"
        );

        let mut child = Command::new(&self.program)
            .args(request.to_gh_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            return Err(TransportError::Io(std::io::Error::other(
                "child output was not captured",
            )));
        };

        let limit = self.max_output_bytes;
        let run = async {
            let (out, err) = tokio::try_join!(
                read_capped(&mut stdout, limit),
                read_capped(&mut stderr, limit)
            )?;
            let status = child.wait().await?;
            Ok::<_, TransportError>((status, out, err))
        };

        let outcome = tokio::time::timeout(self.timeout, run).await;
        let (status, out, err) = match outcome {
            Err(_elapsed) => {
                warn!(endpoint = %request.endpoint, timeout = ?self.timeout, "transport timed out; killing process");
                let _ = child.start_kill();
                return Err(TransportError::Timeout(self.timeout));
            }
            Ok(Err(e)) => {
                let _ = child.start_kill();
                return Err(e);
            }
            Ok(Ok(captured)) => captured,
        };

        if !status.success() && out.iter().all(u8::is_ascii_whitespace) {
            return Err(TransportError::ProcessFailure {
                code: status.code(),
                stderr: String::from_utf8_lossy(&err).trim().to_string(),
            });
        }

        parse_raw_response(&out)
    }
}

/// Reads `reader` to the end, failing once more than `limit` bytes arrive.
async fn read_capped<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(captured);
        }
        if captured.len() + n > limit {
            return Err(TransportError::OutputOverflow { limit });
        }
        captured.extend_from_slice(&chunk[..n]);
    }
}
