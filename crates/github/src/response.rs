//! Raw HTTP responses as printed by `gh api --include`.
//!
//! The CLI writes the status line, the response headers, a blank line and
//! then the body. [`parse_raw_response`] turns that text back into a
//! [`RawHttpResponse`]; nothing else in the crate looks at raw bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TransportError;

/// One HTTP response: status, headers and decoded JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHttpResponse {
    /// `None` when no status line could be parsed.
    pub status: Option<u16>,
    /// Header names are lower-cased; repeated headers are joined with `", "`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// `Null` for an empty body; a string for a non-JSON error body.
    #[serde(default)]
    pub body: Value,
}

impl RawHttpResponse {
    /// A response with the given status and body and no headers.
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status: Some(status),
            headers: BTreeMap::new(),
            body,
        }
    }

    /// Adds a header, lower-casing its name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Status 429, or 403 with `x-ratelimit-remaining: 0`.
    pub fn is_rate_limited(&self) -> bool {
        match self.status {
            Some(429) => true,
            Some(403) => self
                .header("x-ratelimit-remaining")
                .is_some_and(|v| v.trim() == "0"),
            _ => false,
        }
    }

    pub(crate) fn normalize_headers(&mut self) {
        let headers = std::mem::take(&mut self.headers);
        self.headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
    }
}

/// Parses the stdout of `gh api --include`.
///
/// The head and body are split at the first blank line (LF or CRLF). A
/// status line that does not start with `HTTP/` leaves `status` as `None`.
/// An empty body decodes to `Null`. A body that is not JSON is kept as a
/// string on error statuses (`>= 400`), such as an HTML gateway page, and is
/// an error otherwise.
pub fn parse_raw_response(stdout: &[u8]) -> Result<RawHttpResponse, TransportError> {
    let text = String::from_utf8_lossy(stdout);
    let (head, body) = split_head(&text);

    let mut lines = head.lines();
    let status = lines.next().and_then(parse_status_line);

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        headers
            .entry(name)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    let body = body.trim();
    let body = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) if status.is_some_and(|s| s >= 400) => Value::String(body.to_string()),
            Err(e) => return Err(TransportError::MalformedBody(e)),
        }
    };

    Ok(RawHttpResponse {
        status,
        headers,
        body,
    })
}

fn split_head(text: &str) -> (&str, &str) {
    let lf = text.find("\n\n").map(|i| (i, 2));
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let boundary = match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match boundary {
        Some((at, len)) => (&text[..at], &text[at + len..]),
        None => (text, ""),
    }
}

fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let protocol = parts.next()?;
    if !protocol.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}
