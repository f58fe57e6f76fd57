//! Single-retry rate-limit handling around any [`Transport`].
//!
//! A rate-limited response (see [`RawHttpResponse::is_rate_limited`]) is
//! retried exactly once after the wait the forge asked for, clamped to a
//! configured maximum. Whatever the retry returns is handed back unchanged,
//! even if it is rate-limited again. Responses without a usable wait hint
//! are returned as they are.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use refgraph::RetryPolicy;
use tracing::warn;

use crate::{ApiRequest, Clock, RawHttpResponse, Transport, TransportError};

/// Derives the retry decision for a rate-limited response.
///
/// `retry-after` wins, as seconds or an HTTP date. Otherwise
/// `x-ratelimit-reset` (epoch seconds) is used. Times already in the past
/// yield a zero wait.
pub fn retry_policy(response: &RawHttpResponse, now: SystemTime) -> RetryPolicy {
    if let Some(value) = response.header("retry-after") {
        if let Some(after) = parse_retry_after(value.trim(), now) {
            return RetryPolicy::Retryable { after };
        }
    }

    if let Some(reset) = response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        return RetryPolicy::Retryable {
            after: Duration::from_secs(reset.saturating_sub(now_secs)),
        };
    }

    RetryPolicy::NonRetryable
}

fn parse_retry_after(value: &str, now: SystemTime) -> Option<Duration> {
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let now = DateTime::<Utc>::from(now);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Wraps a transport with the single-retry rate-limit policy.
pub struct Backoff<T> {
    inner: T,
    clock: Arc<dyn Clock>,
    max_wait: Duration,
}

impl<T: Transport> Backoff<T> {
    /// Wraps `inner`; waits come from `clock` and never exceed `max_wait`.
    pub fn new(inner: T, clock: Arc<dyn Clock>, max_wait: Duration) -> Self {
        Self {
            inner,
            clock,
            max_wait,
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for Backoff<T> {
    async fn execute(&self, request: &ApiRequest) -> Result<RawHttpResponse, TransportError> {
        let first = self.inner.execute(request).await?;
        if !first.is_rate_limited() {
            return Ok(first);
        }

        match retry_policy(&first, self.clock.now()) {
            RetryPolicy::NonRetryable => {
                warn!(
                    endpoint = %request.endpoint,
                    status = ?first.status,
                    "rate limited without a wait hint; not retrying"
                );
                Ok(first)
            }
            RetryPolicy::Retryable { after } => {
                let wait = after.min(self.max_wait);
                warn!(
                    endpoint = %request.endpoint,
                    requested = ?after,
                    wait = ?wait,
                    "rate limited; retrying once"
                );
                self.clock.sleep(wait).await;
                self.inner.execute(request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn limited() -> RawHttpResponse {
        RawHttpResponse::new(429, Value::Null)
    }

    #[test]
    fn test_retry_after_seconds() {
        let resp = limited().with_header("Retry-After", "30");
        assert_eq!(
            retry_policy(&resp, at(0)),
            RetryPolicy::Retryable {
                after: Duration::from_secs(30)
            }
        );
    }

    #[test]
    fn test_retry_after_http_date() {
        // 2015-10-21T07:28:00Z is epoch 1445412480.
        let resp = limited().with_header("retry-after", "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(
            retry_policy(&resp, at(1_445_412_480 - 12)),
            RetryPolicy::Retryable {
                after: Duration::from_secs(12)
            }
        );
        assert_eq!(
            retry_policy(&resp, at(1_445_412_480 + 100)),
            RetryPolicy::Retryable {
                after: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_reset_header() {
        let resp = limited().with_header("x-ratelimit-reset", "1000");
        assert_eq!(
            retry_policy(&resp, at(990)),
            RetryPolicy::Retryable {
                after: Duration::from_secs(10)
            }
        );
        assert_eq!(
            retry_policy(&resp, at(2000)),
            RetryPolicy::Retryable {
                after: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_retry_after_takes_precedence_over_reset() {
        let resp = limited()
            .with_header("retry-after", "5")
            .with_header("x-ratelimit-reset", "9999");
        assert_eq!(
            retry_policy(&resp, at(0)),
            RetryPolicy::Retryable {
                after: Duration::from_secs(5)
            }
        );
    }

    #[test]
    fn test_unusable_headers_are_non_retryable() {
        assert_eq!(retry_policy(&limited(), at(0)), RetryPolicy::NonRetryable);
        let garbage = limited()
            .with_header("retry-after", "soon")
            .with_header("x-ratelimit-reset", "later");
        assert_eq!(retry_policy(&garbage, at(0)), RetryPolicy::NonRetryable);
    }
}
