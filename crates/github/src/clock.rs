//! Injectable time source.
//!
//! Cache freshness and rate-limit waits both depend on "now"; routing them
//! through [`Clock`] lets tests drive them without real sleeping.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;

/// Source of the current time and of sleeps.
#[async_trait]
pub trait Clock: Send + Sync {
    /// The current wall-clock time.
    fn now(&self) -> SystemTime;

    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
