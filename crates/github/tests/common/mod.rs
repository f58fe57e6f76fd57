#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use github::{Backoff, Clock, FileCache, GithubClient, RawHttpResponse, ReplayTransport};
use refgraph::RepositoryRef;
use serde_json::{json, Value};

/// A clock that never really sleeps and remembers every requested sleep.
#[derive(Debug)]
pub struct RecordingClock {
    now: Mutex<SystemTime>,
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn at(now: SystemTime) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn at_epoch_secs(secs: u64) -> Arc<Self> {
        Self::at(UNIX_EPOCH + Duration::from_secs(secs))
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn repo() -> RepositoryRef {
    RepositoryRef::new("octo", "hello").unwrap()
}

pub fn ok(body: Value) -> RawHttpResponse {
    RawHttpResponse::new(200, body)
}

pub fn comment(id: u64, created_at: &str, body: &str) -> Value {
    json!({
        "id": id,
        "body": body,
        "created_at": created_at,
        "user": { "login": "someone" }
    })
}

/// Client over `replay` with backoff, the given clock and no cache.
pub fn client(replay: &ReplayTransport, clock: Arc<RecordingClock>) -> GithubClient {
    GithubClient::new(
        repo(),
        Backoff::new(replay.clone(), clock.clone(), Duration::from_secs(60)),
    )
    .with_clock(clock)
}

/// Client over `replay` with a file cache in `dir`.
pub fn cached_client(
    replay: &ReplayTransport,
    clock: Arc<RecordingClock>,
    dir: &std::path::Path,
) -> GithubClient {
    client(replay, clock).with_cache(FileCache::new(dir, Duration::from_secs(3600)))
}
