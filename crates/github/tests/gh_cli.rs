#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, SystemTime};

use common::{repo, RecordingClock};
use github::{Backoff, GhCliTransport, GithubClient};
use pretty_assertions::assert_eq;
use refgraph::{CachePolicy, Forge, ForgeError};

/// Writes an executable `sh` script standing in for `gh`.
fn fake_gh(dir: &Path, script: &str) -> String {
    let path = dir.join("gh");
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn gh_client(program: String, clock: std::sync::Arc<RecordingClock>) -> GithubClient {
    let transport = GhCliTransport::new(program, Duration::from_secs(10), 1024 * 1024);
    GithubClient::new(
        repo(),
        Backoff::new(transport, clock.clone(), Duration::from_secs(60)),
    )
    .with_clock(clock)
}

#[tokio::test]
async fn test_html_gateway_error_reports_http_status() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_gh(
        dir.path(),
        "printf 'HTTP/2.0 502 Bad Gateway\\nContent-Type: text/html\\n\\n<html>unicorn</html>\\n'\n\
         exit 1",
    );
    let client = gh_client(program, RecordingClock::at(SystemTime::now()));

    let err = client.get_pull_request(1, CachePolicy::Use).await.unwrap_err();

    assert!(matches!(err, ForgeError::HttpStatus { status: 502, .. }), "{err}");
    assert_eq!(err.to_string(), "getPR repos/octo/hello/pulls/1: HTTP 502");
}

#[tokio::test]
async fn test_plain_text_rate_limit_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("limited");
    let script = r#"if [ -f MARKER ]; then
  printf 'HTTP/2.0 200 OK\nContent-Type: application/json\n\n{"number": 1, "title": "Retry budget"}\n'
else
  touch MARKER
  printf 'HTTP/2.0 429 Too Many Requests\nRetry-After: 5\nContent-Type: text/plain\n\nslow down\n'
  exit 1
fi"#
        .replace("MARKER", &marker.to_string_lossy());
    let program = fake_gh(dir.path(), &script);
    let clock = RecordingClock::at(SystemTime::now());
    let client = gh_client(program, clock.clone());

    let pr = client.get_pull_request(1, CachePolicy::Use).await.unwrap();

    assert_eq!(pr.number, 1);
    assert_eq!(pr.title.as_deref(), Some("Retry budget"));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
}
