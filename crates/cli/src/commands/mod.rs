//! Subcommand implementations.

pub mod graph;
pub mod search;

use std::sync::Arc;

use anyhow::{Context, Result};
use github::{Backoff, GithubClient, ReplayTransport, SystemClock};
use refgraph::RepositoryRef;
use serde::Serialize;

use crate::config::SupersedeConfig;
use crate::GlobalOptions;

/// Loads configuration and applies the global flag overrides.
pub fn load_config(global: &GlobalOptions) -> Result<SupersedeConfig> {
    let mut config = SupersedeConfig::load(global.config.as_deref())?;
    config.apply_overrides(global.no_cache, global.cache_dir.clone());
    Ok(config)
}

/// Builds the forge client: `gh` with cache by default, or a replayed
/// fixture file with `--replay`.
pub fn create_client(
    global: &GlobalOptions,
    config: &SupersedeConfig,
    repo: RepositoryRef,
) -> Result<GithubClient> {
    match &global.replay {
        Some(path) => {
            let replay = ReplayTransport::from_file(path)
                .with_context(|| format!("failed to load replay fixture {}", path.display()))?;
            tracing::info!(fixture = %path.display(), "replaying recorded responses");
            Ok(GithubClient::new(
                repo,
                Backoff::new(replay, Arc::new(SystemClock), config.client.max_backoff()),
            ))
        }
        None => Ok(GithubClient::from_config(repo, &config.client)),
    }
}

/// Writes `value` to stdout as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}
