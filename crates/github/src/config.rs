//! Client configuration.
//!
//! Deserialized from the `[client]` table of the CLI's TOML file; every field
//! has a default so an empty table is valid.

use std::path::PathBuf;
use std::time::Duration;

use refgraph::CachePolicy;
use serde::{Deserialize, Serialize};

/// Settings for [`crate::GithubClient::from_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Transport program; must behave like `gh api --include`.
    pub program: String,
    /// Directory for cache entry files.
    pub cache_dir: PathBuf,
    /// Age after which a cache entry is stale.
    pub cache_ttl_secs: u64,
    /// `false` bypasses cache reads. Writes still happen.
    pub use_cache: bool,
    /// Upper bound on a single rate-limit wait.
    pub max_backoff_secs: u64,
    /// Wall-clock limit per transport invocation.
    pub timeout_secs: u64,
    /// Limit on captured stdout and stderr, each.
    pub max_output_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program: "gh".to_string(),
            cache_dir: PathBuf::from(".supersede/cache"),
            cache_ttl_secs: 3600,
            use_cache: true,
            max_backoff_secs: 60,
            timeout_secs: 120,
            max_output_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    /// [`Self::cache_ttl_secs`] as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// [`Self::max_backoff_secs`] as a [`Duration`].
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    /// [`Self::timeout_secs`] as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The cache policy implied by [`Self::use_cache`].
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::from_flag(self.use_cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ClientConfig =
            serde_json::from_value(serde_json::json!({ "cache_ttl_secs": 10, "use_cache": false }))
                .unwrap();

        assert_eq!(config.cache_ttl(), Duration::from_secs(10));
        assert_eq!(config.cache_policy(), CachePolicy::Bypass);
        assert_eq!(config.program, "gh");
        assert_eq!(config.max_backoff(), Duration::from_secs(60));
        assert_eq!(config.timeout(), Duration::from_secs(120));
    }
}
