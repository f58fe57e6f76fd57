//! TOML configuration for the `supersede` binary.
//!
//! ```toml
//! [client]
//! cache_dir = ".supersede/cache"
//! cache_ttl_secs = 3600
//! max_backoff_secs = 60
//!
//! [budgets]
//! max_layer1_references = 25
//! max_closing_prs_per_issue = 5
//! ```
//!
//! Every key is optional. A missing file means defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use github::ClientConfig;
use refgraph::Budgets;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupersedeConfig {
    pub client: ClientConfig,
    pub budgets: Budgets,
}

impl SupersedeConfig {
    /// Loads `path`, or returns defaults when no path is given or the file
    /// does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found; using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Applies command-line overrides on top of the file values.
    pub fn apply_overrides(&mut self, no_cache: bool, cache_dir: Option<PathBuf>) {
        if no_cache {
            self.client.use_cache = false;
        }
        if let Some(dir) = cache_dir {
            self.client.cache_dir = dir;
        }
    }
}
