//! Supersede CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse flags and configuration**: global options plus an optional TOML
//!    file (`--config` / `SUPERSEDE_CONFIG`).
//! 2. **Wire observability**: `tracing-subscriber` on stderr, human-readable or
//!    JSON, with optional OTLP span export.
//! 3. **Construct infrastructure**: a [`github::GithubClient`] over the `gh`
//!    CLI, or over a recorded fixture with `--replay`.
//! 4. **Run the subcommand** and print its JSON result on stdout.
//!
//! # Usage
//!
//! ```bash
//! supersede graph octo/hello 1234
//! supersede search octo/hello --query "retry budget" --merged-after 2024-01-01
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;
mod config;
mod telemetry;

/// Reconstruct the issue/PR reference graph around a pull request
#[derive(Parser, Debug)]
#[command(name = "supersede")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, env = "SUPERSEDE_CONFIG")]
    config: Option<PathBuf>,

    /// Always fetch fresh data (results are still written to the cache)
    #[arg(long, global = true)]
    no_cache: bool,

    /// Cache directory, overriding the configuration file
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Serve responses from a recorded fixture file instead of calling gh
    #[arg(long, global = true)]
    replay: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Export spans over OTLP (also enabled by OTEL_EXPORTER_OTLP_ENDPOINT)
    #[arg(long, global = true)]
    otlp: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the reference graph around a pull request
    Graph(commands::graph::GraphArgs),

    /// Search merged pull requests
    Search(commands::search::SearchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init(
        cli.global.log_json,
        telemetry::otlp_requested(cli.global.otlp),
    )?;

    let result = match cli.command {
        Commands::Graph(args) => commands::graph::execute(args, cli.global).await,
        Commands::Search(args) => commands::search::execute(args, cli.global).await,
    };

    telemetry.shutdown();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_graph_invocation() {
        let cli = Cli::try_parse_from([
            "supersede",
            "graph",
            "octo/hello",
            "42",
            "--no-cache",
            "--cache-dir",
            "/tmp/c",
        ])
        .unwrap();

        assert!(cli.global.no_cache);
        assert_eq!(cli.global.cache_dir, Some(PathBuf::from("/tmp/c")));
        assert!(matches!(cli.command, Commands::Graph(_)));
    }

    #[test]
    fn test_rejects_malformed_repository() {
        assert!(Cli::try_parse_from(["supersede", "graph", "octo", "42"]).is_err());
    }

    #[test]
    fn test_parses_search_dates() {
        let cli = Cli::try_parse_from([
            "supersede",
            "search",
            "octo/hello",
            "--query",
            "widgets",
            "--merged-after",
            "2024-01-01",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Search(_)));

        assert!(Cli::try_parse_from([
            "supersede",
            "search",
            "octo/hello",
            "--merged-after",
            "January",
        ])
        .is_err());
    }
}
