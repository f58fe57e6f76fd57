//! `supersede search`: merged pull requests matching a query.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use refgraph::{Forge, MergedPrSearch, RepositoryRef};

use super::{create_client, load_config, print_json};
use crate::GlobalOptions;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Repository as `owner/name`
    repo: RepositoryRef,

    /// Free-text search terms
    #[arg(long, short = 'q', default_value = "")]
    query: String,

    /// Only PRs merged on or after this date (YYYY-MM-DD)
    #[arg(long)]
    merged_after: Option<NaiveDate>,

    /// Only PRs merged on or before this date (YYYY-MM-DD)
    #[arg(long)]
    merged_before: Option<NaiveDate>,
}

pub async fn execute(args: SearchArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let client = create_client(&global, &config, args.repo.clone())?;

    let search = MergedPrSearch {
        query: args.query,
        merged_after: args.merged_after,
        merged_before: args.merged_before,
    };
    let results = client
        .search_merged_prs(&search, config.client.cache_policy())
        .await
        .with_context(|| format!("search in {} failed", args.repo))?;

    print_json(&results)
}
