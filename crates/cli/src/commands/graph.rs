//! `supersede graph`: build the reference graph around a pull request.

use anyhow::{Context, Result};
use clap::Args;
use refgraph::{GraphBuilder, RepositoryRef};

use super::{create_client, load_config, print_json};
use crate::GlobalOptions;

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Repository as `owner/name`
    repo: RepositoryRef,

    /// Pull request number to start from
    number: u64,
}

pub async fn execute(args: GraphArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let client = create_client(&global, &config, args.repo.clone())?;

    let graph = GraphBuilder::new(&client, config.budgets)
        .with_cache_policy(config.client.cache_policy())
        .build(args.number)
        .await
        .with_context(|| format!("failed to build graph for {}#{}", args.repo, args.number))?;

    print_json(&graph)
}
