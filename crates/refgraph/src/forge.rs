//! The forge port: typed read operations against one hosted repository.
//!
//! Infrastructure crates implement [`Forge`] (the `github` crate does so over
//! the `gh` CLI with an on-disk cache). The crawl in [`crate::builder`] only
//! ever talks to this trait, so it can be driven by in-memory fixtures.

use async_trait::async_trait;

use crate::{
    CachePolicy, ForgeError, Issue, MergedPrSearch, MergedPrSearchResults, PrComments,
    PullRequest, RepositoryRef, TimelineEvent,
};

/// Read-only access to issues and pull requests of a single repository.
///
/// Every operation takes a [`CachePolicy`]; implementations without a cache
/// ignore it.
#[async_trait]
pub trait Forge: Send + Sync {
    /// The repository every operation is scoped to.
    fn repository(&self) -> &RepositoryRef;

    /// Fetches a pull request.
    async fn get_pull_request(
        &self,
        number: u64,
        cache: CachePolicy,
    ) -> Result<PullRequest, ForgeError>;

    /// Fetches the issue representation of `number`.
    ///
    /// Pull requests are issues too; see [`Issue::is_pull_request`].
    async fn get_issue(&self, number: u64, cache: CachePolicy) -> Result<Issue, ForgeError>;

    /// Lists conversation and review comments of a pull request.
    async fn list_pr_comments(
        &self,
        number: u64,
        cache: CachePolicy,
    ) -> Result<PrComments, ForgeError>;

    /// Returns the closing and cross-reference timeline events of an issue,
    /// in forge order.
    async fn get_issue_timeline(
        &self,
        number: u64,
        cache: CachePolicy,
    ) -> Result<Vec<TimelineEvent>, ForgeError>;

    /// Searches merged pull requests in the repository.
    async fn search_merged_prs(
        &self,
        search: &MergedPrSearch,
        cache: CachePolicy,
    ) -> Result<MergedPrSearchResults, ForgeError>;
}
