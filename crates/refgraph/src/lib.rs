//! Reference-graph domain for Supersede.
//!
//! Supersede decides whether an open pull request has been made redundant by
//! later work. This crate reconstructs the evidence for that decision: a
//! bounded graph of the issues and pull requests around the PR, linked by
//! text references and "closed by" / "cross-referenced by" timeline events.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines the [`Forge`] port; infrastructure crates (e.g. `github`)
//! implement it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `RepositoryRef`, `NodeKey`, `NodeKind`, `CrawlRunId` |
//! | [`types`] | Forge payloads (`PullRequest`, `Issue`, `Comment`, `TimelineEvent`, search) |
//! | [`errors`] | `ForgeError`, `GraphError`, `RetryPolicy` |
//! | [`forge`] | The [`Forge`] port trait |
//! | [`references`] | Same-repository reference extraction from text |
//! | [`classifier`] | Memoised issue-vs-PR classification |
//! | [`graph`] | `ReferenceGraph`, nodes, edges, budgets, stats |
//! | [`builder`] | The budgeted two-layer crawl |

pub mod builder;
pub mod classifier;
pub mod errors;
pub mod forge;
pub mod graph;
pub mod identifiers;
pub mod references;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use builder::GraphBuilder;
pub use classifier::{Classifier, NumberKind};
pub use errors::{ForgeError, GraphError, RetryPolicy};
pub use forge::Forge;
pub use graph::{
    Budgets, CallCounts, CrawlStats, EdgeType, GraphEdge, GraphNode, NodeMetadata,
    ReferenceGraph, Truncation,
};
pub use identifiers::{
    CrawlRunId, InvalidRepository, NodeKey, NodeKind, RepositoryName, RepositoryOwner,
    RepositoryRef,
};
pub use references::{extract_from_pull_request, extract_referenced_numbers};
pub use types::{
    CachePolicy, Comment, CommentAuthor, CommentKind, Issue, MergedPrSearch,
    MergedPrSearchResults, PrComments, PullRequest, SearchItem, SearchPullRequestRef,
    SubjectRepository, TimelineEvent, TimelineSubject, Timestamp,
};
