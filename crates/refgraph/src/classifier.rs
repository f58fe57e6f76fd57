//! Issue-vs-pull-request classification of referenced numbers.
//!
//! A bare `#N` says nothing about what `N` is. The forge's issue endpoint
//! answers for both kinds, and marks pull requests with a `pull_request`
//! object, so one `get_issue` call per number settles it. Results are
//! memoised for the lifetime of one [`Classifier`], which the crawl creates
//! fresh per build.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{CachePolicy, CallCounts, Forge, Issue};

/// What a referenced number turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberKind {
    Issue,
    PullRequest,
    /// The lookup failed; the number is not expanded but the crawl continues.
    Unknown,
}

#[derive(Debug, Clone)]
struct Classified {
    kind: NumberKind,
    payload: Option<Issue>,
}

/// Memoising classifier scoped to one crawl.
#[derive(Debug, Default)]
pub struct Classifier {
    memo: HashMap<u64, Classified>,
}

impl Classifier {
    /// Creates an empty classifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `number`, fetching its issue payload on first sight.
    ///
    /// Fetch failures are logged and classify as [`NumberKind::Unknown`];
    /// they never fail the caller. Each actual fetch increments
    /// `calls.get_issue`.
    pub async fn classify(
        &mut self,
        forge: &dyn Forge,
        number: u64,
        cache: CachePolicy,
        calls: &mut CallCounts,
    ) -> NumberKind {
        if let Some(hit) = self.memo.get(&number) {
            return hit.kind;
        }

        calls.get_issue += 1;
        let classified = match forge.get_issue(number, cache).await {
            Ok(issue) => {
                let kind = if issue.is_pull_request() {
                    NumberKind::PullRequest
                } else {
                    NumberKind::Issue
                };
                debug!(number, ?kind, "classified reference");
                Classified {
                    kind,
                    payload: Some(issue),
                }
            }
            Err(e) => {
                warn!(number, error = %e, "classification failed; number will not be expanded");
                Classified {
                    kind: NumberKind::Unknown,
                    payload: None,
                }
            }
        };

        let kind = classified.kind;
        self.memo.insert(number, classified);
        kind
    }

    /// The issue payload fetched while classifying `number`, if any.
    pub fn payload(&self, number: u64) -> Option<&Issue> {
        self.memo.get(&number).and_then(|c| c.payload.as_ref())
    }
}
