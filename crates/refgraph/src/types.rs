//! Forge payload types shared between the domain and infrastructure crates.
//!
//! These are the typed views of forge responses that the crawl consumes. They
//! deserialise directly from GitHub REST/GraphQL JSON; unknown fields are
//! ignored so payload growth on the forge side never breaks decoding.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::RepositoryRef;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

/// Whether a forge call may be answered from the on-disk cache.
///
/// [`CachePolicy::Bypass`] forces a fresh fetch; the fresh result is still
/// written back so later calls see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Serve from cache when a fresh entry exists.
    #[default]
    Use,
    /// Skip the cache read and always fetch.
    Bypass,
}

impl CachePolicy {
    /// Maps a `use_cache` flag to a policy.
    pub fn from_flag(use_cache: bool) -> Self {
        if use_cache {
            CachePolicy::Use
        } else {
            CachePolicy::Bypass
        }
    }

    /// Returns `true` if cached entries may be served.
    pub fn reads_cache(self) -> bool {
        matches!(self, CachePolicy::Use)
    }
}

// ---------------------------------------------------------------------------
// Pull requests and issues
// ---------------------------------------------------------------------------

/// A pull request as returned by `GET /repos/{owner}/{repo}/pulls/{number}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub merged_at: Option<Timestamp>,
    #[serde(default)]
    pub closed_at: Option<Timestamp>,
}

/// An issue as returned by `GET /repos/{owner}/{repo}/issues/{number}`.
///
/// The forge treats every pull request as an issue too; the
/// [`Issue::pull_request`] marker is present only for pull requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub closed_at: Option<Timestamp>,
    /// Pull-request marker object; `Some` only when the number is a PR.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    /// Returns `true` if this issue payload describes a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Which comment listing a [`Comment`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    /// Conversation comment (`/issues/{n}/comments`).
    #[default]
    Issue,
    /// Inline review comment (`/pulls/{n}/comments`).
    Review,
}

/// Author of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub login: String,
}

/// A single comment on a pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    /// Set by the client after decoding; absent from forge payloads.
    #[serde(default)]
    pub kind: CommentKind,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub user: Option<CommentAuthor>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Every comment attached to one pull request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrComments {
    pub issue_comments: Vec<Comment>,
    pub review_comments: Vec<Comment>,
    /// Union of both kinds, ascending by creation time. Equal timestamps keep
    /// source order: issue comments first, then review comments, each in the
    /// order the forge returned them.
    pub all: Vec<Comment>,
}

impl PrComments {
    /// Combines the two comment listings and derives [`PrComments::all`].
    pub fn merge(issue_comments: Vec<Comment>, review_comments: Vec<Comment>) -> Self {
        let mut all: Vec<Comment> = issue_comments
            .iter()
            .chain(review_comments.iter())
            .cloned()
            .collect();
        // Stable sort keeps source order for equal timestamps.
        all.sort_by_key(|c| c.created_at);
        Self {
            issue_comments,
            review_comments,
            all,
        }
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// The repository a timeline subject lives in, as GraphQL reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRepository {
    #[serde(rename = "nameWithOwner")]
    pub name_with_owner: String,
}

impl SubjectRepository {
    /// Returns `true` if this is `repo`. GitHub slugs compare case-insensitively.
    pub fn is(&self, repo: &RepositoryRef) -> bool {
        match self.name_with_owner.split_once('/') {
            Some((owner, name)) => {
                owner.eq_ignore_ascii_case(repo.owner.as_str())
                    && name.eq_ignore_ascii_case(repo.name.as_str())
            }
            None => false,
        }
    }
}

/// The item a timeline event points at (closer or cross-reference source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum TimelineSubject {
    PullRequest {
        number: u64,
        /// Absent when the query did not ask for it; treated as the crawled
        /// repository.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repository: Option<SubjectRepository>,
    },
    Issue { number: u64 },
    /// Commits, project cards, and anything else not consumed by the crawl.
    #[serde(other)]
    Other,
}

/// One node of an issue's GraphQL `timelineItems` connection.
///
/// Only the event kinds the crawl consumes are modelled; every other
/// `__typename` decodes to [`TimelineEvent::Other`] instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum TimelineEvent {
    ClosedEvent {
        #[serde(default)]
        closer: Option<TimelineSubject>,
    },
    CrossReferencedEvent {
        #[serde(default)]
        source: Option<TimelineSubject>,
        /// The source lives in another repository; its number is not ours.
        #[serde(default, rename = "isCrossRepository")]
        is_cross_repository: bool,
    },
    #[serde(other)]
    Other,
}

impl TimelineEvent {
    /// The pull request in `repo` that closed the issue, if this is a PR
    /// closing event. Closers from other repositories are ignored.
    pub fn closing_pull_request(&self, repo: &RepositoryRef) -> Option<u64> {
        match self {
            TimelineEvent::ClosedEvent {
                closer: Some(TimelineSubject::PullRequest { number, repository }),
            } if repository.as_ref().map_or(true, |r| r.is(repo)) => Some(*number),
            _ => None,
        }
    }

    /// The same-repository pull request that mentioned the issue, if this is
    /// a PR cross-reference.
    pub fn cross_referencing_pull_request(&self) -> Option<u64> {
        match self {
            TimelineEvent::CrossReferencedEvent {
                source: Some(TimelineSubject::PullRequest { number, .. }),
                is_cross_repository: false,
            } => Some(*number),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Parameters of a merged-pull-request search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergedPrSearch {
    /// Free-text search terms.
    pub query: String,
    /// Inclusive lower bound on the merge date.
    pub merged_after: Option<NaiveDate>,
    /// Inclusive upper bound on the merge date.
    pub merged_before: Option<NaiveDate>,
}

impl MergedPrSearch {
    /// Renders the forge search string scoped to `repo`.
    ///
    /// `repo:<owner>/<name> is:pr is:merged [merged:<range>] <query>`
    pub fn to_search_string(&self, repo: &RepositoryRef) -> String {
        let mut parts = vec![format!("repo:{}", repo), "is:pr".into(), "is:merged".into()];
        match (self.merged_after, self.merged_before) {
            (Some(after), Some(before)) => parts.push(format!("merged:{}..{}", after, before)),
            (Some(after), None) => parts.push(format!("merged:>={}", after)),
            (None, Some(before)) => parts.push(format!("merged:<={}", before)),
            (None, None) => {}
        }
        let query = self.query.trim();
        if !query.is_empty() {
            parts.push(query.to_string());
        }
        parts.join(" ")
    }
}

/// The pull-request sub-object of a search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPullRequestRef {
    #[serde(default)]
    pub merged_at: Option<Timestamp>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub closed_at: Option<Timestamp>,
    #[serde(default)]
    pub pull_request: Option<SearchPullRequestRef>,
}

/// Search hits merged across every page.
///
/// `total_count` and `incomplete_results` come from the first page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedPrSearchResults {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn comment(id: u64, created_at: &str) -> Comment {
        serde_json::from_value(json!({ "id": id, "body": "x", "created_at": created_at }))
            .unwrap()
    }

    #[test]
    fn test_merge_interleaves_by_creation_time() {
        let issue = vec![
            comment(1, "2024-01-01T00:00:00Z"),
            comment(2, "2024-01-03T00:00:00Z"),
        ];
        let mut review = vec![
            comment(10, "2024-01-02T00:00:00Z"),
            comment(11, "2024-01-04T00:00:00Z"),
        ];
        for c in &mut review {
            c.kind = CommentKind::Review;
        }

        let merged = PrComments::merge(issue, review);
        let ids: Vec<u64> = merged.all.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 10, 2, 11]);
        assert_eq!(merged.all[1].kind, CommentKind::Review);
    }

    #[test]
    fn test_merge_keeps_source_order_on_equal_timestamps() {
        let issue = vec![comment(5, "2024-01-01T00:00:00Z")];
        let review = vec![
            comment(3, "2024-01-01T00:00:00Z"),
            comment(4, "2024-01-01T00:00:00Z"),
        ];

        let merged = PrComments::merge(issue, review);
        let ids: Vec<u64> = merged.all.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![5, 3, 4]);
    }

    #[test]
    fn test_timeline_event_decoding() {
        let events: Vec<TimelineEvent> = serde_json::from_value(json!([
            { "__typename": "ClosedEvent", "closer": { "__typename": "PullRequest", "number": 9 } },
            { "__typename": "ClosedEvent", "closer": { "__typename": "Commit", "oid": "abc" } },
            { "__typename": "ClosedEvent", "closer": null },
            { "__typename": "ClosedEvent", "closer": { "__typename": "PullRequest", "number": 900, "repository": { "nameWithOwner": "other/lib" } } },
            { "__typename": "ClosedEvent", "closer": { "__typename": "PullRequest", "number": 10, "repository": { "nameWithOwner": "Octo/Hello" } } },
            { "__typename": "CrossReferencedEvent", "source": { "__typename": "PullRequest", "number": 4 } },
            { "__typename": "CrossReferencedEvent", "source": { "__typename": "Issue", "number": 5 } },
            { "__typename": "CrossReferencedEvent", "isCrossRepository": true, "source": { "__typename": "PullRequest", "number": 6 } },
            { "__typename": "LabeledEvent", "label": { "name": "bug" } }
        ]))
        .unwrap();

        let repo = RepositoryRef::new("octo", "hello").unwrap();
        let closing: Vec<u64> = events
            .iter()
            .filter_map(|e| e.closing_pull_request(&repo))
            .collect();
        let crossing: Vec<u64> = events
            .iter()
            .filter_map(|e| e.cross_referencing_pull_request())
            .collect();
        assert_eq!(closing, vec![9, 10]);
        assert_eq!(crossing, vec![4]);
        assert_eq!(events[8], TimelineEvent::Other);
    }

    #[test]
    fn test_issue_pull_request_marker() {
        let issue: Issue = serde_json::from_value(json!({ "number": 1 })).unwrap();
        let pr: Issue =
            serde_json::from_value(json!({ "number": 2, "pull_request": { "url": "u" } })).unwrap();
        assert!(!issue.is_pull_request());
        assert!(pr.is_pull_request());
    }

    #[test]
    fn test_search_string_ranges() {
        let repo = RepositoryRef::new("octo", "hello").unwrap();
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();

        let both = MergedPrSearch {
            query: "cache ttl".into(),
            merged_after: Some(date("2024-01-01")),
            merged_before: Some(date("2024-02-01")),
        };
        assert_eq!(
            both.to_search_string(&repo),
            "repo:octo/hello is:pr is:merged merged:2024-01-01..2024-02-01 cache ttl"
        );

        let after_only = MergedPrSearch {
            query: String::new(),
            merged_after: Some(date("2024-01-01")),
            merged_before: None,
        };
        assert_eq!(
            after_only.to_search_string(&repo),
            "repo:octo/hello is:pr is:merged merged:>=2024-01-01"
        );
    }
}
