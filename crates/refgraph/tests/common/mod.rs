//! In-memory `Forge` fixture shared by the refgraph integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use refgraph::{
    CachePolicy, Comment, Forge, ForgeError, Issue, MergedPrSearch, MergedPrSearchResults,
    PrComments, PullRequest, RepositoryRef, SubjectRepository, TimelineEvent, TimelineSubject,
};
use serde_json::json;

/// Which forge operation a recorded call was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetPr,
    GetIssue,
    ListComments,
    Timeline,
}

/// A forge answering from fixtures and recording every call.
pub struct FixtureForge {
    repo: RepositoryRef,
    prs: HashMap<u64, PullRequest>,
    comments: HashMap<u64, Vec<Comment>>,
    issues: HashMap<u64, Issue>,
    timelines: HashMap<u64, Vec<TimelineEvent>>,
    broken_issues: HashSet<u64>,
    calls: Mutex<Vec<(Op, u64)>>,
}

impl FixtureForge {
    pub fn new() -> Self {
        Self {
            repo: RepositoryRef::new("octo", "hello").unwrap(),
            prs: HashMap::new(),
            comments: HashMap::new(),
            issues: HashMap::new(),
            timelines: HashMap::new(),
            broken_issues: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Registers a pull request whose body is `body`.
    pub fn pr(mut self, number: u64, body: &str) -> Self {
        let pr: PullRequest = serde_json::from_value(json!({
            "number": number,
            "title": format!("PR {}", number),
            "body": body,
            "html_url": format!("https://github.com/octo/hello/pull/{}", number),
            "state": "closed",
            "merged_at": "2024-03-01T00:00:00Z",
        }))
        .unwrap();
        let issue: Issue = serde_json::from_value(json!({
            "number": number,
            "title": format!("PR {}", number),
            "state": "closed",
            "pull_request": { "url": "x" },
        }))
        .unwrap();
        self.prs.insert(number, pr);
        self.issues.insert(number, issue);
        self
    }

    /// Adds a conversation comment to pull request `number`.
    pub fn comment(mut self, number: u64, body: &str) -> Self {
        let entry = self.comments.entry(number).or_default();
        let comment: Comment = serde_json::from_value(json!({
            "id": entry.len() as u64 + 1,
            "body": body,
            "created_at": "2024-03-02T00:00:00Z",
        }))
        .unwrap();
        entry.push(comment);
        self
    }

    /// Registers a plain issue with the given timeline.
    pub fn issue(mut self, number: u64, timeline: Vec<TimelineEvent>) -> Self {
        let issue: Issue = serde_json::from_value(json!({
            "number": number,
            "title": format!("Issue {}", number),
            "state": "open",
        }))
        .unwrap();
        self.issues.insert(number, issue);
        self.timelines.insert(number, timeline);
        self
    }

    /// Registers an issue whose timeline fetch fails.
    pub fn issue_without_timeline(mut self, number: u64) -> Self {
        let issue: Issue =
            serde_json::from_value(json!({ "number": number, "state": "open" })).unwrap();
        self.issues.insert(number, issue);
        self
    }

    /// Makes `get_issue(number)` fail.
    pub fn broken_issue(mut self, number: u64) -> Self {
        self.broken_issues.insert(number);
        self
    }

    pub fn count(&self, op: Op, number: u64) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, n)| *o == op && *n == number)
            .count()
    }

    pub fn total(&self, op: Op) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == op)
            .count()
    }

    fn record(&self, op: Op, number: u64) {
        self.calls.lock().unwrap().push((op, number));
    }

    fn not_found(operation: &str, number: u64) -> ForgeError {
        ForgeError::HttpStatus {
            operation: operation.into(),
            endpoint: format!("fixture/{}", number),
            status: 404,
        }
    }
}

pub fn closed_by(pr: u64) -> TimelineEvent {
    TimelineEvent::ClosedEvent {
        closer: Some(TimelineSubject::PullRequest {
            number: pr,
            repository: None,
        }),
    }
}

/// A closing event whose closer lives in `slug` (`owner/name`).
pub fn closed_from(slug: &str, pr: u64) -> TimelineEvent {
    TimelineEvent::ClosedEvent {
        closer: Some(TimelineSubject::PullRequest {
            number: pr,
            repository: Some(SubjectRepository {
                name_with_owner: slug.into(),
            }),
        }),
    }
}

pub fn mentioned_by(pr: u64) -> TimelineEvent {
    TimelineEvent::CrossReferencedEvent {
        source: Some(TimelineSubject::PullRequest {
            number: pr,
            repository: None,
        }),
        is_cross_repository: false,
    }
}

#[async_trait]
impl Forge for FixtureForge {
    fn repository(&self) -> &RepositoryRef {
        &self.repo
    }

    async fn get_pull_request(
        &self,
        number: u64,
        _cache: CachePolicy,
    ) -> Result<PullRequest, ForgeError> {
        self.record(Op::GetPr, number);
        self.prs
            .get(&number)
            .cloned()
            .ok_or_else(|| Self::not_found("getPR", number))
    }

    async fn get_issue(&self, number: u64, _cache: CachePolicy) -> Result<Issue, ForgeError> {
        self.record(Op::GetIssue, number);
        if self.broken_issues.contains(&number) {
            return Err(Self::not_found("getIssue", number));
        }
        self.issues
            .get(&number)
            .cloned()
            .ok_or_else(|| Self::not_found("getIssue", number))
    }

    async fn list_pr_comments(
        &self,
        number: u64,
        _cache: CachePolicy,
    ) -> Result<PrComments, ForgeError> {
        self.record(Op::ListComments, number);
        let issue_comments = self.comments.get(&number).cloned().unwrap_or_default();
        Ok(PrComments::merge(issue_comments, Vec::new()))
    }

    async fn get_issue_timeline(
        &self,
        number: u64,
        _cache: CachePolicy,
    ) -> Result<Vec<TimelineEvent>, ForgeError> {
        self.record(Op::Timeline, number);
        self.timelines
            .get(&number)
            .cloned()
            .ok_or_else(|| Self::not_found("getIssueTimeline", number))
    }

    async fn search_merged_prs(
        &self,
        _search: &MergedPrSearch,
        _cache: CachePolicy,
    ) -> Result<MergedPrSearchResults, ForgeError> {
        Ok(MergedPrSearchResults {
            total_count: 0,
            incomplete_results: false,
            items: Vec::new(),
        })
    }
}
