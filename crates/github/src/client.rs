//! [`GithubClient`]: the [`Forge`] implementation.
//!
//! Each forge operation maps to one logical request: a single REST object,
//! a Link-paginated REST array, a paginated search, or a cursor-paginated
//! GraphQL connection. The full result of a logical request is cached as one
//! entry keyed by the request shape; pages are never cached individually,
//! and nothing is written unless every page succeeded.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use refgraph::{
    CachePolicy, Comment, CommentKind, Forge, ForgeError, Issue, MergedPrSearch,
    MergedPrSearchResults, PrComments, PullRequest, RepositoryRef, TimelineEvent,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::{
    next_link, ApiRequest, Backoff, CacheKeyParts, ClientConfig, Clock, FileCache,
    GhCliTransport, RawHttpResponse, SystemClock, Transport, MAX_PAGES,
};

const ACCEPT: &str = "application/vnd.github+json";
const PER_PAGE: u32 = 100;

const TIMELINE_CONNECTION: &str = "/data/repository/issue/timelineItems";
const TIMELINE_QUERY: &str = r#"query($owner: String!, $name: String!, $number: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      timelineItems(first: 100, after: $cursor, itemTypes: [CLOSED_EVENT, CROSS_REFERENCED_EVENT]) {
        pageInfo { hasNextPage endCursor }
        nodes {
          __typename
          ... on ClosedEvent {
            closer { __typename ... on PullRequest { number repository { nameWithOwner } } }
          }
          ... on CrossReferencedEvent {
            isCrossRepository
            source { __typename ... on PullRequest { number } ... on Issue { number } }
          }
        }
      }
    }
  }
}"#;

/// Operation names reported in errors and spans.
mod op {
    pub const GET_PR: &str = "getPR";
    pub const GET_ISSUE: &str = "getIssue";
    pub const LIST_PR_COMMENTS: &str = "listPRComments";
    pub const GET_ISSUE_TIMELINE: &str = "getIssueTimeline";
    pub const SEARCH_MERGED_PRS: &str = "searchMergedPRs";
}

/// Cache-entry kinds; part of every cache key.
mod kind {
    pub const REST: &str = "rest";
    pub const REST_LIST: &str = "rest_list";
    pub const SEARCH: &str = "search";
    pub const GRAPHQL: &str = "graphql";
}

/// Forge client for one repository.
pub struct GithubClient {
    repo: RepositoryRef,
    transport: Box<dyn Transport>,
    cache: Option<FileCache>,
    clock: Arc<dyn Clock>,
}

impl GithubClient {
    /// A client over `transport` with no cache and the system clock.
    pub fn new(repo: RepositoryRef, transport: impl Transport + 'static) -> Self {
        Self {
            repo,
            transport: Box::new(transport),
            cache: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// The production wiring: `gh` transport with rate-limit backoff and the
    /// configured file cache.
    pub fn from_config(repo: RepositoryRef, config: &ClientConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let transport = Backoff::new(
            GhCliTransport::new(
                config.program.clone(),
                config.timeout(),
                config.max_output_bytes,
            ),
            clock.clone(),
            config.max_backoff(),
        );
        Self::new(repo, transport)
            .with_clock(clock)
            .with_cache(FileCache::new(config.cache_dir.clone(), config.cache_ttl()))
    }

    /// Serves and stores whole logical results through `cache`.
    pub fn with_cache(mut self, cache: FileCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the clock used for cache freshness.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn repo_endpoint(&self, path: &str) -> String {
        format!("repos/{}/{}/{}", self.repo.owner, self.repo.name, path)
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    /// Executes one page and rejects responses without a usable status.
    async fn send(
        &self,
        operation: &str,
        request: &ApiRequest,
    ) -> Result<RawHttpResponse, ForgeError> {
        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| e.into_forge_error(operation, &request.endpoint))?;

        match response.status {
            None => Err(ForgeError::MalformedResponse {
                operation: operation.to_string(),
                endpoint: request.endpoint.clone(),
            }),
            Some(status) if status >= 400 => Err(ForgeError::HttpStatus {
                operation: operation.to_string(),
                endpoint: request.endpoint.clone(),
                status,
            }),
            Some(_) => Ok(response),
        }
    }

    /// Serves `request` from the cache, or awaits `fetch` and stores its
    /// result.
    ///
    /// [`CachePolicy::Bypass`] skips the read only.
    async fn cached<F>(
        &self,
        kind: &str,
        request: &ApiRequest,
        policy: CachePolicy,
        fetch: F,
    ) -> Result<Value, ForgeError>
    where
        F: Future<Output = Result<Value, ForgeError>>,
    {
        let Some(cache) = &self.cache else {
            return fetch.await;
        };

        let key = CacheKeyParts {
            kind,
            endpoint: &request.endpoint,
            params: request.params(),
            repo: self.repo.to_string(),
        }
        .key();

        if policy.reads_cache() {
            if let Some(value) = cache.read(&key, self.clock.now()) {
                debug!(kind, endpoint = %request.endpoint, key = %key, "cache hit");
                return Ok(value);
            }
        }

        let value = fetch.await?;
        if let Err(e) = cache.write(&key, &value) {
            warn!(endpoint = %request.endpoint, error = %e, "failed to write cache entry");
        }
        Ok(value)
    }

    async fn fetch_object(&self, operation: &str, request: &ApiRequest) -> Result<Value, ForgeError> {
        Ok(self.send(operation, request).await?.body)
    }

    /// Follows `rel="next"` links and concatenates the array pages.
    async fn fetch_array(&self, operation: &str, request: &ApiRequest) -> Result<Value, ForgeError> {
        let mut items = Vec::new();
        let mut next = Some(request.clone());
        let mut pages = 0;

        while let Some(page) = next.take() {
            if pages == MAX_PAGES {
                warn!(endpoint = %request.endpoint, pages, "page limit reached; result truncated");
                break;
            }
            pages += 1;

            let response = self.send(operation, &page).await?;
            let next_url = response.header("link").and_then(next_link);
            match response.body {
                Value::Array(page_items) => items.extend(page_items),
                Value::Null => {}
                other => {
                    return Err(decode_error(
                        operation,
                        &page.endpoint,
                        format!("expected a JSON array, got {}", json_type(&other)),
                    ))
                }
            }
            next = next_url.map(|url| page.next_page(url));
        }

        debug!(endpoint = %request.endpoint, pages, items = items.len(), "fetched list");
        Ok(Value::Array(items))
    }

    /// Follows `rel="next"` links over search pages.
    ///
    /// `items` are concatenated; every other field comes from the first page.
    async fn fetch_search(&self, operation: &str, request: &ApiRequest) -> Result<Value, ForgeError> {
        let mut first: Option<Map<String, Value>> = None;
        let mut items = Vec::new();
        let mut next = Some(request.clone());
        let mut pages = 0;

        while let Some(page) = next.take() {
            if pages == MAX_PAGES {
                warn!(endpoint = %request.endpoint, pages, "page limit reached; result truncated");
                break;
            }
            pages += 1;

            let response = self.send(operation, &page).await?;
            let next_url = response.header("link").and_then(next_link);
            let mut object = match response.body {
                Value::Object(object) => object,
                other => {
                    return Err(decode_error(
                        operation,
                        &page.endpoint,
                        format!("expected a JSON object, got {}", json_type(&other)),
                    ))
                }
            };
            if let Some(Value::Array(page_items)) = object.remove("items") {
                items.extend(page_items);
            }
            if first.is_none() {
                first = Some(object);
            }
            next = next_url.map(|url| page.next_page(url));
        }

        debug!(endpoint = %request.endpoint, pages, items = items.len(), "fetched search results");
        let mut merged = first.unwrap_or_default();
        merged.insert("items".to_string(), Value::Array(items));
        Ok(Value::Object(merged))
    }

    /// Walks a GraphQL connection at `connection` (a JSON pointer) by cursor.
    ///
    /// The cursor is sent as the `cursor` variable. A missing or null
    /// connection ends the walk; any GraphQL `errors` fail it.
    async fn fetch_graphql_nodes(
        &self,
        operation: &str,
        request: &ApiRequest,
        connection: &str,
    ) -> Result<Value, ForgeError> {
        let mut nodes = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = match &cursor {
                Some(cursor) => request.clone().raw_field("cursor", cursor.clone()),
                None => request.clone(),
            };
            let body = self.send(operation, &page).await?.body;

            if let Some(errors) = body
                .get("errors")
                .and_then(Value::as_array)
                .filter(|errors| !errors.is_empty())
            {
                return Err(ForgeError::GraphQl {
                    operation: operation.to_string(),
                    endpoint: page.endpoint.clone(),
                    messages: errors.iter().map(graphql_message).collect(),
                });
            }

            let Some(conn) = body.pointer(connection).filter(|c| !c.is_null()) else {
                return Ok(Value::Array(nodes));
            };
            if let Some(page_nodes) = conn.get("nodes").and_then(Value::as_array) {
                nodes.extend(page_nodes.iter().cloned());
            }

            let has_next = conn
                .pointer("/pageInfo/hasNextPage")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            match conn.pointer("/pageInfo/endCursor").and_then(Value::as_str) {
                Some(end) if has_next => cursor = Some(end.to_string()),
                _ => return Ok(Value::Array(nodes)),
            }
        }

        warn!(endpoint = %request.endpoint, pages = MAX_PAGES, "page limit reached; result truncated");
        Ok(Value::Array(nodes))
    }

    async fn list_comments(
        &self,
        path: &str,
        comment_kind: CommentKind,
        policy: CachePolicy,
    ) -> Result<Vec<Comment>, ForgeError> {
        let request = ApiRequest::get(self.repo_endpoint(path))
            .header("Accept", ACCEPT)
            .typed_field("per_page", PER_PAGE);
        let value = self
            .cached(
                kind::REST_LIST,
                &request,
                policy,
                self.fetch_array(op::LIST_PR_COMMENTS, &request),
            )
            .await?;

        let mut comments: Vec<Comment> = decode(op::LIST_PR_COMMENTS, &request.endpoint, value)?;
        for comment in &mut comments {
            comment.kind = comment_kind;
        }
        Ok(comments)
    }
}

// ---------------------------------------------------------------------------
// Forge
// ---------------------------------------------------------------------------

#[async_trait]
impl Forge for GithubClient {
    fn repository(&self) -> &RepositoryRef {
        &self.repo
    }

    #[instrument(level = "debug", skip(self), fields(operation = op::GET_PR, repo = %self.repo))]
    async fn get_pull_request(
        &self,
        number: u64,
        cache: CachePolicy,
    ) -> Result<PullRequest, ForgeError> {
        let request =
            ApiRequest::get(self.repo_endpoint(&format!("pulls/{number}"))).header("Accept", ACCEPT);
        let value = self
            .cached(kind::REST, &request, cache, self.fetch_object(op::GET_PR, &request))
            .await?;
        decode(op::GET_PR, &request.endpoint, value)
    }

    #[instrument(level = "debug", skip(self), fields(operation = op::GET_ISSUE, repo = %self.repo))]
    async fn get_issue(&self, number: u64, cache: CachePolicy) -> Result<Issue, ForgeError> {
        let request = ApiRequest::get(self.repo_endpoint(&format!("issues/{number}")))
            .header("Accept", ACCEPT);
        let value = self
            .cached(kind::REST, &request, cache, self.fetch_object(op::GET_ISSUE, &request))
            .await?;
        decode(op::GET_ISSUE, &request.endpoint, value)
    }

    #[instrument(level = "debug", skip(self), fields(operation = op::LIST_PR_COMMENTS, repo = %self.repo))]
    async fn list_pr_comments(
        &self,
        number: u64,
        cache: CachePolicy,
    ) -> Result<PrComments, ForgeError> {
        let issue_comments = self
            .list_comments(&format!("issues/{number}/comments"), CommentKind::Issue, cache)
            .await?;
        let review_comments = self
            .list_comments(&format!("pulls/{number}/comments"), CommentKind::Review, cache)
            .await?;
        Ok(PrComments::merge(issue_comments, review_comments))
    }

    #[instrument(level = "debug", skip(self), fields(operation = op::GET_ISSUE_TIMELINE, repo = %self.repo))]
    async fn get_issue_timeline(
        &self,
        number: u64,
        cache: CachePolicy,
    ) -> Result<Vec<TimelineEvent>, ForgeError> {
        let request = ApiRequest::graphql()
            .raw_field("query", TIMELINE_QUERY)
            .raw_field("owner", self.repo.owner.as_str())
            .raw_field("name", self.repo.name.as_str())
            .typed_field("number", number);
        let value = self
            .cached(
                kind::GRAPHQL,
                &request,
                cache,
                self.fetch_graphql_nodes(op::GET_ISSUE_TIMELINE, &request, TIMELINE_CONNECTION),
            )
            .await?;
        decode(op::GET_ISSUE_TIMELINE, &request.endpoint, value)
    }

    #[instrument(level = "debug", skip(self), fields(operation = op::SEARCH_MERGED_PRS, repo = %self.repo))]
    async fn search_merged_prs(
        &self,
        search: &MergedPrSearch,
        cache: CachePolicy,
    ) -> Result<MergedPrSearchResults, ForgeError> {
        let request = ApiRequest::get("search/issues")
            .header("Accept", ACCEPT)
            .raw_field("q", search.to_search_string(&self.repo))
            .typed_field("per_page", PER_PAGE);
        let value = self
            .cached(
                kind::SEARCH,
                &request,
                cache,
                self.fetch_search(op::SEARCH_MERGED_PRS, &request),
            )
            .await?;
        decode(op::SEARCH_MERGED_PRS, &request.endpoint, value)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(operation: &str, endpoint: &str, value: Value) -> Result<T, ForgeError> {
    serde_json::from_value(value).map_err(|e| decode_error(operation, endpoint, e.to_string()))
}

fn decode_error(operation: &str, endpoint: &str, message: String) -> ForgeError {
    ForgeError::Decode {
        operation: operation.to_string(),
        endpoint: endpoint.to_string(),
        message,
    }
}

fn graphql_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
