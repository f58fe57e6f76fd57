//! The reference graph produced by a crawl.
//!
//! A [`ReferenceGraph`] is built once by [`crate::GraphBuilder`] and is
//! read-only afterwards. It serialises to the JSON object consumed by the
//! judging and reporting steps:
//! `{ rootId, nodes, edges, budgets, stats }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Issue, NodeKey, NodeKind, PullRequest, RepositoryRef, Timestamp};

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Optional descriptive data attached to a node once a payload is known.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub title: Option<String>,
    pub url: Option<String>,
    pub merged_at: Option<Timestamp>,
    pub closed_at: Option<Timestamp>,
    pub state: Option<String>,
}

impl NodeMetadata {
    /// Overwrites each field for which `other` has a value.
    ///
    /// Fields absent from `other` keep their current value, so metadata is
    /// never downgraded to null.
    pub fn absorb(&mut self, other: NodeMetadata) {
        fn keep<T>(slot: &mut Option<T>, incoming: Option<T>) {
            if incoming.is_some() {
                *slot = incoming;
            }
        }
        keep(&mut self.title, other.title);
        keep(&mut self.url, other.url);
        keep(&mut self.merged_at, other.merged_at);
        keep(&mut self.closed_at, other.closed_at);
        keep(&mut self.state, other.state);
    }

    /// Returns `true` if no field is set (a stub node).
    pub fn is_empty(&self) -> bool {
        *self == NodeMetadata::default()
    }
}

impl From<&PullRequest> for NodeMetadata {
    fn from(pr: &PullRequest) -> Self {
        Self {
            title: pr.title.clone(),
            url: pr.html_url.clone(),
            merged_at: pr.merged_at,
            closed_at: pr.closed_at,
            state: pr.state.clone(),
        }
    }
}

impl From<&Issue> for NodeMetadata {
    fn from(issue: &Issue) -> Self {
        Self {
            title: issue.title.clone(),
            url: issue.html_url.clone(),
            merged_at: None,
            closed_at: issue.closed_at,
            state: issue.state.clone(),
        }
    }
}

/// An issue or pull request in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeKey,
    pub kind: NodeKind,
    pub owner: String,
    pub repo: String,
    pub number: u64,
    #[serde(flatten)]
    pub metadata: NodeMetadata,
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Relationship carried by a [`GraphEdge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// The source's text mentions the target.
    References,
    /// The source issue was closed by the target pull request.
    ClosedBy,
    /// The target pull request mentioned the source issue without closing it.
    CrossReferencedBy,
}

/// A directed, typed edge between two nodes.
///
/// The same `(from, to, type)` triple may appear more than once when the
/// crawl reaches a relationship along different paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: NodeKey,
    pub to: NodeKey,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

// ---------------------------------------------------------------------------
// Budgets and stats
// ---------------------------------------------------------------------------

/// Per-step caps on how many candidates the crawl follows.
///
/// Serialized camelCase inside the graph; configuration files use the
/// snake_case field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"), default)]
pub struct Budgets {
    /// References followed from the root pull request.
    pub max_layer1_references: usize,
    /// Closing plus cross-referencing PRs followed per layer-1 issue.
    pub max_closing_prs_per_issue: usize,
    /// References followed from each layer-1-derived pull request.
    pub max_layer2_references_per_pr: usize,
    /// Closing plus cross-referencing PRs recorded per layer-2 issue.
    pub max_layer2_closing_prs_per_issue: usize,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_layer1_references: 25,
            max_closing_prs_per_issue: 5,
            max_layer2_references_per_pr: 15,
            max_layer2_closing_prs_per_issue: 3,
        }
    }
}

/// Which capped steps dropped candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truncation {
    /// Set when the root PR had more references than the layer-1 budget.
    pub layer1_references: bool,
    /// Number of layer-1 issues whose closing/cross-referencing PRs were cut.
    pub closing_prs_per_issue: u32,
    /// Number of layer-2 PRs whose references were cut.
    pub layer2_references_per_pr: u32,
    /// Number of layer-2 issues whose closing/cross-referencing PRs were cut.
    pub layer2_closing_prs_per_issue: u32,
}

/// Forge calls issued by one crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallCounts {
    #[serde(rename = "getPR")]
    pub get_pr: u32,
    #[serde(rename = "getIssue")]
    pub get_issue: u32,
    #[serde(rename = "listPRComments")]
    pub list_pr_comments: u32,
    #[serde(rename = "getIssueTimeline")]
    pub get_issue_timeline: u32,
}

/// Traversal statistics attached to a finished graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    pub truncated: Truncation,
    pub calls: CallCounts,
    pub node_count: usize,
    pub edge_count: usize,
    pub layer1_issues: usize,
    pub layer1_prs: usize,
    pub layer2_prs: usize,
    pub layer2_issues: usize,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Nodes, edges and bookkeeping for one crawl around a root pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceGraph {
    pub root_id: NodeKey,
    pub nodes: BTreeMap<NodeKey, GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub budgets: Budgets,
    pub stats: CrawlStats,
    #[serde(skip)]
    repository: RepositoryRef,
}

impl ReferenceGraph {
    /// Creates a graph containing only the root pull request node.
    pub(crate) fn new(repo: &RepositoryRef, root_number: u64, budgets: Budgets) -> Self {
        let mut graph = Self {
            root_id: NodeKey::new(NodeKind::Pr, repo, root_number),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            budgets,
            stats: CrawlStats::default(),
            repository: repo.clone(),
        };
        graph.ensure_node(NodeKind::Pr, root_number);
        graph
    }

    /// Returns the node with `key`, if present.
    pub fn node(&self, key: &NodeKey) -> Option<&GraphNode> {
        self.nodes.get(key)
    }

    /// Returns `true` if an edge `from -> to` of `edge_type` exists.
    pub fn has_edge(&self, from: &NodeKey, to: &NodeKey, edge_type: EdgeType) -> bool {
        self.edges
            .iter()
            .any(|e| &e.from == from && &e.to == to && e.edge_type == edge_type)
    }

    /// The repository every node belongs to.
    pub fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    /// Returns the key a `kind` node for `number` has in this graph.
    pub fn key(&self, kind: NodeKind, number: u64) -> NodeKey {
        NodeKey::new(kind, &self.repository, number)
    }

    /// Inserts a stub node unless it exists already; returns its key.
    pub(crate) fn ensure_node(&mut self, kind: NodeKind, number: u64) -> NodeKey {
        let key = self.key(kind, number);
        if !self.nodes.contains_key(&key) {
            self.nodes.insert(
                key.clone(),
                GraphNode {
                    id: key.clone(),
                    kind,
                    owner: self.repository.owner.to_string(),
                    repo: self.repository.name.to_string(),
                    number,
                    metadata: NodeMetadata::default(),
                },
            );
        }
        key
    }

    /// Ensures the node exists and merges `metadata` into it.
    pub(crate) fn upgrade_node(&mut self, kind: NodeKind, number: u64, metadata: NodeMetadata) {
        let key = self.ensure_node(kind, number);
        if let Some(node) = self.nodes.get_mut(&key) {
            node.metadata.absorb(metadata);
        }
    }

    pub(crate) fn add_edge(&mut self, from: NodeKey, to: NodeKey, edge_type: EdgeType) {
        self.edges.push(GraphEdge {
            from,
            to,
            edge_type,
        });
    }

    pub(crate) fn finish(mut self) -> Self {
        self.stats.node_count = self.nodes.len();
        self.stats.edge_count = self.edges.len();
        self
    }
}
