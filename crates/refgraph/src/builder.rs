//! Bounded two-layer crawl around a root pull request.
//!
//! The crawl proceeds in strictly sequential steps:
//!
//! 1. Fetch the root PR and its comments.
//! 2. Extract references (layer 1), cap them, classify each survivor, and
//!    link issues and PRs from the root with `references` edges.
//! 3. For each layer-1 issue, read its timeline and link the PRs that closed
//!    (`closed_by`) or mentioned (`cross_referenced_by`) it, capped per issue.
//! 4. Fetch every PR surfaced in step 3, extract and cap its references,
//!    classify them and link them with `references` edges (layer 2).
//! 5. For each issue linked in step 4, link closing/cross-referencing PRs as
//!    in step 3 with the layer-2 cap. Those PRs stay stubs.
//!
//! Steps never skip what an earlier step already saw: the root is fetched
//! again when an issue points back at it, an issue from layer 1 has its
//! timeline read again at layer 2, and a PR mentioning its own number links
//! to itself. Relationships reached twice therefore appear as repeated
//! `(from, to, type)` edges.
//!
//! Every candidate list is processed in ascending numeric order and budgets
//! are applied before any further I/O for that frontier, so the set of forge
//! calls is a deterministic function of the forge's answers.
//!
//! Any failing fetch other than a classification aborts the whole build.

use std::collections::BTreeSet;

use tracing::{debug, info, info_span, Instrument};

use crate::{
    references::extract_from_pull_request, Budgets, CachePolicy, Classifier, CrawlRunId, EdgeType,
    Forge, GraphError, NodeKey, NodeKind, NodeMetadata, NumberKind, PrComments, PullRequest,
    ReferenceGraph,
};

/// Builds [`ReferenceGraph`]s against a [`Forge`].
pub struct GraphBuilder<'a> {
    forge: &'a dyn Forge,
    budgets: Budgets,
    cache: CachePolicy,
}

impl<'a> GraphBuilder<'a> {
    /// Creates a builder using `budgets` and the default cache policy.
    pub fn new(forge: &'a dyn Forge, budgets: Budgets) -> Self {
        Self {
            forge,
            budgets,
            cache: CachePolicy::default(),
        }
    }

    /// Sets the cache policy passed to every forge call.
    pub fn with_cache_policy(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Crawls outward from pull request `root_number`.
    ///
    /// Returns the fully populated graph, or the first fatal fetch error.
    pub async fn build(&self, root_number: u64) -> Result<ReferenceGraph, GraphError> {
        let run_id = CrawlRunId::new_random();
        let span = info_span!(
            "build_graph",
            run_id = %run_id,
            repo = %self.forge.repository(),
            root = root_number,
        );

        async move {
            let mut crawl = Crawl {
                forge: self.forge,
                cache: self.cache,
                budgets: self.budgets,
                classifier: Classifier::new(),
                graph: ReferenceGraph::new(self.forge.repository(), root_number, self.budgets),
            };
            crawl.run(root_number).await?;

            let graph = crawl.graph.finish();
            info!(
                nodes = graph.stats.node_count,
                edges = graph.stats.edge_count,
                get_pr = graph.stats.calls.get_pr,
                get_issue = graph.stats.calls.get_issue,
                timelines = graph.stats.calls.get_issue_timeline,
                "reference graph built"
            );
            Ok::<_, GraphError>(graph)
        }
        .instrument(span)
        .await
    }
}

/// Keeps the first `budget` candidates; reports whether any were dropped.
fn cap(mut candidates: Vec<u64>, budget: usize) -> (Vec<u64>, bool) {
    let truncated = candidates.len() > budget;
    candidates.truncate(budget);
    (candidates, truncated)
}

/// Mutable state of one build invocation.
struct Crawl<'a> {
    forge: &'a dyn Forge,
    cache: CachePolicy,
    budgets: Budgets,
    classifier: Classifier,
    graph: ReferenceGraph,
}

impl Crawl<'_> {
    async fn run(&mut self, root: u64) -> Result<(), GraphError> {
        // Layer 1: root references.
        let (root_pr, root_comments) = self.fetch_pull_request(root, "root pull request").await?;
        self.graph
            .upgrade_node(NodeKind::Pr, root, NodeMetadata::from(&root_pr));

        let refs = self.references_of(&root_pr, &root_comments);
        let (refs, truncated) = cap(refs, self.budgets.max_layer1_references);
        if truncated {
            debug!(budget = self.budgets.max_layer1_references, "layer-1 references truncated");
            self.graph.stats.truncated.layer1_references = true;
        }

        let root_key = self.graph.root_id.clone();
        let (layer1_issues, layer1_prs) = self.link_references(&root_key, &refs).await;
        self.graph.stats.layer1_issues = layer1_issues.len();
        self.graph.stats.layer1_prs = layer1_prs.len();

        // Layer 1 issues: who closed or mentioned them.
        let mut frontier = BTreeSet::new();
        for &issue in &layer1_issues {
            let (prs, truncated) = self
                .link_closing_prs(
                    issue,
                    self.budgets.max_closing_prs_per_issue,
                    "layer-1 issue timeline",
                )
                .await?;
            if truncated {
                self.graph.stats.truncated.closing_prs_per_issue += 1;
            }
            frontier.extend(prs);
        }

        // Layer 2: references of PRs surfaced from layer-1 issues.
        let mut layer2_issues = BTreeSet::new();
        for &number in &frontier {
            let (pr, comments) = self.fetch_pull_request(number, "layer-2 pull request").await?;
            self.graph
                .upgrade_node(NodeKind::Pr, number, NodeMetadata::from(&pr));

            let refs = self.references_of(&pr, &comments);
            let (refs, truncated) = cap(refs, self.budgets.max_layer2_references_per_pr);
            if truncated {
                debug!(pr = number, "layer-2 references truncated");
                self.graph.stats.truncated.layer2_references_per_pr += 1;
            }

            let from = self.graph.key(NodeKind::Pr, number);
            let (issues, _prs) = self.link_references(&from, &refs).await;
            layer2_issues.extend(issues);
        }
        self.graph.stats.layer2_prs = frontier.len();
        self.graph.stats.layer2_issues = layer2_issues.len();

        // Layer 2 issues: record closers, but do not expand them.
        for &issue in &layer2_issues {
            let (_, truncated) = self
                .link_closing_prs(
                    issue,
                    self.budgets.max_layer2_closing_prs_per_issue,
                    "layer-2 issue timeline",
                )
                .await?;
            if truncated {
                self.graph.stats.truncated.layer2_closing_prs_per_issue += 1;
            }
        }

        Ok(())
    }

    fn references_of(&self, pr: &PullRequest, comments: &PrComments) -> Vec<u64> {
        extract_from_pull_request(pr, &comments.all, self.forge.repository())
    }

    async fn fetch_pull_request(
        &mut self,
        number: u64,
        step: &'static str,
    ) -> Result<(PullRequest, PrComments), GraphError> {
        let fail = |source| GraphError::Fetch {
            step,
            number,
            source,
        };

        self.graph.stats.calls.get_pr += 1;
        let pr = self
            .forge
            .get_pull_request(number, self.cache)
            .await
            .map_err(fail)?;

        self.graph.stats.calls.list_pr_comments += 1;
        let comments = self
            .forge
            .list_pr_comments(number, self.cache)
            .await
            .map_err(fail)?;

        Ok((pr, comments))
    }

    /// Classifies `refs` and links each issue or PR from `from`.
    ///
    /// Returns the issue numbers and PR numbers that were linked; unknown
    /// numbers are skipped.
    async fn link_references(&mut self, from: &NodeKey, refs: &[u64]) -> (Vec<u64>, Vec<u64>) {
        let mut issues = Vec::new();
        let mut prs = Vec::new();

        for &number in refs {
            let kind = self
                .classifier
                .classify(self.forge, number, self.cache, &mut self.graph.stats.calls)
                .await;
            let node_kind = match kind {
                NumberKind::Issue => {
                    issues.push(number);
                    NodeKind::Issue
                }
                NumberKind::PullRequest => {
                    prs.push(number);
                    NodeKind::Pr
                }
                NumberKind::Unknown => continue,
            };

            let metadata = self
                .classifier
                .payload(number)
                .map(NodeMetadata::from)
                .unwrap_or_default();
            self.graph.upgrade_node(node_kind, number, metadata);
            let to = self.graph.key(node_kind, number);
            self.graph.add_edge(from.clone(), to, EdgeType::References);
        }

        (issues, prs)
    }

    /// Links the PRs that closed or cross-referenced `issue`, closers first,
    /// within `budget`.
    ///
    /// Returns the linked PR numbers and whether either list was cut.
    async fn link_closing_prs(
        &mut self,
        issue: u64,
        budget: usize,
        step: &'static str,
    ) -> Result<(Vec<u64>, bool), GraphError> {
        self.graph.stats.calls.get_issue_timeline += 1;
        let events = self
            .forge
            .get_issue_timeline(issue, self.cache)
            .await
            .map_err(|source| GraphError::Fetch {
                step,
                number: issue,
                source,
            })?;

        let repo = self.forge.repository();
        let closing: BTreeSet<u64> = events
            .iter()
            .filter_map(|e| e.closing_pull_request(repo))
            .collect();
        let crossing: BTreeSet<u64> = events
            .iter()
            .filter_map(|e| e.cross_referencing_pull_request())
            .filter(|n| !closing.contains(n))
            .collect();

        let (closers, closing_cut) = cap(closing.into_iter().collect(), budget);
        let remaining = budget - closers.len();
        let (mentioners, crossing_cut) = cap(crossing.into_iter().collect(), remaining);
        let truncated = closing_cut || crossing_cut;
        if truncated {
            debug!(issue, budget, "closing/cross-referencing PRs truncated");
        }

        let issue_key = self.graph.ensure_node(NodeKind::Issue, issue);
        for &pr in &closers {
            let to = self.graph.ensure_node(NodeKind::Pr, pr);
            self.graph.add_edge(issue_key.clone(), to, EdgeType::ClosedBy);
        }
        for &pr in &mentioners {
            let to = self.graph.ensure_node(NodeKind::Pr, pr);
            self.graph
                .add_edge(issue_key.clone(), to, EdgeType::CrossReferencedBy);
        }

        Ok((closers.into_iter().chain(mentioners).collect(), truncated))
    }
}
