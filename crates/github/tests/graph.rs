mod common;

use std::time::SystemTime;

use common::{client, ok, repo, RecordingClock};
use github::{Method, ReplayTransport};
use pretty_assertions::assert_eq;
use refgraph::{Budgets, EdgeType, GraphBuilder, NodeKey, NodeKind};
use serde_json::json;

fn pr(number: u64, body: &str) -> serde_json::Value {
    json!({
        "number": number,
        "title": format!("PR {number}"),
        "body": body,
        "html_url": format!("https://github.com/octo/hello/pull/{number}"),
        "state": "closed",
        "merged_at": "2024-03-01T12:00:00Z"
    })
}

fn issue(number: u64) -> serde_json::Value {
    json!({
        "number": number,
        "title": format!("Issue {number}"),
        "html_url": format!("https://github.com/octo/hello/issues/{number}"),
        "state": "open"
    })
}

fn timeline(nodes: serde_json::Value) -> github::RawHttpResponse {
    ok(json!({
        "data": { "repository": { "issue": { "timelineItems": {
            "pageInfo": { "hasNextPage": false, "endCursor": null },
            "nodes": nodes
        } } } }
    }))
}

#[tokio::test]
async fn test_builds_graph_over_replayed_forge() {
    let replay = ReplayTransport::new();
    // Issue #2 points back at the root, so the root is read twice.
    for _ in 0..2 {
        replay
            .on_get("repos/octo/hello/pulls/1", ok(pr(1, "Fixes #2")))
            .on_get("repos/octo/hello/issues/1/comments", ok(json!([])))
            .on_get("repos/octo/hello/pulls/1/comments", ok(json!([])));
    }
    replay
        .on_get("repos/octo/hello/issues/2", ok(issue(2)))
        .on_get("repos/octo/hello/pulls/3", ok(pr(3, "Related to octo/hello#4")))
        .on_get("repos/octo/hello/issues/3/comments", ok(json!([])))
        .on_get("repos/octo/hello/pulls/3/comments", ok(json!([])))
        .on_get("repos/octo/hello/issues/4", ok(issue(4)));
    let issue2_timeline = json!([
        { "__typename": "ClosedEvent", "closer": {
            "__typename": "PullRequest", "number": 1,
            "repository": { "nameWithOwner": "octo/hello" } } },
        { "__typename": "CrossReferencedEvent", "isCrossRepository": false,
          "source": { "__typename": "PullRequest", "number": 3 } }
    ]);
    // Layer 1 reads #2; layer 2 reads #2 again, then #4.
    replay
        .push(Method::Post, "graphql", timeline(issue2_timeline.clone()))
        .push(Method::Post, "graphql", timeline(issue2_timeline))
        .push(Method::Post, "graphql", timeline(json!([])));

    let forge = client(&replay, RecordingClock::at(SystemTime::now()));
    let graph = GraphBuilder::new(&forge, Budgets::default())
        .build(1)
        .await
        .unwrap();

    let key = |kind, n| NodeKey::new(kind, &repo(), n);
    let edges: Vec<(String, String, EdgeType)> = graph
        .edges
        .iter()
        .map(|e| (e.from.to_string(), e.to.to_string(), e.edge_type))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("pr:octo/hello#1".into(), "issue:octo/hello#2".into(), EdgeType::References),
            ("issue:octo/hello#2".into(), "pr:octo/hello#1".into(), EdgeType::ClosedBy),
            ("issue:octo/hello#2".into(), "pr:octo/hello#3".into(), EdgeType::CrossReferencedBy),
            ("pr:octo/hello#1".into(), "issue:octo/hello#2".into(), EdgeType::References),
            ("pr:octo/hello#3".into(), "issue:octo/hello#4".into(), EdgeType::References),
            ("issue:octo/hello#2".into(), "pr:octo/hello#1".into(), EdgeType::ClosedBy),
            ("issue:octo/hello#2".into(), "pr:octo/hello#3".into(), EdgeType::CrossReferencedBy),
        ]
    );

    let pr3 = graph.node(&key(NodeKind::Pr, 3)).unwrap();
    assert_eq!(pr3.metadata.title.as_deref(), Some("PR 3"));
    let issue4 = graph.node(&key(NodeKind::Issue, 4)).unwrap();
    assert_eq!(issue4.metadata.title.as_deref(), Some("Issue 4"));

    assert_eq!(graph.stats.calls.get_pr, 3);
    assert_eq!(graph.stats.calls.get_issue, 2);
    assert_eq!(graph.stats.calls.get_issue_timeline, 3);
    assert_eq!(replay.pending(), 0);
}

#[tokio::test]
async fn test_closer_in_another_repository_is_not_fetched() {
    let replay = ReplayTransport::new();
    replay
        .on_get("repos/octo/hello/pulls/1", ok(pr(1, "see #2")))
        .on_get("repos/octo/hello/issues/1/comments", ok(json!([])))
        .on_get("repos/octo/hello/pulls/1/comments", ok(json!([])))
        .on_get("repos/octo/hello/issues/2", ok(issue(2)))
        .push(
            Method::Post,
            "graphql",
            timeline(json!([
                { "__typename": "ClosedEvent", "closer": {
                    "__typename": "PullRequest", "number": 900,
                    "repository": { "nameWithOwner": "other/lib" } } }
            ])),
        );

    let forge = client(&replay, RecordingClock::at(SystemTime::now()));
    let graph = GraphBuilder::new(&forge, Budgets::default())
        .build(1)
        .await
        .unwrap();

    assert!(graph.node(&NodeKey::new(NodeKind::Pr, &repo(), 900)).is_none());
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.stats.calls.get_pr, 1);
    assert!(replay
        .requests()
        .iter()
        .all(|r| r.endpoint != "repos/octo/hello/pulls/900"));
    assert_eq!(replay.pending(), 0);
}
