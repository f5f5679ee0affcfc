// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;
use std::time::Duration;

use cairn_core::{AgentId, GraphId, Priority};
use cairn_events::EventBus;

use super::*;

fn node(id: AgentId, priority: Priority, upstream: &[AgentId]) -> AgentNode {
    AgentNode {
        id,
        target: "target".into(),
        bundle_path: "bundle".into(),
        upstream: upstream.iter().copied().collect(),
        downstream: HashSet::new(),
        priority,
    }
}

fn link(nodes: &mut [AgentNode], parent: usize, child: usize) {
    let child_id = nodes[child].id;
    let parent_id = nodes[parent].id;
    nodes[parent].downstream.insert(child_id);
    nodes[child].upstream.insert(parent_id);
}

fn config(policy: ErrorPolicy) -> GraphExecutorConfig {
    GraphExecutorConfig { max_concurrency: 4, timeout: Duration::from_secs(5), error_policy: policy }
}

#[tokio::test]
async fn all_nodes_complete_when_every_run_succeeds() {
    let a = node(AgentId::new(), Priority::Normal, &[]);
    let b = node(AgentId::new(), Priority::Normal, &[]);
    let mut nodes = vec![a, b];
    link(&mut nodes, 0, 1);

    let executor = GraphExecutor::new(config(ErrorPolicy::Continue));
    let events = EventBus::new(64);
    let summary = executor
        .run(nodes, GraphId::new(), &events, || 0, |n| async move {
            ResultSummary { agent_id: n.id, success: true, output: Some("ok".into()), error: None }
        })
        .await
        .expect("graph run succeeds");

    assert_eq!(summary, GraphRunSummary { completed: 2, failed: 0, skipped: 0 });
}

#[tokio::test]
async fn cyclic_graph_is_rejected_before_any_node_runs() {
    let a = node(AgentId::new(), Priority::Normal, &[]);
    let b = node(AgentId::new(), Priority::Normal, &[]);
    let mut nodes = vec![a, b];
    link(&mut nodes, 0, 1);
    link(&mut nodes, 1, 0);

    let executor = GraphExecutor::new(config(ErrorPolicy::Continue));
    let events = EventBus::new(64);
    let err = executor
        .run(nodes, GraphId::new(), &events, || 0, |n| async move {
            ResultSummary { agent_id: n.id, success: true, output: None, error: None }
        })
        .await
        .expect_err("cycle must be rejected");

    assert!(matches!(err, EngineError::InvalidGraph(_)));
}

#[tokio::test]
async fn skip_downstream_policy_skips_only_transitive_dependents() {
    let a = node(AgentId::new(), Priority::Normal, &[]);
    let b = node(AgentId::new(), Priority::Normal, &[]);
    let c = node(AgentId::new(), Priority::Normal, &[]);
    let mut nodes = vec![a, b, c];
    link(&mut nodes, 0, 1); // a -> b
    link(&mut nodes, 1, 2); // b -> c
    let failing_id = nodes[0].id;
    let unrelated_id = {
        let d = node(AgentId::new(), Priority::Normal, &[]);
        nodes.push(d);
        nodes[3].id
    };

    let executor = GraphExecutor::new(config(ErrorPolicy::SkipDownstream));
    let events = EventBus::new(64);
    let summary = executor
        .run(nodes, GraphId::new(), &events, || 0, move |n| {
            let should_fail = n.id == failing_id;
            async move { ResultSummary { agent_id: n.id, success: !should_fail, output: None, error: None } }
        })
        .await
        .expect("graph run succeeds even with a failure under SKIP_DOWNSTREAM");

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.completed, 1);
    let _ = unrelated_id;
}

#[tokio::test]
async fn stop_graph_policy_halts_before_later_batches() {
    let a = node(AgentId::new(), Priority::Normal, &[]);
    let b = node(AgentId::new(), Priority::Normal, &[]);
    let mut nodes = vec![a, b];
    link(&mut nodes, 0, 1);
    let failing_id = nodes[0].id;

    let executor = GraphExecutor::new(config(ErrorPolicy::StopGraph));
    let events = EventBus::new(64);
    let summary = executor
        .run(nodes, GraphId::new(), &events, || 0, move |n| {
            let should_fail = n.id == failing_id;
            async move { ResultSummary { agent_id: n.id, success: !should_fail, output: None, error: None } }
        })
        .await
        .expect("graph run succeeds even with a failure under STOP_GRAPH");

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.skipped, 0);
}

#[tokio::test]
async fn higher_priority_nodes_in_a_batch_run_does_not_affect_final_counts() {
    // Priority only affects scheduling order within a batch, not the final
    // completed/failed/skipped tally; this exercises the sort path in
    // `plan_batches` without asserting on timing.
    let low = node(AgentId::new(), Priority::Low, &[]);
    let high = node(AgentId::new(), Priority::High, &[]);
    let nodes = vec![low, high];

    let executor = GraphExecutor::new(config(ErrorPolicy::Continue));
    let events = EventBus::new(64);
    let summary = executor
        .run(nodes, GraphId::new(), &events, || 0, |n| async move {
            ResultSummary { agent_id: n.id, success: true, output: None, error: None }
        })
        .await
        .expect("graph run succeeds");

    assert_eq!(summary.completed, 2);
}

#[tokio::test]
async fn graph_level_timeout_fails_the_whole_run() {
    let a = node(AgentId::new(), Priority::Normal, &[]);
    let nodes = vec![a];

    let executor = GraphExecutor::new(GraphExecutorConfig {
        max_concurrency: 1,
        timeout: Duration::from_millis(5),
        error_policy: ErrorPolicy::Continue,
    });
    let events = EventBus::new(64);
    let err = executor
        .run(nodes, GraphId::new(), &events, || 0, |n| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            ResultSummary { agent_id: n.id, success: true, output: None, error: None }
        })
        .await
        .expect_err("graph timeout must surface as an error");

    assert!(matches!(err, EngineError::ResourceLimit(cairn_limiter::LimiterError::Timeout)));
}
