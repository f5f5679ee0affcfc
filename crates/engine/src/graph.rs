// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GraphExecutor`: runs a DAG of [`AgentNode`]s batch-by-batch, respecting
//! upstream dependencies and a graph-level concurrency cap (spec §4.8).
//! Grounded on `remora_v0.4.10/src/remora/core/executor.py::GraphExecutor`
//! (`get_execution_batches`, the `asyncio.Semaphore`-bounded batch runner,
//! `asyncio.gather(..., return_exceptions=True)`, and the per-result error
//! policy dispatch). `remora.core.graph`, which originally built the batch
//! list, was never present in the retrieved source tree; batch planning
//! below is grounded directly on spec §4.8 steps 1-2 instead.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cairn_core::{AgentId, Event, EventCategory, GraphId, Priority};
use cairn_events::EventBus;

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct AgentNode {
    pub id: AgentId,
    pub target: String,
    pub bundle_path: String,
    pub upstream: HashSet<AgentId>,
    pub downstream: HashSet<AgentId>,
    pub priority: Priority,
}

/// Per-node-failure policy (spec §4.8 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    StopGraph,
    SkipDownstream,
    Continue,
}

#[derive(Debug, Clone)]
pub struct ResultSummary {
    pub agent_id: AgentId,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GraphExecutorConfig {
    pub max_concurrency: usize,
    pub timeout: Duration,
    pub error_policy: ErrorPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphRunSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct GraphExecutor {
    config: GraphExecutorConfig,
}

impl GraphExecutor {
    pub fn new(config: GraphExecutorConfig) -> Self {
        Self { config }
    }

    /// Topologically order `nodes` into batches (spec §4.8 steps 1-2): each
    /// batch holds the ids with no unsatisfied upstream dependency at that
    /// point, sorted by descending priority. A node left over with no ready
    /// batch means a cycle.
    fn plan_batches(nodes: &[AgentNode]) -> Result<Vec<Vec<AgentId>>, EngineError> {
        let by_id: HashMap<AgentId, &AgentNode> = nodes.iter().map(|n| (n.id, n)).collect();
        let mut remaining: HashSet<AgentId> = by_id.keys().copied().collect();
        let mut done: HashSet<AgentId> = HashSet::new();
        let mut batches = Vec::new();

        while !remaining.is_empty() {
            let mut ready: Vec<AgentId> = remaining
                .iter()
                .copied()
                .filter(|id| by_id[id].upstream.iter().all(|u| done.contains(u)))
                .collect();
            if ready.is_empty() {
                let cycle = remaining.iter().map(AgentId::to_string).collect();
                return Err(EngineError::InvalidGraph(cycle));
            }
            ready.sort_by(|a, b| by_id[b].priority.cmp(&by_id[a].priority).then_with(|| a.to_string().cmp(&b.to_string())));
            for id in &ready {
                remaining.remove(id);
                done.insert(*id);
            }
            batches.push(ready);
        }
        Ok(batches)
    }

    /// BFS over `downstream` edges from `start`, spec §4.8 step 4's
    /// `SKIP_DOWNSTREAM` policy.
    fn transitive_downstream(start: AgentId, by_id: &HashMap<AgentId, &AgentNode>) -> HashSet<AgentId> {
        let mut skipped = HashSet::new();
        let mut queue: VecDeque<AgentId> = VecDeque::new();
        if let Some(node) = by_id.get(&start) {
            queue.extend(node.downstream.iter().copied());
        }
        while let Some(id) = queue.pop_front() {
            if skipped.insert(id) {
                if let Some(node) = by_id.get(&id) {
                    queue.extend(node.downstream.iter().copied());
                }
            }
        }
        skipped
    }

    /// Run the graph. `exec` runs one node to a [`ResultSummary`]; callers
    /// typically close over an `AgentLifecycleDriver`. `now_ms` stamps
    /// emitted events (injected so tests can use a fake clock).
    pub async fn run<F, Fut>(
        &self,
        nodes: Vec<AgentNode>,
        graph_id: GraphId,
        events: &EventBus,
        now_ms: impl Fn() -> u64,
        exec: F,
    ) -> Result<GraphRunSummary, EngineError>
    where
        F: Fn(AgentNode) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResultSummary> + Send + 'static,
    {
        let by_id: HashMap<AgentId, &AgentNode> = nodes.iter().map(|n| (n.id, n)).collect();
        let batches = Self::plan_batches(&nodes)?;
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_concurrency.max(1)));

        let run = self.run_batches(batches, &by_id, &semaphore, graph_id, events, &now_ms, exec);
        match tokio::time::timeout(self.config.timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::ResourceLimit(cairn_limiter::LimiterError::Timeout)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_batches<F, Fut>(
        &self,
        batches: Vec<Vec<AgentId>>,
        by_id: &HashMap<AgentId, &AgentNode>,
        semaphore: &Arc<tokio::sync::Semaphore>,
        graph_id: GraphId,
        events: &EventBus,
        now_ms: &impl Fn() -> u64,
        exec: F,
    ) -> Result<GraphRunSummary, EngineError>
    where
        F: Fn(AgentNode) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResultSummary> + Send + 'static,
    {
        let mut summary = GraphRunSummary::default();
        let mut skipped_ids: HashSet<AgentId> = HashSet::new();
        let mut stop = false;

        for batch in batches {
            if stop {
                break;
            }
            let runnable: Vec<AgentId> = batch.into_iter().filter(|id| !skipped_ids.contains(id)).collect();
            if runnable.is_empty() {
                continue;
            }

            let mut join_set = tokio::task::JoinSet::new();
            for id in runnable {
                let node = (*by_id[&id]).clone();
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    stop = true;
                    break;
                };
                events.publish(
                    Event::new(EventCategory::Agent, "started", node.id.to_string(), now_ms())
                        .with_agent(node.id)
                        .with_graph(graph_id),
                );
                let fut = exec(node);
                join_set.spawn(async move {
                    let result = fut.await;
                    drop(permit);
                    result
                });
            }

            while let Some(joined) = join_set.join_next().await {
                let result = match joined {
                    Ok(result) => result,
                    Err(join_err) => ResultSummary {
                        agent_id: AgentId::new(),
                        success: false,
                        output: None,
                        error: Some(format!("node task did not complete: {join_err}")),
                    },
                };

                let action = if result.success { "completed" } else { "failed" };
                events.publish(
                    Event::new(EventCategory::Agent, action, result.agent_id.to_string(), now_ms())
                        .with_agent(result.agent_id)
                        .with_graph(graph_id),
                );

                if result.success {
                    summary.completed += 1;
                    continue;
                }
                summary.failed += 1;
                match self.config.error_policy {
                    ErrorPolicy::StopGraph => stop = true,
                    ErrorPolicy::Continue => {}
                    ErrorPolicy::SkipDownstream => {
                        for skip_id in Self::transitive_downstream(result.agent_id, by_id) {
                            if skipped_ids.insert(skip_id) {
                                summary.skipped += 1;
                                events.publish(
                                    Event::new(EventCategory::Agent, "skipped", skip_id.to_string(), now_ms())
                                        .with_agent(skip_id)
                                        .with_graph(graph_id),
                                );
                            }
                        }
                    }
                }
            }
        }

        let mut payload = serde_json::Map::new();
        payload.insert("completed".into(), summary.completed.into());
        payload.insert("failed".into(), summary.failed.into());
        payload.insert("skipped".into(), summary.skipped.into());
        events.publish(
            Event::new(EventCategory::Graph, "completed", graph_id.to_string(), now_ms())
                .with_graph(graph_id)
                .with_payload(payload),
        );

        Ok(summary)
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
