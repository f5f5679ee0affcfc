// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identity, lifecycle state, and the volatile in-memory context for
//! an active agent (spec §3, §4.6).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::priority::Priority;

crate::define_id! {
    /// Opaque identifier for a single scheduled agent, unique process-wide
    /// and persisted across restarts.
    pub struct AgentId("agt-");
}

crate::define_id! {
    /// Identifier for a graph run composing many agents (spec §4.8).
    pub struct GraphId("grf-");
}

crate::define_id! {
    /// Correlates a human-input request with its response (spec §4.9).
    pub struct RequestId("req-");
}

/// Per-agent lifecycle state (spec §4.6). Transitions strictly follow the
/// DAG in the state machine diagram; see [`AgentState::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    Queued,
    Generating,
    Executing,
    Submitting,
    Reviewing,
    Accepted,
    Rejected,
    Errored,
}

crate::simple_display! {
    AgentState {
        Queued => "queued",
        Generating => "generating",
        Executing => "executing",
        Submitting => "submitting",
        Reviewing => "reviewing",
        Accepted => "accepted",
        Rejected => "rejected",
        Errored => "errored",
    }
}

impl AgentState {
    /// Terminal states never mutate further (testable property 8).
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentState::Accepted | AgentState::Rejected | AgentState::Errored)
    }

    /// Whether moving from `self` to `next` is a legal edge in the state
    /// machine diagram in spec §4.6.
    pub fn can_transition_to(self, next: AgentState) -> bool {
        use AgentState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Queued, Generating) => true,
            (Generating, Executing) => true,
            (Executing, Submitting) => true,
            (Submitting, Reviewing) => true,
            (Queued | Generating | Executing | Submitting, Errored) => true,
            (Reviewing, Accepted) => true,
            (Queued | Reviewing, Rejected) => true,
            _ => false,
        }
    }
}

/// Structured error recorded on an agent when it transitions to `Errored`
/// (spec §7: include `agent_id`, `state_at_failure`, `task`, plus
/// kind-specific fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentError {
    pub kind: String,
    pub message: String,
    pub state_at_failure: AgentState,
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} (at {})", self.kind, self.message, self.state_at_failure)
    }
}

/// Metadata an agent writes into its own workspace KV before entering
/// `REVIEWING` (spec §3 `SubmissionRecord`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub summary: String,
    pub changed_files: Vec<String>,
}

/// Well-known KV key a `SubmissionRecord` is stored under in an agent's
/// workspace (spec §4.6 phase 4).
pub const SUBMISSION_KEY: &str = "submission";

/// Volatile in-memory handle for an active agent (spec §3 `AgentContext`).
/// The durable mirror is [`crate::lifecycle::LifecycleRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    pub agent_id: AgentId,
    pub task: String,
    pub priority: Priority,
    pub state: AgentState,
    pub created_at_ms: u64,
    pub state_changed_at_ms: u64,
    pub workspace_path: String,
    pub submission: Option<SubmissionRecord>,
    pub error: Option<AgentError>,
    pub upstream: BTreeSet<AgentId>,
    pub downstream: BTreeSet<AgentId>,
}

impl AgentContext {
    pub fn new(agent_id: AgentId, task: impl Into<String>, priority: Priority, now_ms: u64, workspace_path: impl Into<String>) -> Self {
        Self {
            agent_id,
            task: task.into(),
            priority,
            state: AgentState::Queued,
            created_at_ms: now_ms,
            state_changed_at_ms: now_ms,
            workspace_path: workspace_path.into(),
            submission: None,
            error: None,
            upstream: BTreeSet::new(),
            downstream: BTreeSet::new(),
        }
    }

    /// Move to `next`, bumping `state_changed_at_ms`. Returns `false`
    /// (without mutating) if the edge is not legal.
    #[must_use]
    pub fn transition(&mut self, next: AgentState, now_ms: u64) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        self.state_changed_at_ms = now_ms;
        true
    }

    pub fn mark_errored(&mut self, error: AgentError, now_ms: u64) -> bool {
        let failed_at = self.state;
        if self.transition(AgentState::Errored, now_ms) {
            self.error = Some(AgentError { state_at_failure: failed_at, ..error });
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
