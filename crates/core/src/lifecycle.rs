// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent mirror of an [`AgentContext`], the source of truth consulted
//! on crash recovery (spec §3, §4.2).

use serde::{Deserialize, Serialize};

use crate::agent::{AgentContext, AgentError, AgentId, AgentState, SubmissionRecord};
use crate::priority::Priority;

/// Durable record of an agent, versioned for compare-and-swap (spec §4.2).
/// `version == 0` means "not yet saved"; [`crate::error::ErrorKind::VersionConflict`]
/// is raised by the store, not tracked here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub agent_id: AgentId,
    pub task: String,
    pub priority: Priority,
    pub state: AgentState,
    pub created_at_ms: u64,
    pub state_changed_at_ms: u64,
    pub workspace_path: String,
    pub submission: Option<SubmissionRecord>,
    pub error: Option<AgentError>,
    pub version: u64,
}

impl LifecycleRecord {
    /// Build the initial (unsaved, `version == 0`) record for a freshly
    /// queued agent.
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            agent_id: ctx.agent_id,
            task: ctx.task.clone(),
            priority: ctx.priority,
            state: ctx.state,
            created_at_ms: ctx.created_at_ms,
            state_changed_at_ms: ctx.state_changed_at_ms,
            workspace_path: ctx.workspace_path.clone(),
            submission: ctx.submission.clone(),
            error: ctx.error.clone(),
            version: 0,
        }
    }

    /// Overwrite the scalar/state fields from a live context, preserving
    /// `version` (the store bumps that on `save`).
    pub fn sync_from(&mut self, ctx: &AgentContext) {
        self.task = ctx.task.clone();
        self.priority = ctx.priority;
        self.state = ctx.state;
        self.state_changed_at_ms = ctx.state_changed_at_ms;
        self.workspace_path = ctx.workspace_path.clone();
        self.submission = ctx.submission.clone();
        self.error = ctx.error.clone();
    }

    /// Rebuild a volatile [`AgentContext`] from this record, e.g. during
    /// crash recovery (spec §4.7 initialization step 2).
    pub fn to_context(&self) -> AgentContext {
        AgentContext {
            agent_id: self.agent_id,
            task: self.task.clone(),
            priority: self.priority,
            state: self.state,
            created_at_ms: self.created_at_ms,
            state_changed_at_ms: self.state_changed_at_ms,
            workspace_path: self.workspace_path.clone(),
            submission: self.submission.clone(),
            error: self.error.clone(),
            upstream: Default::default(),
            downstream: Default::default(),
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
