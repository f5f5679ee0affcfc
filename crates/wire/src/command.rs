// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Command`/`CommandResult`: the orchestrator command ABI (spec §6 table).

use std::collections::BTreeMap;

use cairn_core::{AgentError, AgentId, AgentState, Priority, SubmissionRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Command {
    Queue { task: String, priority: Priority },
    Accept { agent_id: AgentId },
    Reject { agent_id: AgentId },
    Status { agent_id: AgentId },
    ListAgents,
}

/// Snapshot of one agent as returned by `list_agents`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSummary {
    pub state: AgentState,
    pub task: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum CommandResult {
    Queued {
        agent_id: AgentId,
    },
    Accepted,
    Rejected,
    Status {
        state: AgentState,
        task: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<AgentError>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        submission: Option<SubmissionRecord>,
    },
    Agents {
        agents: BTreeMap<AgentId, AgentSummary>,
    },
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
