// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire shape for bus events (spec §3, §4.4) and the `"category:action"` /
//! `"category:*"` pattern matching rule subscribers filter on.

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, GraphId, RequestId};

/// Event category (spec §3). `Human` covers the human-input rendezvous
/// (spec §4.9); the rest mirror the source's `agent`/`tool`/`model`/`graph`
/// categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Agent,
    Tool,
    Model,
    Graph,
    Human,
}

crate::simple_display! {
    EventCategory {
        Agent => "agent",
        Tool => "tool",
        Model => "model",
        Graph => "graph",
        Human => "human",
    }
}

/// A single immutable event flowing through the bus (spec §3 `Event`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub timestamp_ms: u64,
    pub category: EventCategory,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<GraphId>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    pub fn new(category: EventCategory, action: impl Into<String>, id: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            id: id.into(),
            timestamp_ms,
            category,
            action: action.into(),
            agent_id: None,
            graph_id: None,
            payload: serde_json::Map::new(),
        }
    }

    pub fn with_agent(mut self, agent_id: AgentId) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_graph(mut self, graph_id: GraphId) -> Self {
        self.graph_id = Some(graph_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Map<String, serde_json::Value>) -> Self {
        self.payload = payload;
        self
    }

    /// The `"category:action"` string used for subscription matching.
    pub fn subscription_key(&self) -> String {
        format!("{}:{}", self.category, self.action)
    }

    /// `request_id` field of a `human:request_input` / `human:response_input`
    /// payload, used for human-input rendezvous correlation (spec §4.9).
    pub fn request_id(&self) -> Option<RequestId> {
        self.payload.get("request_id")?.as_str().map(RequestId::from_string)
    }

    /// Render this event as one SSE `data:` line (spec §6).
    pub fn to_sse(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            id: &'a str,
            timestamp: u64,
            category: EventCategory,
            action: &'a str,
            #[serde(rename = "type")]
            ty: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            agent_id: Option<AgentId>,
            #[serde(skip_serializing_if = "Option::is_none")]
            graph_id: Option<GraphId>,
            payload: &'a serde_json::Map<String, serde_json::Value>,
        }
        let wire = Wire {
            id: &self.id,
            timestamp: self.timestamp_ms,
            category: self.category,
            action: &self.action,
            ty: self.subscription_key(),
            agent_id: self.agent_id,
            graph_id: self.graph_id,
            payload: &self.payload,
        };
        Ok(format!("data: {}\n\n", serde_json::to_string(&wire)?))
    }
}

/// `true` when `pattern` (`"category:action"` or `"category:*"`) matches
/// `key` (an event's [`Event::subscription_key`]).
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
