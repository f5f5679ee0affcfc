// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability interfaces the lifecycle driver and graph executor are
//! generic over (spec §6): the LLM code provider, the sandboxed script
//! host, and the graph discoverer. Each is an external system this crate
//! only talks to through a small named trait — never concretely.

use std::path::Path;

use async_trait::async_trait;
use cairn_core::AgentId;
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::graph::AgentNode;

pub type Inputs = Map<String, Value>;
pub type Externals = Map<String, Value>;

/// Everything `CodeProvider::get_code` needs about the agent asking for code,
/// without handing it a full `AgentContext`.
pub struct CodeGenContext<'a> {
    pub agent_id: AgentId,
    pub agent_workspace_path: &'a str,
    pub stable_path: &'a str,
}

/// Produces and validates the generated script for a task (spec §4.6 phase 1).
#[async_trait]
pub trait CodeProvider: Send + Sync {
    async fn get_code(&self, task: &str, ctx: &CodeGenContext<'_>) -> Result<String, EngineError>;

    /// `(ok, error)`: `ok = false` carries a human-readable reason.
    async fn validate_code(&self, code: &str) -> Result<(bool, Option<String>), EngineError>;
}

/// Result of `ScriptHandle::check` (spec §4.6 phase 2).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// One file write (`Some`) or delete (`None`) a script produces while
/// running, applied to the agent's [`crate::lifecycle_driver`] overlay
/// after the run completes. Standing in for the live `agentfs_sdk.AgentFS`
/// handle the original runtime hands a running script directly — not
/// present in the retrieved source, so this crate models its effect as data
/// returned from `run` rather than a capability closure.
#[derive(Debug, Clone)]
pub struct ScriptWrite {
    pub path: String,
    pub contents: Option<Vec<u8>>,
}

/// A loaded, checkable, runnable script (spec §4.6 phases 2-3).
#[async_trait]
pub trait ScriptHandle: Send + Sync {
    async fn check(&self) -> Result<CheckResult, EngineError>;
    async fn run(&self, inputs: Inputs, externals: Externals) -> Result<Vec<ScriptWrite>, EngineError>;
}

/// Loads a script by path into a runnable [`ScriptHandle`] (spec §6).
#[async_trait]
pub trait ScriptHost: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Box<dyn ScriptHandle>, EngineError>;
}

/// Builds the tool/external surface a running script sees, scoped to one
/// agent's workspace plus the shared `stable` base (spec §4.6 phase 3).
pub trait ToolFactory: Send + Sync {
    fn build(&self, agent_id: AgentId, agent_workspace_path: &str, stable_path: &str) -> Externals;
}

/// Turns a set of source paths into graph nodes (spec §4.8, graph-only).
#[async_trait]
pub trait Discoverer: Send + Sync {
    async fn discover(&self, paths: &[std::path::PathBuf]) -> Result<Vec<AgentNode>, EngineError>;
}
