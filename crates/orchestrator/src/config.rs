// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration (spec §4.14): built-in defaults → `cairn.toml` →
//! `CAIRN_`-prefixed environment variables → CLI flags. Each layer is
//! optional and only overrides fields it actually sets; the result is
//! validated once, at startup, into a plain struct passed down by value
//! rather than read from globals.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cairn_workspace::MergeStrategy;
use serde::Deserialize;

use crate::error::OrchestratorError;

/// Fully resolved, validated orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub project_root: PathBuf,
    pub cairn_home: PathBuf,
    pub max_concurrent_agents: usize,
    pub max_queue_size: usize,
    pub workspace_cache_size: usize,
    pub max_execution_time: Duration,
    pub max_memory_bytes: Option<u64>,
    pub max_recursion_depth: u32,
    pub graph_max_concurrency: usize,
    pub graph_timeout: Duration,
    pub accept_merge_strategy: MergeStrategy,
    pub code_provider: String,
}

impl OrchestratorConfig {
    pub fn agentfs_dir(&self) -> PathBuf {
        self.project_root.join(".agentfs")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.project_root.join(".scripts").join("agents")
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.cairn_home.join("workspaces")
    }

    pub fn state_file(&self) -> PathBuf {
        self.cairn_home.join("state").join("orchestrator.json")
    }
}

/// Every field optional: `None` means "this layer doesn't set it", so later
/// layers can fall through to an earlier one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub project_root: Option<PathBuf>,
    pub cairn_home: Option<PathBuf>,
    pub max_concurrent_agents: Option<usize>,
    pub max_queue_size: Option<usize>,
    pub workspace_cache_size: Option<usize>,
    pub max_execution_time_secs: Option<u64>,
    pub max_memory_bytes: Option<u64>,
    pub max_recursion_depth: Option<u32>,
    pub graph_max_concurrency: Option<usize>,
    pub graph_timeout_secs: Option<u64>,
    pub accept_merge_strategy: Option<String>,
    pub code_provider: Option<String>,
}

impl ConfigLayer {
    fn merge(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            project_root: over.project_root.or(self.project_root),
            cairn_home: over.cairn_home.or(self.cairn_home),
            max_concurrent_agents: over.max_concurrent_agents.or(self.max_concurrent_agents),
            max_queue_size: over.max_queue_size.or(self.max_queue_size),
            workspace_cache_size: over.workspace_cache_size.or(self.workspace_cache_size),
            max_execution_time_secs: over.max_execution_time_secs.or(self.max_execution_time_secs),
            max_memory_bytes: over.max_memory_bytes.or(self.max_memory_bytes),
            max_recursion_depth: over.max_recursion_depth.or(self.max_recursion_depth),
            graph_max_concurrency: over.graph_max_concurrency.or(self.graph_max_concurrency),
            graph_timeout_secs: over.graph_timeout_secs.or(self.graph_timeout_secs),
            accept_merge_strategy: over.accept_merge_strategy.or(self.accept_merge_strategy),
            code_provider: over.code_provider.or(self.code_provider),
        }
    }

    fn defaults() -> ConfigLayer {
        ConfigLayer {
            project_root: Some(PathBuf::from(".")),
            cairn_home: Some(PathBuf::from(".cairn")),
            max_concurrent_agents: Some(4),
            max_queue_size: Some(256),
            workspace_cache_size: Some(32),
            max_execution_time_secs: Some(300),
            max_memory_bytes: None,
            max_recursion_depth: Some(8),
            graph_max_concurrency: Some(4),
            graph_timeout_secs: Some(1800),
            accept_merge_strategy: Some("overwrite".into()),
            code_provider: Some("default".into()),
        }
    }

    /// Read `CAIRN_*` environment variables, parsing each into its field's
    /// type; a variable that's set but doesn't parse is ignored rather than
    /// aborting the whole layer (surfaced as a `warn` by the caller).
    fn from_env() -> ConfigLayer {
        let parse = |name: &str| std::env::var(name).ok();
        ConfigLayer {
            project_root: parse("CAIRN_PROJECT_ROOT").map(PathBuf::from),
            cairn_home: parse("CAIRN_HOME").map(PathBuf::from),
            max_concurrent_agents: parse("CAIRN_MAX_CONCURRENT_AGENTS").and_then(|s| s.parse().ok()),
            max_queue_size: parse("CAIRN_MAX_QUEUE_SIZE").and_then(|s| s.parse().ok()),
            workspace_cache_size: parse("CAIRN_WORKSPACE_CACHE_SIZE").and_then(|s| s.parse().ok()),
            max_execution_time_secs: parse("CAIRN_MAX_EXECUTION_TIME_SECS").and_then(|s| s.parse().ok()),
            max_memory_bytes: parse("CAIRN_MAX_MEMORY_BYTES").and_then(|s| s.parse().ok()),
            max_recursion_depth: parse("CAIRN_MAX_RECURSION_DEPTH").and_then(|s| s.parse().ok()),
            graph_max_concurrency: parse("CAIRN_GRAPH_MAX_CONCURRENCY").and_then(|s| s.parse().ok()),
            graph_timeout_secs: parse("CAIRN_GRAPH_TIMEOUT_SECS").and_then(|s| s.parse().ok()),
            accept_merge_strategy: parse("CAIRN_ACCEPT_MERGE_STRATEGY"),
            code_provider: parse("CAIRN_CODE_PROVIDER"),
        }
    }

    fn validate(self) -> Result<OrchestratorConfig, OrchestratorError> {
        let require_nonzero = |name: &str, v: usize| -> Result<usize, OrchestratorError> {
            if v == 0 {
                return Err(OrchestratorError::Config(format!("{name} must be nonzero")));
            }
            Ok(v)
        };

        let accept_merge_strategy = match self.accept_merge_strategy.as_deref() {
            Some("overwrite") | None => MergeStrategy::Overwrite,
            Some("preserve") => MergeStrategy::Preserve,
            Some("error") => MergeStrategy::Error,
            Some(other) => return Err(OrchestratorError::Config(format!("unknown accept_merge_strategy '{other}'"))),
        };

        Ok(OrchestratorConfig {
            project_root: self.project_root.unwrap_or_else(|| PathBuf::from(".")).canonicalize_or_self(),
            cairn_home: self.cairn_home.unwrap_or_else(|| PathBuf::from(".cairn")),
            max_concurrent_agents: require_nonzero("max_concurrent_agents", self.max_concurrent_agents.unwrap_or(4))?,
            max_queue_size: require_nonzero("max_queue_size", self.max_queue_size.unwrap_or(256))?,
            workspace_cache_size: require_nonzero("workspace_cache_size", self.workspace_cache_size.unwrap_or(32))?,
            max_execution_time: Duration::from_secs(self.max_execution_time_secs.unwrap_or(300)),
            max_memory_bytes: self.max_memory_bytes,
            max_recursion_depth: self.max_recursion_depth.unwrap_or(8),
            graph_max_concurrency: require_nonzero("graph_max_concurrency", self.graph_max_concurrency.unwrap_or(4))?,
            graph_timeout: Duration::from_secs(self.graph_timeout_secs.unwrap_or(1800)),
            accept_merge_strategy,
            code_provider: self.code_provider.unwrap_or_else(|| "default".into()),
        })
    }
}

trait CanonicalizeOrSelf {
    fn canonicalize_or_self(self) -> PathBuf;
}

impl CanonicalizeOrSelf for PathBuf {
    fn canonicalize_or_self(self) -> PathBuf {
        self.canonicalize().unwrap_or(self)
    }
}

/// Load configuration: built-in defaults, then `<project_root>/cairn.toml`
/// if present, then `CAIRN_*` env vars, then `cli_overrides`. `project_root`
/// is resolved first (from env or `cli_overrides`, defaulting to `.`) purely
/// to locate `cairn.toml`; the same precedence then applies to its own
/// final value.
pub fn load(cli_overrides: ConfigLayer) -> Result<OrchestratorConfig, OrchestratorError> {
    load_from(cli_overrides, None)
}

/// Like [`load`], but `config_path` (the CLI's `--config <path>`, spec §6)
/// overrides the default `<project_root>/cairn.toml` lookup entirely when set.
pub fn load_from(cli_overrides: ConfigLayer, config_path: Option<&Path>) -> Result<OrchestratorConfig, OrchestratorError> {
    let defaults = ConfigLayer::defaults();
    let env = ConfigLayer::from_env();

    let project_root_hint = cli_overrides
        .project_root
        .clone()
        .or_else(|| env.project_root.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let file = match config_path {
        Some(path) => read_toml_layer(path)?,
        None => read_toml_layer(&project_root_hint.join("cairn.toml"))?,
    };

    let merged = defaults.merge(file).merge(env).merge(cli_overrides);
    merged.validate()
}

fn read_toml_layer(path: &Path) -> Result<ConfigLayer, OrchestratorError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).map_err(|e| OrchestratorError::Config(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigLayer::default()),
        Err(e) => Err(OrchestratorError::Io(e)),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
