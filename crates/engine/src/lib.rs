// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cairn-engine: per-agent lifecycle driving and DAG-batched graph execution
//! (spec §4.6, §4.8).
//!
//! This crate never talks to a real LLM or sandbox directly — it's generic
//! over [`collaborators::CodeProvider`], [`collaborators::ScriptHost`], and
//! [`collaborators::ToolFactory`], small `async_trait` interfaces injected
//! by the orchestrator. Enable `test-support` for in-tree fakes of all three.

pub mod collaborators;
pub mod error;
pub mod graph;
pub mod lifecycle_driver;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use collaborators::{CheckResult, CodeGenContext, CodeProvider, Discoverer, Externals, Inputs, ScriptHandle, ScriptHost, ScriptWrite, ToolFactory};
pub use error::EngineError;
pub use graph::{AgentNode, ErrorPolicy, GraphExecutor, GraphExecutorConfig, GraphRunSummary, ResultSummary};
pub use lifecycle_driver::{AgentLifecycleDriver, DriverConfig};
