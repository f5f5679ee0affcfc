// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-tree `CodeProvider`/`ScriptHost`/`ToolFactory` fakes so integration
//! tests (and this crate's own unit tests) can drive the full agent
//! lifecycle deterministically, without a real LLM or sandboxed script
//! runtime (spec §6 explicitly requires this). Gated behind
//! `#[cfg(any(test, feature = "test-support"))]`, the same pattern
//! `cairn-core`'s `define_id!`-generated test helpers use.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cairn_core::AgentId;

use crate::collaborators::{CheckResult, CodeGenContext, CodeProvider, Externals, Inputs, ScriptHandle, ScriptHost, ScriptWrite, ToolFactory};
use crate::error::EngineError;

/// Returns a fixed snippet of generated code; optionally rejects it on
/// `validate_code`, or fails `get_code` outright, to drive ERRORED paths.
pub struct FakeCodeProvider {
    pub code: String,
    pub reject_reason: Option<String>,
    pub fail_generation: Option<String>,
}

impl FakeCodeProvider {
    pub fn accepting(code: impl Into<String>) -> Self {
        Self { code: code.into(), reject_reason: None, fail_generation: None }
    }

    pub fn rejecting(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { code: code.into(), reject_reason: Some(reason.into()), fail_generation: None }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self { code: String::new(), reject_reason: None, fail_generation: Some(reason.into()) }
    }
}

#[async_trait]
impl CodeProvider for FakeCodeProvider {
    async fn get_code(&self, _task: &str, _ctx: &CodeGenContext<'_>) -> Result<String, EngineError> {
        match &self.fail_generation {
            Some(reason) => Err(EngineError::Provider(reason.clone())),
            None => Ok(self.code.clone()),
        }
    }

    async fn validate_code(&self, _code: &str) -> Result<(bool, Option<String>), EngineError> {
        match &self.reject_reason {
            Some(reason) => Ok((false, Some(reason.clone()))),
            None => Ok((true, None)),
        }
    }
}

/// A script whose `check`/`run` outcomes are fixed in advance, and whose
/// `run` invocation count is observable for assertions.
pub struct FakeScriptHandle {
    check_result: CheckResult,
    run_error: Option<String>,
    writes: Vec<ScriptWrite>,
    run_count: AtomicUsize,
    recorded_inputs: Mutex<Vec<Inputs>>,
}

impl FakeScriptHandle {
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }

    pub fn recorded_inputs(&self) -> Vec<Inputs> {
        self.recorded_inputs.lock().expect("fake script handle mutex poisoned").clone()
    }
}

#[async_trait]
impl ScriptHandle for FakeScriptHandle {
    async fn check(&self) -> Result<CheckResult, EngineError> {
        Ok(self.check_result.clone())
    }

    async fn run(&self, inputs: Inputs, _externals: Externals) -> Result<Vec<ScriptWrite>, EngineError> {
        self.run_count.fetch_add(1, Ordering::SeqCst);
        self.recorded_inputs.lock().expect("fake script handle mutex poisoned").push(inputs);
        match &self.run_error {
            Some(reason) => Err(EngineError::ScriptExecution(reason.clone())),
            None => Ok(self.writes.clone()),
        }
    }
}

pub struct FakeScriptHost {
    pub valid: bool,
    pub check_errors: Vec<String>,
    pub run_error: Option<String>,
    pub writes: Vec<ScriptWrite>,
}

impl FakeScriptHost {
    pub fn passing() -> Self {
        Self { valid: true, check_errors: Vec::new(), run_error: None, writes: Vec::new() }
    }

    pub fn failing_check(errors: Vec<String>) -> Self {
        Self { valid: false, check_errors: errors, run_error: None, writes: Vec::new() }
    }

    pub fn failing_run(reason: impl Into<String>) -> Self {
        Self { valid: true, check_errors: Vec::new(), run_error: Some(reason.into()), writes: Vec::new() }
    }

    /// A passing run that reports `writes` as the script's file effects,
    /// for driving ACCEPT/REJECT scenarios end to end (spec §8 S1/S4).
    pub fn writing(writes: Vec<ScriptWrite>) -> Self {
        Self { valid: true, check_errors: Vec::new(), run_error: None, writes }
    }
}

#[async_trait]
impl ScriptHost for FakeScriptHost {
    async fn load(&self, _path: &Path) -> Result<Box<dyn ScriptHandle>, EngineError> {
        Ok(Box::new(FakeScriptHandle {
            check_result: CheckResult { valid: self.valid, errors: self.check_errors.clone() },
            run_error: self.run_error.clone(),
            writes: self.writes.clone(),
            run_count: AtomicUsize::new(0),
            recorded_inputs: Mutex::new(Vec::new()),
        }))
    }
}

/// Builds an empty externals map; real implementations bind actual
/// filesystem/search tools here, scoped to the agent's overlay.
pub struct NullToolFactory;

impl ToolFactory for NullToolFactory {
    fn build(&self, _agent_id: AgentId, _agent_workspace_path: &str, _stable_path: &str) -> Externals {
        Externals::new()
    }
}
