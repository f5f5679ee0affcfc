// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AgentLifecycleDriver`: drives one [`AgentContext`] through GENERATING →
//! EXECUTING → SUBMITTING → REVIEWING, or into ERRORED (spec §4.6). Grounded
//! on `cairn/orchestrator.py`'s `_execute_agent_lifecycle` / `_generate_code`
//! / `_validate_code` / `_execute_script` / `_submit_results`, expressed
//! against this crate's [`CodeProvider`]/[`ScriptHost`] capability traits
//! instead of duck-typed collaborators.
//!
//! Every phase transition is persisted via the [`LifecycleStore`] *before*
//! the next phase's external I/O runs, so a crash always resumes from an
//! on-disk-consistent state (spec §4.6 preamble).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cairn_core::{AgentContext, AgentError, AgentState, Clock, LifecycleRecord, SUBMISSION_KEY};
use cairn_limiter::{LimiterError, ResourceLimiter};
use cairn_store::LifecycleStore;
use cairn_workspace::{Kv, Materializer, Overlay, Repository};
use tracing::info;

use crate::collaborators::{CodeGenContext, CodeProvider, ScriptHandle, ScriptHost, ToolFactory};
use crate::error::EngineError;

/// Filesystem layout and resource caps the driver needs (spec §4.14, §6).
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// `<project_root>/.scripts/agents` (spec §6).
    pub scripts_dir: PathBuf,
    /// `<cairn_home>/workspaces`, the materializer boundary for previews.
    pub preview_root: PathBuf,
    pub max_execution_time: Duration,
    pub max_memory_bytes: Option<u64>,
}

pub struct AgentLifecycleDriver<C: Clock> {
    code_provider: Arc<dyn CodeProvider>,
    script_host: Arc<dyn ScriptHost>,
    tool_factory: Arc<dyn ToolFactory>,
    limiter: ResourceLimiter,
    config: DriverConfig,
    clock: C,
}

impl<C: Clock> AgentLifecycleDriver<C> {
    pub fn new(
        code_provider: Arc<dyn CodeProvider>,
        script_host: Arc<dyn ScriptHost>,
        tool_factory: Arc<dyn ToolFactory>,
        config: DriverConfig,
        clock: C,
    ) -> Self {
        Self {
            code_provider,
            script_host,
            tool_factory,
            limiter: ResourceLimiter::new(),
            config,
            clock,
        }
    }

    /// Run the full lifecycle for `ctx`. `agent_kv` is the agent's private
    /// KV (for the submission record); `agent_overlay` accumulates the
    /// script's file writes (reported back by [`ScriptHandle::run`]) over
    /// the course of EXECUTING; `preview_target` is
    /// `<cairn_home>/workspaces/<agent_id>`.
    ///
    /// Returns `Ok(())` whether the agent reaches REVIEWING or ERRORED —
    /// both are a successfully-driven lifecycle. Only infrastructure
    /// failures (store I/O, illegal transitions) are returned as `Err`.
    pub async fn run(
        &self,
        ctx: &mut AgentContext,
        record: &mut LifecycleRecord,
        store: &LifecycleStore,
        agent_kv: &Kv,
        stable_path: &str,
        agent_overlay: &mut Overlay,
        preview_target: &Path,
    ) -> Result<(), EngineError> {
        self.transition(ctx, record, store, AgentState::Generating)?;

        let generated = match self.generate_code(ctx, stable_path).await {
            Ok(code) => code,
            Err(e) => return self.fail(ctx, record, store, "ProviderError", e.to_string()),
        };

        self.transition(ctx, record, store, AgentState::Executing)?;

        let handle = match self.check_script(ctx, &generated).await {
            Ok(handle) => handle,
            Err(EngineError::ScriptCheckFailed { errors }) => {
                return self.fail(ctx, record, store, "InvalidState", format!("Validation failed: {errors:?}"));
            }
            Err(e) => return self.fail(ctx, record, store, "InternalError", e.to_string()),
        };

        if let Err(e) = self.execute_script(ctx, handle.as_ref(), stable_path, agent_overlay).await {
            let kind = match &e {
                EngineError::ResourceLimit(LimiterError::Timeout) => "Timeout",
                EngineError::ResourceLimit(LimiterError::MemoryExceeded) => "ResourceLimit",
                _ => "InternalError",
            };
            return self.fail(ctx, record, store, kind, e.to_string());
        }

        self.transition(ctx, record, store, AgentState::Submitting)?;
        self.submit_results(ctx, agent_kv, agent_overlay, preview_target)?;
        self.transition(ctx, record, store, AgentState::Reviewing)?;
        Ok(())
    }

    async fn generate_code(&self, ctx: &AgentContext, stable_path: &str) -> Result<String, EngineError> {
        let gen_ctx = CodeGenContext {
            agent_id: ctx.agent_id,
            agent_workspace_path: &ctx.workspace_path,
            stable_path,
        };
        let code = self.code_provider.get_code(&ctx.task, &gen_ctx).await?;
        let (ok, error) = self.code_provider.validate_code(&code).await?;
        if !ok {
            return Err(EngineError::Provider(error.unwrap_or_else(|| "code provider validation failed".into())));
        }
        Ok(code)
    }

    async fn check_script(&self, ctx: &AgentContext, generated: &str) -> Result<Box<dyn ScriptHandle>, EngineError> {
        let agent_dir = self.config.scripts_dir.join(ctx.agent_id.to_string());
        std::fs::create_dir_all(&agent_dir)?;
        std::fs::write(agent_dir.join("script.txt"), generated)?;

        let handle = self.script_host.load(&agent_dir.join("script.txt")).await?;
        let check = handle.check().await?;
        std::fs::write(agent_dir.join("check.json"), serde_json::to_string_pretty(&check)?)?;

        if !check.valid {
            return Err(EngineError::ScriptCheckFailed { errors: check.errors });
        }
        Ok(handle)
    }

    async fn execute_script(
        &self,
        ctx: &AgentContext,
        handle: &dyn ScriptHandle,
        stable_path: &str,
        agent_overlay: &mut Overlay,
    ) -> Result<(), EngineError> {
        let mut inputs = crate::collaborators::Inputs::new();
        inputs.insert("task_description".into(), serde_json::Value::String(ctx.task.clone()));
        let externals = self.tool_factory.build(ctx.agent_id, &ctx.workspace_path, stable_path);

        let writes = self
            .limiter
            .limit(self.config.max_execution_time, self.config.max_memory_bytes, handle.run(inputs, externals))
            .await??;
        for write in writes {
            match write.contents {
                Some(bytes) => agent_overlay.write(write.path, bytes),
                None => agent_overlay.delete(write.path),
            }
        }
        Ok(())
    }

    fn submit_results(
        &self,
        ctx: &mut AgentContext,
        agent_kv: &Kv,
        agent_overlay: &Overlay,
        preview_target: &Path,
    ) -> Result<(), EngineError> {
        let repo: Repository<cairn_core::SubmissionRecord> = Repository::new(agent_kv.clone(), "");
        ctx.submission = repo.load(SUBMISSION_KEY)?.map(|(_, record)| record);

        let materializer = Materializer::new(&self.config.preview_root);
        materializer.materialize(agent_overlay, preview_target)?;
        Ok(())
    }

    fn fail(
        &self,
        ctx: &mut AgentContext,
        record: &mut LifecycleRecord,
        store: &LifecycleStore,
        kind: &str,
        message: String,
    ) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let state_at_failure = ctx.state;
        ctx.mark_errored(AgentError { kind: kind.into(), message, state_at_failure }, now_ms);
        self.persist(ctx, record, store)
    }

    fn transition(
        &self,
        ctx: &mut AgentContext,
        record: &mut LifecycleRecord,
        store: &LifecycleStore,
        next: AgentState,
    ) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let ok = ctx.transition(next, now_ms);
        debug_assert!(ok, "illegal lifecycle transition to {next:?}");
        info!(agent_id = %ctx.agent_id, %next, "agent phase transition");
        self.persist(ctx, record, store)
    }

    fn persist(&self, ctx: &AgentContext, record: &mut LifecycleRecord, store: &LifecycleStore) -> Result<(), EngineError> {
        record.sync_from(ctx);
        *record = store.save(record.clone())?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_driver_tests.rs"]
mod tests;
