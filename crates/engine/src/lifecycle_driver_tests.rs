// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use cairn_core::{AgentContext, AgentId, AgentState, Clock, FakeClock, LifecycleRecord, Priority};
use cairn_store::LifecycleStore;
use cairn_workspace::{Kv, Overlay};

use crate::collaborators::{CheckResult, Externals, Inputs};
use crate::test_support::{FakeCodeProvider, FakeScriptHost, NullToolFactory};

use super::*;

struct Fixture {
    _dir: tempfile::TempDir,
    store: LifecycleStore,
    agent_kv: Kv,
    overlay: Overlay,
    preview_target: std::path::PathBuf,
    clock: FakeClock,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LifecycleStore::new(Kv::open(dir.path().join("bin.db")).expect("kv"));
        let agent_kv = Kv::open(dir.path().join("agent.db")).expect("agent kv");
        let overlay = Overlay::new(dir.path().join("stable"));
        let preview_target = dir.path().join("workspaces").join("preview");
        Self { _dir: dir, store, agent_kv, overlay, preview_target, clock: FakeClock::new() }
    }

    fn driver(&self, code_provider: Arc<dyn CodeProvider>, script_host: Arc<dyn ScriptHost>) -> AgentLifecycleDriver<FakeClock> {
        AgentLifecycleDriver::new(
            code_provider,
            script_host,
            Arc::new(NullToolFactory),
            DriverConfig {
                scripts_dir: self._dir.path().join("scripts"),
                preview_root: self._dir.path().join("workspaces"),
                max_execution_time: Duration::from_secs(5),
                max_memory_bytes: None,
            },
            self.clock.clone(),
        )
    }

    fn fresh_ctx(&self) -> (AgentContext, LifecycleRecord) {
        let ctx = AgentContext::new(AgentId::new(), "fix the bug", Priority::Normal, self.clock.epoch_ms(), "/tmp/agent-workspace");
        let record = LifecycleRecord::new(&ctx);
        (ctx, record)
    }
}

#[tokio::test]
async fn successful_run_reaches_reviewing_with_persisted_record() {
    let mut fx = Fixture::new();
    let drv = fx.driver(Arc::new(FakeCodeProvider::accepting("print('hello')")), Arc::new(FakeScriptHost::passing()));

    let (mut ctx, mut record) = fx.fresh_ctx();
    drv.run(&mut ctx, &mut record, &fx.store, &fx.agent_kv, "/tmp/stable", &mut fx.overlay, &fx.preview_target)
        .await
        .expect("run succeeds");

    assert_eq!(ctx.state, AgentState::Reviewing);
    assert!(ctx.error.is_none());

    let persisted = fx.store.load(&ctx.agent_id).expect("load").expect("record present");
    assert_eq!(persisted.state, AgentState::Reviewing);
    assert_eq!(persisted.version, record.version);
}

#[tokio::test]
async fn script_writes_are_applied_to_the_agent_overlay() {
    let mut fx = Fixture::new();
    let script_host = FakeScriptHost::writing(vec![crate::collaborators::ScriptWrite {
        path: "notes/hello.txt".into(),
        contents: Some(b"hi".to_vec()),
    }]);
    let drv = fx.driver(Arc::new(FakeCodeProvider::accepting("print('hello')")), Arc::new(script_host));

    let (mut ctx, mut record) = fx.fresh_ctx();
    drv.run(&mut ctx, &mut record, &fx.store, &fx.agent_kv, "/tmp/stable", &mut fx.overlay, &fx.preview_target)
        .await
        .expect("run succeeds");

    assert_eq!(ctx.state, AgentState::Reviewing);
    assert_eq!(fx.overlay.read("notes/hello.txt").expect("read"), Some(b"hi".to_vec()));
}

#[tokio::test]
async fn code_provider_rejection_errors_with_provider_error_kind() {
    let mut fx = Fixture::new();
    let drv = fx.driver(
        Arc::new(FakeCodeProvider::rejecting("bad code", "syntax error")),
        Arc::new(FakeScriptHost::passing()),
    );

    let (mut ctx, mut record) = fx.fresh_ctx();
    drv.run(&mut ctx, &mut record, &fx.store, &fx.agent_kv, "/tmp/stable", &mut fx.overlay, &fx.preview_target)
        .await
        .expect("driver never returns Err for agent-level failures");

    assert_eq!(ctx.state, AgentState::Errored);
    let error = ctx.error.as_ref().expect("error present");
    assert_eq!(error.kind, "ProviderError");
    assert_eq!(error.state_at_failure, AgentState::Generating);
}

#[tokio::test]
async fn script_check_failure_errors_with_invalid_state_kind() {
    let mut fx = Fixture::new();
    let drv = fx.driver(
        Arc::new(FakeCodeProvider::accepting("code")),
        Arc::new(FakeScriptHost::failing_check(vec!["undefined name".into()])),
    );

    let (mut ctx, mut record) = fx.fresh_ctx();
    drv.run(&mut ctx, &mut record, &fx.store, &fx.agent_kv, "/tmp/stable", &mut fx.overlay, &fx.preview_target)
        .await
        .expect("driver never returns Err for agent-level failures");

    assert_eq!(ctx.state, AgentState::Errored);
    let error = ctx.error.as_ref().expect("error present");
    assert_eq!(error.kind, "InvalidState");
    assert_eq!(error.state_at_failure, AgentState::Executing);
}

#[tokio::test]
async fn script_run_failure_errors_with_internal_error_kind() {
    let mut fx = Fixture::new();
    let drv = fx.driver(Arc::new(FakeCodeProvider::accepting("code")), Arc::new(FakeScriptHost::failing_run("boom")));

    let (mut ctx, mut record) = fx.fresh_ctx();
    drv.run(&mut ctx, &mut record, &fx.store, &fx.agent_kv, "/tmp/stable", &mut fx.overlay, &fx.preview_target)
        .await
        .expect("driver never returns Err for agent-level failures");

    assert_eq!(ctx.state, AgentState::Errored);
    let error = ctx.error.as_ref().expect("error present");
    assert_eq!(error.kind, "InternalError");
    assert_eq!(error.state_at_failure, AgentState::Executing);
}

#[tokio::test]
async fn timeout_during_execution_is_classified_as_timeout() {
    let mut fx = Fixture::new();
    let drv = AgentLifecycleDriver::new(
        Arc::new(FakeCodeProvider::accepting("code")),
        Arc::new(SlowScriptHost),
        Arc::new(NullToolFactory),
        DriverConfig {
            scripts_dir: fx._dir.path().join("scripts"),
            preview_root: fx._dir.path().join("workspaces"),
            max_execution_time: Duration::from_millis(5),
            max_memory_bytes: None,
        },
        fx.clock.clone(),
    );

    let (mut ctx, mut record) = fx.fresh_ctx();
    drv.run(&mut ctx, &mut record, &fx.store, &fx.agent_kv, "/tmp/stable", &mut fx.overlay, &fx.preview_target)
        .await
        .expect("driver never returns Err for agent-level failures");

    assert_eq!(ctx.state, AgentState::Errored);
    assert_eq!(ctx.error.as_ref().expect("error present").kind, "Timeout");
}

struct SlowScriptHost;

#[async_trait::async_trait]
impl ScriptHost for SlowScriptHost {
    async fn load(&self, _path: &std::path::Path) -> Result<Box<dyn ScriptHandle>, EngineError> {
        Ok(Box::new(SlowScriptHandle))
    }
}

struct SlowScriptHandle;

#[async_trait::async_trait]
impl ScriptHandle for SlowScriptHandle {
    async fn check(&self) -> Result<CheckResult, EngineError> {
        Ok(CheckResult { valid: true, errors: Vec::new() })
    }

    async fn run(&self, _inputs: Inputs, _externals: Externals) -> Result<Vec<crate::collaborators::ScriptWrite>, EngineError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(Vec::new())
    }
}
