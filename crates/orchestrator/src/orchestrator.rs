// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Orchestrator`: owns the active-agents map, worker pool, queue, lifecycle
//! store, workspace cache, and the persistent `stable`/`bin` workspaces
//! (spec §4.7). Every public mutation goes through [`Orchestrator::submit_command`]
//! or the background dispatcher; nothing else writes to the shared state.
//!
//! Locking follows the fixed order from spec §9 to avoid deadlock:
//! lifecycle store → active-agents → workspace cache → queue. In practice
//! each of those is independently serialized (the store via CAS, the others
//! via their own internal mutex), so no command here ever holds two of them
//! at once; the order only matters if that ever changes.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cairn_core::{
    AgentContext, AgentError, AgentId, AgentState, Clock, Event, EventCategory, LifecycleRecord, Priority, RequestId, SystemClock,
};
use cairn_engine::{AgentLifecycleDriver, CodeProvider, DriverConfig, ScriptHost, ToolFactory};
use cairn_events::EventBus;
use cairn_queue::TaskQueue;
use cairn_store::LifecycleStore;
use cairn_wire::{AgentSummary, Command, CommandResult};
use cairn_workspace::{Kv, Overlay, StableWorkspace};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::workspace_cache::{CachedWorkspace, WorkspaceCache};

struct Dispatcher {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

pub struct Orchestrator<C: Clock = SystemClock> {
    config: OrchestratorConfig,
    store: LifecycleStore,
    stable: StableWorkspace,
    queue: TaskQueue,
    workspace_cache: WorkspaceCache,
    active_agents: Mutex<HashMap<AgentId, AgentContext>>,
    event_bus: Arc<EventBus>,
    driver: AgentLifecycleDriver<C>,
    semaphore: Arc<Semaphore>,
    dispatcher: Mutex<Option<Dispatcher>>,
    clock: C,
}

impl<C: Clock + 'static> Orchestrator<C> {
    /// Open or create `stable` and `bin`, then run crash recovery (spec §4.7
    /// initialization steps 1-2). Does not start the dispatcher — call
    /// [`Orchestrator::start`] once the caller is ready to process the queue.
    pub fn new(
        config: OrchestratorConfig,
        clock: C,
        code_provider: Arc<dyn CodeProvider>,
        script_host: Arc<dyn ScriptHost>,
        tool_factory: Arc<dyn ToolFactory>,
    ) -> Result<Arc<Self>, OrchestratorError> {
        std::fs::create_dir_all(config.agentfs_dir())?;
        std::fs::create_dir_all(config.workspaces_dir())?;
        if let Some(parent) = config.state_file().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let stable = StableWorkspace::open(Kv::open(config.agentfs_dir().join("stable.db"))?);
        let store = LifecycleStore::new(Kv::open(config.agentfs_dir().join("bin.db"))?);

        let driver_config = DriverConfig {
            scripts_dir: config.scripts_dir(),
            preview_root: config.workspaces_dir(),
            max_execution_time: config.max_execution_time,
            max_memory_bytes: config.max_memory_bytes,
        };
        let driver = AgentLifecycleDriver::new(code_provider, script_host, tool_factory, driver_config, clock.clone());

        let orchestrator = Arc::new(Self {
            queue: TaskQueue::new(config.max_queue_size),
            workspace_cache: WorkspaceCache::new(config.workspace_cache_size),
            active_agents: Mutex::new(HashMap::new()),
            event_bus: Arc::new(EventBus::default()),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_agents)),
            dispatcher: Mutex::new(None),
            clock,
            store,
            stable,
            driver,
            config,
        });

        orchestrator.recover()?;
        Ok(orchestrator)
    }

    /// Spec §4.7 initialization step 2: rebuild active-agents from every
    /// non-terminal lifecycle record, re-enqueuing those that never left
    /// QUEUED. Records whose workspace file vanished are marked ERRORED in
    /// place instead of being resurrected.
    fn recover(&self) -> Result<(), OrchestratorError> {
        for mut record in self.store.list_active()? {
            let workspace_file = PathBuf::from(&record.workspace_path);
            if !workspace_file.exists() {
                let now_ms = self.clock.epoch_ms();
                let mut ctx = record.to_context();
                ctx.mark_errored(
                    AgentError {
                        kind: "Internal".into(),
                        message: format!("workspace file missing at startup: {}", workspace_file.display()),
                        state_at_failure: ctx.state,
                    },
                    now_ms,
                );
                record.sync_from(&ctx);
                self.store.save(record)?;
                continue;
            }

            let overlay_base = self.overlay_base_dir(record.agent_id);
            let kv = Kv::open(&workspace_file)?;
            self.workspace_cache
                .put(record.workspace_path.clone(), CachedWorkspace { kv, overlay: Overlay::new(overlay_base) });

            let ctx = record.to_context();
            let state = ctx.state;
            let agent_id = ctx.agent_id;
            let priority = ctx.priority;
            self.active_agents.lock().insert(agent_id, ctx);

            if state == AgentState::Queued {
                self.queue.enqueue(agent_id, priority)?;
            }
            info!(%agent_id, ?state, "recovered non-terminal agent");
        }
        Ok(())
    }

    /// Start the background worker-dispatcher task (spec §4.7 initialization
    /// step 3). A no-op if already started.
    pub fn start(self: &Arc<Self>) {
        let mut guard = self.dispatcher.lock();
        if guard.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let child = cancel.child_token();
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.dispatcher_loop(child).await });
        *guard = Some(Dispatcher { cancel, handle });
    }

    async fn dispatcher_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut tasks: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                agent_id = self.queue.dequeue_wait() => {
                    let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let this = Arc::clone(&self);
                    tasks.spawn(async move { this.run_agent_once(agent_id, permit).await });
                }
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = result {
                        warn!(error = %e, "agent lifecycle task panicked");
                    }
                }
            }
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "agent lifecycle task panicked during shutdown drain");
            }
        }
    }

    async fn run_agent_once(self: Arc<Self>, agent_id: AgentId, _permit: tokio::sync::OwnedSemaphorePermit) {
        let Some(mut ctx) = self.active_agents.lock().get(&agent_id).cloned() else {
            warn!(%agent_id, "dispatcher: no active context for dequeued agent");
            return;
        };
        let mut record = match self.store.load(&agent_id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                error!(%agent_id, "dispatcher: lifecycle record missing for dequeued agent");
                return;
            }
            Err(e) => {
                error!(%agent_id, error = %e, "dispatcher: failed to load lifecycle record");
                return;
            }
        };
        let Some(cached) = self.workspace_cache.get(&ctx.workspace_path) else {
            error!(%agent_id, "dispatcher: workspace missing for dequeued agent");
            return;
        };

        self.publish_event(EventCategory::Agent, "started", agent_id);

        let mut overlay = cached.overlay;
        let agent_kv = cached.kv;
        let stable_path = self.config.agentfs_dir().join("stable.db").to_string_lossy().into_owned();
        let preview_target = self.config.workspaces_dir().join(agent_id.to_string());

        let outcome = self
            .driver
            .run(&mut ctx, &mut record, &self.store, &agent_kv, &stable_path, &mut overlay, &preview_target)
            .await;

        self.workspace_cache.put(ctx.workspace_path.clone(), CachedWorkspace { kv: agent_kv, overlay });

        match outcome {
            Ok(()) => {
                let action = if ctx.state == AgentState::Errored { "errored" } else { "reviewing" };
                self.active_agents.lock().insert(agent_id, ctx);
                self.publish_event(EventCategory::Agent, action, agent_id);
            }
            Err(e) => error!(%agent_id, error = %e, "lifecycle driver returned an infrastructure error"),
        }
    }

    /// Dispatch one [`Command`] (spec §4.7, §6).
    pub async fn submit_command(&self, command: Command) -> Result<CommandResult, OrchestratorError> {
        match command {
            Command::Queue { task, priority } => self.handle_queue(task, priority),
            Command::Accept { agent_id } => self.handle_accept(agent_id),
            Command::Reject { agent_id } => self.handle_reject(agent_id),
            Command::Status { agent_id } => self.handle_status(agent_id),
            Command::ListAgents => self.handle_list_agents(),
        }
    }

    fn handle_queue(&self, task: String, priority: Priority) -> Result<CommandResult, OrchestratorError> {
        let agent_id = AgentId::new();
        let now_ms = self.clock.epoch_ms();
        let workspace_file = self.agent_db_path(agent_id);

        let ctx = AgentContext::new(agent_id, task, priority, now_ms, workspace_file.display().to_string());
        let record = LifecycleRecord::new(&ctx);

        let kv = Kv::open(&workspace_file)?;
        self.workspace_cache
            .put(ctx.workspace_path.clone(), CachedWorkspace { kv, overlay: Overlay::new(self.overlay_base_dir(agent_id)) });

        if let Err(e) = self.store.save(record) {
            self.workspace_cache.remove(&ctx.workspace_path);
            let _ = std::fs::remove_file(&workspace_file);
            return Err(e.into());
        }

        self.active_agents.lock().insert(agent_id, ctx.clone());

        if let Err(e) = self.queue.enqueue(agent_id, priority) {
            self.active_agents.lock().remove(&agent_id);
            let _ = self.store.delete(&agent_id);
            self.workspace_cache.remove(&ctx.workspace_path);
            let _ = std::fs::remove_file(&workspace_file);
            return Err(e.into());
        }

        self.publish_event(EventCategory::Agent, "queued", agent_id);
        Ok(CommandResult::Queued { agent_id })
    }

    fn handle_accept(&self, agent_id: AgentId) -> Result<CommandResult, OrchestratorError> {
        let ctx = self
            .active_agents
            .lock()
            .get(&agent_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::NotFound(agent_id.to_string()))?;
        if ctx.state != AgentState::Reviewing {
            return Err(OrchestratorError::InvalidState {
                agent_id: agent_id.to_string(),
                expected: "REVIEWING",
                actual: ctx.state.to_string(),
            });
        }

        let cached = self
            .workspace_cache
            .get(&ctx.workspace_path)
            .ok_or_else(|| OrchestratorError::NotFound(agent_id.to_string()))?;

        // No partial merge is ever committed: a conflict under the ERROR
        // strategy leaves `stable` untouched and the agent stays REVIEWING
        // so the caller can retry (spec §7, §8 property 5).
        if let Err(e) = self.stable.merge_overlay(&cached.overlay, &self.config.accept_merge_strategy) {
            self.workspace_cache.put(ctx.workspace_path.clone(), cached);
            return Err(e.into());
        }
        self.workspace_cache.put(ctx.workspace_path.clone(), cached);

        let now_ms = self.clock.epoch_ms();
        let mut ctx = ctx;
        let transitioned = ctx.transition(AgentState::Accepted, now_ms);
        debug_assert!(transitioned, "REVIEWING -> ACCEPTED must be a legal edge");
        self.store.update_atomic(&agent_id, 5, |record| record.sync_from(&ctx))?;

        self.trash_workspace(&ctx);
        self.publish_event(EventCategory::Agent, "accepted", agent_id);
        Ok(CommandResult::Accepted)
    }

    fn handle_reject(&self, agent_id: AgentId) -> Result<CommandResult, OrchestratorError> {
        let ctx = self
            .active_agents
            .lock()
            .get(&agent_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::NotFound(agent_id.to_string()))?;
        if !matches!(ctx.state, AgentState::Reviewing | AgentState::Queued) {
            return Err(OrchestratorError::InvalidState {
                agent_id: agent_id.to_string(),
                expected: "REVIEWING or QUEUED",
                actual: ctx.state.to_string(),
            });
        }

        let now_ms = self.clock.epoch_ms();
        let mut ctx = ctx;
        let transitioned = ctx.transition(AgentState::Rejected, now_ms);
        debug_assert!(transitioned, "REVIEWING/QUEUED -> REJECTED must be a legal edge");
        self.store.update_atomic(&agent_id, 5, |record| record.sync_from(&ctx))?;

        self.trash_workspace(&ctx);
        self.publish_event(EventCategory::Agent, "rejected", agent_id);
        Ok(CommandResult::Rejected)
    }

    fn handle_status(&self, agent_id: AgentId) -> Result<CommandResult, OrchestratorError> {
        if let Some(ctx) = self.active_agents.lock().get(&agent_id).cloned() {
            return Ok(CommandResult::Status {
                state: ctx.state,
                task: ctx.task,
                error: ctx.error,
                submission: ctx.submission,
            });
        }
        if let Some(record) = self.store.load(&agent_id)? {
            return Ok(CommandResult::Status {
                state: record.state,
                task: record.task,
                error: record.error,
                submission: record.submission,
            });
        }
        Err(OrchestratorError::NotFound(agent_id.to_string()))
    }

    fn handle_list_agents(&self) -> Result<CommandResult, OrchestratorError> {
        let mut agents = BTreeMap::new();
        for record in self.store.list_all()? {
            agents.insert(
                record.agent_id,
                AgentSummary { state: record.state, task: record.task, priority: record.priority },
            );
        }
        for (agent_id, ctx) in self.active_agents.lock().iter() {
            agents.insert(*agent_id, AgentSummary { state: ctx.state, task: ctx.task.clone(), priority: ctx.priority });
        }
        Ok(CommandResult::Agents { agents })
    }

    /// Spec §4.7.1: every step is best-effort — a later step failing never
    /// undoes an earlier one that already succeeded.
    fn trash_workspace(&self, ctx: &AgentContext) {
        self.workspace_cache.remove(&ctx.workspace_path);

        let agent_db = self.agent_db_path(ctx.agent_id);
        let trash_db = self.trash_db_path(ctx.agent_id);
        if agent_db.exists() && !trash_db.exists() {
            if let Err(e) = std::fs::rename(&agent_db, &trash_db) {
                warn!(agent_id = %ctx.agent_id, error = %e, "trash protocol: failed to move workspace file");
            }
        }

        let trash_path = trash_db.display().to_string();
        if let Err(e) = self.store.update_atomic(&ctx.agent_id, 5, |record| {
            record.workspace_path = trash_path.clone();
        }) {
            warn!(agent_id = %ctx.agent_id, error = %e, "trash protocol: failed to update lifecycle record");
        }

        self.active_agents.lock().remove(&ctx.agent_id);

        let preview_dir = self.config.workspaces_dir().join(ctx.agent_id.to_string());
        if let Err(e) = std::fs::remove_dir_all(&preview_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(agent_id = %ctx.agent_id, error = %e, "trash protocol: failed to remove preview directory");
            }
        }
    }

    /// Human-input rendezvous (spec §4.9): publish `human:request_input` and
    /// await the matching `human:response_input`, correlated purely by
    /// `request_id` on the event stream — no map of pending requests needed.
    /// The concrete surface a running script uses to trigger this call lives
    /// outside this crate's retrieved collaborators (see DESIGN.md).
    pub async fn request_human_input(
        &self,
        agent_id: AgentId,
        question: String,
        options: Option<Vec<String>>,
        timeout: Duration,
    ) -> Result<String, OrchestratorError> {
        let request_id = RequestId::new();
        let now_ms = self.clock.epoch_ms();

        let mut payload = serde_json::Map::new();
        payload.insert("request_id".into(), serde_json::Value::String(request_id.to_string()));
        payload.insert("question".into(), serde_json::Value::String(question));
        if let Some(options) = options {
            payload.insert("options".into(), serde_json::Value::Array(options.into_iter().map(serde_json::Value::String).collect()));
        }
        self.event_bus.publish(
            Event::new(EventCategory::Human, "request_input", format!("evt-{request_id}"), now_ms)
                .with_agent(agent_id)
                .with_payload(payload),
        );

        let response = self
            .event_bus
            .wait_for(timeout, move |event| {
                event.category == EventCategory::Human
                    && event.action == "response_input"
                    && event.request_id() == Some(request_id)
            })
            .await?;

        response
            .payload
            .get("answer")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| OrchestratorError::InvalidInput("human:response_input missing 'answer'".into()))
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Cancel the dispatcher, wait up to `timeout` for in-flight agent tasks,
    /// then close every cached workspace (spec §4.7 shutdown). `stable` and
    /// `bin` close naturally when the last `Kv` clone referencing them drops.
    pub async fn shutdown(&self, timeout: Duration) {
        let dispatcher = self.dispatcher.lock().take();
        if let Some(Dispatcher { cancel, handle }) = dispatcher {
            cancel.cancel();
            if tokio::time::timeout(timeout, handle).await.is_err() {
                warn!("shutdown: dispatcher did not finish within timeout");
            }
        }
        self.workspace_cache.clear();
    }

    fn publish_event(&self, category: EventCategory, action: &'static str, agent_id: AgentId) {
        let now_ms = self.clock.epoch_ms();
        self.event_bus
            .publish(Event::new(category, action, format!("evt-{agent_id}-{now_ms}"), now_ms).with_agent(agent_id));
        self.write_state_snapshot(now_ms);
    }

    /// Spec §6 filesystem layout: `<cairn_home>/state/orchestrator.json`, a
    /// compact status snapshot rewritten on every meaningful transition.
    /// Best-effort — a write failure here never blocks the command it rode
    /// in on, it's just logged.
    fn write_state_snapshot(&self, now_ms: u64) {
        let running = self.config.max_concurrent_agents - self.semaphore.available_permits();
        let snapshot = serde_json::json!({
            "project_root": self.config.project_root.display().to_string(),
            "updated_at": now_ms,
            "queue": {
                "pending": self.queue.size(),
                "running": running,
            },
        });
        let path = self.config.state_file();
        let tmp_path = path.with_extension("json.tmp");
        let write_result = std::fs::write(&tmp_path, snapshot.to_string()).and_then(|_| std::fs::rename(&tmp_path, &path));
        if let Err(e) = write_result {
            warn!(error = %e, "failed to write orchestrator state snapshot");
        }
    }

    fn agent_db_path(&self, agent_id: AgentId) -> PathBuf {
        self.config.agentfs_dir().join(format!("agent-{agent_id}.db"))
    }

    fn trash_db_path(&self, agent_id: AgentId) -> PathBuf {
        self.config.agentfs_dir().join(format!("bin-agent-{agent_id}.db"))
    }

    fn overlay_base_dir(&self, agent_id: AgentId) -> PathBuf {
        self.config.workspaces_dir().join(agent_id.to_string()).join("base")
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
