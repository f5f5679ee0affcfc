// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line surface (spec §6): `up`, `queue`, `spawn`, `list-agents`,
//! `status`, `accept`, `reject`. Every subcommand opens the project's
//! on-disk workspaces directly rather than talking to a long-running
//! daemon over a socket — a networked adapter is explicitly out of this
//! crate's scope, so each invocation runs crash recovery and acts exactly
//! like a just-restarted orchestrator would.
//!
//! The collaborators wired in here (`FakeCodeProvider`/`FakeScriptHost`/
//! `NullToolFactory`) are the in-tree fakes spec §6 calls for; a real LLM
//! call or sandboxed script runtime is "a model-serving runtime", an
//! explicit top-level Non-goal, so this is the reference wiring rather
//! than a placeholder awaiting one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cairn_core::{AgentId, ErrorKind, HasKind, Priority, SystemClock};
use cairn_engine::test_support::{FakeCodeProvider, FakeScriptHost, NullToolFactory};
use cairn_orchestrator::config::{self, ConfigLayer};
use cairn_orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorError};
use cairn_wire::{Command, CommandResult};
use clap::{Parser, Subcommand};

use crate::exit_error::ExitError;
use crate::output::{format_or_json, handle_list, OutputFormat};

#[derive(Parser, Debug)]
#[command(
    name = "cairn",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    about = "Agent orchestration core",
    styles = crate::color::styles()
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Explicit path to the `cairn.toml` to load, bypassing `<project_root>/cairn.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root holding `.agentfs/`; defaults to `.`.
    #[arg(long, global = true)]
    pub project_root: Option<PathBuf>,

    /// Directory for workspace previews and the status snapshot; defaults to `<project_root>/.cairn`.
    #[arg(long, global = true)]
    pub cairn_home: Option<PathBuf>,

    #[arg(long, global = true)]
    pub max_concurrent_agents: Option<usize>,

    #[arg(long, global = true)]
    pub max_queue_size: Option<usize>,

    #[arg(long, global = true)]
    pub max_execution_time_secs: Option<u64>,

    #[arg(long, global = true)]
    pub max_memory_bytes: Option<u64>,

    #[arg(long, global = true)]
    pub code_provider: Option<String>,

    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the orchestrator service in the foreground: run crash recovery, then
    /// drive queued agents through their lifecycle until Ctrl-C.
    Up,
    /// Queue a task at NORMAL priority.
    Queue { task: String },
    /// Queue a task at HIGH priority.
    Spawn { task: String },
    /// List every known agent, active or persisted.
    ListAgents,
    /// Show one agent's current state.
    Status { agent_id: String },
    /// Merge an agent's REVIEWING workspace into `stable` and retire it.
    Accept { agent_id: String },
    /// Discard an agent's workspace without merging.
    Reject { agent_id: String },
}

fn cli_overrides(cli: &Cli) -> ConfigLayer {
    ConfigLayer {
        project_root: cli.project_root.clone(),
        cairn_home: cli.cairn_home.clone(),
        max_concurrent_agents: cli.max_concurrent_agents,
        max_queue_size: cli.max_queue_size,
        max_execution_time_secs: cli.max_execution_time_secs,
        max_memory_bytes: cli.max_memory_bytes,
        code_provider: cli.code_provider.clone(),
        ..Default::default()
    }
}

fn build_orchestrator(config: OrchestratorConfig) -> anyhow::Result<Arc<Orchestrator<SystemClock>>> {
    let code_provider: Arc<dyn cairn_engine::CodeProvider> = Arc::new(FakeCodeProvider::accepting(""));
    let script_host: Arc<dyn cairn_engine::ScriptHost> = Arc::new(FakeScriptHost::passing());
    let tool_factory: Arc<dyn cairn_engine::ToolFactory> = Arc::new(NullToolFactory);
    Ok(Orchestrator::new(config, SystemClock, code_provider, script_host, tool_factory)?)
}

/// Maps a component error's `ErrorKind` (spec §7) to a distinct process exit
/// code, so scripts driving `cairn` can branch on failure class without
/// parsing the message.
fn exit_code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::NotFound => 2,
        ErrorKind::InvalidState | ErrorKind::InvalidInput | ErrorKind::InvalidGraph => 3,
        ErrorKind::ResourceLimit => 4,
        ErrorKind::Timeout => 5,
        ErrorKind::WorkspaceMergeFailed => 6,
        ErrorKind::ProviderError | ErrorKind::VersionConflict | ErrorKind::RecoverableIo | ErrorKind::Cancelled | ErrorKind::Internal => 1,
    }
}

async fn submit(orchestrator: &Orchestrator<SystemClock>, command: Command) -> anyhow::Result<CommandResult> {
    orchestrator
        .submit_command(command)
        .await
        .map_err(|e: OrchestratorError| anyhow::Error::new(ExitError::new(exit_code_for(e.kind()), e.to_string())))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load_from(cli_overrides(&cli), cli.config.as_deref())?;
    let format = cli.output;

    match &cli.command {
        Commands::Up => run_up(config).await,
        Commands::Queue { task } => {
            let orchestrator = build_orchestrator(config)?;
            let result = submit(&orchestrator, Command::Queue { task: task.clone(), priority: Priority::Normal }).await?;
            print_result(format, &result)
        }
        Commands::Spawn { task } => {
            let orchestrator = build_orchestrator(config)?;
            let result = submit(&orchestrator, Command::Queue { task: task.clone(), priority: Priority::High }).await?;
            print_result(format, &result)
        }
        Commands::ListAgents => {
            let orchestrator = build_orchestrator(config)?;
            let result = submit(&orchestrator, Command::ListAgents).await?;
            print_result(format, &result)
        }
        Commands::Status { agent_id } => {
            let orchestrator = build_orchestrator(config)?;
            let result = submit(&orchestrator, Command::Status { agent_id: AgentId::from(agent_id.as_str()) }).await?;
            print_result(format, &result)
        }
        Commands::Accept { agent_id } => {
            let orchestrator = build_orchestrator(config)?;
            let result = submit(&orchestrator, Command::Accept { agent_id: AgentId::from(agent_id.as_str()) }).await?;
            print_result(format, &result)
        }
        Commands::Reject { agent_id } => {
            let orchestrator = build_orchestrator(config)?;
            let result = submit(&orchestrator, Command::Reject { agent_id: AgentId::from(agent_id.as_str()) }).await?;
            print_result(format, &result)
        }
    }
}

/// `up`: run crash recovery (already done by [`build_orchestrator`]), start
/// the dispatcher, then block until Ctrl-C and shut down cleanly.
async fn run_up(config: OrchestratorConfig) -> anyhow::Result<()> {
    let project_root = config.project_root.display().to_string();
    let orchestrator = build_orchestrator(config)?;
    orchestrator.start();
    println!("cairn orchestrator running ({})", crate::color::muted(&project_root));

    tokio::signal::ctrl_c().await?;
    println!("shutting down...");
    orchestrator.shutdown(Duration::from_secs(30)).await;
    Ok(())
}

fn print_result(format: OutputFormat, result: &CommandResult) -> anyhow::Result<()> {
    match result {
        CommandResult::Queued { agent_id } => format_or_json(format, result, || println!("queued {agent_id}")),
        CommandResult::Accepted => format_or_json(format, result, || println!("accepted")),
        CommandResult::Rejected => format_or_json(format, result, || println!("rejected")),
        CommandResult::Status { state, task, error, submission } => format_or_json(format, result, || {
            println!("state:    {state}");
            println!("task:     {task}");
            if let Some(error) = error {
                println!("error:    {} ({})", error.message, error.kind);
            }
            if let Some(submission) = submission {
                println!("summary:  {}", submission.summary);
                println!("changed:  {} file(s)", submission.changed_files.len());
            }
        }),
        CommandResult::Agents { agents } => handle_list(format, result, agents.is_empty(), "no agents", || {
            for (agent_id, summary) in agents {
                println!(
                    "{:<26}  {:<10}  {:<8}  {}",
                    crate::color::literal(&agent_id.to_string()),
                    crate::color::header(&summary.state.to_string()),
                    summary.priority.as_str(),
                    summary.task
                );
            }
        }),
    }
}
