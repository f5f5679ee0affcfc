// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the orchestrator (spec §4.13, §7).

use cairn_core::{ErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no agent '{0}'")]
    NotFound(String),

    #[error("agent '{agent_id}' is {actual}, command requires {expected}")]
    InvalidState {
        agent_id: String,
        expected: &'static str,
        actual: String,
    },

    #[error("invalid command: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] cairn_store::StoreError),

    #[error(transparent)]
    Workspace(#[from] cairn_workspace::WorkspaceError),

    #[error(transparent)]
    Queue(#[from] cairn_queue::QueueError),

    #[error(transparent)]
    Engine(#[from] cairn_engine::EngineError),

    #[error(transparent)]
    Events(#[from] cairn_events::EventsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HasKind for OrchestratorError {
    fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::NotFound(_) => ErrorKind::NotFound,
            OrchestratorError::InvalidState { .. } => ErrorKind::InvalidState,
            OrchestratorError::InvalidInput(_) | OrchestratorError::Config(_) => ErrorKind::InvalidInput,
            OrchestratorError::Store(e) => e.kind(),
            OrchestratorError::Workspace(e) => e.kind(),
            OrchestratorError::Queue(e) => e.kind(),
            OrchestratorError::Engine(e) => e.kind(),
            OrchestratorError::Events(e) => e.kind(),
            OrchestratorError::Io(_) => ErrorKind::RecoverableIo,
        }
    }
}
