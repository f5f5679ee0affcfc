// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cairn_core::{ErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("code provider failed: {0}")]
    Provider(String),
    #[error("script check failed: {errors:?}")]
    ScriptCheckFailed { errors: Vec<String> },
    #[error("script execution failed: {0}")]
    ScriptExecution(String),
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(#[from] cairn_limiter::LimiterError),
    #[error("dependency cycle detected among nodes: {0:?}")]
    InvalidGraph(Vec<String>),
    #[error(transparent)]
    Store(#[from] cairn_store::StoreError),
    #[error(transparent)]
    Workspace(#[from] cairn_workspace::WorkspaceError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl cairn_core::HasKind for EngineError {
    fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Provider(_) => ErrorKind::ProviderError,
            EngineError::ScriptCheckFailed { .. } => ErrorKind::InvalidState,
            EngineError::ScriptExecution(_) => ErrorKind::Internal,
            EngineError::ResourceLimit(cairn_limiter::LimiterError::Timeout) => ErrorKind::Timeout,
            EngineError::ResourceLimit(cairn_limiter::LimiterError::MemoryExceeded) => ErrorKind::ResourceLimit,
            EngineError::InvalidGraph(_) => ErrorKind::InvalidGraph,
            EngineError::Store(e) => e.kind(),
            EngineError::Workspace(e) => e.kind(),
            EngineError::Io(_) => ErrorKind::RecoverableIo,
            EngineError::Serde(_) => ErrorKind::Internal,
        }
    }
}
