// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cairn_core::{ErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no lifecycle record for agent '{0}'")]
    NotFound(String),

    #[error("version conflict saving record for agent '{0}'")]
    VersionConflict(String),

    #[error("update_atomic exhausted {attempts} retries for agent '{agent_id}'")]
    RetriesExhausted { agent_id: String, attempts: u32 },

    #[error(transparent)]
    Workspace(#[from] cairn_workspace::WorkspaceError),
}

impl HasKind for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::VersionConflict(_) | StoreError::RetriesExhausted { .. } => {
                ErrorKind::VersionConflict
            }
            StoreError::Workspace(e) => e.kind(),
        }
    }
}
