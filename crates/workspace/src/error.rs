// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the workspace layer (spec §7).

use cairn_core::{ErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("path '{0}' escapes the workspace boundary")]
    PathEscapesBoundary(String),

    #[error("refused to materialize onto filesystem root")]
    RefusedRootTarget,

    #[error("version conflict on key '{key}': expected {expected}, found {actual}")]
    VersionConflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("key '{0}' not found")]
    NotFound(String),

    #[error("overlay merge failed for {failed} of {attempted} path(s): {detail}")]
    MergeFailed {
        attempted: usize,
        failed: usize,
        detail: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb error: {0}")]
    Redb(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl HasKind for WorkspaceError {
    fn kind(&self) -> ErrorKind {
        match self {
            WorkspaceError::PathEscapesBoundary(_) | WorkspaceError::RefusedRootTarget => {
                ErrorKind::InvalidInput
            }
            WorkspaceError::VersionConflict { .. } => ErrorKind::VersionConflict,
            WorkspaceError::NotFound(_) => ErrorKind::NotFound,
            WorkspaceError::MergeFailed { .. } => ErrorKind::WorkspaceMergeFailed,
            WorkspaceError::Io(_) | WorkspaceError::Redb(_) => ErrorKind::RecoverableIo,
            WorkspaceError::Serde(_) => ErrorKind::Internal,
        }
    }
}
