// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: owns the active-agents map, queue, lifecycle store,
//! workspace cache, and the stable/bin workspaces, and exposes the command
//! surface (`Command`/`CommandResult` from `cairn-wire`) that `cairn-cli`
//! and any other front end drive against.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod workspace_cache;

pub use config::{ConfigLayer, OrchestratorConfig};
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use workspace_cache::{CachedWorkspace, WorkspaceCache};
