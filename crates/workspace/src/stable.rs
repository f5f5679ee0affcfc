// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `StableWorkspace`: the project's accepted state (spec §3, §6
//! `.agentfs/stable.db`) — a path-keyed, `redb`-backed store read by every
//! in-flight agent and written only through the accept-merge protocol
//! (spec §4.7). Unlike [`crate::overlay::Overlay`] (an in-memory COW layer
//! over a directory of real files, used for an agent's own scratch
//! workspace), `stable` must survive a restart on its own, so its content
//! lives directly in a [`Kv`] keyed by normalized relative path rather than
//! on disk.

use crate::error::WorkspaceError;
use crate::kv::Kv;
use crate::overlay::{MergeConflict, MergeResult, MergeStrategy, Overlay};

pub struct StableWorkspace {
    kv: Kv,
}

impl StableWorkspace {
    pub fn open(kv: Kv) -> Self {
        Self { kv }
    }

    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>, WorkspaceError> {
        self.kv.get(path)
    }

    pub fn exists(&self, path: &str) -> Result<bool, WorkspaceError> {
        Ok(self.kv.get(path)?.is_some())
    }

    pub fn write(&self, path: &str, contents: &[u8]) -> Result<(), WorkspaceError> {
        self.kv.set(path, contents)
    }

    pub fn delete(&self, path: &str) -> Result<(), WorkspaceError> {
        self.kv.delete(path)
    }

    /// Merge `overlay`'s staged writes/deletes into `stable` (spec §4.7
    /// ACCEPT). A path conflicts only when `stable` already has it *and*
    /// its bytes differ from what the overlay stages (spec §4.1: "both
    /// sides present, bytes differ") — restaging identical content never
    /// conflicts. Under [`MergeStrategy::Error`] a conflict aborts the
    /// whole merge with nothing committed — `stable` is left byte-for-byte
    /// as it was (spec §7, §8 property 5).
    pub fn merge_overlay(&self, overlay: &Overlay, strategy: &MergeStrategy) -> Result<MergeResult, WorkspaceError> {
        let mut entries = Vec::new();
        let mut conflicts = Vec::new();
        for path in overlay.list_changes() {
            let overlay_value = overlay.read(&path)?;
            let stable_value = self.read(&path)?;
            let is_conflict = stable_value.is_some() && stable_value != overlay_value;
            if is_conflict {
                conflicts.push(path.clone());
            }
            entries.push((path, overlay_value, stable_value, is_conflict));
        }

        if matches!(strategy, MergeStrategy::Error) && !conflicts.is_empty() {
            return Err(WorkspaceError::MergeFailed {
                attempted: entries.len(),
                failed: conflicts.len(),
                detail: format!("conflicting path(s): {conflicts:?}"),
            });
        }

        let mut result = MergeResult::default();
        let mut txn = self.kv.transaction();
        for (path, overlay_value, stable_value, is_conflict) in entries {
            if is_conflict {
                match strategy {
                    MergeStrategy::Preserve => {
                        result.conflicts.push(MergeConflict { path });
                        continue;
                    }
                    MergeStrategy::Callback(resolve) => {
                        let resolved = resolve(&path, stable_value.as_deref(), overlay_value.as_deref());
                        result.conflicts.push(MergeConflict { path: path.clone() });
                        txn.set(path, &resolved);
                        result.files_merged += 1;
                        continue;
                    }
                    MergeStrategy::Overwrite | MergeStrategy::Error => {}
                }
            }
            match overlay_value {
                Some(bytes) => txn.set(path, &bytes),
                None => txn.delete(path),
            }
            result.files_merged += 1;
        }
        txn.commit()?;
        Ok(result)
    }
}

#[cfg(test)]
#[path = "stable_tests.rs"]
mod tests;
