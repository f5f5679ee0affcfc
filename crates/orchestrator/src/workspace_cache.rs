// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace cache (spec §4.10 `WorkspaceCache`).
//!
//! An LRU map from workspace path to the pair of handles an agent workspace
//! needs: its `redb`-backed [`Kv`] and its in-memory [`Overlay`]. All
//! operations are serialized under a single lock, as the spec requires.
//! `Overlay` being `Clone` lets `get` behave as an owned-value checkout:
//! the entry is removed, a clone is reinserted at the back to record recency,
//! and the original is handed back to the caller. Since each agent's
//! workspace path is unique by construction, there is never more than one
//! live checkout of a given path outstanding, so this needs no additional
//! per-entry locking.

use indexmap::IndexMap;
use parking_lot::Mutex;

use cairn_workspace::{Kv, Overlay};

/// The pair of handles cached per workspace path.
#[derive(Clone)]
pub struct CachedWorkspace {
    pub kv: Kv,
    pub overlay: Overlay,
}

pub struct WorkspaceCache {
    capacity: usize,
    entries: Mutex<IndexMap<String, CachedWorkspace>>,
}

impl WorkspaceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Check the entry for `path` out of the cache, marking it
    /// most-recently-used. Returns `None` if not cached.
    pub fn get(&self, path: &str) -> Option<CachedWorkspace> {
        let mut entries = self.entries.lock();
        let workspace = entries.shift_remove(path)?;
        entries.insert(path.to_string(), workspace.clone());
        Some(workspace)
    }

    /// Insert or replace the entry for `path`, marking it most-recently-used.
    /// Evicts the least-recently-used entry first if already at capacity.
    pub fn put(&self, path: String, workspace: CachedWorkspace) {
        let mut entries = self.entries.lock();
        entries.shift_remove(&path);
        if entries.len() >= self.capacity {
            entries.shift_remove_index(0);
        }
        entries.insert(path, workspace);
    }

    /// Remove and drop the entry for `path`. Returns whether one was present.
    pub fn remove(&self, path: &str) -> bool {
        self.entries.lock().shift_remove(path).is_some()
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "workspace_cache_tests.rs"]
mod tests;
