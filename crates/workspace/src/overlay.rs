// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Copy-on-write overlay over a base directory (spec §4.1 `Overlay`).
//!
//! Writes land in an in-memory map keyed by path relative to the overlay
//! root; reads fall through to the map first, then to the base directory on
//! disk. A deleted path is recorded as a tombstone (`None`) so it stops
//! shadowing through to base.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::WorkspaceError;

/// Caller-supplied resolver for [`MergeStrategy::Callback`]: given a path and
/// the conflicting (existing, incoming) bytes, returns the bytes to keep.
pub type ConflictResolver = Arc<dyn Fn(&str, Option<&[u8]>, Option<&[u8]>) -> Vec<u8> + Send + Sync>;

/// How conflicting paths are resolved when merging one overlay into another.
#[derive(Clone)]
pub enum MergeStrategy {
    /// The overlay being merged in wins on conflicts.
    Overwrite,
    /// The target's existing content is preserved on conflicts.
    Preserve,
    /// A conflict is a hard error.
    Error,
    /// The resolver picks the winning bytes for each conflict.
    Callback(ConflictResolver),
}

impl fmt::Debug for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Overwrite => f.write_str("Overwrite"),
            MergeStrategy::Preserve => f.write_str("Preserve"),
            MergeStrategy::Error => f.write_str("Error"),
            MergeStrategy::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl PartialEq for MergeStrategy {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Overwrite, Self::Overwrite) | (Self::Preserve, Self::Preserve) | (Self::Error, Self::Error)
        )
    }
}

#[derive(Debug, Clone)]
pub struct MergeConflict {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct MergeFileError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    pub files_merged: usize,
    pub conflicts: Vec<MergeConflict>,
    pub errors: Vec<MergeFileError>,
}

/// An in-memory copy-on-write layer on top of `base_dir`.
#[derive(Clone)]
pub struct Overlay {
    base_dir: PathBuf,
    changes: BTreeMap<String, Option<Vec<u8>>>,
}

impl Overlay {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            changes: BTreeMap::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn write(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.changes.insert(path.into(), Some(contents.into()));
    }

    pub fn delete(&mut self, path: impl Into<String>) {
        self.changes.insert(path.into(), None);
    }

    /// Read a path: overlay changes shadow the base directory, including
    /// tombstones (a deleted path reads as absent even if base still has it).
    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>, WorkspaceError> {
        if let Some(entry) = self.changes.get(path) {
            return Ok(entry.clone());
        }
        match fs::read(self.base_dir.join(path)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkspaceError::Io(e)),
        }
    }

    /// Paths this overlay has written or deleted, relative to its root.
    pub fn list_changes(&self) -> Vec<String> {
        self.changes.keys().cloned().collect()
    }

    /// Remove staged changes for `paths` (or all changes when `None`),
    /// returning the overlay to base state for those paths.
    pub fn reset(&mut self, paths: Option<&[String]>) -> usize {
        match paths {
            None => {
                let count = self.changes.len();
                self.changes.clear();
                count
            }
            Some(paths) => {
                let mut removed = 0;
                for path in paths {
                    if self.changes.remove(path).is_some() {
                        removed += 1;
                    }
                }
                removed
            }
        }
    }

    /// Merge `source`'s staged changes into this overlay. A path conflicts
    /// only when both sides stage it and the staged bytes differ (spec
    /// §4.1) — an overlay re-staging the same content as the target is not
    /// a conflict.
    pub fn merge(&mut self, source: &Overlay, strategy: &MergeStrategy) -> Result<MergeResult, WorkspaceError> {
        let mut result = MergeResult::default();
        for (path, value) in &source.changes {
            let existing = self.changes.get(path);
            let conflict = existing.is_some_and(|existing_value| existing_value != value);
            if conflict {
                match strategy {
                    MergeStrategy::Overwrite => {
                        self.changes.insert(path.clone(), value.clone());
                        result.files_merged += 1;
                    }
                    MergeStrategy::Preserve => {
                        result.conflicts.push(MergeConflict { path: path.clone() });
                    }
                    MergeStrategy::Error => {
                        return Err(WorkspaceError::MergeFailed {
                            attempted: source.changes.len(),
                            failed: 1,
                            detail: format!("conflicting path '{path}'"),
                        });
                    }
                    MergeStrategy::Callback(resolve) => {
                        let existing_bytes = existing.and_then(|v| v.as_deref());
                        let resolved = resolve(path, existing_bytes, value.as_deref());
                        self.changes.insert(path.clone(), Some(resolved));
                        result.conflicts.push(MergeConflict { path: path.clone() });
                        result.files_merged += 1;
                    }
                }
            } else {
                self.changes.insert(path.clone(), value.clone());
                result.files_merged += 1;
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod tests;
