// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic on-disk materialization of an [`Overlay`] (spec §4.1 `Materializer`).
//!
//! `materialize` stages the merged base+overlay tree in a sibling directory,
//! then swaps it into place: if `target` doesn't exist yet the staging dir is
//! renamed straight onto it; otherwise the existing `target` is renamed aside
//! as a backup, the staging dir renamed onto `target`, and the backup removed
//! — restoring the backup if any step after it fails. A cross-device rename
//! (`EXDEV`) falls back to a recursive copy-then-remove. The staging dir is
//! always cleaned up, best-effort, whether or not the swap succeeded.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::WorkspaceError;
use crate::overlay::Overlay;

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub path: String,
    pub kind: DiffKind,
}

pub struct Materializer {
    /// Directory all materialization targets must live under.
    boundary: PathBuf,
}

impl Materializer {
    pub fn new(boundary: impl Into<PathBuf>) -> Self {
        Self {
            boundary: boundary.into(),
        }
    }

    fn validate_target(&self, target: &Path) -> Result<(), WorkspaceError> {
        if target.parent().is_none() {
            return Err(WorkspaceError::RefusedRootTarget);
        }
        if target == self.boundary {
            return Err(WorkspaceError::PathEscapesBoundary(target.display().to_string()));
        }
        if !target.starts_with(&self.boundary) {
            return Err(WorkspaceError::PathEscapesBoundary(target.display().to_string()));
        }
        Ok(())
    }

    /// Write `overlay`'s base + staged changes atomically into `target`.
    pub fn materialize(&self, overlay: &Overlay, target: &Path) -> Result<(), WorkspaceError> {
        self.validate_target(target)?;

        let staging = self.new_staging_dir(target)?;
        let result = self.stage_tree(overlay, &staging).and_then(|()| self.swap_into_place(&staging, target));
        let _ = fs::remove_dir_all(&staging);
        result
    }

    fn new_staging_dir(&self, target: &Path) -> Result<PathBuf, WorkspaceError> {
        let parent = target.parent().ok_or(WorkspaceError::RefusedRootTarget)?;
        fs::create_dir_all(parent)?;
        let suffix = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
        let staging = parent.join(format!(".cairn-staging-{}-{suffix}", std::process::id()));
        fs::create_dir_all(&staging)?;
        Ok(staging)
    }

    fn stage_tree(&self, overlay: &Overlay, staging: &Path) -> Result<(), WorkspaceError> {
        if overlay.base_dir().exists() {
            copy_recursive(overlay.base_dir(), staging)?;
        }
        for path in overlay.list_changes() {
            let dest = staging.join(&path);
            match overlay.read(&path)? {
                Some(contents) => {
                    if let Some(parent) = dest.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&dest, contents)?;
                }
                None => {
                    if dest.is_dir() {
                        let _ = fs::remove_dir_all(&dest);
                    } else {
                        let _ = fs::remove_file(&dest);
                    }
                }
            }
        }
        Ok(())
    }

    fn swap_into_place(&self, staging: &Path, target: &Path) -> Result<(), WorkspaceError> {
        if !target.exists() {
            return rename_with_exdev_fallback(staging, target);
        }

        let backup = target.with_extension("cairn-backup");
        let _ = fs::remove_dir_all(&backup);
        fs::rename(target, &backup)?;

        if let Err(e) = rename_with_exdev_fallback(staging, target) {
            // Best-effort restore; surface the original failure either way.
            let _ = fs::rename(&backup, target);
            return Err(e);
        }
        let _ = fs::remove_dir_all(&backup);
        Ok(())
    }

    /// Compare `overlay`'s materialized tree against what's currently on
    /// `target`: size mismatch first, falling back to a content hash, and
    /// only doing a full byte comparison if the hashes collide.
    pub fn diff(&self, overlay: &Overlay, target: &Path) -> Result<Vec<DiffEntry>, WorkspaceError> {
        let mut entries = Vec::new();
        for path in overlay.list_changes() {
            let overlay_bytes = overlay.read(&path)?;
            let target_path = target.join(&path);
            let target_bytes = match fs::read(&target_path) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(WorkspaceError::Io(e)),
            };

            match (overlay_bytes, target_bytes) {
                (Some(_), None) => entries.push(DiffEntry { path, kind: DiffKind::Added }),
                (None, Some(_)) => entries.push(DiffEntry { path, kind: DiffKind::Removed }),
                (Some(a), Some(b)) => {
                    if content_differs(&a, &b) {
                        entries.push(DiffEntry { path, kind: DiffKind::Modified });
                    }
                }
                (None, None) => {}
            }
        }
        Ok(entries)
    }

    /// Alias of [`Materializer::diff`]: what `materialize` would change.
    pub fn preview(&self, overlay: &Overlay, target: &Path) -> Result<Vec<DiffEntry>, WorkspaceError> {
        self.diff(overlay, target)
    }
}

fn content_differs(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return true;
    }
    let mut ha = DefaultHasher::new();
    a.hash(&mut ha);
    let mut hb = DefaultHasher::new();
    b.hash(&mut hb);
    if ha.finish() != hb.finish() {
        return true;
    }
    a != b
}

fn rename_with_exdev_fallback(from: &Path, to: &Path) -> Result<(), WorkspaceError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc_exdev()) => {
            copy_recursive(from, to)?;
            fs::remove_dir_all(from)?;
            Ok(())
        }
        Err(e) => Err(WorkspaceError::Io(e)),
    }
}

#[cfg(unix)]
fn libc_exdev() -> i32 {
    18 // EXDEV
}

#[cfg(not(unix))]
fn libc_exdev() -> i32 {
    -1
}

fn copy_recursive(from: &Path, to: &Path) -> Result<(), WorkspaceError> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let dest = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_recursive(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "materializer_tests.rs"]
mod tests;
