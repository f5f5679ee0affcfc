// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::kv::Kv;

fn stable() -> (tempfile::TempDir, StableWorkspace) {
    let dir = tempfile::tempdir().expect("tempdir");
    let kv = Kv::open(dir.path().join("stable.db")).expect("open kv");
    (dir, StableWorkspace::open(kv))
}

#[test]
fn write_then_read_round_trips() {
    let (_dir, stable) = stable();
    stable.write("README.md", b"original").expect("write");
    assert_eq!(stable.read("README.md").expect("read"), Some(b"original".to_vec()));
    assert!(stable.exists("README.md").expect("exists"));
}

#[test]
fn overwrite_merge_replaces_conflicting_paths() {
    let (_dir, stable) = stable();
    stable.write("README.md", b"original").expect("write");

    let mut overlay = Overlay::new(tempfile::tempdir().expect("tempdir").path());
    overlay.write("README.md", b"changed".to_vec());
    overlay.write("notes/hello.txt", b"hi".to_vec());

    let result = stable.merge_overlay(&overlay, &MergeStrategy::Overwrite).expect("merge succeeds");
    assert_eq!(result.files_merged, 2);
    assert!(result.conflicts.is_empty());
    assert_eq!(stable.read("README.md").expect("read"), Some(b"changed".to_vec()));
    assert_eq!(stable.read("notes/hello.txt").expect("read"), Some(b"hi".to_vec()));
}

#[test]
fn error_strategy_commits_nothing_on_conflict() {
    let (_dir, stable) = stable();
    stable.write("README.md", b"original").expect("write");

    let mut overlay = Overlay::new(tempfile::tempdir().expect("tempdir").path());
    overlay.write("README.md", b"changed".to_vec());

    let err = stable.merge_overlay(&overlay, &MergeStrategy::Error).expect_err("conflict must fail");
    assert!(matches!(err, WorkspaceError::MergeFailed { failed: 1, .. }));
    assert_eq!(stable.read("README.md").expect("read"), Some(b"original".to_vec()));
}

#[test]
fn preserve_strategy_keeps_existing_and_reports_conflict() {
    let (_dir, stable) = stable();
    stable.write("README.md", b"original").expect("write");

    let mut overlay = Overlay::new(tempfile::tempdir().expect("tempdir").path());
    overlay.write("README.md", b"changed".to_vec());
    overlay.write("new-file.txt", b"brand new".to_vec());

    let result = stable.merge_overlay(&overlay, &MergeStrategy::Preserve).expect("merge succeeds");
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].path, "README.md");
    assert_eq!(result.files_merged, 1);
    assert_eq!(stable.read("README.md").expect("read"), Some(b"original".to_vec()));
    assert_eq!(stable.read("new-file.txt").expect("read"), Some(b"brand new".to_vec()));
}

#[test]
fn merging_a_deletion_removes_the_path_from_stable() {
    let (_dir, stable) = stable();
    stable.write("stale.txt", b"old").expect("write");

    let mut overlay = Overlay::new(tempfile::tempdir().expect("tempdir").path());
    overlay.delete("stale.txt");

    let result = stable.merge_overlay(&overlay, &MergeStrategy::Overwrite).expect("merge succeeds");
    assert_eq!(result.files_merged, 1);
    assert!(!stable.exists("stale.txt").expect("exists"));
}
