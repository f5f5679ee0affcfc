// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;

#[test]
fn materialize_creates_target_from_scratch() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    fs::create_dir_all(&base).unwrap();
    let mut overlay = Overlay::new(&base);
    overlay.write("a.txt", b"hello".to_vec());

    let target = root.path().join("target");
    let materializer = Materializer::new(root.path());
    materializer.materialize(&overlay, &target).unwrap();

    assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"hello");
}

#[test]
fn materialize_swaps_existing_target_and_preserves_base_files() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    fs::create_dir_all(&base).unwrap();
    fs::write(base.join("base.txt"), b"base-content").unwrap();

    let target = root.path().join("target");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("stale.txt"), b"old").unwrap();

    let mut overlay = Overlay::new(&base);
    overlay.write("new.txt", b"new-content".to_vec());

    let materializer = Materializer::new(root.path());
    materializer.materialize(&overlay, &target).unwrap();

    assert_eq!(fs::read(target.join("base.txt")).unwrap(), b"base-content");
    assert_eq!(fs::read(target.join("new.txt")).unwrap(), b"new-content");
    assert!(!target.join("stale.txt").exists());
}

#[test]
fn materialize_leaves_no_staging_or_backup_dirs_behind() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    fs::create_dir_all(&base).unwrap();
    let target = root.path().join("target");
    fs::create_dir_all(&target).unwrap();

    let overlay = Overlay::new(&base);
    let materializer = Materializer::new(root.path());
    materializer.materialize(&overlay, &target).unwrap();

    let leftovers: Vec<_> = fs::read_dir(root.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(".cairn-staging") || name.ends_with("cairn-backup"))
        .collect();
    assert!(leftovers.is_empty(), "leftover entries: {leftovers:?}");
}

#[test]
fn materialize_refuses_target_outside_boundary() {
    let root = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    fs::create_dir_all(&base).unwrap();

    let overlay = Overlay::new(&base);
    let materializer = Materializer::new(root.path());
    let err = materializer.materialize(&overlay, &outside.path().join("target")).unwrap_err();
    assert!(matches!(err, WorkspaceError::PathEscapesBoundary(_)));
}

#[test]
fn diff_reports_added_modified_and_removed() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    fs::create_dir_all(&base).unwrap();
    let target = root.path().join("target");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("changed.txt"), b"old").unwrap();
    fs::write(target.join("gone.txt"), b"bye").unwrap();

    let mut overlay = Overlay::new(&base);
    overlay.write("changed.txt", b"new".to_vec());
    overlay.write("added.txt", b"fresh".to_vec());
    overlay.delete("gone.txt");

    let materializer = Materializer::new(root.path());
    let mut entries = materializer.diff(&overlay, &target).unwrap();
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    assert_eq!(
        entries,
        vec![
            DiffEntry { path: "added.txt".into(), kind: DiffKind::Added },
            DiffEntry { path: "changed.txt".into(), kind: DiffKind::Modified },
            DiffEntry { path: "gone.txt".into(), kind: DiffKind::Removed },
        ]
    );
}

#[test]
fn diff_skips_unchanged_content() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    fs::create_dir_all(&base).unwrap();
    let target = root.path().join("target");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("same.txt"), b"identical").unwrap();

    let mut overlay = Overlay::new(&base);
    overlay.write("same.txt", b"identical".to_vec());

    let materializer = Materializer::new(root.path());
    assert!(materializer.diff(&overlay, &target).unwrap().is_empty());
}

#[test]
fn preview_is_an_alias_of_diff() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    fs::create_dir_all(&base).unwrap();
    let target = root.path().join("target");
    fs::create_dir_all(&target).unwrap();

    let mut overlay = Overlay::new(&base);
    overlay.write("a.txt", b"x".to_vec());

    let materializer = Materializer::new(root.path());
    assert_eq!(
        materializer.diff(&overlay, &target).unwrap(),
        materializer.preview(&overlay, &target).unwrap()
    );
}
