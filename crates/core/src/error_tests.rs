// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn display_matches_snake_case_name() {
    assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    assert_eq!(ErrorKind::WorkspaceMergeFailed.to_string(), "workspace_merge_failed");
}

#[test]
fn only_io_and_version_conflict_are_retryable() {
    assert!(ErrorKind::RecoverableIo.is_retryable());
    assert!(ErrorKind::VersionConflict.is_retryable());
    assert!(!ErrorKind::NotFound.is_retryable());
    assert!(!ErrorKind::InvalidState.is_retryable());
}
