// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Mutex;

use cairn_workspace::MergeStrategy;

use super::*;

// Environment variables are process-global; serialize tests that touch them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for var in [
        "CAIRN_PROJECT_ROOT",
        "CAIRN_HOME",
        "CAIRN_MAX_CONCURRENT_AGENTS",
        "CAIRN_MAX_QUEUE_SIZE",
        "CAIRN_WORKSPACE_CACHE_SIZE",
        "CAIRN_MAX_EXECUTION_TIME_SECS",
        "CAIRN_MAX_MEMORY_BYTES",
        "CAIRN_MAX_RECURSION_DEPTH",
        "CAIRN_GRAPH_MAX_CONCURRENCY",
        "CAIRN_GRAPH_TIMEOUT_SECS",
        "CAIRN_ACCEPT_MERGE_STRATEGY",
        "CAIRN_CODE_PROVIDER",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
fn defaults_apply_when_nothing_else_is_set() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = load(ConfigLayer {
        project_root: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .expect("load succeeds");

    assert_eq!(cfg.max_concurrent_agents, 4);
    assert_eq!(cfg.max_queue_size, 256);
    assert_eq!(cfg.accept_merge_strategy, MergeStrategy::Overwrite);
}

#[test]
fn cairn_toml_overrides_defaults_and_env_overrides_the_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("cairn.toml"), "max_concurrent_agents = 9\nmax_queue_size = 10\n").expect("write toml");

    let cfg = load(ConfigLayer {
        project_root: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .expect("load succeeds");
    assert_eq!(cfg.max_concurrent_agents, 9);
    assert_eq!(cfg.max_queue_size, 10);

    std::env::set_var("CAIRN_MAX_CONCURRENT_AGENTS", "2");
    let cfg = load(ConfigLayer {
        project_root: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .expect("load succeeds");
    assert_eq!(cfg.max_concurrent_agents, 2);
    assert_eq!(cfg.max_queue_size, 10, "env only overrides the field it sets");

    clear_env();
}

#[test]
fn cli_overrides_win_over_every_other_layer() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("CAIRN_MAX_CONCURRENT_AGENTS", "2");

    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = load(ConfigLayer {
        project_root: Some(dir.path().to_path_buf()),
        max_concurrent_agents: Some(7),
        ..Default::default()
    })
    .expect("load succeeds");
    assert_eq!(cfg.max_concurrent_agents, 7);

    clear_env();
}

#[test]
fn zero_caps_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("tempdir");
    let err = load(ConfigLayer {
        project_root: Some(dir.path().to_path_buf()),
        max_queue_size: Some(0),
        ..Default::default()
    })
    .expect_err("zero must be rejected");
    assert!(matches!(err, OrchestratorError::Config(_)));
}

#[test]
fn unknown_merge_strategy_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("tempdir");
    let err = load(ConfigLayer {
        project_root: Some(dir.path().to_path_buf()),
        accept_merge_strategy: Some("yolo".into()),
        ..Default::default()
    })
    .expect_err("unknown strategy must be rejected");
    assert!(matches!(err, OrchestratorError::Config(_)));
}
