// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use super::{format_or_json, handle_list, OutputFormat};

#[derive(Debug, Clone, Serialize)]
struct FakeEntry {
    name: String,
}

#[test]
fn format_or_json_calls_text_fn_for_text_format() {
    let mut called = false;
    format_or_json(OutputFormat::Text, &FakeEntry { name: "a".into() }, || called = true).expect("renders");
    assert!(called);
}

#[test]
fn format_or_json_skips_text_fn_for_json_format() {
    let mut called = false;
    format_or_json(OutputFormat::Json, &FakeEntry { name: "a".into() }, || called = true).expect("renders");
    assert!(!called);
}

#[test]
fn handle_list_prints_empty_message_for_text_format() {
    let items: Vec<FakeEntry> = vec![];
    let mut rendered = false;
    handle_list(OutputFormat::Text, &items, items.is_empty(), "no entries", || rendered = true).expect("renders");
    assert!(!rendered);
}

#[test]
fn handle_list_calls_render_text_when_nonempty() {
    let items = vec![FakeEntry { name: "a".into() }];
    let mut rendered = false;
    handle_list(OutputFormat::Text, &items, items.is_empty(), "no entries", || rendered = true).expect("renders");
    assert!(rendered);
}

#[test]
fn handle_list_json_never_calls_render_text() {
    let items = vec![FakeEntry { name: "a".into() }];
    let mut rendered = false;
    handle_list(OutputFormat::Json, &items, items.is_empty(), "no entries", || rendered = true).expect("renders");
    assert!(!rendered);
}
