// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cairn-wire: the orchestrator command ABI (spec §4.11, §6).
//!
//! `Command`/`CommandResult` are serde-tagged types shared between the
//! orchestrator and any adapter (the in-process CLI today). They carry no
//! behavior beyond (de)serialization and light validation of required
//! fields — the one place internal types are intentionally duplicated
//! behind a stable external shape, so orchestrator refactors don't change
//! the ABI.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod command;

pub use command::{AgentSummary, Command, CommandResult};
pub use cairn_core::Event;
