// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cairn`: thin CLI adapter over the orchestrator command ABI (spec §6).
//! Every subcommand either starts the orchestrator service in the
//! foreground (`up`) or opens the same on-disk workspaces for one command
//! and exits — there is no separate daemon process in this crate's scope
//! (a distributed/networked adapter is an explicit Non-goal).

mod cli;
mod color;
mod exit_error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use exit_error::ExitError;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();
    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<ExitError>() {
                eprintln!("error: {exit_err}");
                return ExitCode::from(exit_err.code as u8);
            }
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
