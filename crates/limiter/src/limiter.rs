// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ResourceLimiter::limit`: a hard timeout plus an advisory memory ceiling
//! sampled periodically against the process's own resident-set size. Guard
//! release is automatic: whichever branch of the `select!` doesn't win gets
//! dropped, cancelling its work.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::LimiterError;

const SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

pub struct ResourceLimiter;

impl ResourceLimiter {
    pub fn new() -> Self {
        Self
    }

    /// Run `future` to completion, failing early with `Timeout` if it
    /// exceeds `timeout`, or `ResourceLimit` if the process RSS exceeds
    /// `max_memory_bytes` (when given) at a sampling point.
    pub async fn limit<F>(&self, timeout: Duration, max_memory_bytes: Option<u64>, future: F) -> Result<F::Output, LimiterError>
    where
        F: Future,
    {
        tokio::pin!(future);
        tokio::select! {
            result = &mut future => Ok(result),
            () = tokio::time::sleep(timeout) => Err(LimiterError::Timeout),
            () = watch_memory(max_memory_bytes) => Err(LimiterError::MemoryExceeded),
        }
    }
}

impl Default for ResourceLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once sampled RSS exceeds `max_memory_bytes`; never resolves if
/// no ceiling was given or RSS can't be read on this platform.
async fn watch_memory(max_memory_bytes: Option<u64>) {
    let Some(limit) = max_memory_bytes else {
        std::future::pending::<()>().await;
        return;
    };
    loop {
        tokio::time::sleep(SAMPLE_INTERVAL).await;
        match current_rss_bytes() {
            Some(rss) if rss > limit => return,
            Some(_) => continue,
            None => {
                warn!("resource limiter: RSS sampling unsupported on this platform, memory ceiling is unenforced");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn current_rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kb: u64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_bytes() -> Option<u64> {
    None
}

#[cfg(test)]
#[path = "limiter_tests.rs"]
mod tests;
