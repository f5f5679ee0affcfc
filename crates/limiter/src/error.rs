// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cairn_core::{ErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("operation exceeded its timeout")]
    Timeout,

    #[error("operation exceeded its advisory memory ceiling")]
    MemoryExceeded,
}

impl HasKind for LimiterError {
    fn kind(&self) -> ErrorKind {
        match self {
            LimiterError::Timeout => ErrorKind::Timeout,
            LimiterError::MemoryExceeded => ErrorKind::ResourceLimit,
        }
    }
}
