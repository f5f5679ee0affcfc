// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cairn_core::{ErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is full ({size}/{max})")]
    Full { size: usize, max: usize },
}

impl HasKind for QueueError {
    fn kind(&self) -> ErrorKind {
        match self {
            QueueError::Full { .. } => ErrorKind::ResourceLimit,
        }
    }
}
