// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cairn_core::{ErrorKind, HasKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventsError {
    #[error("wait_for timed out before a matching event arrived")]
    Timeout,
}

impl HasKind for EventsError {
    fn kind(&self) -> ErrorKind {
        match self {
            EventsError::Timeout => ErrorKind::Timeout,
        }
    }
}
