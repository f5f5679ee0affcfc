// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent scheduling priority.

use serde::{Deserialize, Serialize};

/// Scheduling priority for a queued agent. Ordered so that `HIGH > NORMAL >
/// LOW`, letting a max-heap-based queue (`BinaryHeap`) pop the highest
/// priority entry directly.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
}

crate::simple_display! {
    Priority {
        Low => "low",
        Normal => "normal",
        High => "high",
    }
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

#[cfg(test)]
#[path = "priority_tests.rs"]
mod tests;
