// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A bounded priority FIFO (spec §4.3): highest [`Priority`] first, ties
//! broken by strict enqueue order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use cairn_core::{AgentId, Priority};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::QueueError;

struct Entry {
    priority: Priority,
    seq: u64,
    agent_id: AgentId,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    /// `BinaryHeap` is a max-heap: higher priority sorts greater, and within
    /// equal priority the *earlier* `seq` must sort greater (pop order is
    /// FIFO), hence the reversed `seq` comparison.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority).then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Inner {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

pub struct TaskQueue {
    max_queue_size: usize,
    inner: Mutex<Inner>,
    notify: Notify,
}

impl TaskQueue {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            max_queue_size,
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Enqueue `agent_id` at `priority`. Fails with `ResourceLimit` if the
    /// queue is already at `max_queue_size`.
    pub fn enqueue(&self, agent_id: AgentId, priority: Priority) -> Result<(), QueueError> {
        let mut inner = self.inner.lock();
        if inner.heap.len() >= self.max_queue_size {
            return Err(QueueError::Full {
                size: inner.heap.len(),
                max: self.max_queue_size,
            });
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Entry { priority, seq, agent_id });
        drop(inner);
        debug!(%agent_id, ?priority, "enqueued");
        self.notify.notify_one();
        Ok(())
    }

    /// Block until an entry is available, then return the highest-priority,
    /// earliest-enqueued one.
    pub async fn dequeue_wait(&self) -> AgentId {
        loop {
            let notified = self.notify.notified();
            if let Some(entry) = self.inner.lock().heap.pop() {
                return entry.agent_id;
            }
            notified.await;
        }
    }

    /// Non-blocking snapshot of the current queue depth.
    pub fn size(&self) -> usize {
        self.inner.lock().heap.len()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
