// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn enqueue_respects_max_size() {
    let queue = TaskQueue::new(1);
    queue.enqueue(AgentId::new(), Priority::Normal).unwrap();
    let err = queue.enqueue(AgentId::new(), Priority::Normal).unwrap_err();
    assert!(matches!(err, QueueError::Full { size: 1, max: 1 }));
}

#[test]
fn size_reports_current_depth() {
    let queue = TaskQueue::new(10);
    assert_eq!(queue.size(), 0);
    queue.enqueue(AgentId::new(), Priority::Low).unwrap();
    assert_eq!(queue.size(), 1);
}

#[tokio::test]
async fn dequeue_returns_highest_priority_first() {
    let queue = TaskQueue::new(10);
    let low = AgentId::new();
    let high = AgentId::new();
    queue.enqueue(low, Priority::Low).unwrap();
    queue.enqueue(high, Priority::High).unwrap();

    assert_eq!(queue.dequeue_wait().await, high);
    assert_eq!(queue.dequeue_wait().await, low);
}

#[tokio::test]
async fn dequeue_is_fifo_within_equal_priority() {
    let queue = TaskQueue::new(10);
    let first = AgentId::new();
    let second = AgentId::new();
    queue.enqueue(first, Priority::Normal).unwrap();
    queue.enqueue(second, Priority::Normal).unwrap();

    assert_eq!(queue.dequeue_wait().await, first);
    assert_eq!(queue.dequeue_wait().await, second);
}

#[tokio::test]
async fn dequeue_wait_blocks_until_enqueue() {
    let queue = std::sync::Arc::new(TaskQueue::new(10));
    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.dequeue_wait().await })
    };
    tokio::task::yield_now().await;
    let agent_id = AgentId::new();
    queue.enqueue(agent_id, Priority::Normal).unwrap();
    assert_eq!(waiter.await.unwrap(), agent_id);
}
