// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `EventBus`: bounded-buffer pub/sub over [`Event`] (spec §4.4), grounded on
//! the source's `EventBus`/`EventStream` — a single shared queue feeds
//! `stream()`, concurrent pattern-matched handlers run in isolated failure
//! domains, and `wait_for` is a one-shot predicate subscriber.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cairn_core::{pattern_matches, Event};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tracing::warn;

use crate::error::EventsError;

const DEFAULT_CAPACITY: usize = 1024;

/// A concurrent, failure-isolated event subscriber.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event);
}

struct PredicateHandler {
    predicate: Box<dyn Fn(&Event) -> bool + Send + Sync>,
    tx: SyncMutex<Option<oneshot::Sender<Event>>>,
}

#[async_trait]
impl EventHandler for PredicateHandler {
    async fn handle(&self, event: Event) {
        if (self.predicate)(&event) {
            if let Some(tx) = self.tx.lock().take() {
                let _ = tx.send(event);
            }
        }
    }
}

pub struct EventBus {
    sender: mpsc::Sender<Event>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<Event>>>,
    subscribers: SyncMutex<Vec<(String, Arc<dyn EventHandler>)>>,
    catch_all: SyncMutex<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
            subscribers: SyncMutex::new(Vec::new()),
            catch_all: SyncMutex::new(Vec::new()),
        }
    }

    /// Enqueue `event` for `stream()` consumers and concurrently notify
    /// pattern-matched handlers. Never blocks: a full buffer drops the event
    /// with a warning instead of backing up the producer.
    pub fn publish(&self, event: Event) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.sender.try_send(event.clone()) {
            warn!(action = %event.action, category = %event.category, "event queue full, dropping event");
        }
        self.notify_handlers(event);
    }

    fn notify_handlers(&self, event: Event) {
        let key = event.subscription_key();
        let mut matching: Vec<Arc<dyn EventHandler>> = self
            .subscribers
            .lock()
            .iter()
            .filter(|(pattern, _)| pattern_matches(pattern, &key))
            .map(|(_, handler)| handler.clone())
            .collect();
        matching.extend(self.catch_all.lock().iter().cloned());
        if matching.is_empty() {
            return;
        }
        tokio::spawn(async move {
            let mut set = tokio::task::JoinSet::new();
            for handler in matching {
                let event = event.clone();
                set.spawn(async move {
                    handler.handle(event).await;
                });
            }
            while let Some(result) = set.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "event handler task panicked");
                }
            }
        });
    }

    /// Subscribe `handler` to events matching `pattern` (`"category:action"`
    /// or `"category:*"`).
    pub fn subscribe(&self, pattern: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.subscribers.lock().push((pattern.into(), handler));
    }

    /// Drop every subscriber registered under `pattern`.
    pub fn unsubscribe(&self, pattern: &str) {
        self.subscribers.lock().retain(|(p, _)| p != pattern);
    }

    /// An async iterator over events in publish order.
    pub fn stream(&self) -> EventStream {
        EventStream {
            receiver: self.receiver.clone(),
        }
    }

    /// Resolve with the first published event matching `predicate`, or fail
    /// with `Timeout` if none arrives in time.
    pub async fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl Fn(&Event) -> bool + Send + Sync + 'static,
    ) -> Result<Event, EventsError> {
        let (tx, rx) = oneshot::channel();
        let handler = Arc::new(PredicateHandler {
            predicate: Box::new(predicate),
            tx: SyncMutex::new(Some(tx)),
        });
        self.catch_all.lock().push(handler.clone() as Arc<dyn EventHandler>);

        let result = tokio::time::timeout(timeout, rx).await;
        self.catch_all.lock().retain(|h| !Arc::ptr_eq(h, &(handler.clone() as Arc<dyn EventHandler>)));

        match result {
            Ok(Ok(event)) => Ok(event),
            _ => Err(EventsError::Timeout),
        }
    }
}

/// Async iterator of events, shared by every `stream()` call on the same bus
/// (they compete for the same underlying queue, matching the source).
pub struct EventStream {
    receiver: Arc<AsyncMutex<mpsc::Receiver<Event>>>,
}

impl EventStream {
    pub async fn next(&self) -> Option<Event> {
        self.receiver.lock().await.recv().await
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
