// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observer queues and the per-zone registry that fans events out to them
//!
//! Delivery never blocks the authority loop: each observer owns a bounded
//! queue and a notification that does not fit is dropped.

use crate::entity::EntityRef;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;
use tw_core::Event;
use uuid::Uuid;

/// Unique identifier for an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(pub Uuid);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sending side of an observer queue, registered with zones
#[derive(Debug, Clone)]
pub struct Observer {
    id: ObserverId,
    tx: mpsc::Sender<Arc<Event>>,
    dropped: Arc<AtomicU64>,
}

impl Observer {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    fn deliver(&self, event: &Arc<Event>) -> Delivery {
        match self.tx.try_send(Arc::clone(event)) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

/// Receiving side of an observer queue
pub struct ObserverReceiver {
    id: ObserverId,
    rx: mpsc::Receiver<Arc<Event>>,
    dropped: Arc<AtomicU64>,
}

impl ObserverReceiver {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Wait for the next notification; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        self.rx.try_recv().ok()
    }

    /// Everything currently queued
    pub fn drain(&mut self) -> Vec<Arc<Event>> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Notifications lost because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create a bounded observer queue
pub fn observer_queue(capacity: usize) -> (Observer, ObserverReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let id = ObserverId(Uuid::new_v4());
    let dropped = Arc::new(AtomicU64::new(0));
    let observer = Observer {
        id,
        tx,
        dropped: Arc::clone(&dropped),
    };
    (observer, ObserverReceiver { id, rx, dropped })
}

enum Delivery {
    Sent,
    Dropped,
    Closed,
}

/// Observers watching each entity of one zone
///
/// Owned by the zone; only the authority loop touches it.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    watchers: BTreeMap<EntityRef, Vec<Observer>>,
}

impl ObserverRegistry {
    pub fn subscribe(&mut self, entity: EntityRef, observer: Observer) {
        let list = self.watchers.entry(entity).or_default();
        if !list.iter().any(|o| o.id == observer.id) {
            list.push(observer);
        }
    }

    pub fn unsubscribe(&mut self, entity: EntityRef, id: ObserverId) -> bool {
        let Some(list) = self.watchers.get_mut(&entity) else {
            return false;
        };
        let before = list.len();
        list.retain(|o| o.id != id);
        let removed = list.len() < before;
        if list.is_empty() {
            self.watchers.remove(&entity);
        }
        removed
    }

    /// Drop every subscription on an entity that no longer exists
    pub fn forget(&mut self, entity: EntityRef) {
        self.watchers.remove(&entity);
    }

    pub fn observers_of(&self, entity: EntityRef) -> Vec<Observer> {
        self.watchers.get(&entity).cloned().unwrap_or_default()
    }

    pub fn count(&self, entity: EntityRef) -> usize {
        self.watchers.get(&entity).map_or(0, Vec::len)
    }

    /// Deliver `event` once to every distinct observer of the touched entities
    pub fn notify(&mut self, touched: &[EntityRef], event: &Event) {
        let event = Arc::new(event.clone());
        let mut seen = HashSet::new();
        let mut closed = HashSet::new();

        for entity in touched {
            let Some(list) = self.watchers.get(entity) else {
                continue;
            };
            for observer in list {
                if !seen.insert(observer.id) {
                    continue;
                }
                match observer.deliver(&event) {
                    Delivery::Sent => {}
                    Delivery::Dropped => warn!(
                        observer = %observer.id,
                        %entity,
                        sequence = event.sequence,
                        name = event.name(),
                        "observer queue full, notification dropped"
                    ),
                    Delivery::Closed => {
                        closed.insert(observer.id);
                    }
                }
            }
        }

        if !closed.is_empty() {
            for list in self.watchers.values_mut() {
                list.retain(|o| !closed.contains(&o.id));
            }
            self.watchers.retain(|_, list| !list.is_empty());
        }
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
