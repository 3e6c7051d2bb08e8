//! Topic-based change notifications.
//!
//! Transport-agnostic: the store adapter (or a test) publishes, UI-side consumers
//! subscribe per topic ("water_readings", "alerts", ...). A subscription stops
//! receiving as soon as it is unsubscribed or dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub topic: String,
    pub kind: ChangeKind,
    pub payload: Value,
    pub at: DateTime<Utc>,
}

type Subscribers = HashMap<String, Vec<(u64, Sender<ChangeEvent>)>>;

#[derive(Debug, Default)]
struct BusInner {
    subscribers: Mutex<Subscribers>,
    next_id: AtomicU64,
}

impl BusInner {
    fn remove(&self, topic: &str, id: u64) {
        if let Ok(mut subs) = self.subscribers.lock() {
            if let Some(list) = subs.get_mut(topic) {
                list.retain(|(sid, _)| *sid != id);
                if list.is_empty() {
                    subs.remove(topic);
                }
            }
        }
    }
}

/// Cloneable handle; clones share subscribers.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = crossbeam_channel::unbounded();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut subs) = self.inner.subscribers.lock() {
            subs.entry(topic.to_string()).or_default().push((id, tx));
        }
        debug!("subscribed #{id} to '{topic}'");
        Subscription {
            id,
            topic: topic.to_string(),
            rx,
            bus: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Delivers to every live subscriber of `topic`; returns how many received it.
    pub fn publish(&self, topic: &str, kind: ChangeKind, payload: Value) -> usize {
        let event = ChangeEvent {
            topic: topic.to_string(),
            kind,
            payload,
            at: Utc::now(),
        };
        let Ok(mut subs) = self.inner.subscribers.lock() else {
            return 0;
        };
        let Some(list) = subs.get_mut(topic) else {
            return 0;
        };

        // drop subscribers whose receiver is gone
        list.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        let delivered = list.len();
        if list.is_empty() {
            subs.remove(topic);
        }
        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .subscribers
            .lock()
            .map(|s| s.get(topic).map_or(0, |l| l.len()))
            .unwrap_or(0)
    }
}

/// Receiving end of one topic subscription.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    topic: String,
    rx: Receiver<ChangeEvent>,
    bus: Weak<BusInner>,
    active: bool,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Blocks until the next event; None once unsubscribed or the bus is gone.
    pub fn recv(&self) -> Option<ChangeEvent> {
        if !self.active {
            return None;
        }
        self.rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<ChangeEvent> {
        if !self.active {
            return None;
        }
        match self.rx.try_recv() {
            Ok(ev) => Some(ev),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        if !self.active {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Detaches from the bus. Pending undelivered events are discarded.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(&self.topic, self.id);
        }
        while self.rx.try_recv().is_ok() {}
        debug!("unsubscribed #{} from '{}'", self.id, self.topic);
    }
}

impl Iterator for Subscription {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<ChangeEvent> {
        self.recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
