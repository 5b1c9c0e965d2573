//! Subscriber set: created on connect, destroyed on disconnect or hub stop.
//! Mutated only from the control loop; iterated under a short-lived lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use live_transcripts_protocol::ServerMessage;

use crate::outbox::{PushOutcome, SubscriberOutbox};

pub type SubscriberId = u64;

struct Subscriber {
    outbox: Arc<SubscriberOutbox>,
}

/// The hub's subscriber set. Writes never block the pipeline: broadcasting
/// to a slow subscriber either evicts an old message from its outbox or, if
/// its buffer is saturated with un-droppable transcriptions, closes it.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its id and outbox. The caller
    /// (the transport layer, e.g. a websocket handler) drains the outbox
    /// and forwards messages to the wire.
    pub fn add(&self, buffer_capacity: usize) -> (SubscriberId, Arc<SubscriberOutbox>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let outbox = SubscriberOutbox::new(buffer_capacity);
        self.subscribers.lock().insert(id, Subscriber { outbox: outbox.clone() });
        (id, outbox)
    }

    pub fn remove(&self, id: SubscriberId) {
        if let Some(sub) = self.subscribers.lock().remove(&id) {
            sub.outbox.close();
        }
    }

    pub fn count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Unicast to one subscriber, if still connected.
    pub fn send_to(&self, id: SubscriberId, msg: ServerMessage) {
        let outbox = self.subscribers.lock().get(&id).map(|s| s.outbox.clone());
        if let Some(outbox) = outbox {
            outbox.push(msg);
        }
    }

    /// Close every subscriber's outbox and drop them all. Used during
    /// session teardown so every connected transport observes end-of-stream.
    pub fn close_all(&self) {
        let mut subscribers = self.subscribers.lock();
        for (_, sub) in subscribers.drain() {
            sub.outbox.close();
        }
    }

    /// Broadcast to every subscriber, dropping any that are now lagging.
    pub fn broadcast(&self, msg: ServerMessage) {
        let mut lagging = Vec::new();
        {
            let subscribers = self.subscribers.lock();
            for (id, sub) in subscribers.iter() {
                if sub.outbox.push(msg.clone()) == PushOutcome::Lagging {
                    lagging.push(*id);
                }
            }
        }
        if !lagging.is_empty() {
            let mut subscribers = self.subscribers.lock();
            for id in lagging {
                tracing::warn!(subscriber = id, "closing lagging subscriber");
                subscribers.remove(&id);
            }
        }
    }
}
