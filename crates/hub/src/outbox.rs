//! Per-subscriber send buffer implementing the hub's fan-out policy.
//!
//! `tokio::sync::mpsc` doesn't let a producer evict an already-queued item,
//! which is exactly what §4.7's backpressure policy needs ("drop the oldest
//! *non-transcription* message"), so the outbox is a small deque behind a
//! lock plus a `Notify`, in the same spirit as `live-transcripts-bus`'s
//! drop-oldest `BatchQueue` but generalized to selective eviction and async
//! receive.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use live_transcripts_protocol::ServerMessage;

/// Default per-subscriber buffer size, per the spec.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Outcome of pushing a message into a subscriber's outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Enqueued (possibly after evicting an older non-transcription message).
    Enqueued,
    /// Buffer was full of un-droppable messages (transcriptions); the
    /// subscriber is now marked lagging and should be disconnected.
    Lagging,
}

fn is_transcription(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::Transcription { .. })
}

/// Bounded, async-receivable outbox with drop-oldest-non-transcription
/// eviction. Writers never block; `recv` awaits new data via `Notify`.
pub struct SubscriberOutbox {
    queue: Mutex<VecDeque<ServerMessage>>,
    notify: Notify,
    capacity: usize,
    closed: AtomicBool,
}

impl SubscriberOutbox {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            notify: Notify::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        })
    }

    /// Enqueue `msg`. Transcriptions are never dropped to make room for
    /// anything else; if the buffer is full and contains no evictable
    /// non-transcription message, the subscriber is marked lagging.
    pub fn push(&self, msg: ServerMessage) -> PushOutcome {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            match queue.iter().position(|m| !is_transcription(m)) {
                Some(idx) => {
                    queue.remove(idx);
                }
                None => {
                    self.closed.store(true, Ordering::Relaxed);
                    drop(queue);
                    self.notify.notify_one();
                    return PushOutcome::Lagging;
                }
            }
        }
        queue.push_back(msg);
        drop(queue);
        self.notify.notify_one();
        PushOutcome::Enqueued
    }

    /// Await the next message, or `None` once closed with an empty queue.
    pub async fn recv(&self) -> Option<ServerMessage> {
        loop {
            {
                let mut queue = self.queue.lock();
                if let Some(msg) = queue.pop_front() {
                    return Some(msg);
                }
                if self.closed.load(Ordering::Relaxed) {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.notify.notify_one();
    }

    pub fn is_lagging(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}
