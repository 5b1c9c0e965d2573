//! Bounded blocking queue connecting the batcher to the dispatcher.
//!
//! The batcher is the producer, the dispatcher the consumer. Pushes block
//! (cooperative backpressure) up to a configurable timeout; on timeout the
//! oldest queued item is evicted to make room for the newest, never the
//! other way around, so the queue always favors recency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, SendTimeoutError};

/// Error returned once the queue's counterpart has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

impl std::fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "queue receiver has been dropped")
    }
}

impl std::error::Error for QueueClosed {}

/// Producer handle. Cheap to clone.
#[derive(Clone)]
pub struct BatchQueueSender<T> {
    tx: crossbeam_channel::Sender<T>,
    evict_rx: crossbeam_channel::Receiver<T>,
    dropped: Arc<AtomicU64>,
}

impl<T> BatchQueueSender<T> {
    /// Push an item, blocking up to `timeout` for space. On timeout, evicts
    /// the oldest queued item and inserts this one in its place.
    pub fn push_blocking(&self, item: T, timeout: Duration) -> Result<(), QueueClosed> {
        match self.tx.send_timeout(item, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Disconnected(_)) => Err(QueueClosed),
            Err(SendTimeoutError::Timeout(item)) => {
                if self.evict_rx.try_recv().is_ok() {
                    let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(dropped, "batch queue full, dropping oldest utterance");
                }
                // A slot should now be free; if a racing consumer already
                // drained it, fall back to a bounded wait rather than
                // spinning forever.
                match self.tx.try_send(item) {
                    Ok(()) => Ok(()),
                    Err(crossbeam_channel::TrySendError::Disconnected(_)) => Err(QueueClosed),
                    Err(crossbeam_channel::TrySendError::Full(item)) => self
                        .tx
                        .send_timeout(item, timeout)
                        .map_err(|_| QueueClosed),
                }
            }
        }
    }

    /// Total number of items evicted to make room for newer ones.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer handle.
pub struct BatchQueueReceiver<T> {
    rx: crossbeam_channel::Receiver<T>,
}

impl<T> BatchQueueReceiver<T> {
    /// Block until an item is available or the queue is closed.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Block up to `timeout` for an item.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

/// A bounded channel with drop-oldest-on-timeout backpressure semantics.
pub struct BatchQueue<T> {
    sender: BatchQueueSender<T>,
    receiver: Option<BatchQueueReceiver<T>>,
}

impl<T> BatchQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            sender: BatchQueueSender {
                tx,
                evict_rx: rx.clone(),
                dropped: Arc::new(AtomicU64::new(0)),
            },
            receiver: Some(BatchQueueReceiver { rx }),
        }
    }

    pub fn sender(&self) -> BatchQueueSender<T> {
        self.sender.clone()
    }

    /// Takes the receiving end. Can only be called once.
    pub fn take_receiver(&mut self) -> Option<BatchQueueReceiver<T>> {
        self.receiver.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushes_and_pops_in_order() {
        let mut q = BatchQueue::new(4);
        let rx = q.take_receiver().unwrap();
        let tx = q.sender();

        for i in 0..3 {
            tx.push_blocking(i, Duration::from_millis(10)).unwrap();
        }
        assert_eq!(rx.recv(), Some(0));
        assert_eq!(rx.recv(), Some(1));
        assert_eq!(rx.recv(), Some(2));
    }

    #[test]
    fn full_queue_evicts_oldest_not_newest() {
        let mut q = BatchQueue::new(2);
        let rx = q.take_receiver().unwrap();
        let tx = q.sender();

        tx.push_blocking(1, Duration::from_millis(10)).unwrap();
        tx.push_blocking(2, Duration::from_millis(10)).unwrap();
        // queue is full; this push should time out, evict `1`, then insert `3`
        tx.push_blocking(3, Duration::from_millis(20)).unwrap();

        assert_eq!(tx.dropped_count(), 1);
        assert_eq!(rx.recv(), Some(2));
        assert_eq!(rx.recv(), Some(3));
    }

    #[test]
    fn closed_receiver_surfaces_error() {
        let mut q = BatchQueue::new(1);
        let rx = q.take_receiver().unwrap();
        let tx = q.sender();
        drop(rx);
        let err = tx.push_blocking(1, Duration::from_millis(10));
        assert!(err.is_err());
    }
}
