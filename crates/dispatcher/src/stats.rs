use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use live_transcripts_protocol::{ModelStats, StatsSnapshot};
use parking_lot::Mutex;

/// Running attempt/success/failure/latency counters for a single model id.
#[derive(Debug, Default)]
struct ModelCounters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    /// Sum of successful latencies in milliseconds, for computing the mean
    /// on demand rather than keeping a running average that drifts.
    total_latency_ms: AtomicU64,
}

impl ModelCounters {
    fn snapshot(&self, model: &str) -> ModelStats {
        let attempts = self.attempts.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);
        let avg_latency_ms = if successes > 0 {
            total_latency_ms as f64 / successes as f64
        } else {
            0.0
        };
        ModelStats {
            model: model.to_string(),
            attempts,
            successes,
            failures,
            avg_latency_ms,
        }
    }
}

/// Shared, cheap-to-clone dispatcher counters, surfaced through the hub's
/// `stats` command. Utterance-drop counts live on the bus's
/// `BatchQueueSender` (the component that actually evicts), not here; the
/// hub merges that count in when it builds a `StatsSnapshot`.
#[derive(Clone, Default)]
pub struct DispatcherStats {
    by_model: Arc<Mutex<HashMap<String, Arc<ModelCounters>>>>,
}

impl DispatcherStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters_for(&self, model: &str) -> Arc<ModelCounters> {
        self.by_model
            .lock()
            .entry(model.to_string())
            .or_default()
            .clone()
    }

    pub fn record_attempt(&self, model: &str) {
        self.counters_for(model).attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, model: &str, latency_ms: u64) {
        let counters = self.counters_for(model);
        counters.successes.fetch_add(1, Ordering::Relaxed);
        counters.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self, model: &str) {
        self.counters_for(model).failures.fetch_add(1, Ordering::Relaxed);
    }

    /// `dropped_utterances` is read from the bus's `BatchQueueSender`
    /// (the hub holds a clone purely to read this) and merged in here
    /// rather than tracked by the dispatcher itself.
    pub fn snapshot(&self, subscriber_count: usize, dropped_utterances: u64) -> StatsSnapshot {
        let by_model = self.by_model.lock();
        let mut models: Vec<ModelStats> = by_model
            .iter()
            .map(|(model, counters)| counters.snapshot(model))
            .collect();
        models.sort_by(|a, b| a.model.cmp(&b.model));
        StatsSnapshot {
            models,
            subscriber_count,
            dropped_utterances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_attempts_successes_and_failures_per_model() {
        let stats = DispatcherStats::new();
        stats.record_attempt("whisper-large");
        stats.record_attempt("whisper-large");
        stats.record_success("whisper-large", 100);
        stats.record_failure("whisper-large");

        let snap = stats.snapshot(0, 0);
        assert_eq!(snap.models.len(), 1);
        assert_eq!(snap.models[0].attempts, 2);
        assert_eq!(snap.models[0].successes, 1);
        assert_eq!(snap.models[0].failures, 1);
        assert_eq!(snap.models[0].avg_latency_ms, 100.0);
    }

    #[test]
    fn models_are_sorted_by_name_in_snapshot() {
        let stats = DispatcherStats::new();
        stats.record_attempt("whisper-1");
        stats.record_attempt("whisper-large");
        let snap = stats.snapshot(0, 0);
        assert_eq!(snap.models[0].model, "whisper-1");
        assert_eq!(snap.models[1].model, "whisper-large");
    }
}
