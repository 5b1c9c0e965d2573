use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use live_transcripts_batcher::Utterance;
use live_transcripts_bus::BatchQueueReceiver;
use live_transcripts_transcript::{Transcript, Transcription};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::client::TranscriptionClient;
use crate::dispatch::{dispatch_one, DispatcherConfig};
use crate::stats::DispatcherStats;

/// Buffers out-of-order completions until the next expected `batch_seq`
/// arrives, so `Transcript::append` never sees a gap. Dispatch attempts run
/// concurrently (up to the configured parallelism) but completions can
/// still land out of order; this is where strict ordering is restored.
struct ReorderState {
    pending: BTreeMap<u64, Transcription>,
    next_expected: u64,
}

impl ReorderState {
    fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_expected: 0,
        }
    }
}

/// Insert a completed Transcription and drain every now-contiguous entry
/// into the transcript, in order. `on_append` fires once per entry actually
/// appended, in order, after the lock is released, so a broadcast hook
/// never runs while holding the transcript lock.
fn append_ready(
    reorder: &Mutex<ReorderState>,
    transcript: &Mutex<Transcript>,
    completed: Transcription,
    on_append: &(dyn Fn(&Transcription) + Send + Sync),
) {
    let mut state = reorder.lock();
    state.pending.insert(completed.batch_seq, completed);

    let mut ready = Vec::new();
    {
        let mut transcript = transcript.lock();
        while let Some(next) = state.pending.remove(&state.next_expected) {
            let seq = next.batch_seq;
            if let Err(e) = transcript.append(next.clone()) {
                tracing::error!(batch_seq = seq, error = %e, "reorder buffer produced an out-of-order append");
                break;
            }
            state.next_expected += 1;
            ready.push(next);
        }
    }
    for t in &ready {
        on_append(t);
    }
}

/// Drains the batch queue and dispatches up to `parallelism` Utterances
/// concurrently, restoring strict `batch_seq` order before appending to
/// `transcript`. Bridges the blocking [`BatchQueueReceiver`] onto a
/// dedicated OS thread so the async dispatch tasks never block the
/// runtime's worker threads waiting on `crossbeam_channel::recv`.
pub async fn run(
    client: Arc<dyn TranscriptionClient>,
    cfg: DispatcherConfig,
    queue: BatchQueueReceiver<Utterance>,
    transcript: Arc<Mutex<Transcript>>,
    stats: DispatcherStats,
    parallelism: usize,
    on_append: impl Fn(&Transcription) + Send + Sync + 'static,
) {
    let on_append: Arc<dyn Fn(&Transcription) + Send + Sync> = Arc::new(on_append);
    let (bridge_tx, mut bridge_rx) = tokio::sync::mpsc::channel::<Utterance>(parallelism.max(1) * 2);

    let bridge_handle = std::thread::spawn(move || {
        while let Some(utterance) = queue.recv() {
            if bridge_tx.blocking_send(utterance).is_err() {
                break;
            }
        }
    });

    let reorder = Arc::new(Mutex::new(ReorderState::new()));
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut in_flight = Vec::new();

    while let Some(utterance) = bridge_rx.recv().await {
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
        let client = client.clone();
        let cfg = cfg.clone();
        let reorder = reorder.clone();
        let transcript = transcript.clone();
        let stats = stats.clone();
        let on_append = on_append.clone();

        let task = tokio::spawn(async move {
            let completed = dispatch_one(client.as_ref(), &cfg, &utterance, &stats).await;
            append_ready(&reorder, &transcript, completed, on_append.as_ref());
            drop(permit);
        });
        in_flight.push(task);
        in_flight.retain(|t: &tokio::task::JoinHandle<()>| !t.is_finished());
    }

    for task in in_flight {
        let _ = task.await;
    }
    let _ = bridge_handle.join();
}
