use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use live_transcripts_audio::AudioRing;
use live_transcripts_bus::BatchQueueSender;

use crate::state_machine::Batcher;
use crate::utterance::Utterance;

/// Samples drained from the ring per iteration. Small enough to keep
/// latency low, large enough to avoid spinning.
const DRAIN_CHUNK: usize = 320;
const EMPTY_SLEEP: Duration = Duration::from_millis(5);

/// Commands the hub sends to a running batcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatcherCommand {
    Pause,
    Resume,
}

/// Drives a [`Batcher`] by polling an [`AudioRing`] until `running` clears,
/// pushing emitted Utterances onto a [`BatchQueueSender`] with bounded
/// blocking backpressure. Intended to run on a dedicated OS thread via
/// `std::thread::spawn` (the ring's mutex is a short-lived lock, not an
/// async-aware one).
pub fn run_blocking(
    mut batcher: Batcher,
    ring: Arc<AudioRing>,
    queue: BatchQueueSender<Utterance>,
    commands: crossbeam_channel::Receiver<BatcherCommand>,
    running: Arc<AtomicBool>,
    push_timeout: Duration,
) {
    let mut cursor = ring.cursor();

    while running.load(Ordering::Relaxed) {
        while let Ok(cmd) = commands.try_recv() {
            match cmd {
                BatcherCommand::Pause => batcher.pause(),
                BatcherCommand::Resume => batcher.resume(),
            }
        }

        let read = ring.read_since(cursor);
        cursor = read.cursor;

        if read.truncated {
            tracing::warn!("ring truncated, resetting batcher");
            batcher.reset();
        }

        if read.samples.is_empty() {
            std::thread::sleep(EMPTY_SLEEP);
            continue;
        }

        let now_ms = chrono::Utc::now().timestamp_millis();
        for utterance in batcher.push_samples(&read.samples, now_ms) {
            if let Err(e) = queue.push_blocking(utterance, push_timeout) {
                tracing::warn!("batch queue closed: {e}, stopping batcher");
                return;
            }
        }

        // DRAIN_CHUNK informs how aggressively we poll; read_since already
        // returns everything available so this is purely a pacing hint.
        let _ = DRAIN_CHUNK;
    }
}
