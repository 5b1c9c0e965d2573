//! Drives an [`AudioSource`] into an [`AudioRing`] on a dedicated OS thread.
//! Mirrors `live-transcripts-batcher::runner::run_blocking`'s shape: a plain
//! blocking loop, no async runtime involvement, since both the source and
//! the ring are blocking/sync APIs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use live_transcripts_audio::{AudioError, AudioRing, AudioSource};

/// Reads chunks from `source` and writes them into `ring` until the source
/// ends, `running` clears, or a read produces a fatal (non-retryable) error.
///
/// A transient read error is logged and the loop continues; `AudioSource`'s
/// own contract treats anything it can recover from internally as already
/// handled, so any `Err` reaching here is treated as fatal and stops the
/// pump — the hub observes this via `running` going false on return.
pub fn run_blocking(mut source: Box<dyn AudioSource>, ring: Arc<AudioRing>, running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        match source.read_chunk() {
            Ok(Some(chunk)) => ring.write(&chunk),
            Ok(None) => {
                tracing::info!("audio source ended stream");
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "audio source read failed, stopping capture");
                break;
            }
        }
    }
    running.store(false, Ordering::Relaxed);
}

#[allow(dead_code)]
fn _assert_error_is_display(e: AudioError) -> String {
    e.to_string()
}
