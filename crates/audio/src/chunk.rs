use std::sync::Arc;

/// A monotonically timestamped block of 16-bit mono PCM samples.
///
/// Produced by an [`AudioSource`](crate::AudioSource) and written into an
/// [`AudioRing`](crate::AudioRing). The capture sequence number is strictly
/// increasing for a given source; gaps indicate a source-level drop, not a
/// ring overwrite (the ring has its own truncation signal for that).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Strictly increasing sequence number assigned at capture time.
    pub seq: u64,
    /// Wall-clock timestamp (ms since epoch) of the first sample in this chunk.
    pub timestamp_ms: i64,
    /// Sample rate this chunk was captured at.
    pub sample_rate: u32,
    /// Mono 16-bit PCM samples, shared so ring writes don't need to copy twice.
    pub samples: Arc<[i16]>,
}

impl AudioChunk {
    pub fn new(seq: u64, timestamp_ms: i64, sample_rate: u32, samples: impl Into<Arc<[i16]>>) -> Self {
        Self {
            seq,
            timestamp_ms,
            sample_rate,
            samples: samples.into(),
        }
    }

    /// Duration of this chunk in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}
