use std::sync::Arc;
use std::time::Duration;

/// A contiguous, word-boundary-aligned segment of voiced audio, ready for
/// transcription.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Dense, strictly increasing sequence assigned by the batcher.
    pub batch_seq: u64,
    pub start_ts_ms: i64,
    pub end_ts_ms: i64,
    pub sample_rate: u32,
    pub samples: Arc<[i16]>,
}

impl Utterance {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}
