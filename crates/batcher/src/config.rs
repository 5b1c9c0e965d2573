use std::time::Duration;

/// Durations below are converted to sample counts at construction time
/// ([`crate::Batcher::new`]), since the state machine reasons in samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatcherConfig {
    pub sample_rate: u32,
    /// VAD frame size. 20 ms is the teacher's convention for RMS-threshold VAD.
    pub frame_duration: Duration,
    pub min_batch_duration: Duration,
    pub max_batch_duration: Duration,
    pub silence_duration_threshold: Duration,
    pub overlap: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_duration: Duration::from_millis(20),
            min_batch_duration: Duration::from_secs_f32(3.0),
            max_batch_duration: Duration::from_secs_f32(30.0),
            silence_duration_threshold: Duration::from_secs_f32(0.5),
            overlap: Duration::from_secs_f32(0.5),
        }
    }
}

impl BatcherConfig {
    pub(crate) fn samples_for(&self, d: Duration) -> usize {
        (d.as_secs_f64() * self.sample_rate as f64).round() as usize
    }
}
