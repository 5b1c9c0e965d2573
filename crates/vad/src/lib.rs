//! RMS-threshold voice-activity detection with hysteresis.
//!
//! The classifier itself is a stateless function of one frame's RMS energy;
//! the hysteresis (stay voiced through brief dips) is the only state carried
//! between frames.

/// Thresholds and timing for the hysteresis state machine.
///
/// `enter_threshold` and `exit_threshold` are RMS values on the int16 scale
/// (0..=32767). `exit_threshold` should be below `enter_threshold` so a
/// frame that's ambiguous doesn't flap between voiced/unvoiced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadConfig {
    pub enter_threshold: f32,
    pub exit_threshold: f32,
    /// Consecutive unvoiced frames required before leaving the voiced state.
    pub min_unvoice_frames: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        let enter_threshold = 500.0;
        Self {
            enter_threshold,
            exit_threshold: enter_threshold * 0.6,
            min_unvoice_frames: 1,
        }
    }
}

/// Per-frame voiced/unvoiced classification, with hysteresis state.
pub trait VoiceActivityDetector: Send {
    fn classify(&mut self, frame: &[i16]) -> bool;
    fn reset(&mut self);
}

/// RMS energy of a frame of int16 samples.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    ((sum_sq / samples.len() as f64).sqrt()) as f32
}

/// RMS-threshold detector with enter/exit hysteresis.
pub struct RmsVad {
    config: VadConfig,
    voiced: bool,
    consecutive_unvoiced: u32,
}

impl RmsVad {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            voiced: false,
            consecutive_unvoiced: 0,
        }
    }

    pub fn config(&self) -> VadConfig {
        self.config
    }

    pub fn is_voiced(&self) -> bool {
        self.voiced
    }
}

impl Default for RmsVad {
    fn default() -> Self {
        Self::new(VadConfig::default())
    }
}

impl VoiceActivityDetector for RmsVad {
    fn classify(&mut self, frame: &[i16]) -> bool {
        let energy = rms(frame);

        if !self.voiced {
            if energy > self.config.enter_threshold {
                tracing::trace!(energy, "vad entering voiced state");
                self.voiced = true;
                self.consecutive_unvoiced = 0;
            }
        } else if energy < self.config.exit_threshold {
            self.consecutive_unvoiced += 1;
            if self.consecutive_unvoiced >= self.config.min_unvoice_frames {
                tracing::trace!(energy, "vad leaving voiced state");
                self.voiced = false;
                self.consecutive_unvoiced = 0;
            }
        } else {
            self.consecutive_unvoiced = 0;
        }

        self.voiced
    }

    fn reset(&mut self) {
        self.voiced = false;
        self.consecutive_unvoiced = 0;
    }
}
