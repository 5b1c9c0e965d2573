use live_transcripts_vad::VoiceActivityDetector;

use crate::config::BatcherConfig;
use crate::utterance::Utterance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitingForVoice,
    Accumulating,
    Paused,
}

/// Converts an unbounded PCM stream into transcription-ready [`Utterance`]s
/// under the minimum/silence-boundary/maximum duration policies.
///
/// `OVERLAP_CARRY` from the design is modeled as a single-frame transient:
/// `emit_and_carry` installs the carried samples and returns directly to
/// `Accumulating`, since no frame is ever processed while "in" that state.
pub struct Batcher {
    config: BatcherConfig,
    vad: Box<dyn VoiceActivityDetector>,
    state: State,
    samples_per_frame: usize,
    min_batch_samples: usize,
    max_batch_samples: usize,
    silence_threshold_samples: usize,
    overlap_samples: usize,

    buf: Vec<i16>,
    pending_frame: Vec<i16>,
    consecutive_unvoiced_samples: usize,
    next_batch_seq: u64,

    samples_seen: u64,
    epoch_ts_ms: Option<i64>,
    utterance_start_sample: u64,
}

impl Batcher {
    pub fn new(config: BatcherConfig, vad: Box<dyn VoiceActivityDetector>) -> Self {
        let samples_per_frame = config.samples_for(config.frame_duration).max(1);
        let min_batch_samples = config.samples_for(config.min_batch_duration);
        let max_batch_samples = config.samples_for(config.max_batch_duration);
        let silence_threshold_samples = config.samples_for(config.silence_duration_threshold);
        let overlap_samples = config.samples_for(config.overlap);

        Self {
            config,
            vad,
            state: State::WaitingForVoice,
            samples_per_frame,
            min_batch_samples,
            max_batch_samples,
            silence_threshold_samples,
            overlap_samples,
            buf: Vec::new(),
            pending_frame: Vec::new(),
            consecutive_unvoiced_samples: 0,
            next_batch_seq: 0,
            samples_seen: 0,
            epoch_ts_ms: None,
            utterance_start_sample: 0,
        }
    }

    /// Feed a contiguous block of newly captured samples. `chunk_ts_ms` is
    /// the wall-clock timestamp of `samples[0]`; the stream is assumed
    /// continuous between calls (no gaps), matching how the batcher runner
    /// drains the ring.
    pub fn push_samples(&mut self, samples: &[i16], chunk_ts_ms: i64) -> Vec<Utterance> {
        if self.state == State::Paused {
            return Vec::new();
        }
        if self.epoch_ts_ms.is_none() {
            self.epoch_ts_ms = Some(chunk_ts_ms);
        }

        let mut input = std::mem::take(&mut self.pending_frame);
        input.extend_from_slice(samples);

        let mut emitted = Vec::new();
        let mut offset = 0;
        while input.len() - offset >= self.samples_per_frame {
            let frame = input[offset..offset + self.samples_per_frame].to_vec();
            if let Some(u) = self.process_frame(&frame) {
                emitted.push(u);
            }
            offset += self.samples_per_frame;
            self.samples_seen += self.samples_per_frame as u64;
        }
        self.pending_frame = input[offset..].to_vec();
        emitted
    }

    /// Drop in-flight accumulation and wait for the next voiced frame. Used
    /// for both the `pause` command and ring-truncation resets.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.pending_frame.clear();
        self.consecutive_unvoiced_samples = 0;
        self.vad.reset();
        self.state = State::WaitingForVoice;
        self.epoch_ts_ms = None;
    }

    pub fn pause(&mut self) {
        self.buf.clear();
        self.pending_frame.clear();
        self.consecutive_unvoiced_samples = 0;
        self.vad.reset();
        self.state = State::Paused;
    }

    pub fn resume(&mut self) {
        self.state = State::WaitingForVoice;
        self.epoch_ts_ms = None;
    }

    fn ts_at(&self, sample_index: u64) -> i64 {
        let epoch = self.epoch_ts_ms.unwrap_or(0);
        epoch + ((sample_index as u128 * 1000) / self.config.sample_rate.max(1) as u128) as i64
    }

    fn process_frame(&mut self, frame: &[i16]) -> Option<Utterance> {
        let voiced = self.vad.classify(frame);

        match self.state {
            State::Paused => None,
            State::WaitingForVoice => {
                if !voiced {
                    return None;
                }
                self.buf.clear();
                self.buf.extend_from_slice(frame);
                self.utterance_start_sample = self.samples_seen;
                self.consecutive_unvoiced_samples = 0;
                self.state = State::Accumulating;
                self.maybe_force_emit()
            }
            State::Accumulating => {
                if voiced {
                    self.buf.extend_from_slice(frame);
                    self.consecutive_unvoiced_samples = 0;
                    self.maybe_force_emit()
                } else {
                    // Silence frames are never appended: the accumulated
                    // buffer already ends at the start of the silence run,
                    // which is exactly the word-boundary the spec wants.
                    self.consecutive_unvoiced_samples += frame.len();
                    if self.buf.len() >= self.min_batch_samples
                        && self.consecutive_unvoiced_samples >= self.silence_threshold_samples
                    {
                        Some(self.emit_and_carry(self.buf.len()))
                    } else {
                        None
                    }
                }
            }
        }
    }

    fn maybe_force_emit(&mut self) -> Option<Utterance> {
        if self.buf.len() >= self.max_batch_samples {
            Some(self.emit_and_carry(self.max_batch_samples))
        } else {
            None
        }
    }

    fn emit_and_carry(&mut self, emit_len: usize) -> Utterance {
        let start_sample = self.utterance_start_sample;
        let end_sample = start_sample + emit_len as u64;

        let emitted_samples: Vec<i16> = self.buf[..emit_len].to_vec();
        let remainder: Vec<i16> = self.buf[emit_len..].to_vec();

        let batch_seq = self.next_batch_seq;
        self.next_batch_seq += 1;

        let utterance = Utterance {
            batch_seq,
            start_ts_ms: self.ts_at(start_sample),
            end_ts_ms: self.ts_at(end_sample),
            sample_rate: self.config.sample_rate,
            samples: emitted_samples.into(),
        };

        let overlap_start = emit_len.saturating_sub(self.overlap_samples);
        let mut carry: Vec<i16> = self.buf[overlap_start..emit_len].to_vec();
        carry.extend(remainder);

        self.utterance_start_sample = end_sample.saturating_sub((emit_len - overlap_start) as u64);
        self.buf = carry;
        self.consecutive_unvoiced_samples = 0;
        self.state = State::Accumulating;

        tracing::debug!(
            batch_seq,
            duration_ms = utterance.duration().as_millis() as u64,
            "batcher emitted utterance"
        );

        utterance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_transcripts_vad::{RmsVad, VadConfig};

    fn batcher(config: BatcherConfig) -> Batcher {
        let vad_config = VadConfig {
            enter_threshold: 500.0,
            exit_threshold: 300.0,
            min_unvoice_frames: 1,
        };
        Batcher::new(config, Box::new(RmsVad::new(vad_config)))
    }

    fn voiced_samples(duration: Duration, sample_rate: u32) -> Vec<i16> {
        let n = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
        vec![1000i16; n]
    }

    fn silent_samples(duration: Duration, sample_rate: u32) -> Vec<i16> {
        let n = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
        vec![0i16; n]
    }

    use std::time::Duration;

    #[test]
    fn silence_boundary_scenario_one() {
        // 2.0s voice, 0.6s silence, 2.0s voice, 0.6s silence.
        // minBatch=3.0 means the first silence run doesn't trigger a
        // boundary (only 2.0s accumulated); the second does, at ~4.0s.
        let config = BatcherConfig {
            sample_rate: 16_000,
            frame_duration: Duration::from_millis(20),
            min_batch_duration: Duration::from_secs_f32(3.0),
            max_batch_duration: Duration::from_secs_f32(30.0),
            silence_duration_threshold: Duration::from_secs_f32(0.5),
            overlap: Duration::from_secs_f32(0.5),
        };
        let mut b = batcher(config);

        let mut emitted = Vec::new();
        emitted.extend(b.push_samples(&voiced_samples(Duration::from_secs_f32(2.0), 16_000), 0));
        emitted.extend(b.push_samples(&silent_samples(Duration::from_secs_f32(0.6), 16_000), 2_000));
        emitted.extend(b.push_samples(&voiced_samples(Duration::from_secs_f32(2.0), 16_000), 2_600));
        emitted.extend(b.push_samples(&silent_samples(Duration::from_secs_f32(0.6), 16_000), 4_600));

        assert_eq!(emitted.len(), 1);
        let dur = emitted[0].duration().as_secs_f64();
        assert!((dur - 4.0).abs() < 0.05, "expected ~4.0s, got {dur}");
    }

    #[test]
    fn max_duration_force_emit_scenario_two() {
        let config = BatcherConfig::default();
        let mut b = batcher(config);

        let emitted = b.push_samples(&voiced_samples(Duration::from_secs_f32(31.0), 16_000), 0);

        assert_eq!(emitted.len(), 1);
        let dur = emitted[0].duration().as_secs_f64();
        assert!((dur - 30.0).abs() < 0.05, "expected exactly ~30.0s, got {dur}");
    }

    #[test]
    fn pure_silence_for_longer_than_max_batch_emits_nothing() {
        let config = BatcherConfig::default();
        let mut b = batcher(config);
        let emitted = b.push_samples(&silent_samples(Duration::from_secs_f32(31.0), 16_000), 0);
        assert!(emitted.is_empty());
    }

    #[test]
    fn batch_sequence_is_dense_and_increasing() {
        let config = BatcherConfig::default();
        let mut b = batcher(config);
        let emitted = b.push_samples(&voiced_samples(Duration::from_secs_f32(61.0), 16_000), 0);
        assert!(emitted.len() >= 2);
        for (i, u) in emitted.iter().enumerate() {
            assert_eq!(u.batch_seq, i as u64);
        }
    }

    #[test]
    fn reset_drops_in_progress_accumulation() {
        let config = BatcherConfig::default();
        let mut b = batcher(config);
        let emitted = b.push_samples(&voiced_samples(Duration::from_secs_f32(1.0), 16_000), 0);
        assert!(emitted.is_empty());
        b.reset();
        // after reset, waiting for voice again; feeding silence emits nothing
        let emitted = b.push_samples(&silent_samples(Duration::from_secs_f32(5.0), 16_000), 0);
        assert!(emitted.is_empty());
    }

    #[test]
    fn pause_then_resume_requires_new_voiced_frame() {
        let config = BatcherConfig::default();
        let mut b = batcher(config);
        let _ = b.push_samples(&voiced_samples(Duration::from_secs_f32(1.0), 16_000), 0);
        b.pause();
        // samples pushed while paused are ignored entirely
        let emitted = b.push_samples(&voiced_samples(Duration::from_secs_f32(1.0), 16_000), 1_000);
        assert!(emitted.is_empty());
        b.resume();
        let emitted = b.push_samples(&silent_samples(Duration::from_secs_f32(1.0), 16_000), 2_000);
        assert!(emitted.is_empty(), "waiting for voice after resume");
    }
}
