use crate::chunk::AudioChunk;
use crate::AudioError;

/// Blocking audio capture interface.
///
/// The platform driver behind this trait is an external collaborator: this
/// crate only depends on the contract — a blocking call that yields the next
/// chunk of 16-bit mono PCM, or signals end-of-stream.
pub trait AudioSource: Send {
    /// Block until the next chunk is available, or the source ends.
    ///
    /// Returns `Ok(None)` on a clean end-of-stream (device removed, process
    /// shutting down) rather than an error.
    fn read_chunk(&mut self) -> Result<Option<AudioChunk>, AudioError>;

    fn sample_rate(&self) -> u32;
}

/// A scriptable source for tests: yields a fixed sequence of chunks, then
/// ends the stream.
pub struct FixedAudioSource {
    sample_rate: u32,
    chunks: std::collections::VecDeque<Vec<i16>>,
    next_seq: u64,
    next_timestamp_ms: i64,
}

impl FixedAudioSource {
    pub fn new(sample_rate: u32, chunks: Vec<Vec<i16>>) -> Self {
        Self {
            sample_rate,
            chunks: chunks.into(),
            next_seq: 0,
            next_timestamp_ms: 0,
        }
    }
}

impl AudioSource for FixedAudioSource {
    fn read_chunk(&mut self) -> Result<Option<AudioChunk>, AudioError> {
        let Some(samples) = self.chunks.pop_front() else {
            return Ok(None);
        };
        let chunk = AudioChunk::new(self.next_seq, self.next_timestamp_ms, self.sample_rate, samples.clone());
        self.next_seq += 1;
        self.next_timestamp_ms += chunk.duration_ms() as i64;
        Ok(Some(chunk))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(feature = "cpal-source")]
mod cpal_source {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use crossbeam_channel::{bounded, Receiver};
    use std::time::Duration;

    /// Captures from the default system input device using cpal, resampling
    /// is assumed to already match the configured rate (the device must be
    /// opened at the target rate; this crate does not resample).
    pub struct CpalAudioSource {
        sample_rate: u32,
        rx: Receiver<Vec<i16>>,
        next_seq: u64,
        next_timestamp_ms: i64,
        _stream: cpal::Stream,
    }

    impl CpalAudioSource {
        pub fn default_device(sample_rate: u32, chunk_size: usize) -> Result<Self, AudioError> {
            let host = cpal::default_host();
            let device = host
                .default_input_device()
                .ok_or_else(|| AudioError::DeviceNotFound("default input device".into()))?;

            let config = cpal::StreamConfig {
                channels: 1,
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Fixed(chunk_size as u32),
            };

            let (tx, rx) = bounded::<Vec<i16>>(64);

            let stream = device
                .build_input_stream(
                    &config,
                    move |data: &[i16], _| {
                        let _ = tx.send(data.to_vec());
                    },
                    move |err| tracing::warn!("cpal input stream error: {err}"),
                    None,
                )
                .map_err(|e| AudioError::StreamError(e.to_string()))?;

            stream
                .play()
                .map_err(|e| AudioError::StreamError(e.to_string()))?;

            Ok(Self {
                sample_rate,
                rx,
                next_seq: 0,
                next_timestamp_ms: 0,
                _stream: stream,
            })
        }
    }

    impl AudioSource for CpalAudioSource {
        fn read_chunk(&mut self) -> Result<Option<AudioChunk>, AudioError> {
            match self.rx.recv_timeout(Duration::from_secs(5)) {
                Ok(samples) => {
                    let chunk =
                        AudioChunk::new(self.next_seq, self.next_timestamp_ms, self.sample_rate, samples);
                    self.next_seq += 1;
                    self.next_timestamp_ms += chunk.duration_ms() as i64;
                    Ok(Some(chunk))
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    Err(AudioError::StreamError("no audio received within timeout".into()))
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Ok(None),
            }
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }
    }
}

#[cfg(feature = "cpal-source")]
pub use cpal_source::CpalAudioSource;
