use parking_lot::Mutex;

use crate::chunk::AudioChunk;

/// A fixed-duration circular buffer of PCM samples with a single writer and
/// any number of cursor-based readers.
///
/// `write` never blocks: once the ring is full, new samples overwrite the
/// oldest ones. Readers track their own position (a sample count) and call
/// [`AudioRing::read_since`] to catch up; if their cursor has already fallen
/// out of the retained window, the read is flagged `truncated` so the caller
/// can reset any in-progress accumulation rather than work from a glitched
/// segment.
pub struct AudioRing {
    sample_rate: u32,
    inner: Mutex<RingInner>,
}

struct RingInner {
    buffer: Vec<i16>,
    /// Total samples ever written (monotonic); acts as the write cursor.
    write_pos: u64,
}

/// Result of a [`AudioRing::read_since`] call.
#[derive(Debug, Clone)]
pub struct RingRead {
    pub samples: Vec<i16>,
    /// The cursor to pass to the next `read_since` call.
    pub cursor: u64,
    /// True if the requested cursor had already fallen outside the retained
    /// window; `samples` contains the entire current window instead.
    pub truncated: bool,
}

impl AudioRing {
    /// `buffer_duration_secs` is the retained window; `sample_rate` is fixed
    /// for the life of the ring.
    pub fn new(sample_rate: u32, buffer_duration_secs: f32) -> Self {
        let capacity = ((sample_rate as f32) * buffer_duration_secs).round() as usize;
        let capacity = capacity.max(1);
        Self {
            sample_rate,
            inner: Mutex::new(RingInner {
                buffer: vec![0; capacity],
                write_pos: 0,
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    /// A cursor positioned at the current write head; a reader starting here
    /// only observes samples written after this call.
    pub fn cursor(&self) -> u64 {
        self.inner.lock().write_pos
    }

    /// Append an audio chunk's samples, overwriting the oldest data if full.
    pub fn write(&self, chunk: &AudioChunk) {
        let mut inner = self.inner.lock();
        let capacity = inner.buffer.len();
        for &sample in chunk.samples.iter() {
            let idx = (inner.write_pos % capacity as u64) as usize;
            inner.buffer[idx] = sample;
            inner.write_pos += 1;
        }
    }

    /// Return samples written since `cursor`, and the cursor to resume from.
    ///
    /// If `cursor` is older than the retained window, the entire window is
    /// returned with `truncated = true`.
    pub fn read_since(&self, cursor: u64) -> RingRead {
        let inner = self.inner.lock();
        let capacity = inner.buffer.len() as u64;
        let write_pos = inner.write_pos;
        let oldest_available = write_pos.saturating_sub(capacity);

        let (effective_cursor, truncated) = if cursor < oldest_available {
            (oldest_available, cursor < write_pos && write_pos > 0 && oldest_available > 0)
        } else {
            (cursor, false)
        };

        let len = write_pos.saturating_sub(effective_cursor) as usize;
        let mut samples = Vec::with_capacity(len);
        for i in 0..len as u64 {
            let pos = effective_cursor + i;
            let idx = (pos % capacity) as usize;
            samples.push(inner.buffer[idx]);
        }

        RingRead {
            samples,
            cursor: write_pos,
            truncated,
        }
    }
}
