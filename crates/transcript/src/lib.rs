//! Append-only meeting transcript.
//!
//! A single dispatcher appends `Transcription`s in strict `batch_seq` order;
//! any number of readers (tickers, the Q&A handler) take a point-in-time
//! snapshot of the version and concatenated text without blocking the
//! writer.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The result of transcribing one Utterance.
///
/// Exactly one `Transcription` is produced per Utterance, whether or not
/// the transcription attempt succeeded; a failed attempt carries `error`
/// and empty `text` rather than being omitted, preserving the dense
/// `batch_seq` sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub batch_seq: u64,
    pub text: String,
    pub model_used: String,
    pub latency: Duration,
    pub confidence: Option<f32>,
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl Transcription {
    pub fn success(
        batch_seq: u64,
        text: impl Into<String>,
        model_used: impl Into<String>,
        latency: Duration,
        confidence: Option<f32>,
    ) -> Self {
        Self {
            batch_seq,
            text: text.into(),
            model_used: model_used.into(),
            latency,
            confidence,
            error: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn failure(batch_seq: u64, model_used: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            batch_seq,
            text: String::new(),
            model_used: model_used.into(),
            latency: Duration::ZERO,
            confidence: None,
            error: Some(error.into()),
            recorded_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Appending out of order is a programming error in the dispatcher (the
/// reorder buffer should make this unreachable), but we surface it as a
/// typed error rather than panicking so callers can log and recover.
#[derive(Debug, thiserror::Error)]
pub enum AppendError {
    #[error("out-of-order append: expected batch_seq {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u64 },
}

/// A read-only, point-in-time view of the transcript, safe to hold across
/// an external AI request without blocking the writer.
#[derive(Debug, Clone)]
pub struct TranscriptSnapshot {
    pub version: u64,
    pub text: String,
}

/// Append-only ordered sequence of Transcriptions plus derived state.
#[derive(Debug, Default)]
pub struct Transcript {
    transcriptions: Vec<Transcription>,
    text: String,
    version: u64,
    last_appended_seq: Option<u64>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a Transcription. Must carry `batch_seq == last_appended_seq + 1`
    /// (or `0` for the first append).
    pub fn append(&mut self, transcription: Transcription) -> Result<(), AppendError> {
        let expected = self.last_appended_seq.map(|s| s + 1).unwrap_or(0);
        if transcription.batch_seq != expected {
            return Err(AppendError::OutOfOrder {
                expected,
                got: transcription.batch_seq,
            });
        }

        if !transcription.text.is_empty() {
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(&transcription.text);
        }

        self.last_appended_seq = Some(transcription.batch_seq);
        self.transcriptions.push(transcription);
        self.version += 1;
        Ok(())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn full_text(&self) -> &str {
        &self.text
    }

    pub fn transcriptions(&self) -> &[Transcription] {
        &self.transcriptions
    }

    pub fn is_empty(&self) -> bool {
        self.transcriptions.is_empty()
    }

    /// Snapshot the current version and concatenated text. Cheap relative
    /// to the AI calls it precedes; the real cost is a `String` clone.
    pub fn snapshot(&self) -> TranscriptSnapshot {
        TranscriptSnapshot {
            version: self.version,
            text: self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_in_order_advances_version_and_text() {
        let mut t = Transcript::new();
        t.append(Transcription::success(0, "hello", "m1", Duration::from_millis(1), None))
            .unwrap();
        t.append(Transcription::success(1, "world", "m1", Duration::from_millis(1), None))
            .unwrap();

        assert_eq!(t.version(), 2);
        assert_eq!(t.full_text(), "hello world");
    }

    #[test]
    fn out_of_order_append_is_rejected() {
        let mut t = Transcript::new();
        t.append(Transcription::success(0, "hello", "m1", Duration::from_millis(1), None))
            .unwrap();

        let err = t
            .append(Transcription::success(5, "oops", "m1", Duration::from_millis(1), None))
            .unwrap_err();
        match err {
            AppendError::OutOfOrder { expected, got } => {
                assert_eq!(expected, 1);
                assert_eq!(got, 5);
            }
        }
        assert_eq!(t.version(), 1);
    }

    #[test]
    fn failed_transcription_still_advances_version_but_not_text() {
        let mut t = Transcript::new();
        t.append(Transcription::failure(0, "m1", "timeout")).unwrap();
        assert_eq!(t.version(), 1);
        assert_eq!(t.full_text(), "");
        assert!(t.transcriptions()[0].is_error());
    }

    #[test]
    fn snapshot_reflects_state_at_call_time() {
        let mut t = Transcript::new();
        t.append(Transcription::success(0, "a", "m1", Duration::from_millis(1), None))
            .unwrap();
        let snap = t.snapshot();
        t.append(Transcription::success(1, "b", "m1", Duration::from_millis(1), None))
            .unwrap();

        assert_eq!(snap.version, 1);
        assert_eq!(snap.text, "a");
        assert_eq!(t.version(), 2);
    }
}
