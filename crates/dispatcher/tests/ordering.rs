//! End-to-end dispatcher scenarios against the crate's public surface:
//! falling back to a secondary model after the primary exhausts its
//! retries, and restoring strict `batch_seq` order when completions race
//! under parallelism.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use live_transcripts_batcher::Utterance;
use live_transcripts_bus::BatchQueue;
use live_transcripts_dispatcher::{
    DispatchError, DispatcherConfig, DispatcherStats, TranscriptionClient, TranscriptionResult,
};
use live_transcripts_transcript::Transcript;
use parking_lot::Mutex;

fn utterance(batch_seq: u64, sample_count: usize) -> Utterance {
    Utterance {
        batch_seq,
        start_ts_ms: 0,
        end_ts_ms: 1_000,
        sample_rate: 16_000,
        samples: Arc::from(vec![0i16; sample_count]),
    }
}

/// Primary model always times out; the fallback always succeeds with "hello".
struct FlakyPrimary {
    primary_model: String,
    primary_calls: Arc<AtomicU32>,
}

#[async_trait]
impl TranscriptionClient for FlakyPrimary {
    async fn transcribe(
        &self,
        model: &str,
        _wav_bytes: &[u8],
        _sample_rate: u32,
    ) -> Result<TranscriptionResult, DispatchError> {
        if model == self.primary_model {
            self.primary_calls.fetch_add(1, Ordering::SeqCst);
            Err(DispatchError::Timeout)
        } else {
            Ok(TranscriptionResult { text: "hello".to_string(), confidence: Some(0.95) })
        }
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_three_fallback_chain_after_primary_exhausts_retries() {
    let cfg = DispatcherConfig {
        primary_model: "whisper-large".to_string(),
        fallback_models: vec!["whisper-1".to_string()],
        max_retries: 3,
        retry_base_delay: Duration::from_millis(5),
        retry_max_delay: Duration::from_millis(20),
    };
    let primary_calls = Arc::new(AtomicU32::new(0));
    let client = FlakyPrimary { primary_model: cfg.primary_model.clone(), primary_calls: primary_calls.clone() };
    let stats = DispatcherStats::new();

    let handle = tokio::spawn({
        let cfg = cfg.clone();
        async move { live_transcripts_dispatcher::dispatch_one(&client, &cfg, &utterance(0, 100), &stats).await }
    });
    tokio::time::advance(Duration::from_secs(2)).await;
    let transcription = handle.await.unwrap();

    assert_eq!(transcription.text, "hello");
    assert_eq!(transcription.model_used, "whisper-1");
    assert_eq!(primary_calls.load(Ordering::SeqCst), cfg.max_retries);
    assert!(!transcription.is_error());
}

/// Responds instantly for small utterances, slowly for large ones, so a
/// later-sequenced small utterance can complete before an earlier large one.
struct SizeRacyClient;

#[async_trait]
impl TranscriptionClient for SizeRacyClient {
    async fn transcribe(
        &self,
        model: &str,
        wav_bytes: &[u8],
        _sample_rate: u32,
    ) -> Result<TranscriptionResult, DispatchError> {
        if wav_bytes.len() > 4_000 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(TranscriptionResult { text: model.to_string(), confidence: None })
    }
}

#[tokio::test]
async fn scenario_four_ordered_append_under_parallelism_two() {
    let cfg = DispatcherConfig {
        primary_model: "fast-model".to_string(),
        fallback_models: vec![],
        max_retries: 1,
        retry_base_delay: Duration::from_millis(1),
        retry_max_delay: Duration::from_millis(2),
    };
    let client: Arc<dyn TranscriptionClient> = Arc::new(SizeRacyClient);
    let transcript = Arc::new(Mutex::new(Transcript::new()));
    let stats = DispatcherStats::new();

    let mut queue = BatchQueue::new(8);
    let rx = queue.take_receiver().unwrap();
    let tx = queue.sender();

    // batch_seq 4 is large (slow); batch_seq 5 is small (fast) and should
    // complete first, but must still append after 4.
    tx.push_blocking(utterance(4, 16_000), Duration::from_millis(50)).unwrap();
    tx.push_blocking(utterance(5, 10), Duration::from_millis(50)).unwrap();
    drop(tx);

    live_transcripts_dispatcher::run(client, cfg, rx, transcript.clone(), stats, 2, |_| {}).await;

    let locked = transcript.lock();
    assert_eq!(locked.version(), 2);
    assert_eq!(locked.transcriptions()[0].batch_seq, 4);
    assert_eq!(locked.transcriptions()[1].batch_seq, 5);
}
