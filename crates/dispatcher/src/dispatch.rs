use std::time::{Duration, Instant};

use live_transcripts_batcher::Utterance;
use live_transcripts_transcript::Transcription;
use rand::Rng;

use crate::client::TranscriptionClient;
use crate::error::DispatchError;
use crate::stats::DispatcherStats;

/// `primary_model` is tried first; `fallback_models` are tried in order
/// once the primary is exhausted. Each model gets exactly `max_retries`
/// attempts before dispatch moves on.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub primary_model: String,
    pub fallback_models: Vec<String>,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            primary_model: "whisper-large".to_string(),
            fallback_models: vec!["whisper-1".to_string()],
            max_retries: 3,
            retry_base_delay: Duration::from_millis(250),
            retry_max_delay: Duration::from_secs(8),
        }
    }
}

fn wav_bytes_for(utterance: &Utterance) -> Result<Vec<u8>, DispatchError> {
    live_transcripts_audio::encode_wav(&utterance.samples, utterance.sample_rate)
        .map_err(|e| DispatchError::ClientError(e.to_string()))
}

/// Backoff delay for the k-th retry (0-indexed), full jitter in `[0, cap)`.
fn backoff_delay(cfg: &DispatcherConfig, k: u32) -> Duration {
    let exp = cfg.retry_base_delay.as_millis() as u64 * 2u64.saturating_pow(k);
    let cap = exp.min(cfg.retry_max_delay.as_millis() as u64);
    let jittered = rand::thread_rng().gen_range(0..=cap.max(1));
    Duration::from_millis(jittered)
}

/// Try `model` up to `cfg.max_retries` times total, sleeping with backoff
/// between attempts (but never after the last one). A non-retryable error
/// (4xx other than 429) stops the loop immediately rather than burning
/// through the remaining attempts.
async fn attempt_model(
    client: &dyn TranscriptionClient,
    cfg: &DispatcherConfig,
    model: &str,
    wav_bytes: &[u8],
    sample_rate: u32,
    stats: &DispatcherStats,
) -> Result<(String, Option<f32>, Duration), DispatchError> {
    let mut last_err = DispatchError::Network("no attempts made".to_string());

    for attempt in 0..cfg.max_retries {
        stats.record_attempt(model);
        let started = Instant::now();
        match client.transcribe(model, wav_bytes, sample_rate).await {
            Ok(result) => {
                let latency = started.elapsed();
                stats.record_success(model, latency.as_millis() as u64);
                return Ok((result.text, result.confidence, latency));
            }
            Err(err) => {
                stats.record_failure(model);
                let is_last_attempt = attempt + 1 == cfg.max_retries;
                if !err.is_retryable() || is_last_attempt {
                    last_err = err;
                    break;
                }
                let delay = match &err {
                    DispatchError::RateLimited { retry_after: Some(d) } => *d,
                    _ => backoff_delay(cfg, attempt),
                };
                tracing::warn!(model, attempt, ?delay, error = %err, "transcription attempt failed, retrying");
                tokio::time::sleep(delay).await;
                last_err = err;
            }
        }
    }

    Err(last_err)
}

/// Dispatch a single Utterance: primary model first, then each fallback in
/// order, each getting its own `max_retries` attempts. Always returns a
/// `Transcription` — a total failure produces one carrying `error`, never
/// an `Err`, so the caller can append it and preserve the dense `batch_seq`
/// sequence.
pub async fn dispatch_one(
    client: &dyn TranscriptionClient,
    cfg: &DispatcherConfig,
    utterance: &Utterance,
    stats: &DispatcherStats,
) -> Transcription {
    let wav_bytes = match wav_bytes_for(utterance) {
        Ok(bytes) => bytes,
        Err(err) => return Transcription::failure(utterance.batch_seq, &cfg.primary_model, err.to_string()),
    };
    let models = std::iter::once(cfg.primary_model.as_str())
        .chain(cfg.fallback_models.iter().map(String::as_str));

    let mut last_error = None;
    for model in models {
        match attempt_model(client, cfg, model, &wav_bytes, utterance.sample_rate, stats).await {
            Ok((text, confidence, latency)) => {
                return Transcription::success(utterance.batch_seq, text, model, latency, confidence);
            }
            Err(err) => {
                tracing::warn!(model, error = %err, "model exhausted its retries, trying next");
                last_error = Some(err);
            }
        }
    }

    let error = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no models configured".to_string());
    Transcription::failure(utterance.batch_seq, &cfg.primary_model, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use live_transcripts_transcript::Transcription as T;

    use crate::client::TranscriptionResult;

    struct ScriptedClient {
        primary_calls: Arc<AtomicU32>,
        primary_model: String,
    }

    #[async_trait]
    impl TranscriptionClient for ScriptedClient {
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
                Ok(TranscriptionResult {
                    text: "hello".to_string(),
                    confidence: Some(0.9),
                })
            }
        }
    }

    fn utterance(batch_seq: u64) -> Utterance {
        Utterance {
            batch_seq,
            start_ts_ms: 0,
            end_ts_ms: 1000,
            sample_rate: 16_000,
            samples: Arc::from(vec![0i16; 16_000]),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_after_primary_exhausts_retries() {
        let cfg = DispatcherConfig {
            primary_model: "whisper-large".to_string(),
            fallback_models: vec!["whisper-1".to_string()],
            max_retries: 3,
            retry_base_delay: Duration::from_millis(10),
            retry_max_delay: Duration::from_millis(50),
        };
        let primary_calls = Arc::new(AtomicU32::new(0));
        let client = ScriptedClient {
            primary_calls: primary_calls.clone(),
            primary_model: cfg.primary_model.clone(),
        };
        let stats = DispatcherStats::new();

        let handle = tokio::spawn(async move {
            dispatch_one(&client, &cfg, &utterance(7), &stats).await
        });
        tokio::time::advance(Duration::from_secs(1)).await;
        let result: T = handle.await.unwrap();

        assert_eq!(result.text, "hello");
        assert_eq!(result.model_used, "whisper-1");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 3);
        assert!(!result.is_error());
    }

    struct AlwaysClientError;

    #[async_trait]
    impl TranscriptionClient for AlwaysClientError {
        async fn transcribe(
            &self,
            _model: &str,
            _wav_bytes: &[u8],
            _sample_rate: u32,
        ) -> Result<TranscriptionResult, DispatchError> {
            Err(DispatchError::ClientError("bad request".to_string()))
        }
    }

    #[tokio::test]
    async fn non_retryable_error_stops_after_one_attempt_per_model() {
        let cfg = DispatcherConfig {
            primary_model: "whisper-large".to_string(),
            fallback_models: vec!["whisper-1".to_string()],
            max_retries: 5,
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(2),
        };
        let stats = DispatcherStats::new();
        let result = dispatch_one(&AlwaysClientError, &cfg, &utterance(0), &stats).await;

        assert!(result.is_error());
        let snap = stats.snapshot(0, 0);
        for model_stats in snap.models {
            assert_eq!(model_stats.attempts, 1);
        }
    }

    #[tokio::test]
    async fn total_failure_still_produces_a_transcription_not_an_error() {
        let cfg = DispatcherConfig {
            primary_model: "whisper-large".to_string(),
            fallback_models: vec![],
            max_retries: 1,
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(2),
        };
        let stats = DispatcherStats::new();
        let result = dispatch_one(&AlwaysClientError, &cfg, &utterance(3), &stats).await;

        assert_eq!(result.batch_seq, 3);
        assert!(result.is_error());
    }
}
