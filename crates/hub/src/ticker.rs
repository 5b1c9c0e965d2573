//! The two independent periodic tasks that run while a session is
//! recording: the insight ticker and the dynamic-question ticker.
//!
//! Both tasks pause themselves (by skipping their tick's work) while the
//! session is `PAUSED`, resume cleanly on `RECORDING`, and stop promptly on
//! cancellation — any AI call already in flight when cancellation fires is
//! simply allowed to finish and its result discarded, per §4.6.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use live_transcripts_context::{ContextManager, QuestionRotation};
use live_transcripts_protocol::{RecordingState, ServerMessage};
use live_transcripts_transcript::Transcript;

use crate::subscriber::SubscriberRegistry;
use crate::view::SharedView;

/// Runs the insight ticker until `cancel` fires. Skips a tick if the
/// transcript version hasn't advanced since the last *successful* tick, so
/// unchanged content never burns a model call.
pub async fn insight_ticker(
    interval: Duration,
    context: Arc<ContextManager>,
    transcript: Arc<Mutex<Transcript>>,
    view: Arc<SharedView>,
    subscribers: Arc<SubscriberRegistry>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_successful_version: Option<u64> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let state = view.snapshot();
        if state.recording != RecordingState::Recording {
            continue;
        }

        let snapshot = transcript.lock().snapshot();
        if Some(snapshot.version) == last_successful_version {
            tracing::debug!("insight ticker: transcript unchanged, skipping tick");
            continue;
        }

        match context.generate_insights(&snapshot, &state.focus, &state.knowledge).await {
            Ok(insights) => {
                if cancel.is_cancelled() {
                    continue;
                }
                last_successful_version = Some(snapshot.version);
                for insight in insights {
                    subscribers.broadcast(ServerMessage::Insight {
                        kind: insight.kind,
                        text: insight.text,
                        ts: insight.generated_at,
                    });
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "insight ticker: AI call failed, will retry next tick");
            }
        }
    }
}

/// Runs the dynamic-question ticker until `cancel` fires. Skips a tick on
/// an empty transcript (a fresh session keeps its static default list).
pub async fn dynamic_question_ticker(
    interval: Duration,
    context: Arc<ContextManager>,
    transcript: Arc<Mutex<Transcript>>,
    view: Arc<SharedView>,
    subscribers: Arc<SubscriberRegistry>,
    rotation: Arc<Mutex<QuestionRotation>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let state = view.snapshot();
        if state.recording != RecordingState::Recording {
            continue;
        }

        let snapshot = transcript.lock().snapshot();
        if snapshot.text.is_empty() {
            tracing::debug!("question ticker: transcript empty, skipping tick");
            continue;
        }

        match context.suggest_questions(&snapshot, &state.focus).await {
            Ok(question) => {
                if cancel.is_cancelled() {
                    continue;
                }
                // The rotation cursor is session state; it's only touched
                // here, synchronously, after the AI call has already
                // completed, so no lock is ever held across an await.
                let mut rotation_guard = rotation.lock();
                let rotated_index = rotation_guard.rotate(question);
                let questions = rotation_guard.all();
                drop(rotation_guard);
                subscribers.broadcast(ServerMessage::SuggestedQuestions { questions, rotated_index });
            }
            Err(err) => {
                tracing::warn!(error = %err, "question ticker: AI call failed, will retry next tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use live_transcripts_context::{AiError, ContextManagerConfig, GenerativeAiClient};
    use std::sync::atomic::{AtomicU32, Ordering};
    use live_transcripts_transcript::Transcription;

    struct CountingAi {
        calls: Arc<AtomicU32>,
        response: String,
    }

    #[async_trait]
    impl GenerativeAiClient for CountingAi {
        async fn generate(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn insight_ticker_skips_when_transcript_unchanged() {
        let calls = Arc::new(AtomicU32::new(0));
        let context = Arc::new(ContextManager::new(
            Arc::new(CountingAi { calls: calls.clone(), response: "a summary".to_string() }),
            ContextManagerConfig::default(),
        ));
        let transcript = Arc::new(Mutex::new(Transcript::new()));
        transcript
            .lock()
            .append(Transcription::success(0, "hello", "m", Duration::from_millis(1), None))
            .unwrap();

        let view = Arc::new(SharedView::new());
        view.set_recording(RecordingState::Recording);
        let subscribers = Arc::new(SubscriberRegistry::new());
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(insight_ticker(
            Duration::from_millis(10),
            context,
            transcript,
            view,
            subscribers,
            cancel_clone,
        ));

        tokio::time::advance(Duration::from_millis(35)).await;
        cancel.cancel();
        handle.await.unwrap();

        // Transcript never changes after the first tick sees it, so only
        // one AI call should ever be made no matter how many ticks fire.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn question_ticker_skips_on_empty_transcript() {
        let calls = Arc::new(AtomicU32::new(0));
        let context = Arc::new(ContextManager::new(
            Arc::new(CountingAi { calls: calls.clone(), response: "what next?".to_string() }),
            ContextManagerConfig::default(),
        ));
        let transcript = Arc::new(Mutex::new(Transcript::new()));
        let view = Arc::new(SharedView::new());
        view.set_recording(RecordingState::Recording);
        let subscribers = Arc::new(SubscriberRegistry::new());
        let rotation = Arc::new(Mutex::new(QuestionRotation::new(3)));
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(dynamic_question_ticker(
            Duration::from_millis(10),
            context,
            transcript,
            view,
            subscribers,
            rotation,
            cancel_clone,
        ));

        tokio::time::advance(Duration::from_millis(35)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tickers_skip_while_paused() {
        let calls = Arc::new(AtomicU32::new(0));
        let context = Arc::new(ContextManager::new(
            Arc::new(CountingAi { calls: calls.clone(), response: "a summary".to_string() }),
            ContextManagerConfig::default(),
        ));
        let transcript = Arc::new(Mutex::new(Transcript::new()));
        transcript
            .lock()
            .append(Transcription::success(0, "hello", "m", Duration::from_millis(1), None))
            .unwrap();

        let view = Arc::new(SharedView::new());
        // left at the default PAUSED state
        let subscribers = Arc::new(SubscriberRegistry::new());
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(insight_ticker(
            Duration::from_millis(10),
            context,
            transcript,
            view,
            subscribers,
            cancel_clone,
        ));

        tokio::time::advance(Duration::from_millis(35)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
