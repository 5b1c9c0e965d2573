//! Wires the loaded [`Config`] into a running [`SessionHub`]: constructs the
//! audio source, the HTTP-backed transcription and generative-AI clients,
//! and translates each config section into the matching library config.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use live_transcripts_audio::{AudioSource, CpalAudioSource};
use live_transcripts_context::{ContextManager, ContextManagerConfig, GenerativeAiClient, HttpGenerativeAiClient};
use live_transcripts_dispatcher::{DispatcherConfig, HttpTranscriptionClient, TranscriptionClient};
use live_transcripts_hub::{HubConfig, SessionHub};
use live_transcripts_vad::VadConfig;

use crate::config::Config;

/// Builds a real `CpalAudioSource` for the default input device, opened at
/// the configured sample rate and chunk size.
fn build_audio_source(config: &Config) -> anyhow::Result<Box<dyn AudioSource>> {
    let source = CpalAudioSource::default_device(config.audio.sample_rate, config.audio.chunk_size)
        .context("failed to open the default audio input device")?;
    Ok(Box::new(source))
}

fn hub_config(config: &Config) -> HubConfig {
    let default = HubConfig::default();

    let batcher = live_transcripts_batcher::BatcherConfig {
        sample_rate: config.audio.sample_rate,
        frame_duration: default.batcher.frame_duration,
        min_batch_duration: Duration::from_secs_f32(config.batcher.min_batch_duration),
        max_batch_duration: Duration::from_secs_f32(config.batcher.max_batch_duration),
        silence_duration_threshold: Duration::from_secs_f32(config.batcher.silence_duration_threshold),
        overlap: Duration::from_secs_f32(config.batcher.batch_overlap),
    };

    let enter_threshold = config.vad.silence_threshold;
    let vad = VadConfig {
        enter_threshold,
        exit_threshold: enter_threshold * 0.6,
        min_unvoice_frames: 1,
    };

    let dispatcher = DispatcherConfig {
        primary_model: config.dispatcher.transcription_model.clone(),
        fallback_models: config.dispatcher.model_fallback.clone(),
        max_retries: config.dispatcher.max_retries,
        retry_base_delay: Duration::from_secs_f32(config.dispatcher.retry_delay),
        retry_max_delay: default.dispatcher.retry_max_delay,
    };

    HubConfig {
        batcher,
        vad,
        dispatcher,
        dispatcher_parallelism: default.dispatcher_parallelism,
        context: ContextManagerConfig::default(),
        insight_interval: Duration::from_secs(config.context.insight_interval),
        question_update_interval: Duration::from_secs(config.context.question_update_interval),
        num_dynamic_questions: config.context.num_dynamic_questions,
        batch_queue_capacity: default.batch_queue_capacity,
        batcher_push_timeout: default.batcher_push_timeout,
        subscriber_buffer_capacity: default.subscriber_buffer_capacity,
        ring_buffer_duration_secs: config.audio.buffer_duration,
    }
}

/// Starts one session hub from a loaded config. The returned `SessionHub`
/// is the handle the websocket layer subscribes against.
pub fn spawn_hub(config: &Config) -> anyhow::Result<Arc<SessionHub>> {
    let source = build_audio_source(config)?;

    let api_timeout = Duration::from_secs(config.dispatcher.api_timeout);
    let transcription_client: Arc<dyn TranscriptionClient> = Arc::new(HttpTranscriptionClient::new(
        config.dispatcher.transcription_base_url.clone(),
        api_timeout,
    ));
    let ai_client: Arc<dyn GenerativeAiClient> = Arc::new(HttpGenerativeAiClient::new(
        config.context.generative_ai_base_url.clone(),
        api_timeout,
    ));
    let context = Arc::new(ContextManager::new(ai_client, ContextManagerConfig::default()));

    let hub = SessionHub::spawn(hub_config(config), source, transcription_client, context);
    Ok(Arc::new(hub))
}
