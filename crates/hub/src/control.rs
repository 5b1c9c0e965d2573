//! The session hub: wires audio capture, batching, dispatch, and the two
//! context tickers together behind a single serialized control loop that
//! owns the session's recording state, focus, and knowledge.
//!
//! Everything that isn't a state transition (audio capture, batching,
//! transcription dispatch, insight/question generation) runs on its own
//! thread or task and only touches session state through [`SharedView`]
//! (read-only) or by sending a [`HubCommand`] (the one place writes
//! happen), the same split `live-transcripts-dispatcher` uses between its
//! concurrent dispatch tasks and the reorder buffer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use live_transcripts_audio::{AudioRing, AudioSource};
use live_transcripts_batcher::{self as batcher, Batcher, BatcherCommand, BatcherConfig};
use live_transcripts_bus::BatchQueue;
use live_transcripts_context::{ContextManager, ContextManagerConfig, QuestionRotation};
use live_transcripts_dispatcher::{self as dispatcher, DispatcherConfig, DispatcherStats, TranscriptionClient};
use live_transcripts_protocol::{ClientMessage, RecordingState, ServerMessage, StatsSnapshot};
use live_transcripts_transcript::Transcript;
use live_transcripts_vad::{RmsVad, VadConfig};

use crate::audio_pump;
use crate::outbox::{SubscriberOutbox, DEFAULT_SUBSCRIBER_BUFFER};
use crate::subscriber::{SubscriberId, SubscriberRegistry};
use crate::ticker::{dynamic_question_ticker, insight_ticker};
use crate::view::SharedView;

/// Bundles every sub-config the hub's components need, plus the hub's own
/// ticker cadences and buffer sizes.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub batcher: BatcherConfig,
    pub vad: VadConfig,
    pub dispatcher: DispatcherConfig,
    pub dispatcher_parallelism: usize,
    pub context: ContextManagerConfig,
    pub insight_interval: Duration,
    pub question_update_interval: Duration,
    pub num_dynamic_questions: usize,
    pub batch_queue_capacity: usize,
    pub batcher_push_timeout: Duration,
    pub subscriber_buffer_capacity: usize,
    pub ring_buffer_duration_secs: f32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            batcher: BatcherConfig::default(),
            vad: VadConfig::default(),
            dispatcher: DispatcherConfig::default(),
            dispatcher_parallelism: 2,
            context: ContextManagerConfig::default(),
            insight_interval: Duration::from_secs(60),
            question_update_interval: Duration::from_secs(15),
            num_dynamic_questions: 4,
            batch_queue_capacity: 16,
            batcher_push_timeout: Duration::from_millis(500),
            subscriber_buffer_capacity: DEFAULT_SUBSCRIBER_BUFFER,
            ring_buffer_duration_secs: 60.0,
        }
    }
}

/// Commands accepted by the control loop. This is the only channel that
/// mutates session state; everything else reads through [`SharedView`].
enum HubCommand {
    Subscribe(oneshot::Sender<(SubscriberId, Arc<SubscriberOutbox>)>),
    Unsubscribe(SubscriberId),
    Client(SubscriberId, ClientMessage),
    Unicast(SubscriberId, ServerMessage),
    Shutdown(oneshot::Sender<()>),
}

/// A running session: audio capture, batching, dispatch and the two
/// tickers all wired together, driven by a single control loop task.
pub struct SessionHub {
    commands: mpsc::UnboundedSender<HubCommand>,
    control_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHub {
    /// Starts every subsystem and returns a handle to the running session.
    /// `source` is consumed by a dedicated capture thread; `client` and
    /// `context` are shared collaborators the hub does not own the
    /// lifetime of beyond this session.
    pub fn spawn(
        config: HubConfig,
        source: Box<dyn AudioSource>,
        client: Arc<dyn TranscriptionClient>,
        context: Arc<ContextManager>,
    ) -> Self {
        let sample_rate = source.sample_rate();
        let ring = Arc::new(AudioRing::new(sample_rate, config.ring_buffer_duration_secs));
        let running = Arc::new(AtomicBool::new(true));

        let audio_thread = {
            let ring = ring.clone();
            let running = running.clone();
            std::thread::spawn(move || audio_pump::run_blocking(source, ring, running))
        };

        let mut queue = BatchQueue::new(config.batch_queue_capacity);
        let queue_rx = queue.take_receiver().expect("freshly constructed queue has a receiver");
        let queue_tx = queue.sender();
        // Kept only to read `dropped_count()` for the `stats` command; the
        // batcher thread below gets its own clone to actually push into.
        let queue_tx_for_stats = queue_tx.clone();

        let (batcher_cmd_tx, batcher_cmd_rx) = crossbeam_channel::unbounded::<BatcherCommand>();
        // Sessions start PAUSED; queue the pause before the batcher thread's
        // first loop iteration so no audio is batched ahead of a "start".
        let _ = batcher_cmd_tx.send(BatcherCommand::Pause);
        let batcher_thread = {
            let vad = RmsVad::new(config.vad);
            let batcher_instance = Batcher::new(config.batcher, Box::new(vad));
            let ring = ring.clone();
            let running = running.clone();
            let push_timeout = config.batcher_push_timeout;
            std::thread::spawn(move || {
                batcher::run_blocking(batcher_instance, ring, queue_tx, batcher_cmd_rx, running, push_timeout)
            })
        };

        let transcript = Arc::new(Mutex::new(Transcript::new()));
        let subscribers = Arc::new(SubscriberRegistry::new());
        let stats = DispatcherStats::new();

        let dispatcher_handle = {
            let transcript = transcript.clone();
            let stats = stats.clone();
            let subscribers = subscribers.clone();
            let dispatcher_cfg = config.dispatcher.clone();
            let parallelism = config.dispatcher_parallelism;
            tokio::spawn(async move {
                dispatcher::run(client, dispatcher_cfg, queue_rx, transcript, stats, parallelism, move |t| {
                    subscribers.broadcast(ServerMessage::Transcription {
                        text: t.text.clone(),
                        batch_seq: t.batch_seq,
                        ts: t.recorded_at,
                        error: t.error.clone(),
                    });
                })
                .await;
            })
        };

        let view = Arc::new(SharedView::new());
        let rotation = Arc::new(Mutex::new(QuestionRotation::new(config.num_dynamic_questions)));
        let ticker_cancel = CancellationToken::new();

        let insight_handle = tokio::spawn(insight_ticker(
            config.insight_interval,
            context.clone(),
            transcript.clone(),
            view.clone(),
            subscribers.clone(),
            ticker_cancel.clone(),
        ));
        let question_handle = tokio::spawn(dynamic_question_ticker(
            config.question_update_interval,
            context.clone(),
            transcript.clone(),
            view.clone(),
            subscribers.clone(),
            rotation.clone(),
            ticker_cancel.clone(),
        ));

        let (commands, commands_rx) = mpsc::unbounded_channel();

        let state = ControlState {
            transcript,
            view,
            subscribers,
            context,
            stats,
            dropped_utterances: queue_tx_for_stats,
            subscriber_buffer_capacity: config.subscriber_buffer_capacity,
            batcher_commands: batcher_cmd_tx,
            running,
            ticker_cancel,
            audio_thread: Some(audio_thread),
            batcher_thread: Some(batcher_thread),
            dispatcher_handle: Some(dispatcher_handle),
            insight_handle: Some(insight_handle),
            question_handle: Some(question_handle),
            question_in_flight: HashMap::new(),
        };

        let control_handle = tokio::spawn(control_loop(commands_rx, state));

        Self {
            commands,
            control_handle: Mutex::new(Some(control_handle)),
        }
    }

    /// Registers a new subscriber and returns its id and outbox. The caller
    /// (the websocket handler) drains the outbox and forwards to the wire.
    pub async fn subscribe(&self) -> (SubscriberId, Arc<SubscriberOutbox>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self.commands.send(HubCommand::Subscribe(reply_tx));
        reply_rx.await.expect("control loop is alive for the hub's lifetime")
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let _ = self.commands.send(HubCommand::Unsubscribe(id));
    }

    /// Submits one message from a connected subscriber. Fire-and-forget:
    /// the control loop processes commands one at a time, in submission
    /// order, and any response is delivered back through that subscriber's
    /// outbox.
    pub fn dispatch_client_message(&self, id: SubscriberId, message: ClientMessage) {
        let _ = self.commands.send(HubCommand::Client(id, message));
    }

    /// Unicasts a message to one subscriber without going through session
    /// state — used by the transport layer to report a malformed frame
    /// back to its sender (see `live-transcripts-protocol`'s deserialization
    /// contract).
    pub fn send_error(&self, id: SubscriberId, message: ServerMessage) {
        let _ = self.commands.send(HubCommand::Unicast(id, message));
    }

    /// Tears the session down: stops audio capture and batching, cancels
    /// the tickers, drains the dispatcher, closes every subscriber, and
    /// transitions to the terminal `STOPPED` state. Idempotent only in the
    /// sense that a second call has no running loop left to act on.
    pub async fn shutdown(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(HubCommand::Shutdown(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }
        if let Some(handle) = self.control_handle.lock().take() {
            let _ = handle.await;
        }
    }
}

struct ControlState {
    transcript: Arc<Mutex<Transcript>>,
    view: Arc<SharedView>,
    subscribers: Arc<SubscriberRegistry>,
    context: Arc<ContextManager>,
    stats: DispatcherStats,
    /// Read-only handle onto the bus queue's eviction counter, merged into
    /// the `stats` command's `dropped_utterances` field.
    dropped_utterances: live_transcripts_bus::BatchQueueSender<batcher::Utterance>,
    subscriber_buffer_capacity: usize,
    batcher_commands: crossbeam_channel::Sender<BatcherCommand>,
    running: Arc<AtomicBool>,
    ticker_cancel: CancellationToken,
    audio_thread: Option<std::thread::JoinHandle<()>>,
    batcher_thread: Option<std::thread::JoinHandle<()>>,
    dispatcher_handle: Option<JoinHandle<()>>,
    insight_handle: Option<JoinHandle<()>>,
    question_handle: Option<JoinHandle<()>>,
    /// In-flight `answer_question` tasks, keyed by the subscriber that
    /// asked, so a disconnect can best-effort abort its pending answers.
    question_in_flight: HashMap<SubscriberId, Vec<JoinHandle<()>>>,
}

async fn control_loop(mut commands: mpsc::UnboundedReceiver<HubCommand>, mut state: ControlState) {
    while let Some(cmd) = commands.recv().await {
        match cmd {
            HubCommand::Subscribe(reply) => {
                let (id, outbox) = state.subscribers.add(state.subscriber_buffer_capacity);
                let snapshot = state.view.snapshot();
                outbox.push(ServerMessage::State { recording: snapshot.recording, focus: snapshot.focus });
                let _ = reply.send((id, outbox));
            }
            HubCommand::Unsubscribe(id) => {
                state.subscribers.remove(id);
                if let Some(handles) = state.question_in_flight.remove(&id) {
                    for h in handles {
                        h.abort();
                    }
                }
            }
            HubCommand::Client(id, message) => handle_client_message(&mut state, id, message),
            HubCommand::Unicast(id, message) => state.subscribers.send_to(id, message),
            HubCommand::Shutdown(reply) => {
                teardown(&mut state).await;
                let _ = reply.send(());
                break;
            }
        }
    }
}

fn handle_client_message(state: &mut ControlState, id: SubscriberId, message: ClientMessage) {
    match message {
        ClientMessage::Start => {
            if state.view.snapshot().recording == RecordingState::Stopped {
                return;
            }
            let _ = state.batcher_commands.send(BatcherCommand::Resume);
            state.view.set_recording(RecordingState::Recording);
            broadcast_state(state);
        }
        ClientMessage::Stop => {
            if state.view.snapshot().recording == RecordingState::Stopped {
                return;
            }
            let _ = state.batcher_commands.send(BatcherCommand::Pause);
            state.view.set_recording(RecordingState::Paused);
            broadcast_state(state);
        }
        ClientMessage::SetFocus { focus } => {
            state.view.set_focus(focus);
            broadcast_state(state);
        }
        ClientMessage::SetKnowledge { items } => {
            state.view.set_knowledge(items);
        }
        ClientMessage::Question { question, request_id } => {
            spawn_answer(state, id, question, request_id);
        }
        ClientMessage::Ping => {
            state.subscribers.send_to(id, ServerMessage::Pong);
        }
        ClientMessage::Stats => {
            let snapshot: StatsSnapshot = state
                .stats
                .snapshot(state.subscribers.count(), state.dropped_utterances.dropped_count());
            state.subscribers.send_to(id, ServerMessage::Stats { stats: snapshot });
        }
    }
}

fn broadcast_state(state: &ControlState) {
    let snapshot = state.view.snapshot();
    state.subscribers.broadcast(ServerMessage::State { recording: snapshot.recording, focus: snapshot.focus });
}

fn spawn_answer(state: &mut ControlState, id: SubscriberId, question: String, request_id: String) {
    let context = state.context.clone();
    let transcript = state.transcript.clone();
    let view = state.view.clone();
    let subscribers = state.subscribers.clone();

    let handle = tokio::spawn(async move {
        let view_state = view.snapshot();
        let snapshot = transcript.lock().snapshot();
        let reply = match context.answer_question(&snapshot, &view_state.focus, &view_state.knowledge, &question).await {
            Ok(answer) => ServerMessage::Answer {
                request_id: request_id.clone(),
                answer: answer.text,
                latency_ms: answer.latency.as_millis() as u64,
                error: false,
            },
            Err(err) => ServerMessage::Answer {
                request_id: request_id.clone(),
                answer: err.to_string(),
                latency_ms: 0,
                error: true,
            },
        };
        subscribers.send_to(id, reply);
    });

    state.question_in_flight.entry(id).or_default().push(handle);
}

async fn teardown(state: &mut ControlState) {
    state.ticker_cancel.cancel();
    state.running.store(false, Ordering::Relaxed);

    if let Some(handle) = state.dispatcher_handle.take() {
        let _ = handle.await;
    }
    if let Some(handle) = state.insight_handle.take() {
        let _ = handle.await;
    }
    if let Some(handle) = state.question_handle.take() {
        let _ = handle.await;
    }
    for handles in state.question_in_flight.values() {
        for h in handles {
            h.abort();
        }
    }

    if let Some(audio_thread) = state.audio_thread.take() {
        let _ = tokio::task::spawn_blocking(move || audio_thread.join()).await;
    }
    if let Some(batcher_thread) = state.batcher_thread.take() {
        let _ = tokio::task::spawn_blocking(move || batcher_thread.join()).await;
    }

    state.view.set_recording(RecordingState::Stopped);
    broadcast_state(state);
    state.subscribers.close_all();
}
