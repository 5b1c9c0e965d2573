//! A cheap, version-free read model of the parts of `SessionState` that
//! tickers and the Q&A handler need (`recording`, `focus`, `knowledge`)
//! without routing every read through the control loop's command channel.
//! Only the control loop ever writes it.

use parking_lot::RwLock;

use live_transcripts_protocol::{KnowledgeItem, RecordingState};

#[derive(Debug, Clone)]
pub struct ViewState {
    pub recording: RecordingState,
    pub focus: String,
    pub knowledge: Vec<KnowledgeItem>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            recording: RecordingState::Paused,
            focus: String::new(),
            knowledge: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct SharedView(RwLock<ViewState>);

impl SharedView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ViewState {
        self.0.read().clone()
    }

    pub fn set_recording(&self, recording: RecordingState) {
        self.0.write().recording = recording;
    }

    pub fn set_focus(&self, focus: String) {
        self.0.write().focus = focus;
    }

    pub fn set_knowledge(&self, knowledge: Vec<KnowledgeItem>) {
        self.0.write().knowledge = knowledge;
    }
}
