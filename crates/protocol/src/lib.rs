//! Wire DTOs for the subscriber-facing message channel.
//!
//! All messages carry a `type` tag; unknown `type` values fail to
//! deserialize and the hub responds with an `error` message rather than
//! panicking (see `live-transcripts-hub`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{id, name, text}` knowledge item attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KnowledgeItem {
    pub id: String,
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsightKind {
    Summary,
    ActionItem,
    Question,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub kind: InsightKind,
    pub text: String,
    pub generated_at: DateTime<Utc>,
    pub covers_up_to_version: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingState {
    Paused,
    Recording,
    Stopped,
}

/// Per-model dispatcher counters, returned by the `stats` command.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelStats {
    pub model: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StatsSnapshot {
    pub models: Vec<ModelStats>,
    pub subscriber_count: usize,
    pub dropped_utterances: u64,
}

/// Messages accepted from a subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Start,
    Stop,
    SetFocus { focus: String },
    SetKnowledge { items: Vec<KnowledgeItem> },
    Question { question: String, request_id: String },
    Ping,
    Stats,
}

/// Messages the hub sends to subscribers, either unicast or broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Transcription {
        text: String,
        batch_seq: u64,
        ts: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Answer {
        request_id: String,
        answer: String,
        latency_ms: u64,
        #[serde(default)]
        error: bool,
    },
    Insight {
        kind: InsightKind,
        text: String,
        ts: DateTime<Utc>,
    },
    SuggestedQuestions {
        questions: Vec<String>,
        rotated_index: usize,
    },
    State {
        recording: RecordingState,
        focus: String,
    },
    Error {
        kind: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    Pong,
    Stats {
        stats: StatsSnapshot,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_round_trips_through_json() {
        let msg = ClientMessage::SetFocus { focus: "roadmap".into() };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"set_focus","focus":"roadmap"}"#);

        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn question_message_carries_request_id() {
        let json = r#"{"type":"question","question":"what did we decide?","request_id":"r-1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Question { question, request_id } => {
                assert_eq!(question, "what did we decide?");
                assert_eq!(request_id, "r-1");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_type_fails_to_deserialize() {
        let json = r#"{"type":"not_a_real_command"}"#;
        let result: Result<ClientMessage, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn server_state_message_uses_screaming_snake_case() {
        let msg = ServerMessage::State {
            recording: RecordingState::Recording,
            focus: String::new(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"recording\":\"RECORDING\""));
    }

    #[test]
    fn insight_kind_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&InsightKind::ActionItem).unwrap();
        assert_eq!(json, "\"ACTION_ITEM\"");
    }
}
