//! Wire message schema (§6 of the design doc)
//!
//! These are the JSON payloads exchanged over the controller and viewer
//! WebSockets. `ServerMessage` covers everything the server ever sends;
//! `ControllerMessage` covers the text-frame control messages a controller
//! may send (binary frames are raw audio and are not modeled here).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Settings snapshot sent once on controller connect and echoed in `config`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    pub silence_threshold: f32,
    pub translation_engine: String,
    pub whisper_params: HashMap<String, serde_json::Value>,
}

/// Messages the server sends to the controller and/or viewers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once to the controller immediately after accept.
    SessionInit { settings: SessionSettings },
    /// Sent to controller + viewers whenever `languages` changes (initial + updates).
    /// Clears the replay cache when published.
    Config { languages: Vec<String> },
    /// Every transcript arrival; fire-and-forget, never cached.
    InterimResult { text: String },
    /// Emitted on flush. `id` is referenced by subsequent `TranslationResult`s.
    FinalResult { original: String, id: String },
    /// One per target language, as each translator call completes.
    TranslationResult {
        original_id: String,
        lang: String,
        text: String,
    },
    /// Reply to a `tuning` control message.
    TuningAck { status: String, message: String },
}

impl ServerMessage {
    /// Whether this message type is appended to the per-session replay cache.
    pub fn is_cacheable(&self) -> bool {
        matches!(
            self,
            ServerMessage::FinalResult { .. } | ServerMessage::TranslationResult { .. }
        )
    }
}

/// Text-frame control messages a controller may send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerMessage {
    /// Tear down any existing pipeline and build a fresh one.
    StreamStart,
    /// Update session-level settings; broadcasts a `Config` message.
    Config {
        languages: Vec<String>,
        silence_threshold: f32,
        translation_engine: String,
    },
    /// Merge the given key/value pairs into the session's persisted ASR params.
    Tuning {
        params: HashMap<String, serde_json::Value>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_tags_are_snake_case() {
        let msg = ServerMessage::FinalResult {
            original: "hello".into(),
            id: "1".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "final_result");
        assert_eq!(json["original"], "hello");
    }

    #[test]
    fn only_final_and_translation_are_cacheable() {
        assert!(ServerMessage::FinalResult {
            original: "x".into(),
            id: "1".into()
        }
        .is_cacheable());
        assert!(ServerMessage::TranslationResult {
            original_id: "1".into(),
            lang: "en".into(),
            text: "x".into()
        }
        .is_cacheable());
        assert!(!ServerMessage::InterimResult { text: "x".into() }.is_cacheable());
        assert!(!ServerMessage::Config { languages: vec![] }.is_cacheable());
    }

    #[test]
    fn controller_message_round_trips() {
        let json = r#"{"type":"stream_start"}"#;
        let msg: ControllerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, ControllerMessage::StreamStart);
    }

    #[test]
    fn tuning_message_carries_arbitrary_params() {
        let json = r#"{"type":"tuning","params":{"beam_size":5}}"#;
        let msg: ControllerMessage = serde_json::from_str(json).unwrap();
        match msg {
            ControllerMessage::Tuning { params } => {
                assert_eq!(params["beam_size"], 5);
            }
            _ => panic!("wrong variant"),
        }
    }
}
