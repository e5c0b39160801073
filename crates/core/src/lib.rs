//! Core types shared by the pipeline, config, and server crates.
//!
//! This crate provides the vocabulary every other crate builds on: PCM
//! conversion helpers, the stream identifier type, the utterance/transcript
//! value types, the wire message schema, and the shared error type. It has
//! no knowledge of sockets, subprocesses, or the flush/translation policy —
//! those live in `liveasr-pipeline` and `liveasr-server`.

pub mod audio;
pub mod error;
pub mod message;
pub mod stream;
pub mod transcript;

pub use audio::{f32_to_pcm16_bytes, pcm16_bytes_to_f32};
pub use error::{Error, Result};
pub use message::{ControllerMessage, ServerMessage, SessionSettings};
pub use stream::StreamId;
pub use transcript::{TranscriptResult, Utterance};
