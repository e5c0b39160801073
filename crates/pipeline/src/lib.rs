//! Pipeline crate: decoder supervision, voice-activity segmentation,
//! transcription, text aggregation, and translation fan-out.
//!
//! Mirrors the teacher pipeline crate's shape — one module per processing
//! stage plus a crate-level error type each stage's failures fold into.

pub mod aggregator;
pub mod decoder;
pub mod transcriber;
pub mod translator;
pub mod vad;

pub use aggregator::{Aggregator, FlushOutcome, FlushReason};
pub use decoder::{Decoder, DecoderError};
pub use transcriber::Transcriber;
pub use translator::{Translator, TranslatorError, TranslatorRegistry};
pub use vad::{Segmenter, SegmenterError, SegmenterState};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("decoder error: {0}")]
    Decoder(#[from] DecoderError),

    #[error("segmenter error: {0}")]
    Segmenter(#[from] SegmenterError),
}

impl From<PipelineError> for liveasr_core::Error {
    fn from(err: PipelineError) -> Self {
        liveasr_core::Error::MalformedMessage(err.to_string())
    }
}
