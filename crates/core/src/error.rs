//! Shared error type for the liveasr core crate

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can originate below the pipeline/server boundary.
///
/// Leaf components (decoder, transcriber, translator) generally swallow
/// their own failures and surface an empty/synthetic result instead of
/// propagating one of these — see the per-component failure semantics in
/// the pipeline crate. This enum exists for the handful of call sites that
/// must return a typed error (persistence, serialization, malformed wire
/// messages).
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid stream id: {0}")]
    InvalidStreamId(String),

    #[error("malformed control message: {0}")]
    MalformedMessage(String),
}
