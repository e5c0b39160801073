//! Live ASR/translation broadcast server.
//!
//! Provides the controller/viewer WebSocket endpoints and supporting HTTP
//! surface (health, readiness, metrics) for a live Korean ASR + multi-target
//! translation broadcast.

pub mod http;
pub mod metrics;
pub mod pipeline_task;
pub mod session;
pub mod state;
pub mod tuning;
pub mod websocket;

pub use http::create_router;
pub use session::{Session, SessionRegistry};
pub use state::AppState;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("session error: {0}")]
    Session(String),

    #[error("a controller is already connected to this stream")]
    ControllerAlreadyConnected,

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Session(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::ControllerAlreadyConnected => axum::http::StatusCode::CONFLICT,
            ServerError::WebSocket(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Persistence(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
