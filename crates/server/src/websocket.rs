//! Controller and viewer WebSocket handlers (§4.7, §6).
//!
//! Grounded in the teacher's split-sender/`Arc<Mutex<..>>`-sender,
//! spawned-task-per-concern pattern, restructured around the two
//! connection roles this service actually has: a single controller that
//! drives the pipeline and receives every message type, and any number of
//! read-only viewers admitted with a config snapshot plus replay cache.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use liveasr_core::{ControllerMessage, ServerMessage, StreamId};

use crate::state::AppState;

/// Policy-violation close code for a rejected second controller (§6).
const POLICY_VIOLATION: u16 = 1008;

pub async fn control_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let stream_id = StreamId::from(id);
    ws.on_upgrade(move |socket| handle_controller(socket, stream_id, state))
}

pub async fn watch_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let stream_id = StreamId::from(id);
    ws.on_upgrade(move |socket| handle_viewer(socket, stream_id, state))
}

async fn handle_controller(socket: WebSocket, stream_id: StreamId, state: AppState) {
    let session = state.sessions.get_or_create(stream_id.clone());
    let (mut sink, mut stream) = socket.split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(32);
    if session.claim_controller(outbound_tx).is_err() {
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: POLICY_VIOLATION,
                reason: "a controller is already connected to this stream".into(),
            })))
            .await;
        return;
    }

    let options = crate::tuning::load(&state.settings.uploads_dir, &stream_id).await;
    session.set_whisper_options(options);
    session.send_to_controller(ServerMessage::SessionInit {
        settings: session.session_settings(),
    });

    let forward_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = serde_json::to_string(&msg).expect("ServerMessage always serializes");
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_controller_text(&text, &session, &state).await;
            }
            Ok(Message::Binary(data)) => {
                if !session.write_audio(&data).await {
                    tracing::warn!(stream_id = %session.id, "binary frame dropped, decoder not running");
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(stream_id = %session.id, error = %e, "controller websocket error");
                break;
            }
        }
    }

    forward_task.abort();
    crate::pipeline_task::teardown(&session, state.settings.decoder.teardown_timeout_ms).await;
    session.release_controller();
    state.sessions.remove_if_empty(&stream_id);
}

async fn handle_controller_text(text: &str, session: &Arc<crate::session::Session>, state: &AppState) {
    let parsed: Result<ControllerMessage, _> = serde_json::from_str(text);
    let Ok(msg) = parsed else {
        tracing::warn!(stream_id = %session.id, "malformed controller message, ignored");
        return;
    };

    match msg {
        ControllerMessage::StreamStart => {
            crate::pipeline_task::restart(
                session.clone(),
                state.settings.clone(),
                state.translators.clone(),
            )
            .await;
        }
        ControllerMessage::Config {
            languages,
            silence_threshold,
            translation_engine,
        } => {
            session.apply_config(languages, silence_threshold, translation_engine);
        }
        ControllerMessage::Tuning { params } => {
            let mut options = session.whisper_options();
            options.extend(params);
            session.set_whisper_options(options.clone());

            let ack = match crate::tuning::save(&state.settings.uploads_dir, &session.id, &options).await {
                Ok(()) => ServerMessage::TuningAck {
                    status: "ok".to_string(),
                    message: "tuning applied".to_string(),
                },
                Err(e) => {
                    tracing::warn!(stream_id = %session.id, error = %e, "failed to persist tuning");
                    ServerMessage::TuningAck {
                        status: "error".to_string(),
                        message: format!("failed to persist tuning: {e}"),
                    }
                }
            };
            session.send_to_controller(ack);
        }
    }
}

async fn handle_viewer(socket: WebSocket, stream_id: StreamId, state: AppState) {
    let session = state.sessions.get_or_create(stream_id.clone());
    let (mut sink, mut stream) = socket.split();

    let (config_snapshot, replay_cache) = session.admission_snapshot();
    let mut admission = vec![config_snapshot];
    admission.extend(replay_cache);
    for msg in admission {
        let json = serde_json::to_string(&msg).expect("ServerMessage always serializes");
        if sink.send(Message::Text(json)).await.is_err() {
            return;
        }
    }

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);
    let viewer_id = session.add_viewer(tx);

    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = serde_json::to_string(&msg).expect("ServerMessage always serializes");
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Viewers are read-only; drain the socket only to detect disconnect.
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            Ok(_) => {}
        }
    }

    forward_task.abort();
    session.remove_viewer(viewer_id);
    state.sessions.remove_if_empty(&stream_id);
}
