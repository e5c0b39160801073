//! HTTP surface: static controller/viewer pages, WebSocket upgrade routes,
//! and the health/readiness/metrics endpoints (§6).

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{extract::State, Json, Router};
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::websocket::{control_handler, watch_handler};

const CONTROLLER_PAGE: &str = include_str!("pages/control.html");
const VIEWER_PAGE: &str = include_str!("pages/watch.html");

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/liveasr/:id", get(controller_page))
        .route("/liveasr/watch/:id", get(viewer_page))
        .route("/ws/liveasr/control/:id", get(control_handler))
        .route("/ws/liveasr/watch/:id", get(watch_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn controller_page() -> Html<&'static str> {
    Html(CONTROLLER_PAGE)
}

async fn viewer_page() -> Html<&'static str> {
    Html(VIEWER_PAGE)
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: reports the active session count plus a short health
/// check against the ASR sidecar, so a load balancer can take this instance
/// out of rotation if its transcription backend is unreachable.
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let session_count = state.sessions.count();
    let asr_health_url = format!("{}/health", state.settings.transcriber.url);
    let asr_reachable = matches!(
        tokio::time::timeout(Duration::from_secs(2), reqwest::get(&asr_health_url)).await,
        Ok(Ok(resp)) if resp.status().is_success()
    );

    let status = if asr_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "status": if asr_reachable { "ready" } else { "degraded" },
            "sessions": session_count,
            "asr_backend_reachable": asr_reachable,
        })),
    )
}

async fn metrics_endpoint() -> impl IntoResponse {
    match metrics_handler().await {
        Ok(body) => (StatusCode::OK, body),
        Err(code) => (code, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveasr_config::Settings;

    #[test]
    fn router_builds_with_default_settings() {
        let state = AppState::new(Settings::default());
        let _ = create_router(state);
    }
}
