//! Prometheus metrics exposition (ambient stack, see the expanded spec's
//! §1.1). Mirrors the teacher's `metrics`/`metrics-exporter-prometheus`
//! usage: a process-wide recorder installed once at startup, counters and
//! histograms recorded at call sites, and a `/metrics` handler that renders
//! the recorder's current snapshot.

use axum::http::StatusCode;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder. Call once at process startup.
pub fn init_metrics() -> Result<(), String> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| e.to_string())?;
    HANDLE
        .set(handle)
        .map_err(|_| "metrics recorder already initialized".to_string())
}

pub async fn metrics_handler() -> Result<String, StatusCode> {
    HANDLE
        .get()
        .map(|h| h.render())
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

pub fn record_utterance_segmented(stream_id: &str) {
    metrics::counter!("liveasr_utterances_segmented_total", "stream_id" => stream_id.to_string())
        .increment(1);
}

pub fn record_final_result(stream_id: &str) {
    metrics::counter!("liveasr_final_results_total", "stream_id" => stream_id.to_string())
        .increment(1);
}

pub fn record_translation(lang: &str, success: bool) {
    metrics::counter!(
        "liveasr_translations_total",
        "lang" => lang.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}
