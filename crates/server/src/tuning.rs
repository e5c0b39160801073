//! Tuning persistence: `uploads/{streamId}.json`.
//!
//! Grounded in `stream_manager.py`'s `_load_options_from_file` /
//! `_save_options_to_file`.

use liveasr_core::StreamId;
use std::collections::HashMap;
use std::path::PathBuf;

/// Load the persisted ASR parameter map for a stream, if any file exists.
pub async fn load(uploads_dir: &str, stream_id: &StreamId) -> HashMap<String, serde_json::Value> {
    let path = file_path(uploads_dir, stream_id);
    match tokio::fs::read(&path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read tuning file");
            HashMap::new()
        }
    }
}

/// Persist the merged ASR parameter map. Logged and swallowed on failure
/// (§7 "persistence failure"); callers report the outcome via `tuning_ack`.
pub async fn save(
    uploads_dir: &str,
    stream_id: &StreamId,
    options: &HashMap<String, serde_json::Value>,
) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(uploads_dir).await?;
    let path = file_path(uploads_dir, stream_id);
    let body = serde_json::to_vec_pretty(options).unwrap_or_default();
    tokio::fs::write(&path, body).await
}

fn file_path(uploads_dir: &str, stream_id: &StreamId) -> PathBuf {
    PathBuf::from(uploads_dir).join(format!("{}.json", stream_id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("liveasr-tuning-test-{}", std::process::id()));
        let stream_id = StreamId::from("test-stream");
        let mut options = HashMap::new();
        options.insert("beam_size".to_string(), serde_json::json!(7));

        save(dir.to_str().unwrap(), &stream_id, &options)
            .await
            .expect("save succeeds");
        let loaded = load(dir.to_str().unwrap(), &stream_id).await;
        assert_eq!(loaded.get("beam_size"), Some(&serde_json::json!(7)));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn load_missing_file_returns_empty_map() {
        let dir = std::env::temp_dir().join(format!("liveasr-tuning-missing-{}", std::process::id()));
        let stream_id = StreamId::from("never-existed");
        let loaded = load(dir.to_str().unwrap(), &stream_id).await;
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn repeated_save_with_same_payload_is_idempotent() {
        let dir = std::env::temp_dir().join(format!("liveasr-tuning-idem-{}", std::process::id()));
        let stream_id = StreamId::from("idem-stream");
        let mut options = HashMap::new();
        options.insert("language".to_string(), serde_json::json!("ko"));

        save(dir.to_str().unwrap(), &stream_id, &options).await.unwrap();
        let first = tokio::fs::read(file_path(dir.to_str().unwrap(), &stream_id)).await.unwrap();
        save(dir.to_str().unwrap(), &stream_id, &options).await.unwrap();
        let second = tokio::fs::read(file_path(dir.to_str().unwrap(), &stream_id)).await.unwrap();
        assert_eq!(first, second);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
