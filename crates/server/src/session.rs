//! Session: per-stream state, replay cache, and the live broadcaster.
//!
//! Grounded in `stream_manager.py`'s `StreamSession`
//! (`broadcast_to_viewers_and_cache`, `add_viewer`, `_cleanup`) and
//! restructured around the teacher's `SessionManager` shape (registry mutex,
//! `start_cleanup_task` watch-channel teardown pattern).

use liveasr_core::{ServerMessage, StreamId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ServerError;

const REPLAY_CACHE_CAPACITY: usize = liveasr_config::constants::broadcast::CACHE_CAPACITY;

/// A running pipeline's handle: the decoder (for binary-frame forwarding and
/// teardown), the segmenter (read-only access to its state), and a
/// cancellation token that tears down every downstream task together.
pub struct PipelineHandle {
    pub decoder: tokio::sync::Mutex<Option<liveasr_pipeline::Decoder>>,
    pub segmenter: Arc<liveasr_pipeline::Segmenter>,
    pub cancel: CancellationToken,
}

/// Per-viewer outbound channel; a send failure on this channel removes the
/// viewer from the broadcast set (§4.6).
pub type ViewerSender = mpsc::Sender<ServerMessage>;

struct SessionState {
    controller: Option<mpsc::Sender<ServerMessage>>,
    viewers: HashMap<u64, ViewerSender>,
    next_viewer_id: u64,
    languages: Vec<String>,
    silence_threshold_s: f32,
    engine: String,
    whisper_options: HashMap<String, serde_json::Value>,
    /// Latest `config` snapshot, replayed to newly admitted viewers.
    config_snapshot: ServerMessage,
    replay_cache: VecDeque<ServerMessage>,
    pipeline: Option<Arc<PipelineHandle>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            controller: None,
            viewers: HashMap::new(),
            next_viewer_id: 0,
            languages: Vec::new(),
            silence_threshold_s: liveasr_config::constants::audio::SILENCE_THRESHOLD_S,
            engine: "deepl".to_string(),
            whisper_options: HashMap::new(),
            config_snapshot: ServerMessage::Config { languages: Vec::new() },
            replay_cache: VecDeque::with_capacity(REPLAY_CACHE_CAPACITY),
            pipeline: None,
        }
    }
}

/// A single live stream identified by its [`StreamId`]. Holds the
/// controller/viewer socket handles, the session's tunables, and the replay
/// cache that hydrates late-joining viewers (§3, §4.6).
pub struct Session {
    pub id: StreamId,
    state: Mutex<SessionState>,
    /// Survives pipeline rebuilds; a `stream_start` only clears this when
    /// `clear_buffer_on_restart` is enabled (§9).
    pub aggregator: Arc<liveasr_pipeline::Aggregator>,
}

impl Session {
    fn new(id: StreamId) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::new()),
            aggregator: Arc::new(liveasr_pipeline::Aggregator::new()),
        }
    }

    /// Attempt to claim the controller slot. Fails if a controller is
    /// already attached (§4.7 "second concurrent controller connect is
    /// rejected").
    pub fn claim_controller(
        &self,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), ServerError> {
        let mut state = self.state.lock();
        if state.controller.is_some() {
            return Err(ServerError::ControllerAlreadyConnected);
        }
        state.controller = Some(sender);
        Ok(())
    }

    pub fn release_controller(&self) {
        self.state.lock().controller = None;
    }

    pub fn has_controller(&self) -> bool {
        self.state.lock().controller.is_some()
    }

    /// Register a viewer and return its id (used to remove it later).
    pub fn add_viewer(&self, sender: ViewerSender) -> u64 {
        let mut state = self.state.lock();
        let id = state.next_viewer_id;
        state.next_viewer_id += 1;
        state.viewers.insert(id, sender);
        id
    }

    pub fn remove_viewer(&self, id: u64) {
        self.state.lock().viewers.remove(&id);
    }

    pub fn viewer_count(&self) -> usize {
        self.state.lock().viewers.len()
    }

    /// Snapshot of the current `config` message plus the full replay cache,
    /// sent to a viewer immediately on admission, before it joins the live
    /// broadcast set (§4.6).
    pub fn admission_snapshot(&self) -> (ServerMessage, Vec<ServerMessage>) {
        let state = self.state.lock();
        (
            state.config_snapshot.clone(),
            state.replay_cache.iter().cloned().collect(),
        )
    }

    pub fn session_settings(&self) -> liveasr_core::SessionSettings {
        let state = self.state.lock();
        liveasr_core::SessionSettings {
            silence_threshold: state.silence_threshold_s,
            translation_engine: state.engine.clone(),
            whisper_params: state.whisper_options.clone(),
        }
    }

    pub fn silence_threshold(&self) -> f32 {
        self.state.lock().silence_threshold_s
    }

    pub fn engine(&self) -> String {
        self.state.lock().engine.clone()
    }

    pub fn languages(&self) -> Vec<String> {
        self.state.lock().languages.clone()
    }

    pub fn whisper_options(&self) -> HashMap<String, serde_json::Value> {
        self.state.lock().whisper_options.clone()
    }

    pub fn set_whisper_options(&self, options: HashMap<String, serde_json::Value>) {
        self.state.lock().whisper_options = options;
    }

    /// Apply a `config` control message: updates tunables and broadcasts a
    /// `config{languages}` message, which clears the replay cache (§4.6).
    pub fn apply_config(&self, languages: Vec<String>, silence_threshold: f32, engine: String) {
        let msg = {
            let mut state = self.state.lock();
            state.languages = languages.clone();
            state.silence_threshold_s = silence_threshold;
            state.engine = engine;
            ServerMessage::Config { languages }
        };
        self.publish(msg);
    }

    pub fn set_pipeline(&self, handle: PipelineHandle) -> Option<Arc<PipelineHandle>> {
        self.state.lock().pipeline.replace(Arc::new(handle))
    }

    pub fn take_pipeline(&self) -> Option<Arc<PipelineHandle>> {
        self.state.lock().pipeline.take()
    }

    /// Current pipeline handle, if one is running — used to forward binary
    /// audio frames to the decoder without tearing the pipeline down.
    pub fn current_pipeline(&self) -> Option<Arc<PipelineHandle>> {
        self.state.lock().pipeline.clone()
    }

    /// Forward a raw audio frame to the running decoder, if any. Returns
    /// `false` (and logs) if no pipeline is attached yet — the controller
    /// is expected to send `stream_start` before streaming audio (§4.2).
    pub async fn write_audio(&self, bytes: &[u8]) -> bool {
        let Some(handle) = self.current_pipeline() else {
            tracing::debug!(stream_id = %self.id, "audio frame dropped, no pipeline attached");
            return false;
        };
        let mut guard = handle.decoder.lock().await;
        match guard.as_mut() {
            Some(decoder) => decoder.write(bytes).await.is_ok(),
            None => false,
        }
    }

    /// Publish a message to every viewer concurrently. A failed send removes
    /// that viewer; one viewer's failure never impacts the others (§4.6).
    pub fn publish(&self, msg: ServerMessage) {
        let viewers: Vec<(u64, ViewerSender)> = {
            let mut state = self.state.lock();
            match &msg {
                ServerMessage::Config { .. } => {
                    state.config_snapshot = msg.clone();
                    state.replay_cache.clear();
                }
                other if other.is_cacheable() => {
                    if state.replay_cache.len() >= REPLAY_CACHE_CAPACITY {
                        state.replay_cache.pop_front();
                    }
                    state.replay_cache.push_back(msg.clone());
                }
                _ => {}
            }
            state
                .viewers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        for (id, tx) in viewers {
            let msg = msg.clone();
            let session_id = self.id.clone();
            tokio::spawn(async move {
                if tx.send(msg).await.is_err() {
                    tracing::debug!(%session_id, viewer_id = id, "viewer send failed, will be pruned");
                }
            });
        }
    }

    pub fn controller_sender(&self) -> Option<mpsc::Sender<ServerMessage>> {
        self.state.lock().controller.clone()
    }

    /// Send a message to the controller only (`session_init`, `tuning_ack`),
    /// bypassing the viewer fan-out and replay cache entirely.
    pub fn send_to_controller(&self, msg: ServerMessage) {
        if let Some(tx) = self.controller_sender() {
            tokio::spawn(async move {
                let _ = tx.send(msg).await;
            });
        }
    }

    /// Publish to the controller (if attached) in addition to every viewer;
    /// used for `interim_result`/`final_result`/`translation_result`, which
    /// the controller receives alongside viewers (§6).
    pub fn publish_to_all(&self, msg: ServerMessage) {
        self.send_to_controller(msg.clone());
        self.publish(msg);
    }

    fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.controller.is_none() && state.viewers.is_empty()
    }
}

/// Process-wide registry of live sessions, keyed by [`StreamId`].
///
/// `GetOrCreate`/`RemoveIfEmpty` are serialized by a single registry mutex,
/// matching the teacher's `SessionManager`'s structural-change discipline.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<StreamId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, id: StreamId) -> Arc<Session> {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Session::new(id)))
            .clone()
    }

    pub fn get(&self, id: &StreamId) -> Option<Arc<Session>> {
        self.sessions.lock().get(id).cloned()
    }

    /// Remove the session iff it has no controller and no viewers.
    pub fn remove_if_empty(&self, id: &StreamId) {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get(id) {
            if session.is_empty() {
                sessions.remove(id);
                tracing::info!(stream_id = %id, "session removed (idle)");
            }
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_controller_claim_is_rejected() {
        let session = Session::new(StreamId::from("s1"));
        let (tx1, _rx1) = mpsc::channel(4);
        let (tx2, _rx2) = mpsc::channel(4);
        assert!(session.claim_controller(tx1).is_ok());
        assert!(matches!(
            session.claim_controller(tx2),
            Err(ServerError::ControllerAlreadyConnected)
        ));
    }

    #[test]
    fn registry_get_or_create_is_idempotent() {
        let registry = SessionRegistry::new();
        let id = StreamId::from("s1");
        let a = registry.get_or_create(id.clone());
        let b = registry.get_or_create(id);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn remove_if_empty_keeps_session_with_viewer() {
        let registry = SessionRegistry::new();
        let id = StreamId::from("s1");
        let session = registry.get_or_create(id.clone());
        let (tx, _rx) = mpsc::channel(4);
        session.add_viewer(tx);
        registry.remove_if_empty(&id);
        assert!(registry.get(&id).is_some());
    }

    #[test]
    fn remove_if_empty_deletes_idle_session() {
        let registry = SessionRegistry::new();
        let id = StreamId::from("s1");
        registry.get_or_create(id.clone());
        registry.remove_if_empty(&id);
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn config_publish_clears_replay_cache() {
        let session = Session::new(StreamId::from("s1"));
        session.publish(ServerMessage::FinalResult {
            original: "hi".to_string(),
            id: "1".to_string(),
        });
        let (_, cache) = session.admission_snapshot();
        assert_eq!(cache.len(), 1);
        session.apply_config(vec!["en".to_string()], 0.8, "deepl".to_string());
        let (_, cache) = session.admission_snapshot();
        assert!(cache.is_empty());
    }

    #[test]
    fn replay_cache_evicts_oldest_beyond_capacity() {
        let session = Session::new(StreamId::from("s1"));
        for i in 0..(REPLAY_CACHE_CAPACITY + 3) {
            session.publish(ServerMessage::FinalResult {
                original: format!("msg{i}"),
                id: i.to_string(),
            });
        }
        let (_, cache) = session.admission_snapshot();
        assert_eq!(cache.len(), REPLAY_CACHE_CAPACITY);
    }

    #[tokio::test]
    async fn late_joiner_receives_config_then_ordered_replay_cache() {
        // End-to-end scenario 1: a viewer joining after a controller has
        // configured the stream and two results already went out is admitted
        // with the current config snapshot followed by the cached results in
        // arrival order, then receives anything published afterward live.
        let session = Session::new(StreamId::from("s1"));
        session.apply_config(vec!["en".to_string(), "ja".to_string()], 0.8, "deepl".to_string());
        session.publish(ServerMessage::FinalResult { original: "first".to_string(), id: "1".to_string() });
        session.publish(ServerMessage::FinalResult { original: "second".to_string(), id: "2".to_string() });

        let (tx, mut rx) = mpsc::channel(8);
        session.add_viewer(tx);
        let (config_snapshot, replay_cache) = session.admission_snapshot();
        assert_eq!(config_snapshot, ServerMessage::Config { languages: vec!["en".to_string(), "ja".to_string()] });
        assert_eq!(
            replay_cache,
            vec![
                ServerMessage::FinalResult { original: "first".to_string(), id: "1".to_string() },
                ServerMessage::FinalResult { original: "second".to_string(), id: "2".to_string() },
            ]
        );

        session.publish(ServerMessage::FinalResult { original: "third".to_string(), id: "3".to_string() });
        let live = rx.recv().await.expect("viewer channel closed unexpectedly");
        assert_eq!(live, ServerMessage::FinalResult { original: "third".to_string(), id: "3".to_string() });
    }
}
