//! Per-stream pipeline: decoder → segmenter → transcriber → aggregator →
//! translator fan-out, wired together with bounded channels and torn down
//! as a unit on `stream_start`/disconnect (§5).

use liveasr_config::Settings;
use liveasr_core::ServerMessage;
use liveasr_pipeline::{Decoder, FlushOutcome, FlushReason, Segmenter, Transcriber, TranslatorRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::session::{PipelineHandle, Session};

/// Build and launch a fresh pipeline for `session`, tearing down whatever
/// pipeline was previously running first.
pub async fn restart(session: Arc<Session>, settings: Arc<Settings>, translators: Arc<TranslatorRegistry>) {
    if let Some(previous) = session.take_pipeline() {
        previous.cancel.cancel();
    }

    if settings.session.clear_buffer_on_restart {
        session.aggregator.clear();
    }

    let cancel = CancellationToken::new();
    let decoder = match Decoder::spawn(&settings.decoder, session.id.as_str()) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(stream_id = %session.id, error = %e, "failed to spawn decoder; stream_start rejected");
            return;
        }
    };
    let (decoder, pcm_rx) = decoder;

    let segmenter = Arc::new(Segmenter::new(session.silence_threshold()));
    let transcriber = Arc::new(Transcriber::new(&settings.transcriber));

    let (utterance_tx, utterance_rx) = mpsc::channel::<Vec<u8>>(8);

    tokio::spawn(run_segmenter(
        pcm_rx,
        segmenter.clone(),
        utterance_tx,
        cancel.clone(),
    ));
    tokio::spawn(run_transcriber(
        utterance_rx,
        transcriber,
        session.clone(),
        translators.clone(),
        cancel.clone(),
    ));
    tokio::spawn(run_tick(session.clone(), translators.clone(), cancel.clone()));

    session.set_pipeline(PipelineHandle {
        decoder: tokio::sync::Mutex::new(Some(decoder)),
        segmenter,
        cancel,
    });
}

/// Tear down the session's pipeline (controller disconnect or process shutdown).
pub async fn teardown(session: &Session, teardown_timeout_ms: u64) {
    if let Some(handle) = session.take_pipeline() {
        handle.cancel.cancel();
        if let Some(decoder) = handle.decoder.lock().await.take() {
            decoder.shutdown(teardown_timeout_ms).await;
        }
    }
}

async fn run_segmenter(
    mut pcm_rx: mpsc::Receiver<Vec<u8>>,
    segmenter: Arc<Segmenter>,
    utterance_tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            chunk = pcm_rx.recv() => {
                let Some(chunk) = chunk else { break };
                match segmenter.push(&chunk) {
                    Ok(utterances) => {
                        for utterance in utterances {
                            if utterance_tx.send(utterance).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "segmenter rejected frame"),
                }
            }
        }
    }
    segmenter.reset();
}

async fn run_transcriber(
    mut utterance_rx: mpsc::Receiver<Vec<u8>>,
    transcriber: Arc<Transcriber>,
    session: Arc<Session>,
    translators: Arc<TranslatorRegistry>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            utterance = utterance_rx.recv() => {
                let Some(pcm) = utterance else { break };
                let previous_text = session.aggregator.snapshot();
                let text = transcriber.transcribe(&pcm, &previous_text).await;
                if text.is_empty() {
                    continue;
                }
                crate::metrics::record_utterance_segmented(session.id.as_str());

                let (buffer, ends_with_terminator) = session.aggregator.on_transcript(&text);
                session.publish_to_all(ServerMessage::InterimResult { text: buffer });

                if ends_with_terminator {
                    let arrival = Instant::now();
                    tokio::time::sleep(Duration::from_millis(
                        liveasr_config::constants::flush::PUNCTUATION_DEBOUNCE_MS,
                    ))
                    .await;
                    if !session.aggregator.arrived_since(arrival) {
                        flush_and_translate(&session, translators.clone(), FlushReason::Punctuation).await;
                    }
                }
            }
        }
    }
}

async fn run_tick(session: Arc<Session>, translators: Arc<TranslatorRegistry>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_millis(
        liveasr_config::constants::flush::TICK_INTERVAL_MS,
    ));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                flush_and_translate(&session, translators.clone(), FlushReason::Tick).await;
            }
        }
    }
}

/// Attempt a flush and, if text was actually flushed, mint a result id, emit
/// `final_result`, and fan out translations (§4.4/§4.5).
async fn flush_and_translate(
    session: &Arc<Session>,
    translators: Arc<TranslatorRegistry>,
    reason: FlushReason,
) {
    let FlushOutcome::Flushed(text) = session.aggregator.flush(reason) else {
        return;
    };

    let id = result_id();
    session.publish_to_all(ServerMessage::FinalResult {
        original: text.clone(),
        id: id.clone(),
    });
    crate::metrics::record_final_result(session.id.as_str());

    let engine = session.engine();
    let languages = session.languages();
    if languages.is_empty() {
        return;
    }

    let results = translators.translate_all(&engine, &text, &languages).await;
    for (lang, translated) in results {
        let success = !translated.contains("번역 실패");
        crate::metrics::record_translation(&lang, success);
        session.publish_to_all(ServerMessage::TranslationResult {
            original_id: id.clone(),
            lang,
            text: translated,
        });
    }
}

fn result_id() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
