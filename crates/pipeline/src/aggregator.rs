//! Aggregator: buffered, punctuation-and-timeout-driven flush policy.
//!
//! Grounded in `stream_manager.py`'s `_text_processing_task` (`text_buffer`,
//! `trigger_translation_if_needed`, `text_consumer`, `timeout_watcher`),
//! restructured around the corpus's single-consolidated-lock style seen in
//! the pipeline crate's VAD mutable state.

use liveasr_config::constants::{flush, korean};
use parking_lot::Mutex;
use std::time::Instant;

/// Outcome of a flush attempt, used by the caller to decide whether to emit
/// a `final_result` and kick off translation fan-out.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Nothing to flush (buffer empty, or tick-initiated flush suppressed).
    NoOp,
    /// Buffer was flushed; carries the snapshot text.
    Flushed(String),
}

struct BufferState {
    buffer: String,
    last_arrival: Option<Instant>,
}

/// Why a flush was attempted — drives the unconditional-vs-conditional
/// decision in `Flush` (§4.4 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Punctuation,
    Tick,
}

/// Per-session text accumulator implementing the flush policy in §4.4.
pub struct Aggregator {
    state: Mutex<BufferState>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BufferState {
                buffer: String::new(),
                last_arrival: None,
            }),
        }
    }

    /// Read-only snapshot of the buffer, used as the transcriber's
    /// "previous text" prompt.
    pub fn snapshot(&self) -> String {
        self.state.lock().buffer.trim().to_string()
    }

    /// Append a freshly transcribed fragment, returning the trimmed buffer
    /// for immediate `interim_result` emission and whether the buffer now
    /// ends with a sentence terminator (the caller is responsible for the
    /// 300ms debounce sleep before calling `flush` with `Punctuation`).
    pub fn on_transcript(&self, text: &str) -> (String, bool) {
        let mut state = self.state.lock();
        if !state.buffer.trim().is_empty() && !text.is_empty() {
            state.buffer.push(' ');
        }
        state.buffer.push_str(text);
        state.last_arrival = Some(Instant::now());

        let trimmed = state.buffer.trim().to_string();
        let ends_with_terminator = korean::SENTENCE_TERMINATORS
            .iter()
            .any(|t| trimmed.ends_with(t));
        (trimmed, ends_with_terminator)
    }

    /// Discard the buffer without emitting anything — used when a session's
    /// `clear_buffer_on_restart` setting is enabled (§9 open question).
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.buffer.clear();
        state.last_arrival = None;
    }

    /// Whether new text has arrived since `since` — used by the caller to
    /// check the punctuation debounce window didn't get superseded.
    pub fn arrived_since(&self, since: Instant) -> bool {
        match self.state.lock().last_arrival {
            Some(t) => t > since,
            None => false,
        }
    }

    /// Attempt a flush. Unconditional for `Punctuation`; for `Tick`, flushes
    /// only if idle long enough, long enough, and not semantically
    /// incomplete (§4.4 step 3).
    pub fn flush(&self, reason: FlushReason) -> FlushOutcome {
        let mut state = self.state.lock();
        let trimmed = state.buffer.trim();
        if trimmed.is_empty() {
            return FlushOutcome::NoOp;
        }

        let should_flush = match reason {
            FlushReason::Punctuation => true,
            FlushReason::Tick => {
                let last_word = trimmed.split_whitespace().last().unwrap_or("");
                let semantically_incomplete = korean::CONNECTING_ENDINGS
                    .iter()
                    .any(|e| last_word.ends_with(e))
                    || korean::CONNECTING_WORDS.contains(&last_word);

                let idle_long_enough = state
                    .last_arrival
                    .map(|t| t.elapsed().as_secs_f32() > flush::TRANSLATION_TIMEOUT_S)
                    .unwrap_or(false);
                let long_enough =
                    trimmed.chars().count() >= flush::MIN_LENGTH_FOR_TIMEOUT_TRANSLATION;

                idle_long_enough && long_enough && !semantically_incomplete
            }
        };

        if !should_flush {
            return FlushOutcome::NoOp;
        }

        let snapshot = trimmed.to_string();
        state.buffer.clear();
        state.last_arrival = None;
        FlushOutcome::Flushed(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn empty_buffer_flush_is_noop() {
        let agg = Aggregator::new();
        assert_eq!(agg.flush(FlushReason::Tick), FlushOutcome::NoOp);
        assert_eq!(agg.flush(FlushReason::Punctuation), FlushOutcome::NoOp);
    }

    #[test]
    fn on_transcript_joins_fragments_with_space() {
        let agg = Aggregator::new();
        agg.on_transcript("안녕하세요");
        let (buf, _) = agg.on_transcript("반갑습니다.");
        assert_eq!(buf, "안녕하세요 반갑습니다.");
    }

    #[test]
    fn sentence_terminator_is_detected() {
        let agg = Aggregator::new();
        let (_, ends) = agg.on_transcript("반갑습니다.");
        assert!(ends);
    }

    #[test]
    fn punctuation_flush_is_unconditional() {
        let agg = Aggregator::new();
        agg.on_transcript("안녕하세요 반갑습니다.");
        let outcome = agg.flush(FlushReason::Punctuation);
        assert_eq!(
            outcome,
            FlushOutcome::Flushed("안녕하세요 반갑습니다.".to_string())
        );
    }

    #[test]
    fn tick_flush_suppressed_on_connecting_ending() {
        let agg = Aggregator::new();
        agg.on_transcript("오늘은");
        // Even if idle long enough and long enough, "은" is a connecting ending.
        sleep(Duration::from_millis(10));
        assert_eq!(agg.flush(FlushReason::Tick), FlushOutcome::NoOp);
    }

    #[test]
    fn tick_flush_suppressed_when_too_short() {
        let agg = Aggregator::new();
        agg.on_transcript("안");
        assert_eq!(agg.flush(FlushReason::Tick), FlushOutcome::NoOp);
    }

    #[test]
    fn flush_clears_buffer_for_next_utterance() {
        let agg = Aggregator::new();
        agg.on_transcript("안녕하세요 반갑습니다.");
        agg.flush(FlushReason::Punctuation);
        assert_eq!(agg.snapshot(), "");
    }

    #[test]
    fn suppressed_tick_flush_is_completed_by_later_punctuation() {
        // End-to-end scenario 4: a connecting-ending buffer survives a tick
        // flush attempt untouched, then a later arrival completing the
        // sentence flushes the whole accumulated text unconditionally.
        let agg = Aggregator::new();
        agg.on_transcript("오늘은");
        sleep(Duration::from_millis(10));
        assert_eq!(agg.flush(FlushReason::Tick), FlushOutcome::NoOp);

        let (_, ends) = agg.on_transcript("좋은 날입니다.");
        assert!(ends);
        assert_eq!(
            agg.flush(FlushReason::Punctuation),
            FlushOutcome::Flushed("오늘은 좋은 날입니다.".to_string())
        );
    }
}
