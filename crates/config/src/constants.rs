//! Centralized constants for the liveasr pipeline
//!
//! Fixed protocol/DSP parameters live here as `const`s. Anything a deployer
//! might reasonably want to override (ffmpeg path, ASR endpoint, default
//! silence threshold) lives in [`crate::settings::Settings`] instead —
//! this module is for values the spec fixes, not values it merely defaults.

/// Audio/VAD parameters
pub mod audio {
    /// Sample rate (Hz), fixed for the whole pipeline.
    pub const SAMPLE_RATE: u32 = 16000;

    /// VAD aggressiveness (0-3, most restrictive).
    pub const VAD_AGGRESSIVENESS: u8 = 3;

    /// VAD frame duration (ms).
    pub const VAD_FRAME_MS: u32 = 30;

    /// Bytes per VAD frame at SAMPLE_RATE/VAD_FRAME_MS, 16-bit mono.
    pub const VAD_BYTES_PER_FRAME: usize =
        (SAMPLE_RATE as usize * VAD_FRAME_MS as usize) / 1000 * 2;

    /// Default end-of-utterance silence gap (seconds); session-mutable via `config`.
    pub const SILENCE_THRESHOLD_S: f32 = 0.8;

    /// Minimum utterance duration (seconds) for the segmenter to emit it.
    pub const MIN_AUDIO_DURATION_S: f32 = 1.2;

    /// Upstream read size from the decoder's stdout, in bytes.
    pub const DECODER_READ_CHUNK: usize = 4096;
}

/// Aggregator flush-policy parameters
pub mod flush {
    /// Tick-initiated flush requires at least this much idle time (seconds).
    pub const TRANSLATION_TIMEOUT_S: f32 = 1.5;

    /// Tick-initiated flush requires at least this many buffered characters.
    pub const MIN_LENGTH_FOR_TIMEOUT_TRANSLATION: usize = 5;

    /// Debounce window after a sentence-terminator before a punctuation flush (ms).
    pub const PUNCTUATION_DEBOUNCE_MS: u64 = 300;

    /// Tick interval for the timeout-driven flush check (ms).
    pub const TICK_INTERVAL_MS: u64 = 500;
}

/// Broadcaster/replay parameters
pub mod broadcast {
    /// Number of final/translation results retained for late-joining viewers.
    pub const CACHE_CAPACITY: usize = 8;
}

/// Korean morpheme sets used by the aggregator's semantic-completeness check.
///
/// Reproduced verbatim from the source these were distilled from; do not
/// "clean up" or reorder these lists, their exact membership is load-bearing.
pub mod korean {
    pub const CONNECTING_WORDS: &[&str] = &[
        "그리고", "그래서", "그러나", "하지만", "그런데", "또한", "또는", "즉", "및", "대해", "따라",
        "위해", "통해", "관련", "대한", "관해", "대하여", "비해", "따르면",
    ];

    pub const CONNECTING_ENDINGS: &[&str] = &[
        "고", "하며", "면서", "는데", "지만", "하고", "에서", "에게", "한테", "부터", "까지", "으로",
        "로", "인데", "해도", "해서", "했고", "하는", "하던", "거나", "든지", "든가", "으며", "다가",
        "어서", "니까", "ㄹ수록", "더라도", "어야", "은데", "ㄴ데", "구요", "고요", "를", "을", "가",
        "이", "는", "은", "의", "와", "과",
    ];

    pub const SENTENCE_TERMINATORS: &[&str] =
        &["습니다.", "니다.", "까요?", "이죠?", "데요!", "하죠.", "시오."];

    pub const HALLUCINATION_BLACKLIST: &[&str] = &[
        "감사합니다",
        "시청해주셔서 감사합니다",
        "한국어 음성 대화",
        "다음 영상에서 만나요.",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_constants_valid() {
        assert_eq!(audio::SAMPLE_RATE, 16000);
        assert_eq!(audio::VAD_BYTES_PER_FRAME, 960);
        assert!(audio::SILENCE_THRESHOLD_S > 0.0);
        assert!(audio::MIN_AUDIO_DURATION_S > 0.0);
    }

    #[test]
    fn test_flush_constants_positive() {
        assert!(flush::TRANSLATION_TIMEOUT_S > 0.0);
        assert!(flush::MIN_LENGTH_FOR_TIMEOUT_TRANSLATION > 0);
        assert!(flush::PUNCTUATION_DEBOUNCE_MS > 0);
        assert!(flush::TICK_INTERVAL_MS > 0);
    }

    #[test]
    fn test_korean_sets_nonempty_and_distinct() {
        assert_eq!(korean::CONNECTING_WORDS.len(), 19);
        assert_eq!(korean::CONNECTING_ENDINGS.len(), 42);
        assert_eq!(korean::SENTENCE_TERMINATORS.len(), 7);
        assert_eq!(korean::HALLUCINATION_BLACKLIST.len(), 4);
        assert!(korean::SENTENCE_TERMINATORS.contains(&"까요?"));
        assert!(korean::HALLUCINATION_BLACKLIST.contains(&"감사합니다"));
    }
}
