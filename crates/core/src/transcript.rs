//! Utterance and transcript value types

/// A contiguous PCM buffer bounded by surrounding silence, handed from the
/// segmenter to the transcriber. Consumed once, then discarded.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// 16-bit little-endian PCM bytes, mono, 16kHz.
    pub pcm: Vec<u8>,
}

impl Utterance {
    pub fn new(pcm: Vec<u8>) -> Self {
        Self { pcm }
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        let samples = self.pcm.len() / 2;
        samples as f32 / sample_rate as f32
    }
}

/// Result of a single transcription call.
#[derive(Debug, Clone, Default)]
pub struct TranscriptResult {
    /// Trimmed transcript text. Empty means "no useful speech" (hallucination
    /// filtered, engine error, or genuine silence) — see pipeline::transcriber.
    pub text: String,
}
