//! Segmenter: voice-activity-detection-driven utterance boundary detection.
//!
//! Frame-level speech/silence classification is delegated to a real
//! WebRTC-style VAD (`webrtc-vad`); the Idle/Active state machine, frame
//! reassembly, and silence-duration bookkeeping are this module's own
//! responsibility and are backend-independent — grounded in
//! `audio_processing.py`'s `pcm_processing_task`, restructured around the
//! corpus's single-consolidated-lock style (`VadMutableState` in the
//! pipeline's neural VAD) rather than that function's inline loop.

use liveasr_config::constants::audio as audio_const;
use parking_lot::Mutex;
use thiserror::Error;
use webrtc_vad::{SampleRate as WebRtcSampleRate, Vad, VadMode};

#[derive(Error, Debug)]
pub enum SegmenterError {
    #[error("webrtc-vad rejected frame of {0} bytes")]
    InvalidFrame(usize),
}

/// Segmenter state, mirroring §4.2's Idle/Active state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmenterState {
    #[default]
    Idle,
    Active,
}

struct MutableState {
    state: SegmenterState,
    /// Whole 960-byte frames not yet classified (trailing partial chunk retained).
    pcm_buffer: Vec<u8>,
    /// Accumulated speech frames since entering Active.
    speech_buffer: Vec<u8>,
    silence_frame_count: u32,
}

/// Carves a PCM byte stream into utterance-sized blobs using frame-level VAD.
///
/// Not `Send`-free: the inner `webrtc_vad::Vad` handle and all bookkeeping
/// live behind a single `parking_lot::Mutex`, so a `Segmenter` can be shared
/// behind an `Arc` and fed from one task while read elsewhere if ever needed,
/// though in the pipeline's normal operation it is owned by a single task.
pub struct Segmenter {
    vad: Mutex<Vad>,
    state: Mutex<MutableState>,
    silence_threshold_s: Mutex<f32>,
}

impl Segmenter {
    pub fn new(silence_threshold_s: f32) -> Self {
        Self {
            vad: Mutex::new(Vad::new_with_rate_and_mode(
                WebRtcSampleRate::Rate16kHz,
                aggressiveness_to_mode(audio_const::VAD_AGGRESSIVENESS),
            )),
            state: Mutex::new(MutableState {
                state: SegmenterState::Idle,
                pcm_buffer: Vec::new(),
                speech_buffer: Vec::new(),
                silence_frame_count: 0,
            }),
            silence_threshold_s: Mutex::new(silence_threshold_s),
        }
    }

    /// Update the silence threshold; read on the next frame transition, per
    /// §3's "takes effect for the next finalized utterance" rule applied to
    /// the segmenter's own state.
    pub fn set_silence_threshold(&self, seconds: f32) {
        *self.silence_threshold_s.lock() = seconds;
    }

    pub fn state(&self) -> SegmenterState {
        self.state.lock().state
    }

    /// Feed an arbitrary-sized PCM chunk. Returns a completed utterance's PCM
    /// bytes whenever a speech burst long enough to pass `MIN_AUDIO_DURATION_S`
    /// ends; shorter bursts are silently discarded per §4.2.
    pub fn push(&self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, SegmenterError> {
        let mut emitted = Vec::new();
        let mut state = self.state.lock();
        state.pcm_buffer.extend_from_slice(chunk);

        let frame_size = audio_const::VAD_BYTES_PER_FRAME;
        let max_silence_frames = {
            let threshold = *self.silence_threshold_s.lock();
            (threshold * 1000.0 / audio_const::VAD_FRAME_MS as f32) as u32
        };
        let min_audio_bytes =
            (audio_const::MIN_AUDIO_DURATION_S * audio_const::SAMPLE_RATE as f32 * 2.0) as usize;

        while state.pcm_buffer.len() >= frame_size {
            let frame: Vec<u8> = state.pcm_buffer.drain(..frame_size).collect();
            let samples: Vec<i16> = frame
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            let is_speech = {
                let mut vad = self.vad.lock();
                vad.is_voice_segment(&samples)
                    .map_err(|_| SegmenterError::InvalidFrame(frame.len()))?
            };

            match state.state {
                SegmenterState::Active => {
                    state.speech_buffer.extend_from_slice(&frame);
                    if is_speech {
                        state.silence_frame_count = 0;
                    } else {
                        state.silence_frame_count += 1;
                        if state.silence_frame_count > max_silence_frames {
                            state.state = SegmenterState::Idle;
                            if state.speech_buffer.len() >= min_audio_bytes {
                                emitted.push(std::mem::take(&mut state.speech_buffer));
                            } else {
                                state.speech_buffer.clear();
                            }
                            state.silence_frame_count = 0;
                        }
                    }
                }
                SegmenterState::Idle => {
                    if is_speech {
                        state.state = SegmenterState::Active;
                        state.silence_frame_count = 0;
                        state.speech_buffer.clear();
                        state.speech_buffer.extend_from_slice(&frame);
                    }
                }
            }
        }

        Ok(emitted)
    }

    /// Discard any in-flight utterance without emitting it — called on
    /// pipeline teardown per §4.2's "any in-flight utterance is discarded".
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.state = SegmenterState::Idle;
        state.pcm_buffer.clear();
        state.speech_buffer.clear();
        state.silence_frame_count = 0;
    }
}

fn aggressiveness_to_mode(level: u8) -> VadMode {
    match level {
        0 => VadMode::Quality,
        1 => VadMode::LowBitrate,
        2 => VadMode::Aggressive,
        _ => VadMode::VeryAggressive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence_frame() -> Vec<u8> {
        vec![0u8; audio_const::VAD_BYTES_PER_FRAME]
    }

    #[test]
    fn all_silence_produces_no_utterances() {
        let segmenter = Segmenter::new(0.1);
        let mut all = Vec::new();
        for _ in 0..200 {
            all.extend(silence_frame());
        }
        let emitted = segmenter.push(&all).unwrap();
        assert!(emitted.is_empty());
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }

    #[test]
    fn trailing_partial_frame_is_retained_across_calls() {
        let segmenter = Segmenter::new(0.1);
        let partial = vec![0u8; audio_const::VAD_BYTES_PER_FRAME - 1];
        let emitted = segmenter.push(&partial).unwrap();
        assert!(emitted.is_empty());
        // Complete the frame; should not panic or misalign.
        let emitted = segmenter.push(&[0u8]).unwrap();
        assert!(emitted.is_empty());
    }

    #[test]
    fn reset_discards_in_flight_utterance() {
        let segmenter = Segmenter::new(0.1);
        segmenter.push(&silence_frame()).unwrap();
        segmenter.reset();
        assert_eq!(segmenter.state(), SegmenterState::Idle);
    }
}
