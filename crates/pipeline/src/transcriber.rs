//! Transcriber: preprocessing + ASR back-end call + hallucination filter.
//!
//! Grounded in `audio_processing.py`'s `preprocess_audio`/`band_pass_filter`
//! and `models.py`'s `WhisperModel.transcribe`, restructured around an HTTP
//! ASR sidecar the way `stt/http_backend.rs` reaches its Python service.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type as FilterType};
use liveasr_config::constants::korean;
use liveasr_config::TranscriberConfig;
use serde::{Deserialize, Serialize};

/// Response from the ASR sidecar.
#[derive(Debug, Deserialize)]
struct AsrResponse {
    text: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct AsrRequest<'a> {
    beam_size: u32,
    language: &'a str,
    initial_prompt: Option<&'a str>,
    condition_on_previous_text: bool,
}

/// Invokes the external ASR engine over HTTP and applies the hallucination
/// filter. All failures — transport errors, non-success responses,
/// preprocessing errors — resolve to an empty string; the engine error is
/// logged but never propagated (§4.3/§7).
///
/// The DSP preprocessing and the ASR call are both CPU-bound/blocking, so
/// the whole of `transcribe` runs on the blocking thread pool via
/// `tokio::task::spawn_blocking` (§5) — the same pattern used for
/// CPU-intensive inference elsewhere in this corpus — so a slow utterance
/// never stalls the segmenter or the controller's read loop.
pub struct Transcriber {
    client: reqwest::blocking::Client,
    url: String,
    beam_size: u32,
}

impl Transcriber {
    pub fn new(config: &TranscriberConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .expect("reqwest client builds with a valid timeout");
        Self {
            client,
            url: config.url.clone(),
            beam_size: config.beam_size,
        }
    }

    /// Transcribe one utterance. `previous_text` is the aggregator's current
    /// buffer, passed as the ASR engine's `initial_prompt`.
    pub async fn transcribe(&self, pcm: &[u8], previous_text: &str) -> String {
        let pcm = pcm.to_vec();
        let previous_text = previous_text.to_string();
        let client = self.client.clone();
        let url = self.url.clone();
        let beam_size = self.beam_size;

        let outcome = tokio::task::spawn_blocking(move || {
            let samples = liveasr_core::pcm16_bytes_to_f32(&pcm);
            let processed = preprocess(&samples);
            let pcm_bytes = liveasr_core::f32_to_pcm16_bytes(&processed);

            let prompt = if previous_text.is_empty() {
                None
            } else {
                Some(previous_text.as_str())
            };
            let request = AsrRequest {
                beam_size,
                language: "ko",
                initial_prompt: prompt,
                condition_on_previous_text: prompt.is_some(),
            };

            call_engine(&client, &url, &pcm_bytes, &request)
        })
        .await;

        match outcome {
            Ok(Ok(text)) => filter_hallucinations(&text),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "transcription engine error");
                String::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "transcription task panicked");
                String::new()
            }
        }
    }
}

/// Runs on the blocking thread pool (see `Transcriber::transcribe`).
fn call_engine(
    client: &reqwest::blocking::Client,
    url: &str,
    pcm: &[u8],
    request: &AsrRequest<'_>,
) -> Result<String, reqwest::Error> {
    let query = serde_json::to_string(request).unwrap_or_default();
    let response = client
        .post(format!("{}/transcribe", url))
        .header("X-Asr-Params", query)
        .header("Content-Type", "audio/pcm")
        .body(pcm.to_vec())
        .send()?
        .error_for_status()?;

    let parsed: AsrResponse = response.json()?;
    if let Some(error) = parsed.error {
        tracing::warn!(error = %error, "ASR engine returned an error field");
    }
    Ok(parsed.text.trim().to_string())
}

/// Noise-floor-gate-then-band-pass preprocessing, falling back to the raw
/// samples on any filter failure (§4.3).
fn preprocess(samples: &[f32]) -> Vec<f32> {
    let denoised = reduce_noise(samples);
    match band_pass_filter(&denoised, 300.0, 3400.0, liveasr_config::constants::audio::SAMPLE_RATE as f32) {
        Ok(filtered) => filtered,
        Err(e) => {
            tracing::error!(error = ?e, "audio preprocessing failed, using unfiltered samples");
            samples.to_vec()
        }
    }
}

/// Frame-wise spectral-subtraction noise gate: estimate the noise floor from
/// the quietest decile of 10ms frames, then attenuate each frame by the
/// Wiener-style gain `sqrt(max(rms^2 - floor^2, 0)) / rms`. Stands in for
/// `noisereduce`'s stationary noise reduction — no Rust crate in this corpus
/// implements that, so this is a hand-rolled equivalent (see DESIGN.md).
fn reduce_noise(samples: &[f32]) -> Vec<f32> {
    const FRAME_LEN: usize = 160; // 10ms @ 16kHz
    if samples.len() < FRAME_LEN * 4 {
        return samples.to_vec();
    }

    let frame_rms: Vec<f32> = samples
        .chunks(FRAME_LEN)
        .map(|frame| (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt())
        .collect();

    let mut sorted_rms = frame_rms.clone();
    sorted_rms.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let noise_floor = sorted_rms[sorted_rms.len() / 10];

    samples
        .chunks(FRAME_LEN)
        .zip(frame_rms.iter())
        .flat_map(|(frame, &rms)| {
            let gain = if rms > noise_floor {
                (rms * rms - noise_floor * noise_floor).max(0.0).sqrt() / rms
            } else {
                0.0
            };
            frame.iter().map(move |s| s * gain).collect::<Vec<f32>>()
        })
        .collect()
}

/// Butterworth-style band-pass IIR filter (approximated here as a cascaded
/// biquad band-pass, order 5 in the original via `scipy.signal.butter`).
fn band_pass_filter(
    samples: &[f32],
    lowcut_hz: f32,
    highcut_hz: f32,
    sample_rate: f32,
) -> Result<Vec<f32>, biquad::Errors> {
    let center = (lowcut_hz * highcut_hz).sqrt();
    let q = center / (highcut_hz - lowcut_hz);
    let coeffs = Coefficients::<f32>::from_params(
        FilterType::BandPass,
        sample_rate.hz(),
        center.hz(),
        q,
    )?;
    let mut filter = DirectForm2Transposed::<f32>::new(coeffs);
    Ok(samples.iter().map(|&s| filter.run(s)).collect())
}

/// Suppresses ASR hallucinations: short outputs matching a known blacklist
/// phrase (e.g. boilerplate sign-offs hallucinated from near-silence).
fn filter_hallucinations(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let is_hallucination = korean::HALLUCINATION_BLACKLIST
        .iter()
        .any(|phrase| text.contains(phrase) && text.chars().count() < phrase.chars().count() + 5);
    if is_hallucination {
        tracing::warn!(text, "suppressed suspected hallucination");
        String::new()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_legitimate_long_text() {
        let text = "오늘 날씨가 정말 좋네요 감사합니다 여러분";
        assert_eq!(filter_hallucinations(text), text);
    }

    #[test]
    fn suppresses_short_blacklisted_phrase() {
        assert_eq!(filter_hallucinations("감사합니다"), "");
    }

    #[test]
    fn suppresses_blacklisted_phrase_with_small_margin() {
        // "감사합니다" is 5 chars; threshold is len+5 = 10 chars.
        assert_eq!(filter_hallucinations("감사합니다."), "");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(filter_hallucinations(""), "");
    }

    #[test]
    fn band_pass_filter_preserves_sample_count() {
        let samples = vec![0.1f32; 1000];
        let filtered = band_pass_filter(&samples, 300.0, 3400.0, 16000.0).unwrap();
        assert_eq!(filtered.len(), samples.len());
    }

    #[test]
    fn reduce_noise_preserves_sample_count() {
        let samples = vec![0.05f32; 1600];
        assert_eq!(reduce_noise(&samples).len(), samples.len());
    }

    #[test]
    fn reduce_noise_attenuates_quiet_uniform_signal_toward_silence() {
        // A perfectly uniform-amplitude signal is, by construction, entirely
        // at the estimated noise floor, so the gate should suppress it.
        let samples = vec![0.02f32; 1600];
        let denoised = reduce_noise(&samples);
        assert!(denoised.iter().all(|&s| s.abs() < 0.02));
    }

    #[test]
    fn reduce_noise_passes_through_short_buffers_unchanged() {
        let samples = vec![0.3f32; 100];
        assert_eq!(reduce_noise(&samples), samples);
    }
}
