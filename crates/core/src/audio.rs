//! PCM conversion helpers
//!
//! The pipeline works internally in two representations: signed 16-bit
//! little-endian bytes (as produced by the decoder and consumed by the
//! segmenter) and normalized f32 samples in `[-1.0, 1.0]` (as required by
//! the transcriber's preprocessing chain). These helpers convert between
//! the two; everything else about "audio" in this crate is just `Vec<u8>`.

/// PCM16 normalization divisor (sample as f32 / PCM16_NORMALIZE)
pub const PCM16_NORMALIZE: f32 = 32768.0;

/// PCM16 scaling multiplier (sample * PCM16_SCALE as i16)
pub const PCM16_SCALE: f32 = 32767.0;

/// Convert little-endian signed 16-bit PCM bytes to normalized f32 samples.
///
/// A trailing odd byte (an incomplete sample) is dropped.
pub fn pcm16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            sample as f32 / PCM16_NORMALIZE
        })
        .collect()
}

/// Convert normalized f32 samples back to little-endian signed 16-bit PCM bytes.
pub fn f32_to_pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        let sample = (clamped * PCM16_SCALE) as i16;
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_silence() {
        let bytes = vec![0u8; 960];
        let samples = pcm16_bytes_to_f32(&bytes);
        assert_eq!(samples.len(), 480);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn drops_trailing_odd_byte() {
        let bytes = vec![0u8, 0u8, 1u8];
        assert_eq!(pcm16_bytes_to_f32(&bytes).len(), 1);
    }

    #[test]
    fn clamps_out_of_range_samples() {
        let bytes = f32_to_pcm16_bytes(&[2.0, -2.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), -32767);
    }
}
