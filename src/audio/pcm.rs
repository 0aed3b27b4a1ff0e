//! PCM16 wire codec: float samples to base64 text frames and back.
//!
//! Each capture block is independent — no cross-frame state — so a lost or
//! reordered frame degrades to a local glitch instead of desynchronizing the
//! stream.

use anyhow::{bail, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Samples per wire frame: 20 ms of mono audio at 48 kHz.
pub const FRAME_SAMPLES: usize = 960;

/// Convert one float sample in `[-1, 1]` to a signed 16-bit integer.
///
/// Clamps first to avoid overflow, then scales asymmetrically (negative range
/// has one extra step in two's complement).
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32_768.0) as i16
    } else {
        (clamped * 32_767.0) as i16
    }
}

/// Rescale a signed 16-bit sample back to floating point.
#[inline]
pub fn sample_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32_768.0
}

/// Pack float samples into little-endian PCM16 and base64-encode the block.
pub fn encode_frame(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }
    BASE64.encode(bytes)
}

/// Decode one base64 PCM16 payload back into float samples.
///
/// # Errors
///
/// Returns an error when the payload is not valid base64 or its byte length
/// is not a whole number of 16-bit samples. Callers skip the payload and
/// keep the queue moving.
pub fn decode_frame(encoded: &str) -> Result<Vec<f32>> {
    let bytes = BASE64.decode(encoded)?;
    if bytes.len() % 2 != 0 {
        bail!("odd PCM16 payload length: {} bytes", bytes.len());
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| sample_to_f32(i16::from_le_bytes([pair[0], pair[1]])))
        .collect();
    Ok(samples)
}
