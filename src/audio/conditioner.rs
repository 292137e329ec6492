//! Per-sample signal conditioning for 16-bit little-endian PCM.
//!
//! Applies a noise gate and soft compression before audio enters the
//! buffering layer. Operates on raw bytes so it can sit directly behind
//! any capture source.

use crate::defaults::{COMPRESSION_FACTOR, NOISE_GATE_THRESHOLD};

/// Condition a byte slice of 16-bit little-endian PCM samples.
///
/// Per sample: zero amplitudes below the noise gate, scale by the soft
/// compression factor (rounded to nearest), clamp to the i16 range, and
/// re-encode little-endian.
///
/// A trailing odd byte (incomplete sample) is dropped rather than buffered
/// across calls, so the output length is always even and never exceeds the
/// input length.
pub fn condition(bytes: &[u8]) -> Vec<u8> {
    let whole = bytes.len() / 2 * 2;
    let mut out = Vec::with_capacity(whole);

    for pair in bytes[..whole].chunks_exact(2) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]) as i32;

        let gated = if sample.abs() < NOISE_GATE_THRESHOLD {
            0
        } else {
            sample
        };

        let compressed = (gated as f64 * COMPRESSION_FACTOR).round() as i32;
        let clamped = compressed.clamp(i16::MIN as i32, i16::MAX as i32) as i16;

        out.extend_from_slice(&clamped.to_le_bytes());
    }

    out
}
