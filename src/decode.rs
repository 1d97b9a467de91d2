//! Decode RTL-SDR's byte based format into Complex I/Q.
use crate::{Complex, Float};

/// Decode RTL-SDR's byte based format into Complex I/Q.
///
/// Every pair of bytes is one sample, I first. A trailing odd byte is
/// ignored.
pub fn decode_u8_iq(input: &[u8]) -> Vec<Complex> {
    input
        .chunks_exact(2)
        .map(|e| (Float::from(e[0]), Float::from(e[1])))
        .map(|(a, b)| Complex::new((a - 127.0) * 0.008, (b - 127.0) * 0.008))
        .collect()
}
