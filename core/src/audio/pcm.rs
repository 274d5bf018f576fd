//! Float to 16-bit sample conversion.

/// Scale a float sample by 32768 and clamp into the i16 range.
/// The fractional part is truncated toward zero.
pub fn sample_to_i16(sample: f32) -> i16 {
    let scaled = (sample * 32768.0).clamp(-32768.0, 32767.0);
    // NaN clamps to NaN and casts to 0.
    scaled as i16
}

pub fn to_i16(samples: &[f32]) -> Vec<i16> {
    samples.iter().copied().map(sample_to_i16).collect()
}

/// Little-endian byte layout of a frame, as sent on the wire.
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Read little-endian f32 samples. Trailing bytes that do not form a whole
/// sample are ignored.
pub fn f32_from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_and_clamping() {
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(0.5), 16384);
        assert_eq!(sample_to_i16(-0.5), -16384);
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32768);
        assert_eq!(sample_to_i16(3.0), 32767);
        assert_eq!(sample_to_i16(-3.0), -32768);
        assert_eq!(sample_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 0.0001 * 32768 = 3.2768
        assert_eq!(sample_to_i16(0.0001), 3);
        assert_eq!(sample_to_i16(-0.0001), -3);
    }

    #[test]
    fn test_le_bytes() {
        assert_eq!(to_le_bytes(&[1, -2]), vec![0x01, 0x00, 0xFE, 0xFF]);
    }

    #[test]
    fn test_f32_from_le_bytes_ignores_partial_sample() {
        let mut bytes = 0.25f32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(-1.0f32).to_le_bytes());
        bytes.push(0xAA);
        assert_eq!(f32_from_le_bytes(&bytes), vec![0.25, -1.0]);
    }
}
