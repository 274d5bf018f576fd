//! Minimal RIFF/WAVE writer for 16-bit PCM.

use super::pcm::sample_to_i16;
use super::AudioBuffer;

const HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;
const FORMAT_PCM: u16 = 1;

/// Encode interleaved float samples as a 16-bit PCM WAV file.
pub fn encode_wav(buffer: &AudioBuffer) -> Vec<u8> {
    let block_align = buffer.channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = buffer.sample_rate * u32::from(block_align);
    let data_len = (buffer.samples.len() * 2) as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&buffer.channels.to_le_bytes());
    out.extend_from_slice(&buffer.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for &sample in &buffer.samples {
        out.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes(bytes[at..at + 2].try_into().unwrap())
    }

    #[test]
    fn test_header_fields() {
        let buffer = AudioBuffer {
            samples: vec![0.0, 0.5, -0.5, 1.0],
            sample_rate: 44_100,
            channels: 2,
        };
        let wav = encode_wav(&buffer);

        assert_eq!(wav.len(), 44 + 8);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 36 + 8);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 2);
        assert_eq!(u32_at(&wav, 24), 44_100);
        assert_eq!(u32_at(&wav, 28), 44_100 * 4);
        assert_eq!(u16_at(&wav, 32), 4);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 8);
    }

    #[test]
    fn test_sample_data() {
        let buffer = AudioBuffer {
            samples: vec![0.5, -1.0],
            sample_rate: 8_000,
            channels: 1,
        };
        let wav = encode_wav(&buffer);
        assert_eq!(&wav[44..], &[0x00, 0x40, 0x00, 0x80]);
    }
}
