//! Container decoding for recorded audio.

use super::{AudioBuffer, AudioError};
use std::io::{Cursor, ErrorKind};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL, CODEC_TYPE_OPUS};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode a complete recording held in memory into interleaved float PCM.
///
/// The container format is detected from its contents, so any format symphonia supports works.
/// `extension` is an optional hint such as `"ogg"` or `"wav"`. Tracks in a
/// codec without a registered decoder, notably Opus, are rejected before
/// decoding starts.
pub fn decode_audio(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioBuffer, AudioError> {
    if bytes.is_empty() {
        return Err(AudioError::Empty);
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let detected = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = detected.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoTrack)?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    ensure_supported(&params)?;

    let mut decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate = params.sample_rate.unwrap_or(super::SAMPLE_RATE);
    let mut channels = params
        .channels
        .map_or(super::CHANNELS, |c| c.count() as u16);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(Error::ResetRequired) => {
                log::warn!("Track list changed mid-recording; keeping what was decoded");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(Error::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if samples.is_empty() {
        return Err(AudioError::Empty);
    }

    Ok(AudioBuffer {
        samples,
        sample_rate,
        channels,
    })
}

/// Fail with [`AudioError::UnsupportedCodec`] when no decoder is registered for the track.
fn ensure_supported(params: &CodecParameters) -> Result<(), AudioError> {
    if symphonia::default::get_codecs()
        .get_codec(params.codec)
        .is_some()
    {
        return Ok(());
    }
    let name = if params.codec == CODEC_TYPE_OPUS {
        "opus".to_owned()
    } else {
        format!("{:?}", params.codec)
    };
    Err(AudioError::UnsupportedCodec(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::encode_wav;

    #[test]
    fn test_empty_input() {
        assert!(matches!(decode_audio(Vec::new(), None), Err(AudioError::Empty)));
    }

    #[test]
    fn test_unknown_container() {
        let result = decode_audio(b"definitely not audio".to_vec(), None);
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn test_opus_track_is_rejected_by_name() {
        let mut params = CodecParameters::new();
        params.for_codec(CODEC_TYPE_OPUS);
        match ensure_supported(&params) {
            Err(AudioError::UnsupportedCodec(name)) => assert_eq!(name, "opus"),
            other => panic!("expected UnsupportedCodec, got {other:?}"),
        }
    }

    #[test]
    fn test_pcm_track_is_supported() {
        let mut params = CodecParameters::new();
        params.for_codec(symphonia::core::codecs::CODEC_TYPE_PCM_S16LE);
        assert!(ensure_supported(&params).is_ok());
    }

    #[test]
    fn test_decodes_wav_recording() {
        let source = AudioBuffer {
            samples: vec![0.0, 0.5, -0.5, 0.25],
            sample_rate: 44_100,
            channels: 1,
        };
        let decoded = decode_audio(encode_wav(&source), Some("wav")).unwrap();

        assert_eq!(decoded.sample_rate, 44_100);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), source.samples.len());
        for (got, want) in decoded.samples.iter().zip(&source.samples) {
            assert!((got - want).abs() < 1e-4, "got {got}, want {want}");
        }
    }
}
