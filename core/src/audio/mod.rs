//! Audio capture: record-and-upload and live streaming to the companion.
//!
//! Both modes expect 44.1 kHz mono input. Recording accumulates encoded
//! container chunks, decodes them, and uploads a single WAV file. Streaming
//! slices raw float samples into fixed frames and relays each frame as
//! 16-bit PCM through a bounded queue.

pub mod decode;
pub mod pcm;
pub mod queue;
pub mod recorder;
pub mod stream;
pub mod wav;

use thiserror::Error;

pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: u16 = 1;
/// Samples per streamed frame.
pub const FRAME_SIZE: usize = 1024;

pub const UPLOAD_ENDPOINT: &str = "/alerts/upload/audio";
pub const STREAM_ENDPOINT: &str = "/alerts/stream/audio";

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error("No supported audio track")]
    NoTrack,
    #[error("No decoder for the {0} codec; record as WAV, FLAC, MP3, or Ogg Vorbis instead")]
    UnsupportedCodec(String),
    #[error("Recording is empty")]
    Empty,
    #[error(transparent)]
    Relay(#[from] crate::relay::RelayError),
}

/// Decoded PCM: interleaved float samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / usize::from(self.channels)
    }
}
