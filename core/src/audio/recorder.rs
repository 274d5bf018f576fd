//! Record-and-upload.
//!
//! Encoded chunks are accumulated until the recording is stopped, then the
//! whole container is decoded, re-encoded as WAV, and uploaded in one
//! multipart request.

use super::decode::decode_audio;
use super::wav::encode_wav;
use super::{AudioError, UPLOAD_ENDPOINT};
use crate::relay::{RelayBody, RelayClient, RelayError};
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK: usize = 16 * 1024;

/// Accumulates recorder output until stopped.
#[derive(Debug, Default)]
pub struct Recorder {
    chunks: Vec<Vec<u8>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a chunk of recorder output. Empty chunks are ignored.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if !chunk.is_empty() {
            self.chunks.push(chunk.to_vec());
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Stop recording and concatenate everything captured, in order.
    pub fn stop(self) -> Vec<u8> {
        self.chunks.concat()
    }
}

/// Read `input` into a [`Recorder`] until EOF or until `stop` resolves.
pub async fn record_from<R, S>(mut input: R, stop: S) -> Result<Vec<u8>, AudioError>
where
    R: AsyncRead + Unpin,
    S: Future<Output = ()>,
{
    let mut recorder = Recorder::new();
    let mut buf = vec![0u8; READ_CHUNK];
    tokio::pin!(stop);

    loop {
        tokio::select! {
            () = &mut stop => {
                log::info!("Recording stopped");
                break;
            }
            read = input.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    break;
                }
                recorder.push_chunk(&buf[..n]);
            }
        }
    }

    log::debug!("Recorded {} chunk(s)", recorder.chunk_count());
    Ok(recorder.stop())
}

/// File name used for uploads: `recording_<unix millis>.wav`.
pub fn recording_file_name(now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("recording_{millis}.wav")
}

/// Convert a finished recording to WAV and upload it.
pub async fn upload_recording(
    relay: &RelayClient,
    recording: Vec<u8>,
    extension: Option<&str>,
) -> Result<Value, AudioError> {
    let audio = decode_audio(recording, extension)?;
    log::debug!(
        "Decoded {} frame(s) at {} Hz, {} channel(s)",
        audio.frames(),
        audio.sample_rate,
        audio.channels
    );
    let wav = encode_wav(&audio);

    let part = Part::bytes(wav)
        .file_name(recording_file_name(SystemTime::now()))
        .mime_str("audio/wav")
        .map_err(RelayError::from)?;
    let form = Form::new().part("audio", part);

    let value = relay
        .post(UPLOAD_ENDPOINT, RelayBody::Multipart(form), HeaderMap::new())
        .await?;
    log::info!("Audio uploaded successfully");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioBuffer;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_recorder_ignores_empty_chunks_and_keeps_order() {
        let mut recorder = Recorder::new();
        recorder.push_chunk(b"ab");
        recorder.push_chunk(b"");
        recorder.push_chunk(b"cd");
        assert_eq!(recorder.chunk_count(), 2);
        assert_eq!(recorder.stop(), b"abcd".to_vec());
    }

    #[test]
    fn test_recording_file_name() {
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(recording_file_name(at), "recording_1700000000123.wav");
    }

    #[tokio::test]
    async fn test_record_until_eof() {
        let input: &[u8] = b"container bytes";
        let bytes = record_from(input, std::future::pending()).await.unwrap();
        assert_eq!(bytes, b"container bytes".to_vec());
    }

    #[tokio::test]
    async fn test_record_until_stopped() {
        let (_writer, reader) = tokio::io::duplex(64);
        let bytes = record_from(reader, tokio::time::sleep(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_wav() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/alerts/upload/audio"))
            .and(header("authorization", "Bearer durable"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let recording = encode_wav(&AudioBuffer {
            samples: vec![0.1; 441],
            sample_rate: 44_100,
            channels: 1,
        });
        let relay = RelayClient::with_defaults(server.uri(), "durable").unwrap();
        let value = upload_recording(&relay, recording, Some("wav")).await.unwrap();
        assert_eq!(value["ok"], true);

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8_lossy(&requests[0].body).to_lowercase();
        assert!(body.contains("name=\"audio\""));
        assert!(body.contains("filename=\"recording_"));
        assert!(body.contains("content-type: audio/wav"));
        assert!(body.contains("riff"));
    }

    #[tokio::test]
    async fn test_upload_of_garbage_fails_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let relay = RelayClient::with_defaults(server.uri(), "durable").unwrap();
        let result = upload_recording(&relay, b"junk".to_vec(), None).await;
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }
}
