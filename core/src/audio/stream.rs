//! Live streaming of raw microphone samples.
//!
//! Input is little-endian f32 mono at 44.1 kHz. Every [`FRAME_SIZE`] samples
//! become one 16-bit PCM relay call. Capture and sending are decoupled by a
//! [`FrameQueue`]; a slow network drops frames per the overflow policy
//! instead of piling up requests.

use super::pcm::{f32_from_le_bytes, to_i16, to_le_bytes};
use super::queue::{FrameQueue, OverflowPolicy, PushOutcome};
use super::{AudioError, CHANNELS, FRAME_SIZE, SAMPLE_RATE, STREAM_ENDPOINT};
use crate::relay::{RelayBody, RelayClient};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

const FRAME_BYTES: usize = FRAME_SIZE * 4;

pub type Frame = Vec<i16>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StreamStats {
    pub captured: u64,
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Headers describing the PCM layout of each streamed frame.
pub fn stream_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("X-Sample-Rate", HeaderValue::from(SAMPLE_RATE));
    headers.insert("X-Channels", HeaderValue::from(CHANNELS));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers
}

/// Slice `input` into frames and push them onto `queue` until EOF.
/// A trailing partial frame is discarded. Returns the number of frames captured.
pub async fn capture_frames<R>(mut input: R, queue: &FrameQueue<Frame>) -> Result<u64, AudioError>
where
    R: AsyncRead + Unpin,
{
    let mut pending: Vec<u8> = Vec::with_capacity(FRAME_BYTES * 2);
    let mut buf = vec![0u8; FRAME_BYTES];
    let mut captured = 0u64;

    loop {
        let n = input.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&buf[..n]);

        while pending.len() >= FRAME_BYTES {
            let frame_bytes: Vec<u8> = pending.drain(..FRAME_BYTES).collect();
            let frame = to_i16(&f32_from_le_bytes(&frame_bytes));
            captured += 1;
            match queue.push(frame) {
                PushOutcome::Queued => {}
                PushOutcome::DroppedOldest | PushOutcome::DroppedNewest => {
                    log::debug!("Stream queue full, dropped a frame");
                }
                PushOutcome::Closed => return Ok(captured),
            }
        }
    }

    if !pending.is_empty() {
        log::debug!("Discarding {} trailing byte(s)", pending.len());
    }
    Ok(captured)
}

/// Drain `queue` in order, relaying each frame. Send failures are logged by
/// the relay and the stream carries on. Returns `(sent, failed)`.
pub async fn send_frames(relay: &RelayClient, queue: &FrameQueue<Frame>) -> (u64, u64) {
    let mut sent = 0;
    let mut failed = 0;
    while let Some(frame) = queue.pop().await {
        let body = RelayBody::Bytes(to_le_bytes(&frame));
        match relay.post(STREAM_ENDPOINT, body, stream_headers()).await {
            Ok(_) => sent += 1,
            Err(_) => failed += 1,
        }
    }
    (sent, failed)
}

/// Stream `input` to the companion until EOF or until `stop` resolves.
///
/// On EOF everything captured is flushed. On stop, frames still waiting in
/// the queue are discarded; a request already in flight is left to finish.
pub async fn run_stream<R, S>(
    relay: &RelayClient,
    input: R,
    stop: S,
    capacity: usize,
    policy: OverflowPolicy,
) -> Result<StreamStats, AudioError>
where
    R: AsyncRead + Unpin,
    S: Future<Output = ()>,
{
    let queue: Arc<FrameQueue<Frame>> = Arc::new(FrameQueue::new(capacity, policy));
    let sender = {
        let relay = relay.clone();
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { send_frames(&relay, &queue).await })
    };

    log::info!("Streaming audio to {}", relay.service_url());
    let capture = capture_frames(input, &queue);
    tokio::pin!(capture);
    tokio::pin!(stop);

    let outcome = tokio::select! {
        result = &mut capture => {
            queue.close();
            result.map(|_| ())
        }
        () = &mut stop => {
            let discarded = queue.close_and_discard();
            log::info!("Streaming stopped, {discarded} queued frame(s) discarded");
            Ok(())
        }
    };

    let (sent, failed) = sender.await.unwrap_or_else(|e| {
        log::error!("Stream sender task failed: {e}");
        (0, 0)
    });
    outcome?;

    let queue_stats = queue.stats();
    let stats = StreamStats {
        captured: queue_stats.pushed,
        sent,
        failed,
        dropped: queue_stats.dropped,
    };
    if stats.dropped > 0 {
        log::warn!(
            "Dropped {} of {} frame(s) because the network could not keep up",
            stats.dropped,
            stats.captured
        );
    }
    Ok(stats)
}
