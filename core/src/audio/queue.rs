//! Bounded hand-off between audio capture and the network sender.
//!
//! Capture never waits on the network: when the queue is full a frame is
//! dropped according to [`OverflowPolicy`]. There is a single consumer.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// What to drop when a frame arrives at a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued frame to make room; keeps latency low.
    #[default]
    DropOldest,
    /// Discard the incoming frame; keeps what is already queued.
    DropNewest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued after evicting the oldest frame.
    DroppedOldest,
    /// The incoming frame was discarded.
    DroppedNewest,
    /// The queue is closed; the frame was discarded.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueueStats {
    /// Items offered while the queue was open, including ones dropped on arrival.
    pub pushed: u64,
    /// Items that made it into the queue.
    pub queued: u64,
    /// Items evicted, refused on overflow, or discarded on close.
    pub dropped: u64,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    stats: QueueStats,
}

pub struct FrameQueue<T> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

impl<T> FrameQueue<T> {
    /// A queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                stats: QueueStats::default(),
            }),
            notify: Notify::new(),
            capacity,
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, item: T) -> PushOutcome {
        let outcome = {
            let mut state = self.lock();
            if state.closed {
                return PushOutcome::Closed;
            }
            state.stats.pushed += 1;
            let outcome = if state.items.len() < self.capacity {
                state.items.push_back(item);
                PushOutcome::Queued
            } else {
                state.stats.dropped += 1;
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        state.items.pop_front();
                        state.items.push_back(item);
                        PushOutcome::DroppedOldest
                    }
                    OverflowPolicy::DropNewest => PushOutcome::DroppedNewest,
                }
            };
            if outcome != PushOutcome::DroppedNewest {
                state.stats.queued += 1;
            }
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    /// Wait for the next item. `None` once the queue is closed and empty.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Stop accepting items; already queued items are still delivered.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_one();
    }

    /// Stop accepting items and discard anything not yet delivered.
    /// Returns how many items were discarded.
    pub fn close_and_discard(&self) -> usize {
        let discarded = {
            let mut state = self.lock();
            state.closed = true;
            let n = state.items.len();
            state.items.clear();
            state.stats.dropped += n as u64;
            n
        };
        self.notify.notify_one();
        discarded
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn stats(&self) -> QueueStats {
        self.lock().stats
    }
}
