//! Bounded queues connecting the pipeline stages.
//!
//! Built on a `VecDeque` behind a parking_lot mutex with `tokio::sync::Notify`
//! wakeups. Plain mpsc channels are not enough here: the interruption path
//! needs an atomic `clear`, and the false-alarm resolution needs a
//! `has_items` probe on the audio queue.
//!
//! Producers block when the queue is at capacity and are unblocked by
//! consumers, by `clear`, or by `close`. All waits use the
//! register-then-check pattern (`Notified::enable`) so a wakeup between the
//! state check and the await is never lost.

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Error returned by [`BoundedQueue::put`] once the queue has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue is closed")]
pub struct QueueClosed;

struct QueueInner<T> {
    buf: VecDeque<T>,
    closed: bool,
}

/// FIFO queue with a fixed capacity, an atomic `clear`, and close semantics.
///
/// `get` returns `None` once the queue is closed and drained, which is the
/// shutdown signal for the worker loops.
pub struct BoundedQueue<T> {
    inner: Mutex<QueueInner<T>>,
    capacity: usize,
    /// Signalled when an item is pushed or the queue closes.
    items: Notify,
    /// Signalled when capacity is freed or the queue closes.
    space: Notify,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                buf: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            items: Notify::new(),
            space: Notify::new(),
        }
    }

    /// Push an item, waiting for capacity if the queue is full.
    ///
    /// The returned future is cancel-safe: dropping it mid-wait leaves the
    /// queue untouched, which is what lets a cancelled agent run abandon a
    /// blocked push.
    pub async fn put(&self, item: T) -> Result<(), QueueClosed> {
        let mut item = Some(item);
        loop {
            let notified = self.space.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return Err(QueueClosed);
                }
                if inner.buf.len() < self.capacity {
                    if let Some(value) = item.take() {
                        inner.buf.push_back(value);
                    }
                    drop(inner);
                    self.items.notify_one();
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    /// Pop the next item, waiting until one is available. Returns `None`
    /// once the queue is closed and empty.
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.items.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut inner = self.inner.lock();
                if let Some(value) = inner.buf.pop_front() {
                    drop(inner);
                    self.space.notify_one();
                    return Some(value);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Drop all queued items in a single critical section and return how
    /// many were discarded.
    pub fn clear(&self) -> usize {
        let drained = {
            let mut inner = self.inner.lock();
            let n = inner.buf.len();
            inner.buf.clear();
            n
        };
        if drained > 0 {
            self.space.notify_waiters();
        }
        drained
    }

    /// True if at least one item is queued.
    pub fn has_items(&self) -> bool {
        !self.inner.lock().buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_items()
    }

    /// Close the queue: pending and future `put`s fail, `get` drains the
    /// remaining items and then returns `None`.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.items.notify_waiters();
        self.space.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

/// Items flowing from the agent runner to the TTS worker.
///
/// `EndOfUtterance` is the sentinel pushed exactly once per completed agent
/// run; cancelled runs push nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextItem {
    Sentence { text: String, generation: u64 },
    EndOfUtterance { generation: u64 },
}

/// Items flowing from the TTS worker to the egress pump. The sentinel is
/// forwarded from the text stream so the pump can observe end-of-utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioItem {
    Chunk { audio: Bytes, generation: u64 },
    EndOfUtterance { generation: u64 },
}
