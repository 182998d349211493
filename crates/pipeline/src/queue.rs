//! Bounded blocking queue
//!
//! The hand-off point between producers that must not outrun the consumer
//! and the consumer that drains them. `put` waits while the queue is full,
//! `take` waits while it is empty, and both give up with
//! `PipelineError::Cancelled` once the queue's cancellation token fires.
//!
//! Items already queued when the token fires can still be taken; only an
//! empty, cancelled queue reports `Cancelled` to `take`.

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};

/// FIFO queue with a fixed capacity and cooperative cancellation
///
/// Shared by reference (typically behind an `Arc`): any number of tasks may
/// `put` concurrently; concurrent `take` calls are serialized.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    sender: mpsc::Sender<T>,
    receiver: Mutex<mpsc::Receiver<T>>,
    capacity: usize,
    cancel: CancellationToken,
}

impl<T: Send> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_cancellation(capacity, CancellationToken::new())
    }

    /// Create a queue that is cancelled together with `cancel`
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_cancellation(capacity: usize, cancel: CancellationToken) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            capacity,
            cancel,
        }
    }

    /// Enqueue an item, waiting while the queue is full
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Cancelled` if the queue is cancelled before
    /// space frees up. The item is dropped in that case.
    pub async fn put(&self, item: T) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            sent = self.sender.send(item) => sent.map_err(|_| PipelineError::Cancelled),
        }
    }

    /// Enqueue without waiting
    ///
    /// Returns the item back if the queue is full or cancelled.
    pub fn try_put(&self, item: T) -> std::result::Result<(), T> {
        if self.cancel.is_cancelled() {
            return Err(item);
        }
        self.sender.try_send(item).map_err(|e| e.into_inner())
    }

    /// Dequeue the oldest item, waiting while the queue is empty
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Cancelled` if the queue is cancelled while
    /// empty.
    pub async fn take(&self) -> Result<T> {
        let mut receiver = tokio::select! {
            biased;

            receiver = self.receiver.lock() => receiver,
            _ = self.cancel.cancelled() => return self.try_take().ok_or(PipelineError::Cancelled),
        };

        if let Ok(item) = receiver.try_recv() {
            return Ok(item);
        }

        tokio::select! {
            biased;

            item = receiver.recv() => item.ok_or(PipelineError::Cancelled),
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
        }
    }

    /// Dequeue without waiting
    ///
    /// Returns `None` if the queue is empty or another task is taking.
    pub fn try_take(&self) -> Option<T> {
        self.receiver.try_lock().ok()?.try_recv().ok()
    }

    /// Remove everything currently queued
    pub fn drain(&self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.try_take() {
            items.push(item);
        }
        items
    }

    /// Number of queued items (never exceeds `capacity`)
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wake every waiting `put` and `take` with `Cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if the queue has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this queue
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
