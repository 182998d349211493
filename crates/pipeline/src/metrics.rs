//! Batching sink metrics
//!
//! Atomic counters updated on the flush path. All operations use relaxed
//! ordering; values are eventually consistent.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// What caused a batch to be flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Pending batch reached the configured size
    Size,
    /// Oldest pending event waited for the configured latency
    Latency,
    /// Sink was closed with a partial batch
    Close,
}

impl FlushTrigger {
    /// Short label for log fields
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Latency => "latency",
            Self::Close => "close",
        }
    }
}

impl std::fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for a batching sink
#[derive(Debug, Default)]
pub struct BatchingMetrics {
    /// Flushes triggered by the size bound
    flushes_by_size: AtomicU64,

    /// Flushes triggered by the latency bound
    flushes_by_latency: AtomicU64,

    /// Flushes performed by close
    flushes_on_close: AtomicU64,

    /// Events delivered to the inner sink
    events_flushed: AtomicU64,

    /// Flushes the inner sink rejected
    flush_errors: AtomicU64,
}

impl BatchingMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            flushes_by_size: AtomicU64::new(0),
            flushes_by_latency: AtomicU64::new(0),
            flushes_on_close: AtomicU64::new(0),
            events_flushed: AtomicU64::new(0),
            flush_errors: AtomicU64::new(0),
        }
    }

    /// Record a batch accepted by the inner sink
    #[inline]
    pub fn record_flush(&self, trigger: FlushTrigger, events: u64) {
        let counter = match trigger {
            FlushTrigger::Size => &self.flushes_by_size,
            FlushTrigger::Latency => &self.flushes_by_latency,
            FlushTrigger::Close => &self.flushes_on_close,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.events_flushed.fetch_add(events, Ordering::Relaxed);
    }

    /// Record a batch the inner sink rejected
    #[inline]
    pub fn record_flush_error(&self) {
        self.flush_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    #[inline]
    pub fn snapshot(&self) -> BatchingSnapshot {
        BatchingSnapshot {
            flushes_by_size: self.flushes_by_size.load(Ordering::Relaxed),
            flushes_by_latency: self.flushes_by_latency.load(Ordering::Relaxed),
            flushes_on_close: self.flushes_on_close.load(Ordering::Relaxed),
            events_flushed: self.events_flushed.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of batching metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchingSnapshot {
    pub flushes_by_size: u64,
    pub flushes_by_latency: u64,
    pub flushes_on_close: u64,
    pub events_flushed: u64,
    pub flush_errors: u64,
}

impl BatchingSnapshot {
    /// Total successful flushes regardless of trigger
    pub fn flushes(&self) -> u64 {
        self.flushes_by_size + self.flushes_by_latency + self.flushes_on_close
    }
}

/// Cloneable view of a batching sink's counters
///
/// Stays valid after the sink is moved into a worker or closed.
#[derive(Debug, Clone)]
pub struct BatchingMetricsHandle {
    metrics: Arc<BatchingMetrics>,
}

impl BatchingMetricsHandle {
    pub(crate) fn new(metrics: Arc<BatchingMetrics>) -> Self {
        Self { metrics }
    }

    /// Get a snapshot of the sink's counters
    pub fn snapshot(&self) -> BatchingSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_flush_by_trigger() {
        let metrics = BatchingMetrics::new();
        metrics.record_flush(FlushTrigger::Size, 10);
        metrics.record_flush(FlushTrigger::Size, 10);
        metrics.record_flush(FlushTrigger::Latency, 3);
        metrics.record_flush(FlushTrigger::Close, 1);
        metrics.record_flush_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.flushes_by_size, 2);
        assert_eq!(snapshot.flushes_by_latency, 1);
        assert_eq!(snapshot.flushes_on_close, 1);
        assert_eq!(snapshot.flushes(), 4);
        assert_eq!(snapshot.events_flushed, 24);
        assert_eq!(snapshot.flush_errors, 1);
    }

    #[test]
    fn test_handle_shares_counters() {
        let metrics = Arc::new(BatchingMetrics::new());
        let handle = BatchingMetricsHandle::new(Arc::clone(&metrics));

        metrics.record_flush(FlushTrigger::Close, 5);
        assert_eq!(handle.snapshot().events_flushed, 5);
    }

    #[test]
    fn test_trigger_labels() {
        assert_eq!(FlushTrigger::Size.to_string(), "size");
        assert_eq!(FlushTrigger::Latency.as_str(), "latency");
        assert_eq!(FlushTrigger::Close.as_str(), "close");
    }
}
