//! Common types and utilities for sinks
//!
//! Metrics shared by every sink type, and the handle that exposes them
//! after the sink has been moved into a worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by all sink types
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Successful `append` / `append_batch` calls
    writes: AtomicU64,

    /// Events accepted
    events_written: AtomicU64,

    /// Bytes accepted (sink-specific: wire bytes or body bytes)
    bytes_written: AtomicU64,

    /// Failed writes
    write_errors: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            writes: AtomicU64::new(0),
            events_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    /// Record a successful write
    #[inline]
    pub fn record_write(&self, event_count: u64, bytes: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.events_written.fetch_add(event_count, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a write error
    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get bytes written
    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            events_written: self.events_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.writes.store(0, Ordering::Relaxed);
        self.events_written.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.write_errors.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub writes: u64,
    pub events_written: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
}

/// Handle for reading a sink's metrics
///
/// It holds an Arc to the metrics, so it remains valid after the sink is
/// moved into a worker or closed.
#[derive(Debug, Clone)]
pub struct SinkMetricsHandle {
    id: String,
    metrics: Arc<SinkMetrics>,
}

impl SinkMetricsHandle {
    pub(crate) fn new(id: impl Into<String>, metrics: Arc<SinkMetrics>) -> Self {
        Self {
            id: id.into(),
            metrics,
        }
    }

    /// Name of the sink these metrics belong to
    pub fn sink_id(&self) -> &str {
        &self.id
    }

    /// Get snapshot of the sink's metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
