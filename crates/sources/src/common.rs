//! Common types and utilities for sources

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by all source types
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Currently active connections
    connections_active: AtomicU64,

    /// Total connections accepted
    connections_total: AtomicU64,

    /// Frames decoded successfully
    frames_received: AtomicU64,

    /// Events handed to the queue
    events_received: AtomicU64,

    /// Wire bytes of decoded frames, prefix included
    bytes_received: AtomicU64,

    /// Connections dropped for malformed data
    malformed_frames: AtomicU64,

    /// Accept and read errors
    errors: AtomicU64,
}

impl SourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            events_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Increment active connections
    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement active connections
    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a decoded frame
    #[inline]
    pub fn frame_received(&self, bytes: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record an event accepted by the queue
    #[inline]
    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection closed for malformed data
    #[inline]
    pub fn frame_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record error
    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub frames_received: u64,
    pub events_received: u64,
    pub bytes_received: u64,
    pub malformed_frames: u64,
    pub errors: u64,
}

/// Handle for reading a source's metrics
///
/// It holds an Arc to the metrics, so it remains valid after the source is
/// moved into a worker or closed.
#[derive(Debug, Clone)]
pub struct SourceMetricsHandle {
    id: String,
    metrics: Arc<SourceMetrics>,
}

impl SourceMetricsHandle {
    pub(crate) fn new(id: impl Into<String>, metrics: Arc<SourceMetrics>) -> Self {
        Self {
            id: id.into(),
            metrics,
        }
    }

    /// Name of the source these metrics belong to
    pub fn source_id(&self) -> &str {
        &self.id
    }

    /// Get snapshot of the source's metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_connection_tracking() {
        let metrics = SourceMetrics::new();

        metrics.connection_opened();
        metrics.connection_opened();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_active, 2);
        assert_eq!(snapshot.connections_total, 2);

        metrics.connection_closed();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_active, 1);
        assert_eq!(snapshot.connections_total, 2);
    }

    #[test]
    fn test_metrics_frame_tracking() {
        let metrics = SourceMetrics::new();

        metrics.frame_received(100);
        metrics.frame_received(200);
        metrics.event_received();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.bytes_received, 300);
        assert_eq!(snapshot.events_received, 1);
    }

    #[test]
    fn test_malformed_counts_as_error() {
        let metrics = SourceMetrics::new();

        metrics.frame_malformed();
        metrics.error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.malformed_frames, 1);
        assert_eq!(snapshot.errors, 2);
    }
}
