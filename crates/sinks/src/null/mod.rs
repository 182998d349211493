//! Null sink - discards all data
//!
//! Used for benchmarking a source without any sink-side overhead. It
//! accepts events, updates metrics, and immediately drops them.
//!
//! # Example
//!
//! ```ignore
//! use tether_pipeline::{Sink, dump_all};
//! use tether_sinks::null::NullSink;
//!
//! let mut sink = NullSink::new();
//! let handle = sink.metrics_handle();
//! sink.open().await?;
//! dump_all(&mut source, &mut sink).await?;
//! println!("{} events", handle.snapshot().events_written);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tether_pipeline::{PipelineError, Result, Sink};
use tether_protocol::{Batch, Event};

use crate::common::{MetricsSnapshot, SinkMetrics, SinkMetricsHandle};

/// Null sink that discards every event
///
/// Bytes are counted as event body bytes.
#[derive(Debug)]
pub struct NullSink {
    name: String,
    open: bool,
    metrics: Arc<SinkMetrics>,
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NullSink {
    /// Create a new null sink
    pub fn new() -> Self {
        Self::with_name("null")
    }

    /// Create a new null sink with a custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            open: false,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Get reference to metrics
    #[inline]
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Get a metrics handle that stays valid after the sink is moved
    pub fn metrics_handle(&self) -> SinkMetricsHandle {
        SinkMetricsHandle::new(self.name.clone(), Arc::clone(&self.metrics))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(PipelineError::NotOpen(self.name.clone()))
        }
    }

    fn log_totals(&self, snapshot: MetricsSnapshot) {
        tracing::info!(
            sink = %self.name,
            events = snapshot.events_written,
            bytes = snapshot.bytes_written,
            "null sink closed"
        );
    }
}

#[async_trait]
impl Sink for NullSink {
    async fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(PipelineError::AlreadyOpen(self.name.clone()));
        }
        self.open = true;
        tracing::debug!(sink = %self.name, "null sink opened");
        Ok(())
    }

    async fn append(&mut self, event: Event) -> Result<()> {
        self.ensure_open()?;
        self.metrics.record_write(1, event.body_len() as u64);
        Ok(())
    }

    async fn append_batch(&mut self, batch: Batch) -> Result<()> {
        self.ensure_open()?;
        self.metrics
            .record_write(batch.len() as u64, batch.body_bytes() as u64);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if std::mem::take(&mut self.open) {
            self.log_totals(self.metrics.snapshot());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
