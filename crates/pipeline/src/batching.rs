//! Batching decorator
//!
//! Wraps any [`Sink`] and groups appended events into batches. A batch is
//! handed to the inner sink's `append_batch` when it reaches `max_count`
//! events, when its oldest event has waited `max_latency`, or when the
//! decorator is closed. Events keep their append order across batches.
//!
//! The size bound is checked inline on `append`, so a batch that fills up
//! is flushed by the append that filled it even if the latency deadline
//! expires at the same moment. The latency bound is enforced by a timer
//! task that re-checks the deadline under the same lock before flushing.
//!
//! A latency flush has no caller to report to. Its failure is held and
//! returned by the next `append` or by `close`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use tether_protocol::{Batch, Event};

use crate::error::{PipelineError, Result};
use crate::metrics::{BatchingMetrics, BatchingMetricsHandle, FlushTrigger};
use crate::traits::Sink;

/// Default maximum events per batch
pub const DEFAULT_MAX_COUNT: usize = 100;

/// Default maximum time an event waits in a partial batch
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_secs(10);

/// Upper bound on the pending buffer's up-front allocation
///
/// Latency-driven setups use a huge `max_count`; the buffer grows as events
/// arrive instead.
const INITIAL_BATCH_CAPACITY: usize = 1024;

/// Batch bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchingConfig {
    /// Flush once this many events are pending (at least 1)
    pub max_count: usize,

    /// Flush once the oldest pending event is this old
    pub max_latency: Duration,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            max_latency: DEFAULT_MAX_LATENCY,
        }
    }
}

impl BatchingConfig {
    /// Create bounds from a count and a latency
    pub fn new(max_count: usize, max_latency: Duration) -> Self {
        Self {
            max_count,
            max_latency,
        }
    }

    /// Create bounds with the latency given in microseconds
    pub fn from_micros(max_count: usize, max_latency_micros: u64) -> Self {
        Self::new(max_count, Duration::from_micros(max_latency_micros))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Open,
    Closed,
}

struct BatchState<S> {
    inner: S,
    pending: Batch,
    /// When the first pending event arrived
    started: Option<Instant>,
    /// Failure of a latency flush, not yet reported
    deferred_error: Option<PipelineError>,
}

impl<S: Sink> BatchState<S> {
    fn push(&mut self, event: Event, wake: &Notify) {
        if self.pending.is_empty() {
            self.started = Some(Instant::now());
            wake.notify_one();
        }
        self.pending.push(event);
    }

    async fn flush(&mut self, trigger: FlushTrigger, metrics: &BatchingMetrics) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let batch = self.pending.take();
        self.started = None;
        let count = batch.len();

        match self.inner.append_batch(batch).await {
            Ok(()) => {
                metrics.record_flush(trigger, count as u64);
                tracing::trace!(
                    sink = %self.inner.name(),
                    trigger = %trigger,
                    events = count,
                    "flushed batch"
                );
                Ok(())
            }
            Err(e) => {
                metrics.record_flush_error();
                Err(PipelineError::unflushed(count, e))
            }
        }
    }
}

struct Shared<S> {
    state: Mutex<BatchState<S>>,
    /// Signalled when a new batch starts so the timer can arm its deadline
    wake: Notify,
    metrics: Arc<BatchingMetrics>,
}

/// Sink decorator that flushes on size, latency or close
pub struct BatchingSink<S: Sink> {
    shared: Arc<Shared<S>>,
    config: BatchingConfig,
    name: String,
    lifecycle: Lifecycle,
    cancel: CancellationToken,
    timer: Option<JoinHandle<()>>,
}

impl<S: Sink> std::fmt::Debug for BatchingSink<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchingSink")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

impl<S: Sink + 'static> BatchingSink<S> {
    /// Wrap `inner` with the given batch bounds
    ///
    /// A `max_count` of zero is treated as one.
    pub fn new(inner: S, config: BatchingConfig) -> Self {
        let config = BatchingConfig {
            max_count: config.max_count.max(1),
            ..config
        };
        let name = format!("batching({})", inner.name());

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BatchState {
                    inner,
                    pending: Batch::with_capacity(config.max_count.min(INITIAL_BATCH_CAPACITY)),
                    started: None,
                    deferred_error: None,
                }),
                wake: Notify::new(),
                metrics: Arc::new(BatchingMetrics::new()),
            }),
            config,
            name,
            lifecycle: Lifecycle::Idle,
            cancel: CancellationToken::new(),
            timer: None,
        }
    }

    /// Batch bounds in effect
    pub fn config(&self) -> &BatchingConfig {
        &self.config
    }

    /// Number of events waiting for the next flush
    pub async fn pending(&self) -> usize {
        self.shared.state.lock().await.pending.len()
    }

    /// Get a cloneable handle to the flush counters
    pub fn metrics_handle(&self) -> BatchingMetricsHandle {
        BatchingMetricsHandle::new(Arc::clone(&self.shared.metrics))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.lifecycle == Lifecycle::Open {
            Ok(())
        } else {
            Err(PipelineError::NotOpen(self.name.clone()))
        }
    }
}

#[async_trait]
impl<S: Sink + 'static> Sink for BatchingSink<S> {
    async fn open(&mut self) -> Result<()> {
        if self.lifecycle == Lifecycle::Open {
            return Err(PipelineError::AlreadyOpen(self.name.clone()));
        }

        self.shared.state.lock().await.inner.open().await?;

        self.cancel = CancellationToken::new();
        self.timer = Some(tokio::spawn(run_latency_timer(
            Arc::clone(&self.shared),
            self.config.max_latency,
            self.cancel.clone(),
        )));
        self.lifecycle = Lifecycle::Open;

        tracing::debug!(
            sink = %self.name,
            max_count = self.config.max_count,
            max_latency = ?self.config.max_latency,
            "batching sink opened"
        );
        Ok(())
    }

    async fn append(&mut self, event: Event) -> Result<()> {
        self.ensure_open()?;

        let mut state = self.shared.state.lock().await;
        if let Some(err) = state.deferred_error.take() {
            return Err(err);
        }

        state.push(event, &self.shared.wake);
        if state.pending.len() >= self.config.max_count {
            state.flush(FlushTrigger::Size, &self.shared.metrics).await?;
        }
        Ok(())
    }

    async fn append_batch(&mut self, batch: Batch) -> Result<()> {
        self.ensure_open()?;

        let mut state = self.shared.state.lock().await;
        if let Some(err) = state.deferred_error.take() {
            return Err(err);
        }

        for event in batch {
            state.push(event, &self.shared.wake);
            if state.pending.len() >= self.config.max_count {
                state.flush(FlushTrigger::Size, &self.shared.metrics).await?;
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.lifecycle != Lifecycle::Open {
            return Ok(());
        }
        self.lifecycle = Lifecycle::Closed;

        self.cancel.cancel();
        if let Some(timer) = self.timer.take()
            && let Err(e) = timer.await
        {
            tracing::warn!(sink = %self.name, error = %e, "latency timer task failed");
        }

        let mut state = self.shared.state.lock().await;
        let deferred = state.deferred_error.take();
        let pending = state.pending.len();
        let flushed = state.flush(FlushTrigger::Close, &self.shared.metrics).await;
        let closed = state.inner.close().await;

        tracing::debug!(
            sink = %self.name,
            flushed_on_close = pending,
            "batching sink closed"
        );

        deferred.map_or(Ok(()), Err).and(flushed).and(closed)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<S: Sink> Drop for BatchingSink<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Ok(state) = self.shared.state.try_lock()
            && !state.pending.is_empty()
        {
            tracing::warn!(
                sink = %self.name,
                events = state.pending.len(),
                "batching sink dropped without close, pending events lost"
            );
        }
    }
}

/// Flush a batch once its oldest event has waited `max_latency`
async fn run_latency_timer<S: Sink>(
    shared: Arc<Shared<S>>,
    max_latency: Duration,
    cancel: CancellationToken,
) {
    loop {
        let started = shared.state.lock().await.started;

        let Some(started) = started else {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = shared.wake.notified() => {}
            }
            continue;
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep_until(started + max_latency) => {}
        }

        let mut state = shared.state.lock().await;
        // A size flush may have won the race and a newer batch started since
        if state
            .started
            .is_none_or(|started| started.elapsed() < max_latency)
        {
            continue;
        }

        if let Err(e) = state.flush(FlushTrigger::Latency, &shared.metrics).await {
            tracing::warn!(
                sink = %state.inner.name(),
                error = %e,
                "latency flush failed"
            );
            state.deferred_error = Some(e);
        }
    }
}
