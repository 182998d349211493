//! Moving events from a source to a sink
//!
//! [`dump_all`] and [`dump_n`] run inline on the caller's task.
//! [`DrainWorker`] runs the same loop on its own task and stops when its
//! cancellation token fires, handing the source and sink back to the caller
//! for closing.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};
use crate::traits::{Sink, Source};

/// Copy every event from `source` into `sink` until the source is exhausted
///
/// Returns the number of events copied. Neither side is opened or closed.
///
/// # Errors
///
/// Stops at the first failure from either side.
pub async fn dump_all<S, K>(source: &mut S, sink: &mut K) -> Result<u64>
where
    S: Source + ?Sized,
    K: Sink + ?Sized,
{
    let mut count = 0;
    while let Some(event) = source.next().await? {
        sink.append(event).await?;
        count += 1;
    }
    Ok(count)
}

/// Copy at most `n` events from `source` into `sink`
///
/// Returns early with a smaller count if the source is exhausted first.
///
/// # Errors
///
/// Stops at the first failure from either side.
pub async fn dump_n<S, K>(source: &mut S, sink: &mut K, n: u64) -> Result<u64>
where
    S: Source + ?Sized,
    K: Sink + ?Sized,
{
    let mut count = 0;
    while count < n {
        let Some(event) = source.next().await? else {
            break;
        };
        sink.append(event).await?;
        count += 1;
    }
    Ok(count)
}

/// What a finished drain worker hands back
#[derive(Debug)]
pub struct Drained<S, K> {
    pub source: S,
    pub sink: K,
    /// Events copied before the worker stopped
    pub events: u64,
    /// Failure that stopped the worker, if any
    pub result: Result<()>,
}

/// Background task copying events from a source to a sink
///
/// The worker stops when the source is exhausted, when either side fails,
/// or when it is cancelled. A source that reports `Cancelled` (because it
/// was closed underneath the worker) counts as a clean stop.
///
/// Cancellation drops an in-flight `next` call, so the source's `next`
/// must not lose events when its future is dropped.
#[derive(Debug)]
pub struct DrainWorker<S, K> {
    cancel: CancellationToken,
    handle: JoinHandle<Drained<S, K>>,
}

impl<S, K> DrainWorker<S, K>
where
    S: Source + 'static,
    K: Sink + 'static,
{
    /// Spawn a worker over already-opened `source` and `sink`
    pub fn spawn(source: S, sink: K) -> Self {
        Self::spawn_with_cancel(source, sink, CancellationToken::new())
    }

    /// Spawn a worker that stops when `cancel` fires
    pub fn spawn_with_cancel(source: S, sink: K, cancel: CancellationToken) -> Self {
        let handle = tokio::spawn(run_drain(source, sink, cancel.clone()));
        Self { cancel, handle }
    }

    /// Token that stops this worker
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Check if the worker task has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the worker and wait for it to hand back its endpoints
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Worker` if the task panicked.
    pub async fn stop(self) -> Result<Drained<S, K>> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the worker to finish on its own
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Worker` if the task panicked.
    pub async fn join(self) -> Result<Drained<S, K>> {
        self.handle
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))
    }
}

async fn run_drain<S: Source, K: Sink>(
    mut source: S,
    mut sink: K,
    cancel: CancellationToken,
) -> Drained<S, K> {
    let mut events = 0;

    let result = loop {
        let next = tokio::select! {
            biased;

            _ = cancel.cancelled() => break Ok(()),
            next = source.next() => next,
        };

        match next {
            Ok(Some(event)) => {
                if let Err(e) = sink.append(event).await {
                    break Err(e);
                }
                events += 1;
            }
            Ok(None) => break Ok(()),
            Err(e) if e.is_cancelled() => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    match &result {
        Ok(()) => tracing::debug!(
            source = %source.name(),
            sink = %sink.name(),
            events,
            "drain worker stopped"
        ),
        Err(e) => tracing::warn!(
            source = %source.name(),
            sink = %sink.name(),
            events,
            error = %e,
            "drain worker failed"
        ),
    }

    Drained {
        source,
        sink,
        events,
        result,
    }
}
