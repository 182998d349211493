//! Source and sink contract
//!
//! Every producer and consumer of events follows the same lifecycle:
//! `open` once, exchange events, `close` once. Implementations are driven
//! through `&mut self`, so a single component is never used concurrently;
//! sharing one across tasks means wrapping it in a lock.

use async_trait::async_trait;

use tether_protocol::{Batch, Event};

use crate::error::Result;

/// Consumer of events
///
/// Events passed to one sink are delivered in the order of the calls that
/// accepted them.
#[async_trait]
pub trait Sink: Send {
    /// Acquire resources (connections, timers)
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::AlreadyOpen` on a second call, or the
    /// failure of the underlying resource.
    async fn open(&mut self) -> Result<()>;

    /// Deliver one event
    ///
    /// # Errors
    ///
    /// Returns an error if the sink is not open or delivery failed.
    async fn append(&mut self, event: Event) -> Result<()>;

    /// Deliver a batch, preserving its order
    ///
    /// The default forwards events one at a time. Sinks with a cheaper
    /// bulk path override it.
    async fn append_batch(&mut self, batch: Batch) -> Result<()> {
        for event in batch {
            self.append(event).await?;
        }
        Ok(())
    }

    /// Flush what is pending and release resources
    ///
    /// Closing a sink that was never opened is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// Producer of events
#[async_trait]
pub trait Source: Send {
    /// Acquire resources (listeners, workers)
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::AlreadyOpen` on a second call, or the
    /// failure of the underlying resource.
    async fn open(&mut self) -> Result<()>;

    /// Next event in arrival order
    ///
    /// Returns `Ok(None)` once a finite source is exhausted. Live sources
    /// block until an event arrives and report `PipelineError::Cancelled`
    /// when closed underneath the waiting caller.
    async fn next(&mut self) -> Result<Option<Event>>;

    /// Release resources and unblock pending waits
    async fn close(&mut self) -> Result<()>;

    /// Source name for logging
    fn name(&self) -> &str;
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Box<S> {
    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    async fn append(&mut self, event: Event) -> Result<()> {
        (**self).append(event).await
    }

    async fn append_batch(&mut self, batch: Batch) -> Result<()> {
        (**self).append_batch(batch).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<S: Source + ?Sized> Source for Box<S> {
    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    async fn next(&mut self) -> Result<Option<Event>> {
        (**self).next().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
