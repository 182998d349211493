//! Tether - Pipeline
//!
//! The contract every event producer and consumer follows, plus the
//! building blocks that sit between them.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──next()──→ dump_all / DrainWorker ──append()──→ [BatchingSink] ──append_batch()──→ [Sink]
//!    ↑                                                          size | latency | close
//! BoundedQueue (put blocks when full, take blocks when empty)
//! ```
//!
//! # Key Design
//!
//! - **One lifecycle**: `open` once, exchange events, `close` once
//! - **Backpressure**: `BoundedQueue::put` waits instead of dropping
//! - **Cancellation**: blocked waits end with `PipelineError::Cancelled`
//! - **Batching**: a decorator, so any sink gains size and latency bounds
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tether_pipeline::{BatchingConfig, BatchingSink, MemorySinkSource, Sink};
//!
//! let mut sink = BatchingSink::new(
//!     MemorySinkSource::new(),
//!     BatchingConfig::new(100, Duration::from_millis(50)),
//! );
//! sink.open().await?;
//! sink.append(event).await?;
//! sink.close().await?; // flushes the partial batch
//! ```

mod batching;
mod driver;
mod error;
mod memory;
mod metrics;
mod queue;
mod traits;

pub use batching::{BatchingConfig, BatchingSink, DEFAULT_MAX_COUNT, DEFAULT_MAX_LATENCY};
pub use driver::{DrainWorker, Drained, dump_all, dump_n};
pub use error::{PipelineError, Result};
pub use memory::MemorySinkSource;
pub use metrics::{BatchingMetrics, BatchingMetricsHandle, BatchingSnapshot, FlushTrigger};
pub use queue::BoundedQueue;
pub use traits::{Sink, Source};



#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;
