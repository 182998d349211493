//! Tether - Sinks
//!
//! Event consumers implementing the `tether_pipeline::Sink` contract.
//!
//! # Available Sinks
//!
//! | Sink | Purpose |
//! |------|---------|
//! | `null` | Benchmarking (discard all, count) |
//! | `transport` | Length-prefixed frames over TCP |
//!
//! Any of them can be wrapped in `tether_pipeline::BatchingSink` to group
//! events before they reach the sink.
//!
//! # Example
//!
//! ```ignore
//! use tether_pipeline::Sink;
//! use tether_sinks::transport::{TransportSink, TransportSinkConfig};
//!
//! let mut sink = TransportSink::new(TransportSinkConfig::new("localhost", 35853));
//! sink.open().await?;
//! sink.append(event).await?;
//! sink.close().await?;
//! ```

// =============================================================================
// Sink implementations (each in its own submodule)
// =============================================================================

/// Null sink - discards all data (for benchmarking)
pub mod null;

/// Transport sink - framed events over TCP
pub mod transport;

// =============================================================================
// Shared types
// =============================================================================

mod common;

pub use common::{MetricsSnapshot, SinkMetrics, SinkMetricsHandle};
