//! Tether - Sources
//!
//! Network sources that decode framed events and expose them through the
//! `tether_pipeline::Source` contract.
//!
//! # Available Sources
//!
//! - **Transport** - TCP listener for frames written by `TransportSink`
//!
//! # Design Principles
//!
//! - **Zero-copy reads**: Use `bytes::BytesMut` for buffer management
//! - **Async I/O**: Built on `tokio` for non-blocking operations
//! - **Bounded hand-off**: readers block on a full queue instead of dropping
//!
//! # Example
//!
//! ```ignore
//! use tether_pipeline::Source;
//! use tether_sources::{TransportSource, TransportSourceConfig};
//!
//! let mut source = TransportSource::new(TransportSourceConfig::with_port(35853));
//! source.open().await?;
//! let event = source.next().await?;
//! source.close().await?;
//! ```

pub mod transport;

// Common types for sources
mod common;

pub use common::{MetricsSnapshot, SourceMetrics, SourceMetricsHandle};
pub use transport::{TransportSource, TransportSourceConfig};
