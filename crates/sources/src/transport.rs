//! Transport Source - framed events over TCP
//!
//! Listens on a port, accepts any number of `TransportSink` connections and
//! hands every decoded event to a bounded queue that `next()` drains.
//!
//! # Protocol
//!
//! ```text
//! [4 bytes: payload length (big-endian)][payload: version, count, events]
//! ```
//!
//! # Design
//!
//! - **Per-connection tasks**: each connection is read by its own task
//! - **Backpressure**: readers block on a full queue, which stops reading
//!   from the socket and lets TCP flow control push back on the sender
//! - **Ordering**: events from one connection enter the queue in wire order;
//!   events from different connections interleave arbitrarily
//! - **Isolation**: a malformed frame closes only the connection it came from
//! - **Zero-copy reads**: event bodies are slices of the read buffer
//!
//! # Example
//!
//! ```ignore
//! use tether_pipeline::Source;
//! use tether_sources::{TransportSource, TransportSourceConfig};
//!
//! let mut source = TransportSource::new(TransportSourceConfig::with_port(35853));
//! source.open().await?;
//! while let Some(event) = source.next().await? {
//!     // ...
//! }
//! ```

use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use socket2::{SockRef, TcpKeepalive};
use tether_pipeline::{BoundedQueue, PipelineError, Result, Source};
use tether_protocol::{Event, FRAME_HEADER_SIZE, decode_payload, peek_frame_len};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::common::{SourceMetrics, SourceMetricsHandle};

/// Default listen port
pub const DEFAULT_PORT: u16 = 35853;

/// Default queue capacity (events)
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default read buffer size per connection (64KB)
const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Default TCP keepalive idle time and probe interval
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Transport source configuration
#[derive(Debug, Clone)]
pub struct TransportSourceConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port (0 picks an ephemeral port)
    pub port: u16,

    /// Events buffered between readers and `next()`
    pub queue_capacity: usize,

    /// Read buffer size per connection
    pub read_buffer_size: usize,

    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,

    /// TCP keepalive enabled
    pub keepalive: bool,

    /// Idle time before the first keepalive probe, and the gap between probes
    pub keepalive_interval: Duration,
}

impl Default for TransportSourceConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            nodelay: true,
            keepalive: true,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}

impl TransportSourceConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Set the bind address
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the queue capacity
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Everything the accept loop and readers share
struct Listening {
    queue: Arc<BoundedQueue<Event>>,
    local_addr: SocketAddr,
    accept: JoinHandle<()>,
}

enum State {
    Idle,
    Open(Listening),
    Closed,
}

/// TCP source decoding framed events into a bounded queue
pub struct TransportSource {
    config: TransportSourceConfig,
    name: String,
    state: State,
    cancel: CancellationToken,
    metrics: Arc<SourceMetrics>,
}

impl std::fmt::Debug for TransportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSource")
            .field("name", &self.name)
            .field("address", &self.config.bind_address())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

impl TransportSource {
    /// Create a new transport source
    ///
    /// A `queue_capacity` of zero is treated as one.
    pub fn new(config: TransportSourceConfig) -> Self {
        Self::with_name(config, "transport")
    }

    /// Create a new transport source with a custom name
    pub fn with_name(config: TransportSourceConfig, name: impl Into<String>) -> Self {
        Self {
            config,
            name: name.into(),
            state: State::Idle,
            cancel: CancellationToken::new(),
            metrics: Arc::new(SourceMetrics::new()),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &TransportSourceConfig {
        &self.config
    }

    /// Address actually bound, once open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            State::Open(listening) => Some(listening.local_addr),
            _ => None,
        }
    }

    /// Token that stops the source from another task
    ///
    /// Cancelling it wakes a `next()` blocked on an empty queue with
    /// `PipelineError::Cancelled` and stops accepting and reading. `close`
    /// is still needed to release the listener.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Events waiting in the queue
    pub fn queued(&self) -> usize {
        match &self.state {
            State::Open(listening) => listening.queue.len(),
            _ => 0,
        }
    }

    /// Get a metrics handle that stays valid after the source is moved
    pub fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle::new(self.name.clone(), Arc::clone(&self.metrics))
    }
}

#[async_trait]
impl Source for TransportSource {
    async fn open(&mut self) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Open(_) => return Err(PipelineError::AlreadyOpen(self.name.clone())),
            // The cancellation token is spent
            State::Closed => return Err(PipelineError::Cancelled),
        }

        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| PipelineError::bind(bind_addr.clone(), e))?;
        let local_addr = listener.local_addr()?;

        let queue = Arc::new(BoundedQueue::with_cancellation(
            self.config.queue_capacity.max(1),
            self.cancel.clone(),
        ));

        let accept = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&queue),
            Arc::clone(&self.metrics),
            self.config.clone(),
            self.cancel.clone(),
        ));

        tracing::info!(
            source = %self.name,
            address = %local_addr,
            queue_capacity = self.config.queue_capacity,
            "transport source listening"
        );

        self.state = State::Open(Listening {
            queue,
            local_addr,
            accept,
        });
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<Event>> {
        match &self.state {
            State::Open(listening) => listening.queue.take().await.map(Some),
            State::Idle => Err(PipelineError::NotOpen(self.name.clone())),
            State::Closed => Err(PipelineError::Cancelled),
        }
    }

    async fn close(&mut self) -> Result<()> {
        let State::Open(listening) = std::mem::replace(&mut self.state, State::Closed) else {
            return Ok(());
        };

        self.cancel.cancel();
        // Readers are joined by the accept loop, so nothing is put after this
        if let Err(e) = listening.accept.await {
            tracing::warn!(source = %self.name, error = %e, "accept task failed");
        }

        let discarded = listening.queue.drain().len();
        if discarded > 0 {
            tracing::warn!(
                source = %self.name,
                events = discarded,
                "closed with undrained events, discarding"
            );
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            source = %self.name,
            connections = snapshot.connections_total,
            frames = snapshot.frames_received,
            events = snapshot.events_received,
            bytes = snapshot.bytes_received,
            malformed = snapshot.malformed_frames,
            "transport source closed"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for TransportSource {
    fn drop(&mut self) {
        // Stop background tasks if the source was never closed
        self.cancel.cancel();
    }
}

/// Accept connections until cancelled, then wait for every reader
async fn accept_loop(
    listener: TcpListener,
    queue: Arc<BoundedQueue<Event>>,
    metrics: Arc<SourceMetrics>,
    config: TransportSourceConfig,
    cancel: CancellationToken,
) {
    let mut readers = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            // Reap finished readers
            Some(_) = readers.join_next(), if !readers.is_empty() => {}

            result = listener.accept() => match result {
                Ok((stream, peer_addr)) => {
                    configure_socket(&stream, &config);
                    metrics.connection_opened();
                    tracing::debug!(peer = %peer_addr, "connection accepted");

                    readers.spawn(handle_connection(
                        stream,
                        peer_addr,
                        Arc::clone(&queue),
                        Arc::clone(&metrics),
                        config.read_buffer_size,
                        cancel.clone(),
                    ));
                }
                Err(e) => {
                    // Transient accept errors - log and continue
                    tracing::warn!(error = %e, "accept error");
                    metrics.error();
                }
            }
        }
    }

    drop(listener);
    while readers.join_next().await.is_some() {}
}

/// Read one connection until EOF, cancellation or a malformed frame
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    queue: Arc<BoundedQueue<Event>>,
    metrics: Arc<SourceMetrics>,
    buffer_size: usize,
    cancel: CancellationToken,
) {
    let result = read_frames(&mut stream, &queue, &metrics, buffer_size, &cancel).await;
    metrics.connection_closed();

    match result {
        Ok(()) => tracing::debug!(peer = %peer_addr, "connection closed"),
        Err(e) if e.is_cancelled() => {
            tracing::trace!(peer = %peer_addr, "connection reader cancelled");
        }
        Err(e) if e.is_serialization() => {
            metrics.frame_malformed();
            tracing::warn!(
                peer = %peer_addr,
                error = %e,
                "malformed frame, closing connection"
            );
        }
        Err(e) => {
            metrics.error();
            tracing::debug!(peer = %peer_addr, error = %e, "connection error");
        }
    }
}

async fn read_frames(
    stream: &mut TcpStream,
    queue: &BoundedQueue<Event>,
    metrics: &SourceMetrics,
    buffer_size: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut buf = BytesMut::with_capacity(buffer_size);

    loop {
        if buf.len() == buf.capacity() {
            buf.reserve(buffer_size);
        }

        let read = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            read = stream.read_buf(&mut buf) => read?,
        };

        if read == 0 {
            if buf.is_empty() {
                return Ok(());
            }
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("connection closed with {} bytes of a partial frame", buf.len()),
            )
            .into());
        }

        while let Some(payload_len) = peek_frame_len(&buf)? {
            buf.advance(FRAME_HEADER_SIZE);
            let payload = buf.split_to(payload_len).freeze();
            let events = decode_payload(payload)?;
            metrics.frame_received((FRAME_HEADER_SIZE + payload_len) as u64);

            for event in events {
                queue.put(event).await?;
                metrics.event_received();
            }
        }
    }
}

/// Configure socket options (best effort)
fn configure_socket(stream: &TcpStream, config: &TransportSourceConfig) {
    if config.nodelay
        && let Err(e) = stream.set_nodelay(true)
    {
        tracing::debug!(error = %e, "failed to set TCP_NODELAY");
    }

    if config.keepalive {
        let keepalive = TcpKeepalive::new().with_time(config.keepalive_interval);

        #[cfg(target_os = "linux")]
        let keepalive = keepalive.with_interval(config.keepalive_interval);

        if let Err(e) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
            tracing::debug!(error = %e, "failed to set TCP keepalive");
        }
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;
