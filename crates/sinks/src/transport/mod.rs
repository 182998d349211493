//! Transport sink - framed events over TCP
//!
//! Sends events to a `TransportSource` (tether-sources) on a remote host. Each `append`
//! becomes one frame holding a single event; each `append_batch` becomes
//! one frame holding the whole batch, or several consecutive frames when the
//! batch would exceed `MAX_FRAME_SIZE`. Only an event too large for a frame of
//! its own is refused.
//!
//! # Protocol
//!
//! ```text
//! [4 bytes: payload length (big-endian)][payload: version, count, events]
//! ```
//!
//! # Connection states
//!
//! ```text
//! Closed ──open()──→ Open ──write error / timeout──→ Faulted
//!    ↑                 │                               │
//!    └─────close()─────┴───────────close()─────────────┘
//! ```
//!
//! A faulted sink rejects further writes until it is closed and opened
//! again; no frame is ever partially retried.

use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use socket2::{SockRef, TcpKeepalive};
use tether_pipeline::{PipelineError, Result, Sink};
use tether_protocol::{Batch, Event, encode_frame, split_frames};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::common::{SinkMetrics, SinkMetricsHandle};

/// Default port shared with the transport source
pub const DEFAULT_PORT: u16 = 35853;

/// Initial capacity of the reusable frame buffer
const FRAME_BUFFER_CAPACITY: usize = 64 * 1024;

/// Configuration for transport sink
#[derive(Debug, Clone)]
pub struct TransportSinkConfig {
    /// Remote host name or address
    pub host: String,

    /// Remote port
    pub port: u16,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Timeout for writing and flushing one frame
    pub write_timeout: Duration,

    /// Disable Nagle's algorithm
    pub nodelay: bool,

    /// TCP keep-alive enabled
    pub keepalive: bool,

    /// TCP keep-alive interval (only used if keepalive is true)
    pub keepalive_interval: Duration,
}

impl Default for TransportSinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            nodelay: true,
            keepalive: true,
            keepalive_interval: Duration::from_secs(30),
        }
    }
}

impl TransportSinkConfig {
    /// Create config for a host and port with default timeouts
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set connection timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set write timeout
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enable or disable TCP_NODELAY
    #[must_use]
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Enable or disable TCP keep-alive
    #[must_use]
    pub fn with_keepalive(mut self, enabled: bool) -> Self {
        self.keepalive = enabled;
        self
    }

    /// Target as `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

enum Connection {
    Closed,
    Open(TcpStream),
    Faulted,
}

impl Connection {
    fn label(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open(_) => "open",
            Self::Faulted => "faulted",
        }
    }
}

/// Sink that frames events onto a TCP connection
pub struct TransportSink {
    config: TransportSinkConfig,
    name: String,
    connection: Connection,
    /// Reused across writes; holds exactly one frame while sending
    buffer: BytesMut,
    metrics: Arc<SinkMetrics>,
}

impl std::fmt::Debug for TransportSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSink")
            .field("name", &self.name)
            .field("target", &self.config.address())
            .field("state", &self.connection.label())
            .finish()
    }
}

impl TransportSink {
    /// Create a new transport sink
    pub fn new(config: TransportSinkConfig) -> Self {
        Self::with_name(config, "transport")
    }

    /// Create a new transport sink with a custom name
    pub fn with_name(config: TransportSinkConfig, name: impl Into<String>) -> Self {
        Self {
            config,
            name: name.into(),
            connection: Connection::Closed,
            buffer: BytesMut::with_capacity(FRAME_BUFFER_CAPACITY),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &TransportSinkConfig {
        &self.config
    }

    /// Total bytes written, counting the payload and its 4-byte prefix
    ///
    /// Only frames that were fully written and flushed are counted.
    pub fn sent_bytes(&self) -> u64 {
        self.metrics.bytes_written()
    }

    /// Get a metrics handle that stays valid after the sink is moved
    pub fn metrics_handle(&self) -> SinkMetricsHandle {
        SinkMetricsHandle::new(self.name.clone(), Arc::clone(&self.metrics))
    }

    /// Check if the sink holds a healthy connection
    pub fn is_open(&self) -> bool {
        matches!(self.connection, Connection::Open(_))
    }

    /// Check if a previous write failed
    pub fn is_faulted(&self) -> bool {
        matches!(self.connection, Connection::Faulted)
    }

    /// Connect to the target with timeout and apply socket options
    async fn connect(&self) -> Result<TcpStream> {
        let address = self.config.address();

        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(&address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(PipelineError::connect(address, e)),
            Err(_) => {
                return Err(PipelineError::connect(
                    address,
                    io::Error::new(ErrorKind::TimedOut, "connection timed out"),
                ));
            }
        };

        // Socket options are best effort
        if let Err(e) = stream.set_nodelay(self.config.nodelay) {
            tracing::debug!(
                sink = %self.name,
                error = %e,
                "failed to set TCP_NODELAY, continuing with default buffering"
            );
        }

        if self.config.keepalive {
            let sock_ref = SockRef::from(&stream);
            let keepalive = TcpKeepalive::new().with_time(self.config.keepalive_interval);

            #[cfg(target_os = "linux")]
            let keepalive = keepalive.with_interval(self.config.keepalive_interval);

            if let Err(e) = sock_ref.set_tcp_keepalive(&keepalive) {
                tracing::debug!(
                    sink = %self.name,
                    error = %e,
                    "failed to set TCP keep-alive, continuing without keep-alive"
                );
            }
        }

        Ok(stream)
    }

    /// Encode `events` and write them, one frame per run that fits
    async fn send(&mut self, events: &[Event]) -> Result<()> {
        let stream = match &mut self.connection {
            Connection::Open(stream) => stream,
            Connection::Closed => {
                return Err(io::Error::new(ErrorKind::NotConnected, "transport sink is closed").into());
            }
            Connection::Faulted => {
                return Err(io::Error::new(
                    ErrorKind::BrokenPipe,
                    "transport sink faulted on an earlier write",
                )
                .into());
            }
        };

        // Encoding failures leave the connection untouched
        self.buffer.clear();
        let mut frame_len = 0;
        for run in split_frames(events)? {
            frame_len += encode_frame(run, &mut self.buffer)?;
        }

        let buffer = &self.buffer;
        let written = timeout(self.config.write_timeout, async {
            stream.write_all(buffer).await?;
            stream.flush().await
        })
        .await;

        let error = match written {
            Ok(Ok(())) => {
                self.metrics
                    .record_write(events.len() as u64, frame_len as u64);
                return Ok(());
            }
            Ok(Err(e)) => e,
            Err(_) => io::Error::new(ErrorKind::TimedOut, "write timed out"),
        };

        // The peer may hold part of the frame; the stream is unusable now
        self.connection = Connection::Faulted;
        self.metrics.record_error();
        tracing::warn!(
            sink = %self.name,
            target = %self.config.address(),
            error = %error,
            "transport write failed, connection faulted"
        );
        Err(error.into())
    }
}

#[async_trait]
impl Sink for TransportSink {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(PipelineError::AlreadyOpen(self.name.clone()));
        }

        let stream = self.connect().await?;
        tracing::debug!(
            sink = %self.name,
            target = %self.config.address(),
            "connected to target"
        );
        self.connection = Connection::Open(stream);
        Ok(())
    }

    async fn append(&mut self, event: Event) -> Result<()> {
        self.send(std::slice::from_ref(&event)).await
    }

    async fn append_batch(&mut self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.send(batch.events()).await
    }

    async fn close(&mut self) -> Result<()> {
        let Connection::Open(mut stream) = std::mem::replace(&mut self.connection, Connection::Closed)
        else {
            return Ok(());
        };

        let shutdown = stream.shutdown().await;

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            sink = %self.name,
            target = %self.config.address(),
            frames = snapshot.writes,
            events = snapshot.events_written,
            bytes = snapshot.bytes_written,
            errors = snapshot.write_errors,
            "transport sink closed"
        );

        // Everything was flushed per frame; a failed FIN is not a delivery failure
        if let Err(e) = shutdown {
            tracing::debug!(sink = %self.name, error = %e, "socket shutdown failed");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;
