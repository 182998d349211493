//! Pipeline error types
//!
//! One taxonomy shared by every source and sink: I/O failures, cancelled
//! waits, wire format violations and lifecycle misuse.

use std::io;

use thiserror::Error;

use tether_protocol::ProtocolError;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Read, write or flush failure on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Listener could not bind its address
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Outbound connection could not be established
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// A blocking wait was interrupted by cancellation or close
    #[error("operation cancelled")]
    Cancelled,

    /// Malformed bytes on the wire, or an event that cannot be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] ProtocolError),

    /// `open` called on a component that is already open
    #[error("{0} is already open")]
    AlreadyOpen(String),

    /// Operation requires an open component
    #[error("{0} is not open")]
    NotOpen(String),

    /// A flush failed and the events it carried were not delivered
    #[error("failed to flush {count} events: {source}")]
    Unflushed {
        count: usize,
        #[source]
        source: Box<PipelineError>,
    },

    /// Background task panicked or was aborted
    #[error("worker failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Create a bind error
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Create a connect error
    pub fn connect(address: impl Into<String>, source: io::Error) -> Self {
        Self::Connect {
            address: address.into(),
            source,
        }
    }

    /// Wrap the failure of a flush carrying `count` events
    pub fn unflushed(count: usize, source: PipelineError) -> Self {
        Self::Unflushed {
            count,
            source: Box::new(source),
        }
    }

    /// Check if this error came from a cancelled wait
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this is an I/O class error (including bind and connect)
    ///
    /// Flush failures report the class of their cause.
    pub fn is_io(&self) -> bool {
        match self {
            Self::Io(_) | Self::Bind { .. } | Self::Connect { .. } => true,
            Self::Unflushed { source, .. } => source.is_io(),
            _ => false,
        }
    }

    /// Check if this error is a wire format violation
    pub fn is_serialization(&self) -> bool {
        match self {
            Self::Serialization(_) => true,
            Self::Unflushed { source, .. } => source.is_serialization(),
            _ => false,
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::bind(
            "127.0.0.1:35853",
            io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        );
        assert!(err.to_string().contains("127.0.0.1:35853"));

        let err = PipelineError::connect(
            "localhost:1",
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert!(err.to_string().contains("localhost:1"));

        let err = PipelineError::AlreadyOpen("transport source".into());
        assert!(err.to_string().contains("already open"));

        let err = PipelineError::unflushed(7, PipelineError::Cancelled);
        assert!(err.to_string().contains("7 events"));
    }

    #[test]
    fn test_error_classes() {
        let io_err = PipelineError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(io_err.is_io());
        assert!(!io_err.is_cancelled());

        assert!(PipelineError::Cancelled.is_cancelled());
        assert!(!PipelineError::Cancelled.is_io());

        let ser = PipelineError::from(ProtocolError::EmptyBatch);
        assert!(ser.is_serialization());
        assert!(!ser.is_io());

        let wrapped = PipelineError::unflushed(3, io_err);
        assert!(wrapped.is_io());
        assert!(!wrapped.is_serialization());
    }
}
