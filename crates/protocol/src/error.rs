//! Protocol error types
//!
//! Errors that can occur when encoding or decoding batch frames.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame ended before a field could be read
    #[error("truncated frame: needed {needed} more bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// Frame length exceeds the maximum frame size
    #[error("frame size {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Payload was written by an incompatible encoder
    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    /// Batches always carry at least one event
    #[error("empty batch")]
    EmptyBatch,

    /// Attribute value tag is not known
    #[error("unknown attribute tag: {0}")]
    UnknownAttrTag(u8),

    /// String field is not valid UTF-8
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Attribute key appears twice in one event
    #[error("duplicate attribute key: {0}")]
    DuplicateAttribute(String),

    /// Attribute key does not fit the 16-bit length field
    #[error("attribute key too long: {len} bytes (max {max})")]
    AttributeKeyTooLong { len: usize, max: usize },

    /// Attribute map does not fit the 16-bit count field
    #[error("too many attributes: {count} (max {max})")]
    TooManyAttributes { count: usize, max: usize },

    /// Bytes left over after the declared events were read
    #[error("{0} trailing bytes after last event")]
    TrailingBytes(usize),
}

impl ProtocolError {
    /// Create a truncated frame error
    #[inline]
    pub fn truncated(needed: usize, remaining: usize) -> Self {
        Self::Truncated { needed, remaining }
    }

    /// Create a frame too large error
    #[inline]
    pub fn frame_too_large(size: usize) -> Self {
        Self::FrameTooLarge {
            size,
            max: crate::MAX_FRAME_SIZE as usize,
        }
    }

    /// Check if the input was well formed but refused
    ///
    /// These are count and length limits, raised before anything is written
    /// and without touching the frame boundaries of a stream. Every other
    /// error means the bytes themselves are bad.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyBatch | Self::AttributeKeyTooLong { .. } | Self::TooManyAttributes { .. }
        )
    }
}
