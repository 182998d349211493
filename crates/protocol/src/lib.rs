//! Tether Protocol - Event model and wire format
//!
//! This crate provides the types that flow through every pipeline stage:
//! - `Event` - Immutable body + typed attribute map
//! - `AttrValue` - Typed attribute value (bytes, string, int, float, bool)
//! - `Batch` - Ordered group of events flushed together
//! - Wire codec - Length-prefixed, self-describing batch frames
//!
//! # Design Principles
//!
//! - **Immutable events**: Fields are private; bodies are `bytes::Bytes` and
//!   attribute maps are behind an `Arc`, so cloning an event never copies data
//! - **Zero-copy decode**: Decoded bodies are slices of the received frame
//! - **Lossless**: Decoding an encoded batch yields events equal in body and
//!   attributes, in the same order
//!
//! # Wire Format
//!
//! ```text
//! frame:   [u32 BE payload length][payload]
//! payload: [u8 version][u32 BE event count][event]*
//! event:   [u32 BE body length][body][u16 BE attribute count][attribute]*
//! attr:    [u16 BE key length][key utf-8][u8 tag][value]
//! ```

mod batch;
mod codec;
mod error;
mod event;

pub use batch::Batch;
pub use codec::{
    FRAME_HEADER_SIZE, MAX_FRAME_SIZE, WIRE_VERSION, decode_payload, encode_frame,
    encoded_frame_len, peek_frame_len, split_frames,
};
pub use error::ProtocolError;
pub use event::{AttrValue, Attributes, Event, EventBuilder};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod event_test;
