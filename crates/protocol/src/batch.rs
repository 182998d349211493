//! Batch - Ordered group of events flushed together
//!
//! A `Batch` exists only between accumulation and flush (sender side) or
//! between decode and enqueue (receiver side). It preserves producer order.

use bytes::{Bytes, BytesMut};

use crate::Result;
use crate::codec::{decode_payload, encode_frame, encoded_frame_len};
use crate::event::Event;

/// Ordered sequence of events
///
/// # Example
///
/// ```
/// use tether_protocol::{Batch, Event};
///
/// let mut batch = Batch::with_capacity(2);
/// batch.push(Event::new("first"));
/// batch.push(Event::new("second"));
///
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch.events()[0].body().as_ref(), b"first");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    events: Vec<Event>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Create an empty batch with room for `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    /// Append an event at the end
    #[inline]
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Number of events
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if batch is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in producer order
    #[inline]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Iterate over events in producer order
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Consume the batch and return its events
    #[inline]
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Take all events out, leaving the batch empty and unallocated
    pub fn take(&mut self) -> Batch {
        Batch {
            events: std::mem::take(&mut self.events),
        }
    }

    /// Sum of all body lengths
    pub fn body_bytes(&self) -> usize {
        self.events.iter().map(Event::body_len).sum()
    }

    /// Size of this batch on the wire, including the length prefix
    pub fn encoded_len(&self) -> usize {
        encoded_frame_len(&self.events)
    }

    /// Encode as one frame, appending to `buf`
    ///
    /// Returns the number of bytes written.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<usize> {
        encode_frame(&self.events, buf)
    }

    /// Decode a frame payload (without its length prefix)
    pub fn decode(payload: Bytes) -> Result<Self> {
        decode_payload(payload).map(Self::from)
    }
}

impl From<Vec<Event>> for Batch {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl FromIterator<Event> for Batch {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Batch {
    type Item = Event;
    type IntoIter = std::vec::IntoIter<Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
