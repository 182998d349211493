//! Wire codec - length-prefixed batch frames
//!
//! A batch travels as one frame, or as consecutive frames when it would
//! exceed `MAX_FRAME_SIZE` (see `split_frames`). The 4-byte big-endian length prefix
//! recovers frame boundaries from a byte stream; the payload carries an explicit
//! event count and per-field lengths, so event boundaries are recovered without
//! any out-of-band schema.

use std::collections::btree_map::Entry;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::event::{AttrValue, Attributes, Event};
use crate::{ProtocolError, Result};

/// Length prefix size (4 bytes, big-endian u32)
pub const FRAME_HEADER_SIZE: usize = 4;

/// Maximum payload size (16MB)
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Payload format version written by this encoder
pub const WIRE_VERSION: u8 = 1;

/// Version byte + event count
const PAYLOAD_HEADER_SIZE: usize = 1 + 4;

/// Body length + attribute count, with an empty body and no attributes
const MIN_EVENT_SIZE: usize = 4 + 2;

const TAG_BYTES: u8 = 0;
const TAG_STRING: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_BOOL: u8 = 4;

#[inline]
fn value_size(value: &AttrValue) -> usize {
    match value {
        AttrValue::Bytes(b) => 4 + b.len(),
        AttrValue::String(s) => 4 + s.len(),
        AttrValue::Int(_) | AttrValue::Float(_) => 8,
        AttrValue::Bool(_) => 1,
    }
}

#[inline]
fn event_size(event: &Event) -> usize {
    let attrs: usize = event
        .attributes()
        .iter()
        .map(|(key, value)| 2 + key.len() + 1 + value_size(value))
        .sum();
    MIN_EVENT_SIZE + event.body_len() + attrs
}

#[inline]
fn payload_size(events: &[Event]) -> usize {
    PAYLOAD_HEADER_SIZE + events.iter().map(event_size).sum::<usize>()
}

/// Total bytes `encode_frame` writes for these events, including the prefix
pub fn encoded_frame_len(events: &[Event]) -> usize {
    FRAME_HEADER_SIZE + payload_size(events)
}

/// Split events into consecutive runs that each fit in one frame
///
/// Runs keep the input order and are never empty. Fails before splitting
/// anything if one event cannot fit in a frame by itself.
pub fn split_frames(events: &[Event]) -> Result<Vec<&[Event]>> {
    let max = MAX_FRAME_SIZE as usize;
    let mut runs = Vec::new();
    let mut start = 0;
    let mut payload = PAYLOAD_HEADER_SIZE;

    for (i, event) in events.iter().enumerate() {
        let size = event_size(event);
        if PAYLOAD_HEADER_SIZE + size > max {
            return Err(ProtocolError::frame_too_large(PAYLOAD_HEADER_SIZE + size));
        }
        if payload + size > max {
            runs.push(&events[start..i]);
            start = i;
            payload = PAYLOAD_HEADER_SIZE;
        }
        payload += size;
    }

    if start < events.len() {
        runs.push(&events[start..]);
    }
    Ok(runs)
}

/// Encode events as one frame, appending to `buf`
///
/// Nothing is written when an error is returned.
///
/// Returns the number of bytes written (prefix + payload).
pub fn encode_frame(events: &[Event], buf: &mut BytesMut) -> Result<usize> {
    if events.is_empty() {
        return Err(ProtocolError::EmptyBatch);
    }

    for event in events {
        let count = event.attributes().len();
        if count > u16::MAX as usize {
            return Err(ProtocolError::TooManyAttributes {
                count,
                max: u16::MAX as usize,
            });
        }
        if let Some(key) = event.attributes().keys().find(|k| k.len() > u16::MAX as usize) {
            return Err(ProtocolError::AttributeKeyTooLong {
                len: key.len(),
                max: u16::MAX as usize,
            });
        }
    }

    let payload = payload_size(events);
    if payload > MAX_FRAME_SIZE as usize {
        return Err(ProtocolError::frame_too_large(payload));
    }

    buf.reserve(FRAME_HEADER_SIZE + payload);
    buf.put_u32(payload as u32);
    buf.put_u8(WIRE_VERSION);
    // Bounded by MAX_FRAME_SIZE / MIN_EVENT_SIZE
    buf.put_u32(events.len() as u32);
    for event in events {
        put_event(event, buf);
    }

    Ok(FRAME_HEADER_SIZE + payload)
}

fn put_event(event: &Event, buf: &mut BytesMut) {
    buf.put_u32(event.body_len() as u32);
    buf.put_slice(event.body());
    buf.put_u16(event.attributes().len() as u16);

    for (key, value) in event.attributes() {
        buf.put_u16(key.len() as u16);
        buf.put_slice(key.as_bytes());
        match value {
            AttrValue::Bytes(b) => {
                buf.put_u8(TAG_BYTES);
                buf.put_u32(b.len() as u32);
                buf.put_slice(b);
            }
            AttrValue::String(s) => {
                buf.put_u8(TAG_STRING);
                buf.put_u32(s.len() as u32);
                buf.put_slice(s.as_bytes());
            }
            AttrValue::Int(v) => {
                buf.put_u8(TAG_INT);
                buf.put_i64(*v);
            }
            AttrValue::Float(v) => {
                buf.put_u8(TAG_FLOAT);
                buf.put_f64(*v);
            }
            AttrValue::Bool(v) => {
                buf.put_u8(TAG_BOOL);
                buf.put_u8(u8::from(*v));
            }
        }
    }
}

/// Peek at the next frame's payload length without consuming the buffer
///
/// Returns:
/// - Ok(Some(len)) if a complete frame is available (len excludes the prefix)
/// - Ok(None) if more data is needed
/// - Err if the declared length exceeds `MAX_FRAME_SIZE`
#[inline]
pub fn peek_frame_len(buf: &[u8]) -> Result<Option<usize>> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Ok(None);
    }

    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::frame_too_large(len as usize));
    }

    if buf.len() < FRAME_HEADER_SIZE + len as usize {
        return Ok(None);
    }

    Ok(Some(len as usize))
}

/// Decode a frame payload (prefix already stripped) into events
///
/// Bodies and byte attributes are zero-copy slices of `payload`.
pub fn decode_payload(mut payload: Bytes) -> Result<Vec<Event>> {
    ensure(&payload, PAYLOAD_HEADER_SIZE)?;

    let version = payload.get_u8();
    if version != WIRE_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let count = payload.get_u32() as usize;
    if count == 0 {
        return Err(ProtocolError::EmptyBatch);
    }

    // Never trust the declared count for allocation
    let mut events = Vec::with_capacity(count.min(payload.remaining() / MIN_EVENT_SIZE));
    for _ in 0..count {
        events.push(get_event(&mut payload)?);
    }

    if payload.has_remaining() {
        return Err(ProtocolError::TrailingBytes(payload.remaining()));
    }

    Ok(events)
}

#[inline]
fn ensure(buf: &Bytes, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(ProtocolError::truncated(needed, buf.remaining()));
    }
    Ok(())
}

fn get_event(buf: &mut Bytes) -> Result<Event> {
    ensure(buf, 4)?;
    let body_len = buf.get_u32() as usize;
    ensure(buf, body_len)?;
    let body = buf.copy_to_bytes(body_len);

    ensure(buf, 2)?;
    let attr_count = buf.get_u16();

    let mut attributes = Attributes::new();
    for _ in 0..attr_count {
        ensure(buf, 2)?;
        let key_len = buf.get_u16() as usize;
        let key = get_string(buf, key_len, "attribute key")?;
        let value = get_value(buf)?;

        match attributes.entry(key) {
            Entry::Occupied(entry) => {
                return Err(ProtocolError::DuplicateAttribute(entry.key().clone()));
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
    }

    Ok(Event::with_attributes(body, attributes))
}

fn get_value(buf: &mut Bytes) -> Result<AttrValue> {
    ensure(buf, 1)?;
    let tag = buf.get_u8();

    let value = match tag {
        TAG_BYTES => {
            ensure(buf, 4)?;
            let len = buf.get_u32() as usize;
            ensure(buf, len)?;
            AttrValue::Bytes(buf.copy_to_bytes(len))
        }
        TAG_STRING => {
            ensure(buf, 4)?;
            let len = buf.get_u32() as usize;
            AttrValue::String(get_string(buf, len, "attribute value")?)
        }
        TAG_INT => {
            ensure(buf, 8)?;
            AttrValue::Int(buf.get_i64())
        }
        TAG_FLOAT => {
            ensure(buf, 8)?;
            AttrValue::Float(buf.get_f64())
        }
        TAG_BOOL => {
            ensure(buf, 1)?;
            AttrValue::Bool(buf.get_u8() != 0)
        }
        other => return Err(ProtocolError::UnknownAttrTag(other)),
    };

    Ok(value)
}

fn get_string(buf: &mut Bytes, len: usize, field: &'static str) -> Result<String> {
    ensure(buf, len)?;
    let raw = buf.copy_to_bytes(len);
    std::str::from_utf8(&raw)
        .map(str::to_owned)
        .map_err(|_| ProtocolError::InvalidUtf8(field))
}
