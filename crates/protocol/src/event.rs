//! Event - Immutable unit of data moving through the pipeline
//!
//! An `Event` is a body plus a map of typed attributes. Both are fixed at
//! construction: the body is reference-counted `Bytes` and the attribute map
//! sits behind an `Arc`, so every stage can hold a clone without copying.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// Attribute map keyed by unique string keys
pub type Attributes = BTreeMap<String, AttrValue>;

/// Typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Opaque bytes
    Bytes(Bytes),
    /// UTF-8 string
    String(String),
    /// Signed 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Boolean flag
    Bool(bool),
}

impl AttrValue {
    /// Name of the value type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
        }
    }

    /// Get the value as a byte slice (bytes and strings)
    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Get the value as a string slice
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a float
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a boolean
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::String(s) => write!(f, "{s}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Bytes> for AttrValue {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(b))
    }
}

/// Immutable event: body bytes plus typed attributes
///
/// # Example
///
/// ```
/// use tether_protocol::Event;
///
/// let event = Event::builder("GET /index.html 200")
///     .attribute("host", "web-01")
///     .attribute("latency_us", 420_i64)
///     .build();
///
/// assert_eq!(event.body().as_ref(), b"GET /index.html 200");
/// assert_eq!(event.attribute("latency_us").and_then(|v| v.as_int()), Some(420));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    body: Bytes,
    attributes: Arc<Attributes>,
}

impl Event {
    /// Create an event with no attributes
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            attributes: Arc::new(Attributes::new()),
        }
    }

    /// Create an event from a body and a finished attribute map
    pub fn with_attributes(body: impl Into<Bytes>, attributes: Attributes) -> Self {
        Self {
            body: body.into(),
            attributes: Arc::new(attributes),
        }
    }

    /// Start building an event with the given body
    pub fn builder(body: impl Into<Bytes>) -> EventBuilder {
        EventBuilder {
            body: body.into(),
            attributes: Attributes::new(),
        }
    }

    /// Get the event body
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get all attributes
    #[inline]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Look up a single attribute
    #[inline]
    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Body length in bytes
    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

/// Builder for events with attributes
///
/// Setting the same key twice keeps the last value, so keys stay unique.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    body: Bytes,
    attributes: Attributes,
}

impl EventBuilder {
    /// Set an attribute
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Finish the event
    pub fn build(self) -> Event {
        Event::with_attributes(self.body, self.attributes)
    }
}
