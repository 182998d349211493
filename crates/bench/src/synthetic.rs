//! Synthetic workload generation
//!
//! Events are generated up front into a [`MemorySinkSource`] so that
//! building them is not part of any measured interval.

use tether_config::BenchConfig;
use tether_pipeline::{MemorySinkSource, Result, Sink};
use tether_protocol::{AttrValue, Event};

/// Shape of a generated workload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    /// Number of events
    pub events: usize,
    /// Body size of each event in bytes
    pub event_size: usize,
    /// Attributes attached to each event
    pub attributes: usize,
}

impl Default for Workload {
    fn default() -> Self {
        Self::from(&BenchConfig::default())
    }
}

impl From<&BenchConfig> for Workload {
    fn from(config: &BenchConfig) -> Self {
        Self {
            events: config.events,
            event_size: config.event_size,
            attributes: config.attributes,
        }
    }
}

impl Workload {
    /// Workload of `events` events with default body size and attributes
    pub fn with_events(events: usize) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// Total body bytes across all events
    pub fn body_bytes(&self) -> u64 {
        (self.events as u64) * (self.event_size as u64)
    }
}

/// Build event `index` of a workload
///
/// The body is printable ASCII cycling through the alphabet starting at an
/// offset derived from `index`, so events are distinguishable and the same
/// index always yields the same event. Attributes rotate through string,
/// int and bool values.
pub fn synthetic_event(index: usize, workload: &Workload) -> Event {
    let body: Vec<u8> = (0..workload.event_size)
        .map(|i| b'a' + ((index + i) % 26) as u8)
        .collect();

    let mut builder = Event::builder(body);
    for k in 0..workload.attributes {
        let value = match k % 3 {
            0 => AttrValue::from(format!("value-{index}")),
            1 => AttrValue::Int(index as i64),
            _ => AttrValue::Bool(index % 2 == 0),
        };
        builder = builder.attribute(format!("attr{k}"), value);
    }
    builder.build()
}

/// Generate a workload into a closed, rewound store ready to be read
///
/// # Errors
///
/// Only fails if the store rejects an append, which a fresh store never does.
pub async fn generate(workload: &Workload) -> Result<MemorySinkSource> {
    let mut store = MemorySinkSource::with_name("synthetic");
    Sink::open(&mut store).await?;
    for index in 0..workload.events {
        store.append(synthetic_event(index, workload)).await?;
    }
    Sink::close(&mut store).await?;
    Ok(store)
}
