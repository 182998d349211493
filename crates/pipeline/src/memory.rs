//! In-memory sink and source
//!
//! A [`MemorySinkSource`] collects every appended event and can then be
//! read back as a finite [`Source`]. Benchmarks use it to pre-generate a
//! workload so that generation cost stays out of the measurement; tests use
//! it as a sink whose contents can be inspected after the fact.

use async_trait::async_trait;

use tether_protocol::Event;

use crate::error::{PipelineError, Result};
use crate::traits::{Sink, Source};

/// Event list that is both a sink and a finite source
///
/// The same open flag serves both roles. Closing does not discard stored
/// events, and a closed instance may be opened again, for example to replay
/// its contents after [`rewind`](Self::rewind).
#[derive(Debug, Clone)]
pub struct MemorySinkSource {
    name: String,
    events: Vec<Event>,
    cursor: usize,
    open: bool,
}

impl Default for MemorySinkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySinkSource {
    /// Create an empty instance
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    /// Create an empty instance with a custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
            cursor: 0,
            open: false,
        }
    }

    /// Create an instance pre-filled with `events`
    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            events,
            ..Self::new()
        }
    }

    /// Stored events in append order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Consume and return the stored events
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Number of stored events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events not yet returned by `next`
    pub fn remaining(&self) -> usize {
        self.events.len() - self.cursor
    }

    /// Restart reading from the first event
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn open_once(&mut self) -> Result<()> {
        if self.open {
            return Err(PipelineError::AlreadyOpen(self.name.clone()));
        }
        self.open = true;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(PipelineError::NotOpen(self.name.clone()))
        }
    }
}

#[async_trait]
impl Sink for MemorySinkSource {
    async fn open(&mut self) -> Result<()> {
        self.open_once()
    }

    async fn append(&mut self, event: Event) -> Result<()> {
        self.ensure_open()?;
        self.events.push(event);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Source for MemorySinkSource {
    async fn open(&mut self) -> Result<()> {
        self.open_once()
    }

    async fn next(&mut self) -> Result<Option<Event>> {
        self.ensure_open()?;
        let event = self.events.get(self.cursor).cloned();
        if event.is_some() {
            self.cursor += 1;
        }
        Ok(event)
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
