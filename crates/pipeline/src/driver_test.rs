//! Driver tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tether_protocol::Event;
use tokio::time::timeout;

use crate::driver::{DrainWorker, dump_all, dump_n};
use crate::error::{PipelineError, Result};
use crate::memory::MemorySinkSource;
use crate::queue::BoundedQueue;
use crate::traits::{Sink, Source};

// ============================================================================
// Helper Functions
// ============================================================================

fn events(n: usize) -> Vec<Event> {
    (0..n).map(|i| Event::new(format!("e{i}"))).collect()
}

async fn open_pair(n: usize) -> (MemorySinkSource, MemorySinkSource) {
    let mut source = MemorySinkSource::from_events(events(n));
    let mut sink = MemorySinkSource::with_name("out");
    Source::open(&mut source).await.unwrap();
    Sink::open(&mut sink).await.unwrap();
    (source, sink)
}

/// Live source backed by a queue, like a network listener
struct QueueSource {
    queue: Arc<BoundedQueue<Event>>,
}

#[async_trait]
impl Source for QueueSource {
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<Event>> {
        self.queue.take().await.map(Some)
    }

    async fn close(&mut self) -> Result<()> {
        self.queue.cancel();
        Ok(())
    }

    fn name(&self) -> &str {
        "queue"
    }
}

/// Sink that rejects every event
struct RejectingSink;

#[async_trait]
impl Sink for RejectingSink {
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    async fn append(&mut self, _event: Event) -> Result<()> {
        Err(PipelineError::NotOpen("rejecting".into()))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "rejecting"
    }
}

// ============================================================================
// Inline Copy Tests
// ============================================================================

#[tokio::test]
async fn test_dump_all_copies_everything() {
    let (mut source, mut sink) = open_pair(5).await;

    let count = dump_all(&mut source, &mut sink).await.unwrap();
    assert_eq!(count, 5);
    assert_eq!(sink.events(), events(5).as_slice());
}

#[tokio::test]
async fn test_dump_all_empty_source() {
    let (mut source, mut sink) = open_pair(0).await;

    assert_eq!(dump_all(&mut source, &mut sink).await.unwrap(), 0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_dump_n_stops_at_n() {
    let (mut source, mut sink) = open_pair(10).await;

    assert_eq!(dump_n(&mut source, &mut sink, 4).await.unwrap(), 4);
    assert_eq!(sink.len(), 4);
    assert_eq!(source.remaining(), 6);
}

#[tokio::test]
async fn test_dump_n_short_source() {
    let (mut source, mut sink) = open_pair(3).await;

    assert_eq!(dump_n(&mut source, &mut sink, 10).await.unwrap(), 3);
}

#[tokio::test]
async fn test_dump_all_stops_on_sink_error() {
    let (mut source, _) = open_pair(3).await;
    let mut sink = RejectingSink;

    let err = dump_all(&mut source, &mut sink).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotOpen(_)));
    assert_eq!(source.remaining(), 2);
}

#[tokio::test]
async fn test_dump_all_through_trait_objects() {
    let (source, sink) = open_pair(2).await;
    let mut source: Box<dyn Source> = Box::new(source);
    let mut sink: Box<dyn Sink> = Box::new(sink);

    assert_eq!(dump_all(&mut source, &mut sink).await.unwrap(), 2);
}

// ============================================================================
// Drain Worker Tests
// ============================================================================

#[tokio::test]
async fn test_worker_runs_until_exhausted() {
    let (source, sink) = open_pair(100).await;

    let worker = DrainWorker::spawn(source, sink);
    let drained = timeout(Duration::from_secs(1), worker.join())
        .await
        .unwrap()
        .unwrap();

    assert!(drained.result.is_ok());
    assert_eq!(drained.events, 100);
    assert_eq!(drained.sink.len(), 100);
}

#[tokio::test]
async fn test_worker_stop_on_live_source() {
    let queue = Arc::new(BoundedQueue::new(16));
    let source = QueueSource {
        queue: Arc::clone(&queue),
    };
    let mut sink = MemorySinkSource::new();
    Sink::open(&mut sink).await.unwrap();

    let worker = DrainWorker::spawn(source, sink);
    for event in events(3) {
        queue.put(event).await.unwrap();
    }

    // Wait for the worker to pick everything up before stopping it
    timeout(Duration::from_secs(1), async {
        while !queue.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let drained = worker.stop().await.unwrap();
    assert!(drained.result.is_ok());
    assert_eq!(drained.events, 3);
    assert_eq!(drained.sink.events(), events(3).as_slice());
}

#[tokio::test]
async fn test_worker_treats_source_cancel_as_clean_stop() {
    let queue = Arc::new(BoundedQueue::new(4));
    let source = QueueSource {
        queue: Arc::clone(&queue),
    };
    let mut sink = MemorySinkSource::new();
    Sink::open(&mut sink).await.unwrap();

    let worker = DrainWorker::spawn(source, sink);
    queue.cancel();

    let drained = timeout(Duration::from_secs(1), worker.join())
        .await
        .unwrap()
        .unwrap();
    assert!(drained.result.is_ok());
    assert_eq!(drained.events, 0);
}

#[tokio::test]
async fn test_worker_reports_sink_error() {
    let (source, _) = open_pair(3).await;

    let worker = DrainWorker::spawn(source, RejectingSink);
    let drained = timeout(Duration::from_secs(1), worker.join())
        .await
        .unwrap()
        .unwrap();

    assert!(drained.result.is_err());
    assert_eq!(drained.events, 0);
}
