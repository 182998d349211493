//! Benchmark scenarios
//!
//! Every scenario pushes a pre-generated workload through a `TransportSink`
//! into a `TransportSource` on this host. A background task drains the
//! source into a `NullSink` and stops once it has seen every event, so the
//! run ends only when the last event has crossed the wire.
//!
//! # Scenarios
//!
//! - `send`: one frame per event
//! - `batch`: events grouped by a `BatchingSink` before framing
//! - `send-multi`: the sink is opened from a separate task and handed back

use std::fmt;
use std::time::Duration;

use tether_config::Config;
use tether_pipeline::{
    BatchingSink, BatchingSnapshot, MemorySinkSource, PipelineError, Result, Sink, Source,
    dump_all, dump_n,
};
use tether_sinks::SinkMetricsHandle;
use tether_sinks::null::NullSink;
use tether_sinks::transport::{TransportSink, TransportSinkConfig};
use tether_sources::TransportSource;

use crate::benchmark::{Benchmark, events_per_sec, mb_per_sec};
use crate::settings::{batching_config, transport_sink_config, transport_source_config};
use crate::synthetic::{Workload, generate};

/// Which path events take to the transport sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Append events one at a time
    Send,
    /// Batch events; `None` uses the configured batch size
    Batch {
        /// Events per batch
        size: Option<usize>,
    },
    /// Open the sink from a spawned task before sending
    SendMulti,
}

impl Scenario {
    /// Every scenario, in report order
    pub fn all(batch_size: Option<usize>) -> [Scenario; 3] {
        [
            Scenario::Send,
            Scenario::Batch { size: batch_size },
            Scenario::SendMulti,
        ]
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::Send => f.write_str("send"),
            Scenario::Batch { size: Some(size) } => write!(f, "batch({size})"),
            Scenario::Batch { size: None } => f.write_str("batch"),
            Scenario::SendMulti => f.write_str("send-multi"),
        }
    }
}

/// Outcome of one scenario run
#[derive(Debug)]
pub struct ScenarioReport {
    /// Scenario that ran
    pub scenario: Scenario,
    /// Events handed to the sink
    pub events_sent: u64,
    /// Events the drain pulled from the source
    pub events_received: u64,
    /// Wire bytes written by the transport sink, framing included
    pub bytes_sent: u64,
    /// Wire bytes read by the transport source, framing included
    pub bytes_received: u64,
    /// Frames read by the transport source
    pub frames_received: u64,
    /// Flush counters, for batched scenarios
    pub flushes: Option<BatchingSnapshot>,
    /// Phase marks: generate, connect, send, drain
    pub benchmark: Benchmark,
}

impl ScenarioReport {
    /// Interval from the end of generation to the last event drained
    pub fn transfer_time(&self) -> Duration {
        self.benchmark
            .between("generate", "drain")
            .unwrap_or_else(|| self.benchmark.elapsed())
    }

    /// Sink throughput in MB/s
    pub fn mb_per_sec(&self) -> f64 {
        mb_per_sec(self.bytes_sent, self.transfer_time())
    }

    /// Events per second end to end
    pub fn events_per_sec(&self) -> f64 {
        events_per_sec(self.events_received, self.transfer_time())
    }

    /// Check that every event sent was received and byte counts agree
    pub fn is_complete(&self) -> bool {
        self.events_sent == self.events_received && self.bytes_sent == self.bytes_received
    }
}

/// Sink-side result of a run
struct Sent {
    events: u64,
    metrics: SinkMetricsHandle,
    flushes: Option<BatchingSnapshot>,
}

/// Run one scenario against a source on this host
///
/// The source binds `[source]`; the sink dials `[sink] host` on whatever
/// port the source actually bound.
///
/// # Errors
///
/// Returns the first sink-side error, then any drain or close error. A
/// failed send cancels the drain so the run never hangs waiting for events
/// that will not arrive.
pub async fn run(scenario: Scenario, config: &Config) -> Result<ScenarioReport> {
    let workload = Workload::from(&config.bench);
    let mut bench = Benchmark::start(scenario.to_string());

    let mut events = generate(&workload).await?;
    Source::open(&mut events).await?;
    bench.mark("generate");

    let mut source = TransportSource::with_name(
        transport_source_config(&config.source),
        format!("{scenario}-source"),
    );
    source.open().await?;
    let port = source.local_addr().map_or(config.source.port, |addr| addr.port());
    let source_metrics = source.metrics_handle();
    let cancel = source.cancel_handle();

    let expected = workload.events as u64;
    let drain = tokio::spawn(drain(source, expected));

    let sink_config = transport_sink_config(&config.sink, port);
    let sent = send(scenario, sink_config, config, &mut events, &mut bench).await;
    if sent.is_err() {
        cancel.cancel();
    }

    let (mut source, drained) = drain
        .await
        .map_err(|e| PipelineError::Worker(e.to_string()))?;
    bench.mark("drain");
    let closed = source.close().await;

    let sent = sent?;
    let received = drained?;
    closed?;

    let source_snapshot = source_metrics.snapshot();
    let sink_snapshot = sent.metrics.snapshot();

    tracing::debug!(
        scenario = %scenario,
        events = received,
        bytes = sink_snapshot.bytes_written,
        timings = %bench,
        "scenario finished"
    );

    Ok(ScenarioReport {
        scenario,
        events_sent: sent.events,
        events_received: received,
        bytes_sent: sink_snapshot.bytes_written,
        bytes_received: source_snapshot.bytes_received,
        frames_received: source_snapshot.frames_received,
        flushes: sent.flushes,
        benchmark: bench,
    })
}

async fn send(
    scenario: Scenario,
    sink_config: TransportSinkConfig,
    config: &Config,
    events: &mut MemorySinkSource,
    bench: &mut Benchmark,
) -> Result<Sent> {
    match scenario {
        Scenario::Send => {
            let mut sink = TransportSink::new(sink_config);
            let metrics = sink.metrics_handle();
            sink.open().await?;
            bench.mark("connect");

            let events = pump(events, &mut sink).await?;
            bench.mark("send");
            Ok(Sent {
                events,
                metrics,
                flushes: None,
            })
        }
        Scenario::Batch { size } => {
            let transport = TransportSink::new(sink_config);
            let metrics = transport.metrics_handle();
            let mut sink = BatchingSink::new(transport, batching_config(&config.batch, size));
            let flushes = sink.metrics_handle();
            sink.open().await?;
            bench.mark("connect");

            let events = pump(events, &mut sink).await?;
            bench.mark("send");
            Ok(Sent {
                events,
                metrics,
                flushes: Some(flushes.snapshot()),
            })
        }
        Scenario::SendMulti => {
            let opener = tokio::spawn(async move {
                let mut sink = TransportSink::with_name(sink_config, "send-multi");
                sink.open().await.map(|()| sink)
            });
            let mut sink = opener
                .await
                .map_err(|e| PipelineError::Worker(e.to_string()))??;
            let metrics = sink.metrics_handle();
            bench.mark("connect");

            let events = pump(events, &mut sink).await?;
            bench.mark("send");
            Ok(Sent {
                events,
                metrics,
                flushes: None,
            })
        }
    }
}

/// Copy every event into `sink`, then close it
///
/// The sink is closed even if copying fails, and the copy error wins.
async fn pump<K: Sink + ?Sized>(events: &mut MemorySinkSource, sink: &mut K) -> Result<u64> {
    let copied = dump_all(events, sink).await;
    let closed = sink.close().await;
    let copied = copied?;
    closed?;
    Ok(copied)
}

/// Pull `expected` events from `source` into a null sink
async fn drain(mut source: TransportSource, expected: u64) -> (TransportSource, Result<u64>) {
    let mut null = NullSink::with_name("drain");
    let result: Result<u64> = async {
        null.open().await?;
        let drained = dump_n(&mut source, &mut null, expected).await?;
        null.close().await?;
        Ok(drained)
    }
    .await;
    (source, result)
}
