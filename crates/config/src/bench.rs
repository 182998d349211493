//! Batching and benchmark configuration

use serde::Deserialize;
use std::time::Duration;

/// `[batch]` section
///
/// Thresholds for the batching decorator in front of the transport sink.
/// Whichever trips first flushes the batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Events per batch
    /// Default: 100
    pub max_count: usize,

    /// Oldest pending event age before a flush
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub max_latency: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_count: 100,
            max_latency: Duration::from_secs(10),
        }
    }
}

/// `[bench]` section
///
/// # Example
///
/// ```toml
/// [bench]
/// events = 1000000
/// event_size = 512
/// attributes = 4
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Synthetic events generated per scenario
    /// Default: 100000
    pub events: usize,

    /// Body size of each synthetic event (bytes)
    /// Default: 100
    pub event_size: usize,

    /// Attributes attached to each synthetic event
    /// Default: 2
    pub attributes: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            events: 100_000,
            event_size: 100,
            attributes: 2,
        }
    }
}
