//! Named timing marks
//!
//! A [`Benchmark`] records the instant of each named mark since it started.
//! Deltas between consecutive marks break a run into phases (generate,
//! connect, send, drain) without nesting timers.

use std::fmt;
use std::time::{Duration, Instant};

/// One recorded mark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    /// Mark label
    pub label: String,
    /// Time since the benchmark started
    pub at: Duration,
    /// Time since the previous mark (or the start)
    pub delta: Duration,
}

/// Stopwatch with named marks
#[derive(Debug)]
pub struct Benchmark {
    name: String,
    start: Instant,
    marks: Vec<Mark>,
}

impl Benchmark {
    /// Start a benchmark now
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// Benchmark name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a mark and return the time since the previous one
    pub fn mark(&mut self, label: impl Into<String>) -> Duration {
        let at = self.start.elapsed();
        let previous = self.marks.last().map_or(Duration::ZERO, |m| m.at);
        let delta = at.saturating_sub(previous);
        self.marks.push(Mark {
            label: label.into(),
            at,
            delta,
        });
        delta
    }

    /// All marks in recording order
    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Look up a mark by label
    pub fn get(&self, label: &str) -> Option<&Mark> {
        self.marks.iter().find(|m| m.label == label)
    }

    /// Time between two recorded marks, if both exist and are in order
    pub fn between(&self, from: &str, to: &str) -> Option<Duration> {
        let from = self.get(from)?;
        let to = self.get(to)?;
        to.at.checked_sub(from.at)
    }

    /// Time since start
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl fmt::Display for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        for mark in &self.marks {
            write!(f, " {}={:.3}ms", mark.label, mark.delta.as_secs_f64() * 1000.0)?;
        }
        Ok(())
    }
}

/// Throughput in MB/s, computed as bytes per microsecond
///
/// Returns 0.0 for a zero-length interval.
pub fn mb_per_sec(bytes: u64, elapsed: Duration) -> f64 {
    let micros = elapsed.as_micros();
    if micros == 0 {
        return 0.0;
    }
    bytes as f64 / micros as f64
}

/// Events per second, 0.0 for a zero-length interval
pub fn events_per_sec(events: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    events as f64 / secs
}
