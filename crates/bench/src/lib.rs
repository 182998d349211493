//! Throughput harness for the tether transport
//!
//! Generates a synthetic workload, pushes it through a transport sink into a
//! transport source on this host, and reports per-phase timings with MB/s
//! computed as bytes per microsecond.
//!
//! The `tether-bench` binary wraps [`scenarios::run`]; the end-to-end tests
//! in `tests/` drive the same components directly.

pub mod benchmark;
pub mod scenarios;
pub mod settings;
pub mod synthetic;

pub use benchmark::{Benchmark, Mark, events_per_sec, mb_per_sec};
pub use scenarios::{Scenario, ScenarioReport, run};
pub use synthetic::{Workload, generate, synthetic_event};
