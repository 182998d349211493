//! Logging configuration
//!
//! Controls how tether binaries report their own lifecycle: which level is
//! emitted, whether lines are human-readable or JSON, and where they go.

use serde::Deserialize;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-frame and per-event tracing
    Trace,
    /// Connection and socket details
    Debug,
    /// Open, close and listener lifecycle (default)
    #[default]
    Info,
    /// Dropped events and failed flushes
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// Where log lines are written
///
/// Benchmark reports go to stdout, so stderr keeps the two apart when
/// output is piped.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard error (default)
    #[default]
    Stderr,
    /// Standard output
    Stdout,
}

/// `[log]` section
///
/// # Example
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// output = "stdout"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level filter; the CLI `--log-level` flag takes precedence
    pub level: LogLevel,

    /// Line format
    pub format: LogFormat,

    /// Destination stream
    pub output: LogOutput,
}
