//! Tether Configuration
//!
//! TOML-based configuration with sensible defaults. Every section and every
//! key is optional; an empty file is a valid config.
//!
//! # Parsing
//!
//! ```
//! use tether_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[batch]\nmax_count = 50").unwrap();
//! assert_eq!(config.batch.max_count, 50);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [source]
//! address = "127.0.0.1"
//! port = 35853
//! queue_capacity = 1000
//!
//! [sink]
//! host = "127.0.0.1"
//! port = 35853
//! connect_timeout = "10s"
//!
//! [batch]
//! max_count = 100
//! max_latency = "10s"
//!
//! [bench]
//! events = 100000
//! event_size = 100
//! ```
//!
//! See `configs/bench.toml` for every option.

mod bench;
mod error;
mod logging;
mod transport;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use bench::{BatchConfig, BenchConfig};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use transport::{DEFAULT_PORT, SinkConfig, SourceConfig};

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Listening end of the transport
    pub source: SourceConfig,

    /// Connecting end of the transport
    pub sink: SinkConfig,

    /// Batching thresholds in front of the sink
    pub batch: BatchConfig,

    /// Synthetic workload
    pub bench: BenchConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work at runtime
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.source.port, DEFAULT_PORT);
        assert_eq!(config.sink.port, DEFAULT_PORT);
        assert_eq!(config.batch.max_count, 100);
        assert_eq!(config.bench.events, 100_000);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[source]
address = "127.0.0.1"
port = 0
queue_capacity = 16

[sink]
host = "127.0.0.1"
port = 4000
write_timeout = "1s"

[batch]
max_count = 10
max_latency = "250ms"

[bench]
events = 5000
event_size = 64
attributes = 0
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.source.bind_address(), "127.0.0.1:0");
        assert_eq!(config.source.queue_capacity, 16);
        assert_eq!(config.sink.address(), "127.0.0.1:4000");
        assert_eq!(config.sink.write_timeout, Duration::from_secs(1));
        assert_eq!(config.batch.max_latency, Duration::from_millis(250));
        assert_eq!(config.bench.attributes, 0);
    }

    #[test]
    fn test_shipped_bench_config_parses() {
        let config = Config::from_str(include_str!("../../../configs/bench.toml")).unwrap();
        assert_eq!(config.source.port, 0);
        assert_eq!(config.sink.keepalive_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_str("[source\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = Config::from_str("[source]\nport = \"high\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bench]\nevents = 42").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bench.events, 42);
    }

    #[test]
    fn test_from_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[batch]\nmax_count = 0").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Config::from_file(&path).unwrap_err();
        match err {
            ConfigError::IoError { path: p, .. } => assert!(p.ends_with("absent.toml")),
            other => panic!("expected IoError, got {other}"),
        }
    }
}
