//! Transport configuration
//!
//! The `[source]` section describes the listening end and `[sink]` the
//! connecting end. Both default to the same port so a bare config wires a
//! sink on this host to a source on this host.

use serde::Deserialize;
use std::time::Duration;

/// Port used by both ends when none is configured
pub const DEFAULT_PORT: u16 = 35853;

/// `[source]` section
///
/// # Example
///
/// ```toml
/// [source]
/// address = "127.0.0.1"
/// port = 0
/// queue_capacity = 4096
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port, 0 for an ephemeral port
    /// Default: 35853
    pub port: u16,

    /// Events buffered between connection readers and the consumer
    /// Default: 1000
    pub queue_capacity: usize,

    /// Per-connection read buffer (bytes)
    /// Default: 64 KiB
    pub read_buffer_size: usize,

    /// Enable TCP_NODELAY on accepted connections
    /// Default: true
    pub nodelay: bool,

    /// Enable TCP keepalive on accepted connections
    /// Default: true
    pub keepalive: bool,

    /// Keepalive idle time and probe interval
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub keepalive_interval: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            queue_capacity: 1000,
            read_buffer_size: 64 * 1024,
            nodelay: true,
            keepalive: true,
            keepalive_interval: Duration::from_secs(30),
        }
    }
}

impl SourceConfig {
    /// `address:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// `[sink]` section
///
/// # Example
///
/// ```toml
/// [sink]
/// host = "collector.internal"
/// connect_timeout = "2s"
/// write_timeout = "500ms"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Remote host
    /// Default: "localhost"
    pub host: String,

    /// Remote port
    /// Default: 35853
    pub port: u16,

    /// Connection timeout
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Timeout for writing one frame
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Enable TCP_NODELAY
    /// Default: true
    pub nodelay: bool,

    /// Enable TCP keepalive
    /// Default: true
    pub keepalive: bool,

    /// Keepalive probe interval
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub keepalive_interval: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            nodelay: true,
            keepalive: true,
            keepalive_interval: Duration::from_secs(30),
        }
    }
}

impl SinkConfig {
    /// `host:port` to connect to
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_defaults() {
        let config: SourceConfig = toml::from_str("").unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:35853");
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.read_buffer_size, 65536);
        assert!(config.nodelay);
        assert_eq!(config.keepalive_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_source_keepalive_interval() {
        let config: SourceConfig = toml::from_str("keepalive_interval = \"2m\"").unwrap();
        assert_eq!(config.keepalive_interval, Duration::from_secs(120));
    }

    #[test]
    fn test_sink_durations() {
        let config: SinkConfig = toml::from_str(
            r#"
host = "10.0.0.5"
port = 9000
connect_timeout = "2s"
write_timeout = "250ms"
keepalive = false
"#,
        )
        .unwrap();
        assert_eq!(config.address(), "10.0.0.5:9000");
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.write_timeout, Duration::from_millis(250));
        assert!(!config.keepalive);
        assert_eq!(config.keepalive_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_sink_rejects_bare_number_duration() {
        let result: Result<SinkConfig, _> = toml::from_str("connect_timeout = 10");
        assert!(result.is_err());
    }
}
