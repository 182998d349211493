//! Conversion from file configuration to runtime component configuration

use tether_config::{BatchConfig, SinkConfig, SourceConfig};
use tether_pipeline::BatchingConfig;
use tether_sinks::transport::TransportSinkConfig;
use tether_sources::TransportSourceConfig;

/// Runtime config for the listening end
pub fn transport_source_config(config: &SourceConfig) -> TransportSourceConfig {
    TransportSourceConfig {
        address: config.address.clone(),
        port: config.port,
        queue_capacity: config.queue_capacity,
        read_buffer_size: config.read_buffer_size,
        nodelay: config.nodelay,
        keepalive: config.keepalive,
        keepalive_interval: config.keepalive_interval,
    }
}

/// Runtime config for the connecting end, dialing `port`
///
/// The port is passed separately because a source bound to port 0 only
/// knows its real port after `open`.
pub fn transport_sink_config(config: &SinkConfig, port: u16) -> TransportSinkConfig {
    TransportSinkConfig {
        host: config.host.clone(),
        port,
        connect_timeout: config.connect_timeout,
        write_timeout: config.write_timeout,
        nodelay: config.nodelay,
        keepalive: config.keepalive,
        keepalive_interval: config.keepalive_interval,
    }
}

/// Runtime batching thresholds, with `max_count` overridden by `size` if given
pub fn batching_config(config: &BatchConfig, size: Option<usize>) -> BatchingConfig {
    BatchingConfig::new(size.unwrap_or(config.max_count), config.max_latency)
}
