//! Configuration validation
//!
//! Serde fills in defaults for anything missing; this catches values that
//! parse but cannot work at runtime.

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_source(config)?;
    validate_sink(config)?;
    validate_batch(config)?;
    validate_bench(config)?;
    Ok(())
}

fn validate_source(config: &Config) -> Result<()> {
    let source = &config.source;

    if source.address.trim().is_empty() {
        return Err(ConfigError::missing_field("source", "address"));
    }
    if source.queue_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "source",
            "queue_capacity",
            "must be greater than 0",
        ));
    }
    if source.read_buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            "source",
            "read_buffer_size",
            "must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_sink(config: &Config) -> Result<()> {
    let sink = &config.sink;

    if sink.host.trim().is_empty() {
        return Err(ConfigError::missing_field("sink", "host"));
    }
    // A client can't dial an ephemeral port
    if sink.port == 0 {
        return Err(ConfigError::invalid_value("sink", "port", "must not be 0"));
    }
    if sink.connect_timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "sink",
            "connect_timeout",
            "must be greater than 0",
        ));
    }
    if sink.write_timeout.is_zero() {
        return Err(ConfigError::invalid_value(
            "sink",
            "write_timeout",
            "must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_batch(config: &Config) -> Result<()> {
    let batch = &config.batch;

    if batch.max_count == 0 {
        return Err(ConfigError::invalid_value(
            "batch",
            "max_count",
            "must be greater than 0",
        ));
    }
    if batch.max_latency.is_zero() {
        return Err(ConfigError::invalid_value(
            "batch",
            "max_latency",
            "must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_bench(config: &Config) -> Result<()> {
    if config.bench.events == 0 {
        return Err(ConfigError::invalid_value(
            "bench",
            "events",
            "must be greater than 0",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn expect_invalid(toml: &str, field: &str) {
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.is_validation(), "expected validation error, got {err}");
        assert!(
            err.to_string().contains(field),
            "error '{err}' does not mention '{field}'"
        );
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_queue_capacity() {
        expect_invalid("[source]\nqueue_capacity = 0", "queue_capacity");
    }

    #[test]
    fn test_empty_source_address() {
        expect_invalid("[source]\naddress = \"  \"", "address");
    }

    #[test]
    fn test_empty_sink_host() {
        expect_invalid("[sink]\nhost = \"\"", "host");
    }

    #[test]
    fn test_sink_port_zero() {
        expect_invalid("[sink]\nport = 0", "port");
    }

    #[test]
    fn test_source_port_zero_allowed() {
        assert!(Config::from_str("[source]\nport = 0").is_ok());
    }

    #[test]
    fn test_zero_write_timeout() {
        expect_invalid("[sink]\nwrite_timeout = \"0s\"", "write_timeout");
    }

    #[test]
    fn test_zero_batch_size() {
        expect_invalid("[batch]\nmax_count = 0", "max_count");
    }

    #[test]
    fn test_zero_batch_latency() {
        expect_invalid("[batch]\nmax_latency = \"0s\"", "max_latency");
    }

    #[test]
    fn test_zero_event_count() {
        expect_invalid("[bench]\nevents = 0", "events");
    }

    #[test]
    fn test_zero_event_size_allowed() {
        assert!(Config::from_str("[bench]\nevent_size = 0").is_ok());
    }
}
