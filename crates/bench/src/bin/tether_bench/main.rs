//! Throughput benchmark for the tether transport
//!
//! # Usage
//!
//! ```bash
//! # Run every scenario with defaults (default)
//! tether-bench
//! tether-bench all --size 500
//!
//! # Single scenarios
//! tether-bench send --events 1000000
//! tether-bench batch --size 100
//! tether-bench send-multi
//!
//! # Settings from a file, JSON logs at debug
//! tether-bench --config configs/bench.toml --log-level debug
//! ```

mod common;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tether_bench::{Scenario, run};
use tether_config::{Config, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::common::{format_number, print_header, print_report};

/// Throughput benchmark for the tether transport
#[derive(Parser, Debug)]
#[command(name = "tether-bench")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Events per scenario. Overrides [bench] events.
    #[arg(short, long, global = true)]
    events: Option<usize>,

    /// Body size per event in bytes. Overrides [bench] event_size.
    #[arg(long, global = true)]
    event_size: Option<usize>,

    /// Attributes per event. Overrides [bench] attributes.
    #[arg(long, global = true)]
    attributes: Option<usize>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run every scenario
    All {
        /// Events per batch for the batch scenario
        #[arg(short, long)]
        size: Option<usize>,
    },
    /// One frame per event
    Send,
    /// Events grouped by a batching sink
    Batch {
        /// Events per batch. Overrides [batch] max_count.
        #[arg(short, long)]
        size: Option<usize>,
    },
    /// Sink opened from a separate task
    SendMulti,
}

impl Command {
    fn scenarios(self) -> Vec<Scenario> {
        match self {
            Command::All { size } => Scenario::all(size).to_vec(),
            Command::Send => vec![Scenario::Send],
            Command::Batch { size } => vec![Scenario::Batch { size }],
            Command::SendMulti => vec![Scenario::SendMulti],
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(events) = cli.events {
        config.bench.events = events;
    }
    if let Some(size) = cli.event_size {
        config.bench.event_size = size;
    }
    if let Some(attributes) = cli.attributes {
        config.bench.attributes = attributes;
    }
    config.validate().context("invalid settings")?;

    let log_level = resolve_log_level(cli.log_level.as_deref(), &config);
    init_logging(&log_level, &config.log)?;

    let command = cli.command.unwrap_or(Command::All { size: None });

    print_header(&format!(
        "{} events | {} B body | {} attrs",
        format_number(config.bench.events as u64),
        config.bench.event_size,
        config.bench.attributes
    ));

    let mut incomplete = Vec::new();
    for scenario in command.scenarios() {
        let report = run(scenario, &config)
            .await
            .with_context(|| format!("scenario '{scenario}' failed"))?;
        print_report(&report);
        if !report.is_complete() {
            tracing::warn!(
                scenario = %scenario,
                sent = report.events_sent,
                received = report.events_received,
                bytes_sent = report.bytes_sent,
                bytes_received = report.bytes_received,
                "sent and received counts differ"
            );
            incomplete.push(scenario.to_string());
        }
    }

    if !incomplete.is_empty() {
        anyhow::bail!("incomplete transfer in: {}", incomplete.join(", "));
    }
    Ok(())
}

/// Load settings from `path`, or defaults when no path is given
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Resolve log level: CLI flag > config file > default (info)
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }
    config.log.level.as_str().to_string()
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match (log.format, log.output) {
        (LogFormat::Console, LogOutput::Stderr) => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(io::stderr)
            .boxed(),
        (LogFormat::Console, LogOutput::Stdout) => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(io::stdout)
            .boxed(),
        (LogFormat::Json, LogOutput::Stderr) => fmt::layer().json().with_writer(io::stderr).boxed(),
        (LogFormat::Json, LogOutput::Stdout) => fmt::layer().json().with_writer(io::stdout).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    Ok(())
}
