//! Report formatting for tether-bench

use tether_bench::ScenarioReport;

// =============================================================================
// Formatting
// =============================================================================

/// Format a number with human-readable suffixes (K, M, B)
pub fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Format bytes as human-readable (auto-scale)
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.1} MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.1} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{} B", bytes)
    }
}

// =============================================================================
// Printing
// =============================================================================

const LINE_WIDTH: usize = 72;

/// Print the run header in the compact box style
pub fn print_header(details: &str) {
    let line = "─".repeat(LINE_WIDTH);
    println!("{}", line);
    println!("tether-bench | {}", details);
    println!(
        "System       | {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!("{}", line);
}

/// Print one scenario's results
pub fn print_report(report: &ScenarioReport) {
    println!(
        "{:<12} {:>10} events | {:>10} | {:>9.1} MB/s | {:>10} events/s",
        report.scenario.to_string(),
        format_number(report.events_received),
        format_bytes(report.bytes_sent),
        report.mb_per_sec(),
        format_number(report.events_per_sec() as u64),
    );

    for mark in report.benchmark.marks() {
        println!(
            "  {:<10} {:>10.3} ms",
            mark.label,
            mark.delta.as_secs_f64() * 1000.0
        );
    }

    if let Some(flushes) = &report.flushes {
        println!(
            "  flushes    size={} latency={} close={}",
            flushes.flushes_by_size, flushes.flushes_by_latency, flushes.flushes_on_close
        );
    }
}
