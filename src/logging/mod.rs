//! Logging framework for the alignment analyzer
//!
//! Structured `tracing` output to the console and optional rolling JSON
//! files, per-call analysis spans carrying a correlation id, and an
//! in-memory latency collector.

pub mod config;
pub mod metrics;
pub mod spans;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use config::LoggingConfig;
pub use metrics::{MetricsCollector, PerformanceMeasurement, PerformanceStats};
pub use spans::AnalysisSpan;

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins over the configured level. The returned guard must be
/// kept alive for as long as file logging should keep flushing.
pub fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<Option<WorkerGuard>> {
    let level = config.level_with_verbosity(verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={},tower_http=info",
            env!("CARGO_PKG_NAME").replace('-', "_"),
            level
        ))
    });

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_line_number(config.include_file_location)
            .with_file(config.include_file_location);
        if config.json_console {
            layers.push(console_layer.json().boxed());
        } else {
            layers.push(console_layer.boxed());
        }
    }

    let mut guard = None;
    if let Some(ref log_dir) = config.log_directory {
        let file_appender = tracing_appender::rolling::daily(log_dir, "shot-align.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .json();
        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::debug!(?config, "Logging initialized");
    Ok(guard)
}
