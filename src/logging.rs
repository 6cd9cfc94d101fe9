//! Logging configuration for dual output (console + rotating file)
//!
//! Hosts embedding the analyzer call [`init_dual_logging`] once at startup;
//! tests and minimal setups use [`init_simple_logging`].

use tracing_appender::non_blocking;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory to store log files
    pub log_dir: String,
    /// Log level filter (e.g. "info", "perf_analyzer=debug")
    pub level_filter: String,
    /// Rotate log files daily instead of hourly
    pub daily_rotation: bool,
    /// Whether to use JSON format for file logs
    pub file_json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            level_filter: "info,perf_analyzer=info".to_string(),
            daily_rotation: true,
            file_json_format: true,
        }
    }
}

/// Initialize dual output logging (console + rotating files).
///
/// Returns a guard that must be kept alive for the duration of the host
/// application so the background writer thread keeps draining.
pub fn init_dual_logging(
    config: LoggingConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.log_dir)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level_filter));
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level_filter));

    let file_appender = if config.daily_rotation {
        tracing_appender::rolling::daily(&config.log_dir, "perf_analyzer.log")
    } else {
        tracing_appender::rolling::hourly(&config.log_dir, "perf_analyzer.log")
    };
    let (file_writer, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_level(true)
        .with_target(true)
        .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string()))
        .with_filter(console_filter);

    let file_layer = if config.file_json_format {
        fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_level(true)
            .with_target(true)
            .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
            .with_filter(file_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_level(true)
            .with_target(true)
            .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string()))
            .with_filter(file_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        log_dir = %config.log_dir,
        json_format = config.file_json_format,
        "Dual logging initialized"
    );

    Ok(guard)
}

/// Initialize plain console logging for tests or minimal setups
pub fn init_simple_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter("info,perf_analyzer=info")
        .init();
    Ok(())
}

/// Remove log files older than `keep_days`. Returns the removed count.
pub fn cleanup_old_logs(log_dir: &str, keep_days: u32) -> Result<usize, std::io::Error> {
    let cutoff_time =
        std::time::SystemTime::now() - std::time::Duration::from_secs(keep_days as u64 * 24 * 3600);

    let mut removed_count = 0;
    if let Ok(entries) = std::fs::read_dir(log_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().map(|ext| ext == "log").unwrap_or(false) {
                if let Ok(metadata) = path.metadata() {
                    if let Ok(modified) = metadata.modified() {
                        if modified < cutoff_time && std::fs::remove_file(&path).is_ok() {
                            removed_count += 1;
                        }
                    }
                }
            }
        }
    }

    if removed_count > 0 {
        tracing::info!(removed = removed_count, keep_days, "Cleaned up old log files");
    }
    Ok(removed_count)
}
