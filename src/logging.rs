//! Logging setup for unattended operation.
//!
//! Writes compact timestamped lines to the console and to a daily-rolling
//! file in the configured log directory. Rolled files past the retention
//! window are purged at startup.
//!
//! # Environment Variable
//!
//! `RUST_LOG` takes precedence over the configured level:
//! ```bash
//! RUST_LOG=debug docwatch watch
//! RUST_LOG=docwatch::watcher=trace docwatch watch
//! ```

use std::path::Path;
use std::sync::Once;
use std::time::{Duration, SystemTime};

use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// File name prefix of the rolled log files (`docwatch.log.YYYY-MM-DD`).
const LOG_FILE_PREFIX: &str = "docwatch.log";

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize logging with configuration.
///
/// Call once at startup. Safe to call multiple times (only the first call
/// takes effect). The `RUST_LOG` environment variable takes precedence over
/// the configured default level.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(&config.default)
        };

        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true);

        let _ = std::fs::create_dir_all(&config.dir);
        let file_appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_timer(CompactTime)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(console_layer.and_then(file_layer).with_filter(filter))
            .init();
    });
}

/// Initialize logging with default configuration.
///
/// Uses `LoggingConfig::default()` (level `info`, `logs/` directory). Use
/// the `RUST_LOG` environment variable for verbose output.
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Delete rolled log files older than the retention window.
///
/// Runs once at startup. A file that cannot be deleted is logged and
/// skipped; retention problems must never stop the monitor.
pub fn purge_old_logs(dir: &Path, retention_days: u64) {
    let Some(cutoff) =
        SystemTime::now().checked_sub(Duration::from_secs(retention_days.saturating_mul(86_400)))
    else {
        return;
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("[logging] no log directory to clean at {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(LOG_FILE_PREFIX) {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if modified < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::info!("[logging] deleted old log file {}", path.display()),
                Err(e) => {
                    tracing::error!("[logging] failed to delete log file {}: {e}", path.display())
                }
            }
        }
    }
}
