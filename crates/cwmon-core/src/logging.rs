//! Logging infrastructure for CWMON.
//!
//! Structured logging via the `tracing` ecosystem. The terminal belongs to the
//! dashboard while it runs, so diagnostics go to a JSON-lines file under
//! `~/.cwmon/logs/` rather than to stderr.
//!
//! ## Targets
//!
//! - `cwmon::stream` - connection lifecycle (open, retry, forced reconnect)
//! - `cwmon::diag` - dropped payloads and other diagnostics nobody acts on
//!
//! ## Example
//!
//! ```no_run
//! use cwmon_core::logging;
//!
//! let _guard = logging::init_logging(None, false).expect("logging init");
//!
//! tracing::info!("CWMON started");
//! tracing::debug!(feed = "summary", "opening stream");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{MonitorError, Result};

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "cwmon.log";

/// Guard that must be held to ensure log flushing on shutdown.
///
/// Keep this guard alive for the lifetime of the application.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the CWMON logging system.
///
/// Sets up a daily-rolling JSON log file in `log_dir` (defaults to
/// `~/.cwmon/logs/`). `verbose` raises the default level to DEBUG; `RUST_LOG`
/// overrides both.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| MonitorError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| MonitorError::internal(format!("tracing already initialized: {e}")))?;

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("cwmon={level},cwmon_stream={level},cwmon_tui={level}")
}

/// Initialize minimal console-only logging for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Get the default log directory path (`~/.cwmon/logs/`).
pub fn default_log_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| MonitorError::Internal {
        message: "HOME environment variable not set".into(),
    })?;

    Ok(PathBuf::from(home).join(".cwmon").join("logs"))
}

/// Get the default CWMON log file path (`~/.cwmon/logs/cwmon.log`).
pub fn default_log_file() -> Result<PathBuf> {
    Ok(default_log_dir()?.join(LOG_FILE_NAME))
}

/// Log a lifecycle event for one telemetry feed.
///
/// ```ignore
/// log_stream_event!("verbose", "opened");
/// log_stream_event!("summary", "retry", delay_ms = 2000);
/// ```
#[macro_export]
macro_rules! log_stream_event {
    ($feed:expr, $event:expr) => {
        tracing::info!(
            target: "cwmon::stream",
            feed = $feed,
            event = $event,
            "stream event"
        )
    };
    ($feed:expr, $event:expr, $($field:tt)*) => {
        tracing::info!(
            target: "cwmon::stream",
            feed = $feed,
            event = $event,
            $($field)*,
            "stream event"
        )
    };
}
