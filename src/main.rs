//! CWMON - live sync-run monitor
//!
//! Streams a CrossWatch server's sync log and run summary into a terminal
//! dashboard with a run timeline and progress bar.
//!
//! ## Usage
//!
//! ```bash
//! # Watch the local server
//! cwmon
//!
//! # Watch another server, raw lines
//! cwmon --url http://nas.local:8787 --debug
//!
//! # Start on the compact summary instead of the verbose log
//! cwmon --summary
//!
//! # With verbose logging to a custom directory
//! cwmon -v --log-dir /tmp/cwmon-logs
//! ```

use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use cwmon_config::MonitorConfig;
use cwmon_core::{LogGuard, MonitorError, init_logging};
use cwmon_tui::App;
use tracing::{error, info};

/// CrossWatch sync-run monitor
///
/// Follows the server's verbose sync log and structured run summary over
/// Server-Sent Events and shows the run's progress live.
#[derive(Parser, Debug)]
#[command(name = "cwmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.cwmon/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.cwmon/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server base URL, e.g. http://localhost:8787
    #[arg(long)]
    url: Option<String>,

    /// Log channel for the verbose feed
    #[arg(long)]
    tag: Option<String>,

    /// Show raw lines instead of formatted ones
    #[arg(long)]
    debug: bool,

    /// Start with details closed (compact summary feed)
    #[arg(long)]
    summary: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            report_error(&e);
            return ExitCode::from(2);
        }
    };

    install_panic_hook();

    info!(url = config.base_url(), "Starting CWMON");

    match run_app(config) {
        Ok(()) => {
            info!("CWMON exited normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = restore_terminal();
            error!("CWMON error: {:#}", e);
            report_error(&e);
            ExitCode::from(1)
        }
    }
}

/// Install a panic hook that restores the terminal before printing the panic message.
fn install_panic_hook() {
    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}

/// Restore terminal to its normal state.
fn restore_terminal() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();

    let _ = crossterm::terminal::disable_raw_mode();

    crossterm::execute!(
        stdout,
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture,
        crossterm::event::DisableFocusChange
    )?;
    crossterm::execute!(stdout, crossterm::cursor::Show)?;
    stdout.flush()?;

    Ok(())
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> cwmon_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

/// File config first, then command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load_from(path)?,
        None => MonitorConfig::load()?,
    };
    if let Some(url) = &cli.url {
        config = config.with_base_url(url.clone());
    }
    if let Some(tag) = &cli.tag {
        config = config.with_log_tag(tag.clone());
    }
    if cli.debug {
        config = config.with_debug(true);
    }
    if cli.summary {
        config.display.details_open = false;
    }
    config.validate()?;
    Ok(config)
}

/// Run the TUI application.
fn run_app(config: MonitorConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    runtime.block_on(async move {
        let mut app = App::new(config).context("creating HTTP client")?;
        app.run().await.map_err(into_anyhow)
    })
}

/// Keep `MonitorError`s typed so their guidance survives to the report.
fn into_anyhow(err: Box<dyn std::error::Error>) -> anyhow::Error {
    match err.downcast::<MonitorError>() {
        Ok(err) => anyhow::Error::from(*err),
        Err(other) => anyhow::anyhow!("dashboard failed: {other}"),
    }
}

/// Print the error chain and, for known failures, what to do about it.
fn report_error(err: &anyhow::Error) {
    eprintln!("Error: {:#}", err);
    if let Some(hint) = hint_for(err) {
        eprintln!("Hint: {}", hint);
    }
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<MonitorError>().and_then(MonitorError::guidance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_apply() {
        let cli = Cli::parse_from([
            "cwmon",
            "--config",
            "/nonexistent/cwmon.yaml",
        ]);
        assert!(load_config(&cli).is_err());

        let cli = Cli::parse_from([
            "cwmon",
            "--url",
            "http://nas.local:9000/",
            "--tag",
            "trakt",
            "--debug",
            "--summary",
        ]);
        let config = MonitorConfig::default()
            .with_base_url(cli.url.clone().unwrap())
            .with_log_tag(cli.tag.clone().unwrap())
            .with_debug(cli.debug);
        assert_eq!(
            config.log_stream_url(),
            "http://nas.local:9000/api/logs/stream?tag=TRAKT"
        );
        assert!(config.display.debug);
        assert!(cli.summary);
    }

    #[test]
    fn test_terminal_failure_keeps_guidance() {
        let err: Box<dyn std::error::Error> = Box::new(MonitorError::TerminalInit {
            message: "not a tty".into(),
        });
        let err = into_anyhow(err);
        assert_eq!(hint_for(&err), Some("Run cwmon from an interactive terminal"));

        let other: Box<dyn std::error::Error> = "draw failed".into();
        let err = into_anyhow(other);
        assert!(err.to_string().contains("draw failed"));
        assert_eq!(hint_for(&err), None);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let cli = Cli::parse_from(["cwmon", "--url", "nas.local:9000"]);
        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }
}
