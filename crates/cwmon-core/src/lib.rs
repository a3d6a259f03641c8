//! # cwmon-core
//!
//! Core types, errors, and utilities for the CWMON sync-run monitor.
//!
//! This crate provides:
//! - [`MonitorError`] - Error type shared by the CWMON crates
//! - [`logging`] - Tracing setup and log file management
//! - [`recovery`] - Reconnect backoff policy for push streams
//!
//! ## Example
//!
//! ```no_run
//! use cwmon_core::{MonitorError, Result, logging};
//!
//! fn main() -> cwmon_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!
//!     let config_path = std::path::Path::new("~/.cwmon/config.yaml");
//!     if !config_path.exists() {
//!         return Err(MonitorError::config_not_found(config_path));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod recovery;

pub use error::{MonitorError, Result};
pub use logging::{LogGuard, init_logging};
pub use recovery::{Backoff, BackoffConfig};
