//! Configuration for CWMON.
//!
//! Reads `~/.cwmon/config.yaml`. Every field has a default, so a missing file
//! is not an error; a file that fails to parse or validate is.
//!
//! ```yaml
//! server:
//!   base_url: http://localhost:8787
//!   log_tag: SYNC
//! stream:
//!   staleness_secs: 20
//! display:
//!   debug: false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use cwmon_core::recovery::{BackoffConfig, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_MS};
use cwmon_core::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default server base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8787";

/// Default log tag for the verbose feed.
pub const DEFAULT_LOG_TAG: &str = "SYNC";

/// Default staleness threshold in seconds.
pub const DEFAULT_STALENESS_SECS: u64 = 20;

/// Config file path (`~/.cwmon/config.yaml`).
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".cwmon").join("config.yaml"))
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Where the synchronizer runs
    pub server: ServerConfig,
    /// Reconnect and staleness policy
    pub stream: StreamConfig,
    /// Dashboard behaviour
    pub display: DisplayConfig,
}

/// Server endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. `http://localhost:8787`
    pub base_url: String,
    /// Log channel streamed by the verbose feed
    pub log_tag: String,
    /// Connect timeout for each (re)connection attempt
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            log_tag: DEFAULT_LOG_TAG.to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Stream resilience settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub initial_retry_ms: u64,
    pub max_retry_ms: u64,
    /// Silence longer than this while focused forces a reconnect
    pub staleness_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_retry_ms: DEFAULT_INITIAL_DELAY_MS,
            max_retry_ms: DEFAULT_MAX_DELAY_MS,
            staleness_secs: DEFAULT_STALENESS_SECS,
        }
    }
}

impl StreamConfig {
    /// Backoff policy derived from the retry bounds.
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig::from_millis(self.initial_retry_ms, self.max_retry_ms)
    }

    /// Staleness threshold as a duration.
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }
}

/// Dashboard display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Render raw lines instead of formatted ones
    pub debug: bool,
    /// Start with the verbose log (details) view open
    pub details_open: bool,
    /// Rows from the bottom that still count as pinned
    pub scroll_tolerance: usize,
    /// Maximum lines kept in the output surface
    pub buffer_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            debug: false,
            details_open: true,
            scroll_tolerance: 1,
            buffer_capacity: 2000,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the default path, falling back to defaults
    /// when no file exists.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MonitorError::config_not_found_with_source(path, e)
            } else {
                MonitorError::io("reading config", path, e)
            }
        })?;

        let config = Self::parse(&content).map_err(|e| match e {
            MonitorError::ConfigInvalid { message, .. } => MonitorError::ConfigInvalid {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).map_err(|e| MonitorError::ConfigInvalid {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<()> {
        let url = self.server.base_url.trim();
        if url.is_empty() {
            return Err(MonitorError::config_validation("server.base_url must not be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(MonitorError::config_validation(format!(
                "server.base_url must start with http:// or https:// (got {url})"
            )));
        }
        let tag = self.server.log_tag.trim();
        if tag.is_empty() {
            return Err(MonitorError::config_validation("server.log_tag must not be empty"));
        }
        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(MonitorError::config_validation(format!(
                "server.log_tag may only contain letters, digits, '_' and '-' (got {tag})"
            )));
        }
        if self.stream.initial_retry_ms == 0 {
            return Err(MonitorError::config_validation("stream.initial_retry_ms must be > 0"));
        }
        if self.stream.max_retry_ms < self.stream.initial_retry_ms {
            return Err(MonitorError::config_validation(
                "stream.max_retry_ms must be >= stream.initial_retry_ms",
            ));
        }
        if self.stream.staleness_secs == 0 {
            return Err(MonitorError::config_validation("stream.staleness_secs must be > 0"));
        }
        if self.display.buffer_capacity == 0 {
            return Err(MonitorError::config_validation("display.buffer_capacity must be > 0"));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.server.base_url.trim().trim_end_matches('/')
    }

    /// Endpoint of the tag-filtered verbose log feed.
    pub fn log_stream_url(&self) -> String {
        format!(
            "{}/api/logs/stream?tag={}",
            self.base_url(),
            self.server.log_tag.trim().to_uppercase()
        )
    }

    /// Endpoint of the structured run-summary feed.
    pub fn summary_stream_url(&self) -> String {
        format!("{}/api/run/summary/stream", self.base_url())
    }

    /// Override the server URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.server.base_url = url.into();
        self
    }

    /// Override the log tag.
    pub fn with_log_tag(mut self, tag: impl Into<String>) -> Self {
        self.server.log_tag = tag.into();
        self
    }

    /// Override the debug (raw lines) flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.display.debug = debug;
        self
    }
}
