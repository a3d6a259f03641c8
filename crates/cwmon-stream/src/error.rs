//! Error types for telemetry streams.

use thiserror::Error;

/// Stream transport errors.
///
/// None of these abort a stream; they are surfaced as informational events
/// while the stream schedules its next attempt.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Could not establish the HTTP connection
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Connect attempt exceeded the configured timeout
    #[error("Connection timed out after {0}s")]
    Timeout(u64),

    /// Server answered with a non-success status
    #[error("Server returned HTTP {0}")]
    Status(u16),

    /// The body stream failed mid-read
    #[error("Stream interrupted: {0}")]
    Body(String),

    /// The server closed the stream cleanly
    #[error("Stream closed by server")]
    Closed,

    /// SSE framing could not be decoded
    #[error("Malformed event stream: {0}")]
    Decode(String),

    /// Endpoint URL could not be used
    #[error("Invalid endpoint {url}: {message}")]
    InvalidEndpoint { url: String, message: String },

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl StreamError {
    /// Transient errors are expected to clear on their own with a retry.
    pub fn is_transient(&self) -> bool {
        match self {
            StreamError::Connect(_)
            | StreamError::Timeout(_)
            | StreamError::Body(_)
            | StreamError::Closed
            | StreamError::Decode(_) => true,
            StreamError::Status(code) => *code >= 500 || *code == 404 || *code == 429,
            StreamError::InvalidEndpoint { .. } | StreamError::Client(_) => false,
        }
    }

    /// Classify a reqwest error from the connect phase.
    pub fn from_connect(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            StreamError::Timeout(timeout_secs)
        } else if err.is_builder() {
            StreamError::InvalidEndpoint {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            StreamError::Status(status.as_u16())
        } else {
            StreamError::Connect(err.to_string())
        }
    }
}

impl From<StreamError> for cwmon_core::MonitorError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::InvalidEndpoint { url, message } => {
                cwmon_core::MonitorError::InvalidEndpoint { url, message }
            }
            other => cwmon_core::MonitorError::HttpClient {
                message: other.to_string(),
            },
        }
    }
}
