//! Per-stream connection state.
//!
//! `StreamSession` does no I/O. The connection task reports transitions to it
//! and the UI reads it back, always passing `now` explicitly.

use std::time::{Duration, Instant};

use cwmon_core::recovery::{Backoff, BackoffConfig};

/// Which of the two telemetry feeds a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Tag-filtered line-oriented log
    Verbose,
    /// Structured run-summary events
    Summary,
}

impl FeedKind {
    pub fn label(&self) -> &'static str {
        match self {
            FeedKind::Verbose => "verbose",
            FeedKind::Summary => "summary",
        }
    }
}

/// Connection status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Attempting to connect, or waiting out a retry delay
    Connecting,
    /// Headers received; messages may flow
    Open,
    /// Explicitly closed; nothing will reconnect
    Closed,
}

impl StreamStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StreamStatus::Connecting => "connecting",
            StreamStatus::Open => "live",
            StreamStatus::Closed => "off",
        }
    }
}

/// State of one logical stream across reconnects.
#[derive(Debug, Clone)]
pub struct StreamSession {
    feed: FeedKind,
    url: String,
    status: StreamStatus,
    last_message_at: Instant,
    messages: u64,
    backoff: Backoff,
    last_error: Option<String>,
}

impl StreamSession {
    /// New session in `Connecting`. The creation time counts as activity.
    pub fn new(feed: FeedKind, url: impl Into<String>, backoff: BackoffConfig, now: Instant) -> Self {
        Self {
            feed,
            url: url.into(),
            status: StreamStatus::Connecting,
            last_message_at: now,
            messages: 0,
            backoff: Backoff::new(backoff),
            last_error: None,
        }
    }

    pub fn feed(&self) -> FeedKind {
        self.feed
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    /// Last moment the stream showed signs of life.
    pub fn last_activity(&self) -> Instant {
        self.last_message_at
    }

    /// Messages received over the session's lifetime.
    pub fn messages(&self) -> u64 {
        self.messages
    }

    /// Delay the next failure will wait.
    pub fn retry_delay(&self) -> Duration {
        self.backoff.current()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.backoff.consecutive_failures()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// A (re)connect attempt is starting. Leaves the backoff untouched.
    pub fn begin_connect(&mut self, now: Instant) {
        if self.status == StreamStatus::Closed {
            return;
        }
        self.status = StreamStatus::Connecting;
        self.last_message_at = self.last_message_at.max(now);
    }

    /// Response headers arrived with a success status.
    pub fn on_open(&mut self, now: Instant) {
        if self.status == StreamStatus::Closed {
            return;
        }
        self.status = StreamStatus::Open;
        self.last_message_at = self.last_message_at.max(now);
    }

    /// A message was delivered: refresh activity and reset the backoff.
    pub fn on_message(&mut self, now: Instant) {
        if self.status == StreamStatus::Closed {
            return;
        }
        self.status = StreamStatus::Open;
        self.last_message_at = self.last_message_at.max(now);
        self.messages = self.messages.saturating_add(1);
        self.backoff.reset();
        self.last_error = None;
    }

    /// The connection failed or ended. Returns how long to wait before retrying.
    pub fn on_failure(&mut self, error: impl Into<String>) -> Duration {
        if self.status != StreamStatus::Closed {
            self.status = StreamStatus::Connecting;
        }
        self.last_error = Some(error.into());
        self.backoff.next_delay()
    }

    /// Terminal: no further transitions are accepted.
    pub fn close(&mut self) {
        self.status = StreamStatus::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.status == StreamStatus::Closed
    }
}
