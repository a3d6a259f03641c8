//! One logical SSE connection that survives drops, errors and silence.
//!
//! Each open stream runs a single tokio task that connects, forwards SSE
//! messages over an mpsc channel, and on any failure (including the server
//! ending the response) waits out the backoff delay and connects again.
//! `close` aborts that task synchronously, so nothing reconnects afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cwmon_config::MonitorConfig;
use cwmon_core::log_stream_event;
use cwmon_core::recovery::BackoffConfig;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StreamError;
use crate::session::{FeedKind, StreamSession, StreamStatus};
use crate::watchdog::StalenessWatchdog;

/// Connection policy shared by both feeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamOptions {
    pub backoff: BackoffConfig,
    /// Silence longer than this while focused forces a reconnect
    pub staleness: Duration,
    /// Upper bound on waiting for response headers
    pub connect_timeout: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            staleness: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl StreamOptions {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            backoff: config.stream.backoff(),
            staleness: config.stream.staleness_threshold(),
            connect_timeout: Duration::from_secs(config.server.request_timeout_secs.max(1)),
        }
    }
}

/// Build the HTTP client shared by every stream.
///
/// No overall request timeout: streams are expected to stay open for the
/// length of a run.
pub fn build_client(options: &StreamOptions) -> Result<reqwest::Client, StreamError> {
    reqwest::Client::builder()
        .connect_timeout(options.connect_timeout)
        .user_agent(concat!("cwmon/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| StreamError::Client(e.to_string()))
}

/// One decoded SSE message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    /// SSE `event:` field, `"message"` when the server sent none
    pub event: String,
    pub data: String,
}

impl SseMessage {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// What happened on a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEventKind {
    /// Response headers received; the server is about to replay its buffer
    Opened,
    Message(SseMessage),
    /// The connection failed and will be retried after `retry_in`
    Error { message: String, retry_in: Duration },
}

/// A stream event, tagged with its feed and the connection that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub feed: FeedKind,
    /// Increments on every spawned connection task; lets consumers drop
    /// events queued by a task that has since been replaced
    pub connection: u64,
    pub kind: StreamEventKind,
}

fn lock(session: &Mutex<StreamSession>) -> MutexGuard<'_, StreamSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A self-healing stream for one feed.
pub struct ResilientStream {
    feed: FeedKind,
    client: reqwest::Client,
    options: StreamOptions,
    tx: mpsc::Sender<StreamEvent>,
    session: Option<Arc<Mutex<StreamSession>>>,
    task: Option<JoinHandle<()>>,
    watchdog: StalenessWatchdog,
    connection: u64,
}

impl ResilientStream {
    pub fn new(
        feed: FeedKind,
        client: reqwest::Client,
        options: StreamOptions,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Self {
        Self {
            feed,
            client,
            options,
            tx,
            session: None,
            task: None,
            watchdog: StalenessWatchdog::new(options.staleness),
            connection: 0,
        }
    }

    pub fn feed(&self) -> FeedKind {
        self.feed
    }

    /// Connect to `url`, replacing any current session. Must run inside a
    /// tokio runtime.
    pub fn open(&mut self, url: impl Into<String>) {
        self.close();
        let url = url.into();
        log_stream_event!(self.feed.label(), "open", url = %url);
        let session = StreamSession::new(self.feed, url, self.options.backoff, Instant::now());
        self.session = Some(Arc::new(Mutex::new(session)));
        self.watchdog.arm();
        self.spawn();
    }

    /// Stop the stream and cancel any pending reconnect. Idempotent.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(session) = self.session.take() {
            lock(&session).close();
            log_stream_event!(self.feed.label(), "closed");
        }
        self.watchdog.disarm();
    }

    /// Drop the current connection and reconnect at once, without consuming
    /// a backoff step. Returns false when the stream is not open.
    pub fn force_reconnect(&mut self, now: Instant) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        if let Some(task) = self.task.take() {
            task.abort();
        }
        lock(session).begin_connect(now);
        log_stream_event!(self.feed.label(), "forced_reconnect");
        self.spawn();
        true
    }

    /// Periodic staleness check. Returns true if a reconnect was forced.
    pub fn tick(&mut self, now: Instant, visible: bool) -> bool {
        let Some(last_activity) = self.last_activity() else {
            return false;
        };
        if self.watchdog.check(now, last_activity, visible) {
            info!(
                feed = self.feed.label(),
                silent_secs = now.saturating_duration_since(last_activity).as_secs(),
                "stream went quiet, reconnecting"
            );
            return self.force_reconnect(now);
        }
        false
    }

    /// Focus changed; regaining focus runs the staleness check at once.
    pub fn visibility_changed(&mut self, visible: bool, now: Instant) -> bool {
        let Some(last_activity) = self.last_activity() else {
            return false;
        };
        if self.watchdog.visibility_changed(visible, now, last_activity) {
            debug!(feed = self.feed.label(), "stale on focus regained");
            return self.force_reconnect(now);
        }
        false
    }

    /// True while a session exists (connecting or open).
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn status(&self) -> StreamStatus {
        self.session
            .as_ref()
            .map_or(StreamStatus::Closed, |s| lock(s).status())
    }

    /// Copy of the current session state, for display.
    pub fn session(&self) -> Option<StreamSession> {
        self.session.as_ref().map(|s| lock(s).clone())
    }

    /// Identifier of the live connection task; events carrying any other
    /// value are stale.
    pub fn connection_id(&self) -> Option<u64> {
        self.task.as_ref().map(|_| self.connection)
    }

    pub fn watchdog(&self) -> &StalenessWatchdog {
        &self.watchdog
    }

    fn last_activity(&self) -> Option<Instant> {
        self.session.as_ref().map(|s| lock(s).last_activity())
    }

    fn spawn(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        self.connection = self.connection.wrapping_add(1);
        let url = lock(session).url().to_string();
        let worker = Worker {
            feed: self.feed,
            connection: self.connection,
            url,
            client: self.client.clone(),
            connect_timeout: self.options.connect_timeout,
            session: Arc::clone(session),
            tx: self.tx.clone(),
        };
        self.task = Some(tokio::spawn(worker.run()));
    }
}

impl Drop for ResilientStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// State moved into the connection task.
struct Worker {
    feed: FeedKind,
    connection: u64,
    url: String,
    client: reqwest::Client,
    connect_timeout: Duration,
    session: Arc<Mutex<StreamSession>>,
    tx: mpsc::Sender<StreamEvent>,
}

impl Worker {
    async fn run(self) {
        loop {
            let outcome = self.connect_and_read().await;
            if self.tx.is_closed() {
                return;
            }
            let error = outcome.err().unwrap_or(StreamError::Closed);
            let delay = lock(&self.session).on_failure(error.to_string());
            if !error.is_transient() {
                warn!(
                    feed = self.feed.label(),
                    url = %self.url,
                    error = %error,
                    "server rejected the stream; retrying anyway"
                );
            }
            log_stream_event!(
                self.feed.label(),
                "retry",
                delay_ms = delay.as_millis() as u64,
                error = %error
            );
            let event = StreamEventKind::Error {
                message: error.to_string(),
                retry_in: delay,
            };
            if !self.emit(event).await {
                return;
            }
            tokio::time::sleep(delay).await;
            lock(&self.session).begin_connect(Instant::now());
        }
    }

    async fn connect_and_read(&self) -> Result<(), StreamError> {
        let timeout_secs = self.connect_timeout.as_secs();
        let request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        let response = tokio::time::timeout(self.connect_timeout, request.send())
            .await
            .map_err(|_| StreamError::Timeout(timeout_secs))?
            .map_err(|e| StreamError::from_connect(e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status(status.as_u16()));
        }

        lock(&self.session).on_open(Instant::now());
        log_stream_event!(self.feed.label(), "opened", status = status.as_u16());
        if !self.emit(StreamEventKind::Opened).await {
            return Ok(());
        }

        let mut events = response.bytes_stream().eventsource();
        while let Some(item) = events.next().await {
            let event = item.map_err(|e| match e {
                EventStreamError::Transport(err) => StreamError::Body(err.to_string()),
                other => StreamError::Decode(other.to_string()),
            })?;
            lock(&self.session).on_message(Instant::now());
            let message = SseMessage {
                event: event.event,
                data: event.data,
            };
            if !self.emit(StreamEventKind::Message(message)).await {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Returns false once the receiver is gone.
    async fn emit(&self, kind: StreamEventKind) -> bool {
        let event = StreamEvent {
            feed: self.feed,
            connection: self.connection,
            kind,
        };
        self.tx.send(event).await.is_ok()
    }
}
