//! Two feeds, one output surface.
//!
//! The verbose feed streams the tagged log line by line; the summary feed
//! streams orchestrator events and run snapshots as JSON. Only one of them is
//! active at a time (details view open or closed), and each keeps its own
//! line buffer so a clear on one never disturbs the other.

use std::time::Instant;

use cwmon_config::MonitorConfig;
use cwmon_progress::{EventKind, SummaryPayload, SyncEvent, parse_summary_payload};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::StreamError;
use crate::markup::strip_markup;
use crate::resilient::{
    ResilientStream, SseMessage, StreamEvent, StreamEventKind, StreamOptions, build_client,
};
use crate::session::{FeedKind, StreamSession, StreamStatus};
use crate::surface::{OutputSurface, TokenRenderer};
use crate::tokenizer::LineAssembler;

/// Endpoint URLs of the two feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    pub verbose: String,
    pub summary: String,
}

impl FeedEndpoints {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            verbose: config.log_stream_url(),
            summary: config.summary_stream_url(),
        }
    }
}

/// Parse a verbose-feed line as an orchestrator event, if it is one.
pub fn sync_event_from_line(line: &str) -> Option<SyncEvent> {
    let text = strip_markup(line);
    let line = text.trim();
    if !(line.starts_with('{') && line.ends_with('}')) {
        return None;
    }
    SyncEvent::from_json(line)
        .ok()
        .filter(|event| !event.event.trim().is_empty())
}

/// Owns both feeds and routes their events into one surface.
pub struct DualStreamCoordinator {
    verbose: ResilientStream,
    summary: ResilientStream,
    endpoints: FeedEndpoints,
    verbose_lines: LineAssembler,
    summary_lines: LineAssembler,
    renderer: Box<dyn TokenRenderer + Send>,
    debug: bool,
    details_open: bool,
    last_finished: Option<String>,
}

impl DualStreamCoordinator {
    /// Build from configuration. Streams stay closed until [`start`](Self::start).
    pub fn new(
        config: &MonitorConfig,
        renderer: Box<dyn TokenRenderer + Send>,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<Self, StreamError> {
        let mut coordinator = Self::with_options(
            FeedEndpoints::from_config(config),
            StreamOptions::from_config(config),
            renderer,
            tx,
        )?;
        coordinator.debug = config.display.debug;
        coordinator.details_open = config.display.details_open;
        Ok(coordinator)
    }

    pub fn with_options(
        endpoints: FeedEndpoints,
        options: StreamOptions,
        renderer: Box<dyn TokenRenderer + Send>,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<Self, StreamError> {
        let client = build_client(&options)?;
        Ok(Self {
            verbose: ResilientStream::new(FeedKind::Verbose, client.clone(), options, tx.clone()),
            summary: ResilientStream::new(FeedKind::Summary, client, options, tx),
            endpoints,
            verbose_lines: LineAssembler::new(),
            summary_lines: LineAssembler::new(),
            renderer,
            debug: false,
            details_open: true,
            last_finished: None,
        })
    }

    /// Open whichever feed the current details setting calls for.
    pub fn start(&mut self) {
        self.switch_feeds();
    }

    /// Details open streams the verbose log; closed streams the summary.
    /// The outgoing feed is closed before the incoming one opens.
    pub fn set_details_open(&mut self, open: bool) {
        let active = self.stream(Self::feed_for(open)).is_active();
        if open == self.details_open && active {
            return;
        }
        self.details_open = open;
        self.switch_feeds();
    }

    pub fn toggle_details(&mut self) -> bool {
        self.set_details_open(!self.details_open);
        self.details_open
    }

    pub fn details_open(&self) -> bool {
        self.details_open
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn toggle_debug(&mut self) -> bool {
        self.debug = !self.debug;
        self.debug
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn endpoints(&self) -> &FeedEndpoints {
        &self.endpoints
    }

    pub fn stream(&self, feed: FeedKind) -> &ResilientStream {
        match feed {
            FeedKind::Verbose => &self.verbose,
            FeedKind::Summary => &self.summary,
        }
    }

    pub fn status(&self, feed: FeedKind) -> StreamStatus {
        self.stream(feed).status()
    }

    pub fn session(&self, feed: FeedKind) -> Option<StreamSession> {
        self.stream(feed).session()
    }

    /// Feed currently writing to the surface, if any.
    pub fn active_feed(&self) -> Option<FeedKind> {
        [FeedKind::Verbose, FeedKind::Summary]
            .into_iter()
            .find(|feed| self.stream(*feed).is_active())
    }

    /// Reconnect every active feed immediately.
    pub fn force_reconnect(&mut self, now: Instant) -> bool {
        let verbose = self.verbose.force_reconnect(now);
        let summary = self.summary.force_reconnect(now);
        verbose || summary
    }

    /// Run both staleness checks. Returns true if any feed was reconnected.
    pub fn tick(&mut self, now: Instant, visible: bool) -> bool {
        let verbose = self.verbose.tick(now, visible);
        let summary = self.summary.tick(now, visible);
        verbose || summary
    }

    pub fn visibility_changed(&mut self, visible: bool, now: Instant) -> bool {
        let verbose = self.verbose.visibility_changed(visible, now);
        let summary = self.summary.visibility_changed(visible, now);
        verbose || summary
    }

    pub fn close_all(&mut self) {
        self.verbose.close();
        self.summary.close();
        self.verbose_lines.reset();
        self.summary_lines.reset();
    }

    /// Route one stream event into `surface`.
    ///
    /// Returns the payloads the progress machine should see: events from the
    /// summary feed, JSON event lines from the verbose feed, and run snapshots.
    pub fn handle(&mut self, event: StreamEvent, surface: &mut dyn OutputSurface) -> Vec<SummaryPayload> {
        let StreamEvent { feed, connection, kind } = event;
        if self.stream(feed).connection_id() != Some(connection) {
            trace!(feed = feed.label(), connection, "dropping event from replaced connection");
            return Vec::new();
        }

        match kind {
            StreamEventKind::Opened => {
                self.assembler(feed).reset();
                if self.is_sole_writer(feed) {
                    // the server replays its buffer on connect
                    surface.reset_for_replay();
                    self.last_finished = None;
                }
                Vec::new()
            }
            StreamEventKind::Message(message) => match feed {
                FeedKind::Verbose => self.handle_verbose(message, surface),
                FeedKind::Summary => self.handle_summary(message, surface),
            },
            StreamEventKind::Error { message, retry_in } => {
                debug!(
                    target: "cwmon::diag",
                    feed = feed.label(),
                    retry_ms = retry_in.as_millis() as u64,
                    error = %message,
                    "stream error"
                );
                Vec::new()
            }
        }
    }

    fn handle_verbose(&mut self, message: SseMessage, surface: &mut dyn OutputSurface) -> Vec<SummaryPayload> {
        let mut chunk = message.data;
        chunk.push('\n');
        let tokens = self.verbose_lines.push(&chunk);

        let mut payloads = Vec::new();
        for token in tokens {
            if token.is_control() {
                surface.reset();
                continue;
            }
            if let Some(event) = sync_event_from_line(&token.text) {
                payloads.push(SummaryPayload::Event(event));
            }
            self.renderer.render_into(surface, &token, self.debug);
        }
        payloads
    }

    fn handle_summary(&mut self, message: SseMessage, surface: &mut dyn OutputSurface) -> Vec<SummaryPayload> {
        let mut chunk = message.data;
        chunk.push('\n');
        let tokens = self.summary_lines.push(&chunk);

        let mut payloads = Vec::new();
        for token in tokens {
            if token.is_control() {
                surface.reset();
                self.last_finished = None;
                continue;
            }
            if token.text.trim().is_empty() {
                continue;
            }
            match parse_summary_payload(&message.event, &token.text) {
                Ok(SummaryPayload::Event(event)) => {
                    if self.debug || Self::worth_a_line(&event) {
                        self.renderer.render_into(surface, &token, self.debug);
                    }
                    payloads.push(SummaryPayload::Event(event));
                }
                Ok(SummaryPayload::Snapshot(summary)) => {
                    if summary.is_finished() {
                        let key = summary.finished_at.clone().unwrap_or_default();
                        if self.last_finished.as_deref() != Some(key.as_str()) {
                            self.last_finished = Some(key);
                            self.renderer.render_into(surface, &token, self.debug);
                        }
                    }
                    payloads.push(SummaryPayload::Snapshot(summary));
                }
                Err(e) => {
                    debug!(
                        target: "cwmon::diag",
                        feed = "summary",
                        sse_event = %message.event,
                        error = %e,
                        "dropping malformed summary payload"
                    );
                }
            }
        }
        payloads
    }

    /// Progress ticks and unknown events only move the bar in the compact view.
    fn worth_a_line(event: &SyncEvent) -> bool {
        !matches!(event.kind(), EventKind::ApplyProgress | EventKind::Other)
            || cwmon_progress::normalize_event_name(&event.event) == "debug"
    }

    fn switch_feeds(&mut self) {
        let (outgoing, incoming) = if self.details_open {
            (FeedKind::Summary, FeedKind::Verbose)
        } else {
            (FeedKind::Verbose, FeedKind::Summary)
        };
        self.stream_mut(outgoing).close();
        self.assembler(outgoing).reset();
        let url = match incoming {
            FeedKind::Verbose => self.endpoints.verbose.clone(),
            FeedKind::Summary => self.endpoints.summary.clone(),
        };
        self.stream_mut(incoming).open(url);
    }

    fn is_sole_writer(&self, feed: FeedKind) -> bool {
        let other = match feed {
            FeedKind::Verbose => FeedKind::Summary,
            FeedKind::Summary => FeedKind::Verbose,
        };
        !self.stream(other).is_active()
    }

    fn feed_for(details_open: bool) -> FeedKind {
        if details_open {
            FeedKind::Verbose
        } else {
            FeedKind::Summary
        }
    }

    fn stream_mut(&mut self, feed: FeedKind) -> &mut ResilientStream {
        match feed {
            FeedKind::Verbose => &mut self.verbose,
            FeedKind::Summary => &mut self.summary,
        }
    }

    fn assembler(&mut self, feed: FeedKind) -> &mut LineAssembler {
        match feed {
            FeedKind::Verbose => &mut self.verbose_lines,
            FeedKind::Summary => &mut self.summary_lines,
        }
    }
}
