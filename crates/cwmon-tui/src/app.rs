//! Main application state and loop for the CWMON dashboard.
//!
//! The `App` owns the stream coordinator, the progress machine and the log
//! surface, and reacts to three sources in one `tokio::select!` loop: stream
//! events, timers (frame and staleness), and terminal input.

use std::io;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossterm::event::EventStream;
use cwmon_config::MonitorConfig;
use cwmon_core::MonitorError;
use cwmon_progress::{
    ProgressSink, ProgressState, ProgressStateMachine, SummaryPayload, TimelinePhase,
};
use cwmon_stream::{
    DualStreamCoordinator, FeedKind, OutputSurface, StreamEvent, StreamEventKind, StreamStatus,
};
use futures_util::StreamExt;
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::event::{AppEvent, InputHandler};
use crate::render::StyledRenderer;
use crate::surface::LogSurface;
use crate::theme::Palette;
use crate::widget::{RunProgressBar, TimelineChips};

/// Result type for app operations.
pub type AppResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Target frame rate.
const TARGET_FPS: u64 = 30;
const FRAME_DURATION: Duration = Duration::from_millis(1000 / TARGET_FPS);

/// Capacity of the stream event channel.
const STREAM_CHANNEL_CAPACITY: usize = 1024;

/// What the progress widgets show. Updated through [`ProgressSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressView {
    pub state: ProgressState,
    pub updates: u64,
}

impl ProgressSink for ProgressView {
    fn update_timeline(&mut self, timeline: &TimelinePhase) {
        self.state.timeline = *timeline;
    }

    fn update_progress(&mut self, percent: u8) {
        self.state.percent = percent;
        self.updates += 1;
    }
}

/// Main application state.
pub struct App {
    config: MonitorConfig,
    coordinator: DualStreamCoordinator,
    rx: mpsc::Receiver<StreamEvent>,
    progress: ProgressStateMachine,
    progress_view: ProgressView,
    surface: LogSurface,
    input_handler: InputHandler,
    palette: Palette,
    /// Terminal focus; the staleness watchdog only acts while focused
    visible: bool,
    should_quit: bool,
    status_message: Option<String>,
    last_event_at: Option<DateTime<Local>>,
    dirty: bool,
}

impl App {
    /// Create the app. Streams are not opened until [`run`](Self::run).
    pub fn new(config: MonitorConfig) -> cwmon_core::Result<Self> {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let coordinator = DualStreamCoordinator::new(&config, Box::new(StyledRenderer), tx)?;
        let surface = LogSurface::new(
            config.display.buffer_capacity,
            config.display.scroll_tolerance,
        );
        Ok(Self {
            config,
            coordinator,
            rx,
            progress: ProgressStateMachine::new(),
            progress_view: ProgressView::default(),
            surface,
            input_handler: InputHandler::new(),
            palette: Palette::default(),
            visible: true,
            should_quit: false,
            status_message: None,
            last_event_at: None,
            dirty: true,
        })
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn progress(&self) -> ProgressState {
        self.progress_view.state
    }

    pub fn surface(&self) -> &LogSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut LogSurface {
        &mut self.surface
    }

    pub fn coordinator(&self) -> &DualStreamCoordinator {
        &self.coordinator
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Route one stream event to the surface and the progress machine.
    pub fn handle_stream_event(&mut self, event: StreamEvent) {
        let feed = event.feed;
        let current = self.coordinator.stream(feed).connection_id() == Some(event.connection);
        if current {
            match &event.kind {
                StreamEventKind::Opened => {
                    self.status_message = None;
                }
                StreamEventKind::Error { message, retry_in } => {
                    self.status_message = Some(format!(
                        "{} feed: {message}; reconnecting in {}s",
                        feed.label(),
                        retry_in.as_secs_f64().ceil() as u64
                    ));
                }
                StreamEventKind::Message(_) => {
                    self.last_event_at = Some(Local::now());
                }
            }
        }

        for payload in self.coordinator.handle(event, &mut self.surface) {
            self.apply_payload(payload);
        }
        self.mark_dirty();
    }

    /// Feed one decoded payload into the progress machine.
    pub fn apply_payload(&mut self, payload: SummaryPayload) {
        match payload {
            SummaryPayload::Event(event) => {
                self.progress.apply_with(&event, &mut self.progress_view);
            }
            SummaryPayload::Snapshot(summary) => {
                self.progress
                    .apply_summary_with(&summary, &mut self.progress_view);
            }
        }
        self.mark_dirty();
    }

    /// Handle an application event.
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit | AppEvent::ForceQuit => {
                self.should_quit = true;
            }
            AppEvent::ToggleDetails => {
                let open = self.coordinator.toggle_details();
                info!(details_open = open, "details view toggled");
                self.status_message = Some(if open {
                    "Details: streaming the verbose log".to_string()
                } else {
                    "Details hidden: streaming the run summary".to_string()
                });
            }
            AppEvent::ToggleDebug => {
                let debug = self.coordinator.toggle_debug();
                self.status_message = Some(format!(
                    "Debug {}: applies to new lines",
                    if debug { "on" } else { "off" }
                ));
            }
            AppEvent::ScrollUp => self.surface.scroll_by(-1),
            AppEvent::ScrollDown => self.surface.scroll_by(1),
            AppEvent::PageUp => self.surface.page(-1),
            AppEvent::PageDown => self.surface.page(1),
            AppEvent::GoToTop => self.surface.scroll_to_top(),
            AppEvent::GoToBottom => self.surface.scrub_to(100),
            AppEvent::Scrub(percent) => self.surface.scrub_to(percent),
            AppEvent::Reconnect => {
                if self.coordinator.force_reconnect(Instant::now()) {
                    self.status_message = Some("Reconnecting...".to_string());
                }
            }
            AppEvent::Clear => self.surface.reset(),
            AppEvent::FocusChanged(visible) => {
                self.visible = visible;
                if self.coordinator.visibility_changed(visible, Instant::now()) {
                    debug!("reconnected stale feed on focus");
                }
            }
            AppEvent::Resize | AppEvent::None => {}
        }
        self.mark_dirty();
    }

    /// Open the feed for the current details setting. Needs a tokio runtime.
    pub fn start_streams(&mut self) {
        self.coordinator.start();
        self.mark_dirty();
    }

    /// Periodic staleness check.
    pub fn on_staleness_tick(&mut self, now: Instant) {
        if self.coordinator.tick(now, self.visible) {
            self.status_message = Some("Stream went quiet; reconnected".to_string());
            self.mark_dirty();
        }
    }

    /// Run the dashboard until the user quits.
    pub async fn run(&mut self) -> AppResult<()> {
        let mut terminal = enter_terminal().map_err(|e| MonitorError::TerminalInit {
            message: e.to_string(),
        })?;

        let result = self.run_loop(&mut terminal).await;

        leave_terminal(&mut terminal).map_err(|e| MonitorError::TerminalRestore {
            message: e.to_string(),
        })?;

        result
    }

    async fn run_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> AppResult<()> {
        self.start_streams();
        info!(
            verbose = %self.coordinator.endpoints().verbose,
            summary = %self.coordinator.endpoints().summary,
            "streams started"
        );

        let mut input = EventStream::new();
        let mut frame_tick = tokio::time::interval(FRAME_DURATION);
        frame_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let period = self.config.stream.staleness_threshold();
        let mut staleness = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        staleness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.should_quit {
            tokio::select! {
                Some(event) = self.rx.recv() => {
                    self.handle_stream_event(event);
                }
                maybe_input = input.next() => match maybe_input {
                    Some(Ok(event)) => {
                        let app_event = self.input_handler.handle_event(&event);
                        self.handle_app_event(app_event);
                    }
                    Some(Err(e)) => {
                        self.coordinator.close_all();
                        return Err(e.into());
                    }
                    None => self.should_quit = true,
                },
                _ = staleness.tick() => {
                    self.on_staleness_tick(Instant::now());
                }
                _ = frame_tick.tick() => {
                    if self.take_dirty() {
                        terminal.draw(|frame| self.draw(frame))?;
                    }
                }
            }
        }

        self.coordinator.close_all();
        info!("streams closed");
        Ok(())
    }

    /// Draw the UI.
    pub fn draw(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(4), // Run progress
                Constraint::Min(5),    // Log
                Constraint::Length(2), // Footer
            ])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_progress(frame, chunks[1]);
        self.draw_log(frame, chunks[2]);
        self.draw_footer(frame, chunks[3]);
    }

    fn feed_badge(&self, feed: FeedKind) -> Vec<Span<'static>> {
        let status = self.coordinator.status(feed);
        let mut label = status.label().to_string();
        if status == StreamStatus::Connecting {
            if let Some(session) = self.coordinator.session(feed) {
                if session.consecutive_failures() > 0 {
                    label = format!("retry #{}", session.consecutive_failures());
                }
            }
        }
        vec![
            Span::styled(
                format!("{}:", feed.label()),
                Style::default().fg(self.palette.text_dim),
            ),
            Span::styled(
                format!("{label} "),
                Style::default().fg(self.palette.stream_status(status)),
            ),
        ]
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let title = " CWMON ";
        let target = format!(" {} ", self.config.base_url());

        let mut spans = vec![
            Span::styled(
                title,
                Style::default()
                    .fg(self.palette.header)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(target, Style::default().fg(self.palette.text_dim)),
        ];

        let mut right = self.feed_badge(FeedKind::Verbose);
        right.extend(self.feed_badge(FeedKind::Summary));
        if !self.visible {
            right.push(Span::styled("[unfocused] ", Style::default().fg(self.palette.text_dim)));
        }
        if let Some(at) = self.last_event_at {
            right.push(Span::styled(
                format!("last {}", at.format("%H:%M:%S")),
                Style::default().fg(self.palette.text_dim),
            ));
        }

        let used: usize = spans.iter().chain(right.iter()).map(|s| s.width()).sum();
        let spacing = (area.width as usize).saturating_sub(used + 2);
        spans.push(Span::raw(" ".repeat(spacing)));
        spans.extend(right);

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.palette.border_dim)),
        );
        frame.render_widget(header, area);
    }

    fn draw_progress(&self, frame: &mut Frame, area: Rect) {
        let state = self.progress_view.state;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.palette.border_dim))
            .title(Span::styled(
                format!(" Run: {} ", state.phase().label()),
                Style::default().fg(self.palette.header),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);
        frame.render_widget(TimelineChips::new(state.timeline).palette(self.palette), rows[0]);
        frame.render_widget(RunProgressBar::new(&state).palette(self.palette), rows[1]);
    }

    fn draw_log(&mut self, frame: &mut Frame, area: Rect) {
        let title = if self.coordinator.details_open() {
            " Details (verbose log) "
        } else {
            " Summary "
        };
        let mut position = if self.surface.scroll().is_pinned() {
            "following".to_string()
        } else {
            format!("{}%", self.surface.scroll().position_percent())
        };
        if self.coordinator.debug() {
            position.push_str(" · debug");
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.palette.border_dim))
            .title(Span::styled(title, Style::default().fg(self.palette.header)))
            .title(
                Line::from(Span::styled(
                    format!(" {position} "),
                    Style::default().fg(self.palette.text_dim),
                ))
                .alignment(Alignment::Right),
            );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let palette = self.palette;
        let stamped = self.coordinator.debug();
        let lines: Vec<Line> = self
            .surface
            .visible(inner.height as usize)
            .map(|line| {
                let mut spans = Vec::with_capacity(2);
                if stamped {
                    spans.push(Span::styled(
                        line.received_at.format("%H:%M:%S ").to_string(),
                        Style::default().fg(palette.border_dim),
                    ));
                }
                spans.push(Span::styled(line.text.clone(), palette.line(line.style)));
                Line::from(spans)
            })
            .collect();
        let body = if lines.is_empty() {
            Paragraph::new(Line::from(Span::styled(
                "Waiting for output...",
                Style::default().fg(palette.text_dim),
            )))
        } else {
            Paragraph::new(lines)
        };
        frame.render_widget(body, inner);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let hotkey_style = Style::default().fg(self.palette.hotkey);
        let mut hints = vec![
            Span::styled("[d]", hotkey_style),
            Span::raw("Details "),
            Span::styled("[b]", hotkey_style),
            Span::raw("Debug "),
            Span::styled("[↑↓]", hotkey_style),
            Span::raw("Scroll "),
            Span::styled("[0-9/End]", hotkey_style),
            Span::raw("Scrub "),
            Span::styled("[r]", hotkey_style),
            Span::raw("Reconnect "),
            Span::styled("[c]", hotkey_style),
            Span::raw("Clear "),
            Span::styled("[q]", hotkey_style),
            Span::raw("Quit"),
        ];
        if let Some(message) = &self.status_message {
            hints.push(Span::raw("  "));
            hints.push(Span::styled(
                message.clone(),
                Style::default().fg(self.palette.text_dim),
            ));
        }

        let footer = Paragraph::new(Line::from(hints))
            .style(Style::default().fg(self.palette.text_dim))
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, area);
    }
}

/// Raw mode, alternate screen, mouse and focus reporting.
fn enter_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture,
        crossterm::event::EnableFocusChange
    )?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn leave_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture,
        crossterm::event::DisableFocusChange
    )?;
    terminal.show_cursor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwmon_progress::SyncEvent;
    use cwmon_stream::{LineStyle, SseMessage};
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;

    fn test_app() -> App {
        App::new(MonitorConfig::default()).unwrap()
    }

    /// Helper to create a test terminal with specified dimensions
    fn test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Helper to render app and get the buffer
    fn render_app(app: &mut App, width: u16, height: u16) -> Buffer {
        let mut terminal = test_terminal(width, height);
        terminal.draw(|frame| app.draw(frame)).unwrap();
        terminal.backend().buffer().clone()
    }

    /// Check if a buffer contains a specific string
    fn buffer_contains(buffer: &Buffer, text: &str) -> bool {
        buffer_to_string(buffer).contains(text)
    }

    /// Convert buffer to string for searching
    fn buffer_to_string(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut result = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                result.push(buffer[(x, y)].symbol().chars().next().unwrap_or(' '));
            }
            result.push('\n');
        }
        result
    }

    #[test]
    fn test_initial_render() {
        let mut app = test_app();
        let buffer = render_app(&mut app, 120, 30);
        assert!(buffer_contains(&buffer, "CWMON"));
        assert!(buffer_contains(&buffer, "http://localhost:8787"));
        assert!(buffer_contains(&buffer, "Details (verbose log)"));
        assert!(buffer_contains(&buffer, "Waiting for output"));
        assert!(buffer_contains(&buffer, "verbose:off"));
        assert!(buffer_contains(&buffer, "[q]Quit"));
    }

    #[test]
    fn test_progress_renders_after_events() {
        let mut app = test_app();
        app.apply_payload(SummaryPayload::Event(SyncEvent::named("run:start")));
        app.apply_payload(SummaryPayload::Event(SyncEvent::named("plan")));
        app.apply_payload(SummaryPayload::Event(SyncEvent::progress(
            "apply:add:progress",
            5.0,
            10.0,
        )));
        assert_eq!(app.progress().percent, 83);

        let buffer = render_app(&mut app, 120, 30);
        assert!(buffer_contains(&buffer, "Run: post"));
        assert!(buffer_contains(&buffer, "83%"));
        assert!(buffer_contains(&buffer, "● Start ─ ● Snapshot ─ ● Apply ─ ○ Done"));
    }

    #[test]
    fn test_log_lines_render_and_follow_tail() {
        let mut app = test_app();
        for i in 0..100 {
            app.surface_mut().push_text(&format!("line number {i}"), LineStyle::Plain);
        }
        let buffer = render_app(&mut app, 100, 30);
        assert!(buffer_contains(&buffer, "line number 99"));
        assert!(!buffer_contains(&buffer, "line number 0 "));
        assert!(buffer_contains(&buffer, "following"));
    }

    #[test]
    fn test_scroll_keys_unpin_and_end_repins() {
        let mut app = test_app();
        for i in 0..100 {
            app.surface_mut().push_text(&format!("line number {i}"), LineStyle::Plain);
        }
        render_app(&mut app, 100, 30);

        app.handle_app_event(AppEvent::GoToTop);
        let buffer = render_app(&mut app, 100, 30);
        assert!(buffer_contains(&buffer, "line number 0"));
        assert!(!app.surface().scroll().is_pinned());

        app.handle_app_event(AppEvent::GoToBottom);
        let buffer = render_app(&mut app, 100, 30);
        assert!(app.surface().scroll().is_pinned());
        assert!(buffer_contains(&buffer, "line number 99"));
    }

    #[tokio::test]
    async fn test_reconnect_replay_keeps_scroll_position() {
        let mut app = test_app();
        app.start_streams();
        for i in 0..100 {
            app.surface_mut().push_text(&format!("line number {i}"), LineStyle::Plain);
        }
        render_app(&mut app, 100, 30);
        app.handle_app_event(AppEvent::GoToTop);
        assert!(!app.surface().scroll().is_pinned());

        app.handle_app_event(AppEvent::Reconnect);
        let connection = app
            .coordinator()
            .stream(FeedKind::Verbose)
            .connection_id()
            .unwrap();
        let event = |kind| StreamEvent {
            feed: FeedKind::Verbose,
            connection,
            kind,
        };
        app.handle_stream_event(event(StreamEventKind::Opened));
        for i in 0..100 {
            let message = SseMessage::new("message", format!("line number {i}"));
            app.handle_stream_event(event(StreamEventKind::Message(message)));
        }

        assert_eq!(app.surface().len(), 100);
        assert!(!app.surface().scroll().is_pinned());
        assert_eq!(app.surface().scroll().offset(), 0);
        let buffer = render_app(&mut app, 100, 30);
        assert!(buffer_contains(&buffer, "line number 0"));
        assert!(!buffer_contains(&buffer, "line number 99"));
    }

    #[test]
    fn test_clear_key_empties_surface() {
        let mut app = test_app();
        app.surface_mut().push_text("something", LineStyle::Plain);
        app.handle_app_event(AppEvent::Clear);
        assert!(app.surface().is_empty());
    }

    #[test]
    fn test_focus_tracking() {
        let mut app = test_app();
        app.handle_app_event(AppEvent::FocusChanged(false));
        assert!(!app.is_visible());
        let buffer = render_app(&mut app, 120, 30);
        assert!(buffer_contains(&buffer, "[unfocused]"));
        app.handle_app_event(AppEvent::FocusChanged(true));
        assert!(app.is_visible());
    }

    #[test]
    fn test_quit() {
        let mut app = test_app();
        app.handle_app_event(AppEvent::Quit);
        assert!(app.should_quit());
    }

    #[tokio::test]
    async fn test_details_toggle_updates_title() {
        let mut app = test_app();
        app.handle_app_event(AppEvent::ToggleDetails);
        assert!(!app.coordinator().details_open());
        let buffer = render_app(&mut app, 120, 30);
        assert!(buffer_contains(&buffer, " Summary "));
        assert!(buffer_contains(&buffer, "summary:connecting"));
        app.handle_app_event(AppEvent::Quit);
    }

    #[test]
    fn test_stale_connection_events_do_not_touch_status() {
        let mut app = test_app();
        app.handle_stream_event(StreamEvent {
            feed: FeedKind::Verbose,
            connection: 7,
            kind: StreamEventKind::Error {
                message: "refused".into(),
                retry_in: Duration::from_secs(2),
            },
        });
        assert!(app.status_message().is_none());
    }
}
