//! Token formatting for the log view.
//!
//! Formatted mode turns orchestrator JSON into one readable line and gives
//! plain log lines a severity style; debug mode passes text through untouched.

use cwmon_progress::{EventKind, SummaryPayload, SyncEvent, parse_summary_payload};
use cwmon_stream::{LineStyle, LogToken, OutputSurface, TokenRenderer, strip_markup};

/// Renderer used by the dashboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyledRenderer;

impl TokenRenderer for StyledRenderer {
    fn render_into(&self, surface: &mut dyn OutputSurface, token: &LogToken, debug: bool) {
        if debug {
            surface.push_text(&token.text, LineStyle::Raw);
            return;
        }
        let (text, style) = format_line(&token.text);
        surface.push_text(&text, style);
    }
}

/// Formatted text and style for one raw line.
pub fn format_line(raw: &str) -> (String, LineStyle) {
    let text = strip_markup(raw);
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        match parse_summary_payload("message", trimmed) {
            Ok(SummaryPayload::Event(event)) => return (event.describe(), event_style(&event)),
            Ok(SummaryPayload::Snapshot(summary)) => {
                let style = match summary.exit_code {
                    Some(0) => LineStyle::Success,
                    Some(_) => LineStyle::Error,
                    None => LineStyle::Info,
                };
                return (summary.describe(), style);
            }
            Err(_) => {}
        }
    }
    let style = classify(trimmed);
    (text, style)
}

fn event_style(event: &SyncEvent) -> LineStyle {
    match event.kind() {
        EventKind::RunStart => LineStyle::Header,
        EventKind::PreSync | EventKind::ApplyStart => LineStyle::Info,
        EventKind::ApplyProgress => LineStyle::Muted,
        EventKind::ApplyDone | EventKind::RunDone => LineStyle::Success,
        EventKind::Other => LineStyle::Muted,
    }
}

/// Severity guess for a plain log line.
pub fn classify(line: &str) -> LineStyle {
    let lower = line.to_ascii_lowercase();
    if lower.contains("error") || lower.contains("failed") || lower.contains("traceback") {
        LineStyle::Error
    } else if lower.contains("warn") || lower.contains("retry") {
        LineStyle::Warning
    } else if lower.starts_with("> sync start") || lower.starts_with("sync start") {
        LineStyle::Header
    } else if lower.starts_with("[i]") {
        LineStyle::Info
    } else if lower.contains("sync complete") || lower.starts_with("[sync] exit code: 0") {
        LineStyle::Success
    } else if line.is_empty() {
        LineStyle::Muted
    } else {
        LineStyle::Plain
    }
}
