//! Colors for the dashboard.

use cwmon_stream::{LineStyle, StreamStatus};
use ratatui::style::{Color, Modifier, Style};

/// Dashboard color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub header: Color,
    pub hotkey: Color,
    pub text: Color,
    pub text_dim: Color,
    pub border_dim: Color,
    pub status_healthy: Color,
    pub status_warning: Color,
    pub status_error: Color,
    /// Filled portion of the progress bar
    pub progress: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            header: Color::Cyan,
            hotkey: Color::Yellow,
            text: Color::White,
            text_dim: Color::Gray,
            border_dim: Color::DarkGray,
            status_healthy: Color::Green,
            status_warning: Color::Yellow,
            status_error: Color::Red,
            progress: Color::Cyan,
        }
    }
}

impl Palette {
    /// Style for a log line.
    pub fn line(&self, style: LineStyle) -> Style {
        match style {
            LineStyle::Plain => Style::default().fg(self.text),
            LineStyle::Info => Style::default().fg(Color::Blue),
            LineStyle::Success => Style::default().fg(self.status_healthy),
            LineStyle::Warning => Style::default().fg(self.status_warning),
            LineStyle::Error => Style::default().fg(self.status_error),
            LineStyle::Header => Style::default()
                .fg(self.header)
                .add_modifier(Modifier::BOLD),
            LineStyle::Muted => Style::default().fg(self.text_dim),
            LineStyle::Raw => Style::default().fg(self.text_dim),
        }
    }

    /// Color of a stream status badge.
    pub fn stream_status(&self, status: StreamStatus) -> Color {
        match status {
            StreamStatus::Open => self.status_healthy,
            StreamStatus::Connecting => self.status_warning,
            StreamStatus::Closed => self.border_dim,
        }
    }
}
