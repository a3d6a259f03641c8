//! Run progress widgets: timeline chips and the percent bar.

use cwmon_progress::{ProgressState, TimelinePhase};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::Palette;

const CHIP_LABELS: [&str; 4] = ["Start", "Snapshot", "Apply", "Done"];

/// Four chips, one per timeline milestone, lit once reached.
#[derive(Debug, Clone, Copy)]
pub struct TimelineChips {
    timeline: TimelinePhase,
    palette: Palette,
}

impl TimelineChips {
    pub fn new(timeline: TimelinePhase) -> Self {
        Self {
            timeline,
            palette: Palette::default(),
        }
    }

    pub fn palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    fn flags(&self) -> [bool; 4] {
        let t = self.timeline;
        [t.start, t.pre, t.post, t.done]
    }

    /// Chips as a styled line.
    pub fn line(&self) -> Line<'static> {
        let mut spans = Vec::with_capacity(8);
        for (i, (label, lit)) in CHIP_LABELS.iter().zip(self.flags()).enumerate() {
            if i > 0 {
                spans.push(Span::styled(" ─ ", Style::default().fg(self.palette.border_dim)));
            }
            let (mark, style) = if lit {
                (
                    "●",
                    Style::default()
                        .fg(self.palette.status_healthy)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ("○", Style::default().fg(self.palette.text_dim))
            };
            spans.push(Span::styled(format!("{mark} {label}"), style));
        }
        Line::from(spans)
    }

    /// Plain-text rendering, e.g. `● Start ─ ○ Snapshot ─ ○ Apply ─ ○ Done`.
    pub fn render_string(&self) -> String {
        self.line()
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect()
    }
}

impl Widget for TimelineChips {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        buf.set_line(area.x, area.y, &self.line(), area.width);
    }
}

/// Horizontal bar for the run percent, with the value at the right.
#[derive(Debug, Clone, Copy)]
pub struct RunProgressBar {
    percent: u8,
    palette: Palette,
}

impl RunProgressBar {
    pub fn new(state: &ProgressState) -> Self {
        Self {
            percent: state.percent.min(100),
            palette: Palette::default(),
        }
    }

    pub fn palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    fn fill_color(&self) -> Color {
        if self.percent >= 100 {
            self.palette.status_healthy
        } else {
            self.palette.progress
        }
    }

    /// Bar of `width` cells followed by the percent.
    pub fn render_string(&self, width: usize) -> String {
        let filled = (usize::from(self.percent) * width) / 100;
        format!(
            "{}{} {:>3}%",
            "█".repeat(filled),
            "░".repeat(width.saturating_sub(filled)),
            self.percent
        )
    }
}

impl Widget for RunProgressBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 6 || area.height == 0 {
            return;
        }
        let label = format!(" {:>3}%", self.percent);
        let bar_width = area.width.saturating_sub(label.len() as u16) as usize;
        let filled = (usize::from(self.percent) * bar_width) / 100;

        let y = area.top();
        for (i, x) in (area.left()..area.left() + bar_width as u16).enumerate() {
            let (ch, color) = if i < filled {
                ('█', self.fill_color())
            } else {
                ('░', self.palette.border_dim)
            };
            buf[(x, y)].set_char(ch).set_style(Style::default().fg(color));
        }
        buf.set_string(
            area.left() + bar_width as u16,
            y,
            label,
            Style::default()
                .fg(self.palette.text)
                .add_modifier(Modifier::BOLD),
        );
    }
}
