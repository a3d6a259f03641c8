//! Seams between the streaming core and whatever displays its output.

use crate::tokenizer::LogToken;

/// Semantic style of one output line. The display decides what it looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    #[default]
    Plain,
    Info,
    Success,
    Warning,
    Error,
    /// Section markers such as run or pair boundaries
    Header,
    /// Low-importance detail
    Muted,
    /// Unformatted debug output
    Raw,
}

/// Ordered, append-only text sink shared by both feeds.
pub trait OutputSurface {
    fn push_text(&mut self, text: &str, style: LineStyle);

    /// Drop everything rendered so far.
    fn reset(&mut self);

    /// Drop everything ahead of a reconnect replay. Unlike [`reset`](Self::reset)
    /// this is not a user-visible clear, so views may keep their position.
    fn reset_for_replay(&mut self) {
        self.reset();
    }
}

/// Turns a line token into styled output.
pub trait TokenRenderer {
    /// `debug` asks for the raw text instead of the formatted form.
    fn render_into(&self, surface: &mut dyn OutputSurface, token: &LogToken, debug: bool);
}

/// Renderer that writes token text verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl TokenRenderer for PlainRenderer {
    fn render_into(&self, surface: &mut dyn OutputSurface, token: &LogToken, debug: bool) {
        let style = if debug { LineStyle::Raw } else { LineStyle::Plain };
        surface.push_text(&token.text, style);
    }
}

/// In-memory surface, useful for tests and headless consumers.
#[derive(Debug, Clone, Default)]
pub struct VecSurface {
    pub lines: Vec<(String, LineStyle)>,
    pub resets: usize,
    pub replays: usize,
}

impl VecSurface {
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|(text, _)| text.as_str()).collect()
    }
}

impl OutputSurface for VecSurface {
    fn push_text(&mut self, text: &str, style: LineStyle) {
        self.lines.push((text.to_string(), style));
    }

    fn reset(&mut self) {
        self.lines.clear();
        self.resets += 1;
    }

    fn reset_for_replay(&mut self) {
        self.lines.clear();
        self.replays += 1;
    }
}
