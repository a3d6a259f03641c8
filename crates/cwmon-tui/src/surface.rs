//! The shared output surface: a bounded ring of styled lines.
//!
//! Both feeds write here through [`OutputSurface`]. The surface owns the
//! [`ScrollStickController`], so every append and clear keeps the scroll
//! state consistent.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use cwmon_stream::{LineStyle, OutputSurface};

use crate::scroll::ScrollStickController;

/// Default maximum number of retained lines.
pub const DEFAULT_CAPACITY: usize = 2000;

/// One rendered line.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledLine {
    pub text: String,
    pub style: LineStyle,
    pub received_at: DateTime<Local>,
}

/// Ring buffer of styled lines with pin-to-bottom scrolling.
#[derive(Debug, Clone)]
pub struct LogSurface {
    lines: VecDeque<StyledLine>,
    capacity: usize,
    dropped_count: usize,
    clear_count: usize,
    scroll: ScrollStickController,
}

impl Default for LogSurface {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, crate::scroll::DEFAULT_TOLERANCE)
    }
}

impl LogSurface {
    pub fn new(capacity: usize, tolerance: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
            dropped_count: 0,
            clear_count: 0,
            scroll: ScrollStickController::new(tolerance),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lines evicted by the capacity limit since the last clear.
    pub fn dropped_count(&self) -> usize {
        self.dropped_count
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count
    }

    pub fn lines(&self) -> impl Iterator<Item = &StyledLine> {
        self.lines.iter()
    }

    pub fn scroll(&self) -> &ScrollStickController {
        &self.scroll
    }

    /// Lines inside a viewport of `height` rows at the current offset.
    /// Also records the viewport height with the scroll controller.
    pub fn visible(&mut self, height: usize) -> impl Iterator<Item = &StyledLine> {
        self.scroll.set_viewport(height);
        self.lines.iter().skip(self.scroll.offset()).take(height)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll.scroll_by(delta);
    }

    pub fn page(&mut self, pages: isize) {
        let rows = self.scroll.viewport().max(1) as isize;
        self.scroll.scroll_by(pages.saturating_mul(rows));
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll.scroll_to_top();
    }

    pub fn scrub_to(&mut self, percent: u8) {
        self.scroll.scrub_to(percent);
    }
}

impl OutputSurface for LogSurface {
    fn push_text(&mut self, text: &str, style: LineStyle) {
        self.scroll.before_mutation();
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
            self.dropped_count += 1;
            self.scroll.after_evict(1);
        }
        self.lines.push_back(StyledLine {
            text: text.to_string(),
            style,
            received_at: Local::now(),
        });
        self.scroll.after_append(self.lines.len());
    }

    fn reset(&mut self) {
        self.lines.clear();
        self.dropped_count = 0;
        self.clear_count += 1;
        self.scroll.on_clear();
    }

    fn reset_for_replay(&mut self) {
        self.lines.clear();
        self.dropped_count = 0;
        self.scroll.on_replay();
    }
}
