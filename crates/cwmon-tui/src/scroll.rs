//! Keeps the log view pinned to its newest line unless the viewer scrolled away.
//!
//! Offsets are in rows: `offset` is the index of the first visible line and
//! the bottom is `content_len - viewport`.

/// Default distance from the bottom (in rows) that still counts as pinned.
pub const DEFAULT_TOLERANCE: usize = 1;

/// Percent at or above which the scrub control re-pins.
pub const SCRUB_PIN_PERCENT: u8 = 99;

/// Pin-to-bottom scroll state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollStickController {
    offset: usize,
    pinned: bool,
    tolerance: usize,
    content_len: usize,
    viewport: usize,
    /// Offset an unpinned view returns to while replayed content refills
    held: Option<usize>,
}

impl Default for ScrollStickController {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl ScrollStickController {
    pub fn new(tolerance: usize) -> Self {
        Self {
            offset: 0,
            pinned: true,
            tolerance,
            content_len: 0,
            viewport: 0,
            held: None,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn tolerance(&self) -> usize {
        self.tolerance
    }

    pub fn viewport(&self) -> usize {
        self.viewport
    }

    /// Largest valid offset for the current content and viewport.
    pub fn max_offset(&self) -> usize {
        self.content_len.saturating_sub(self.viewport)
    }

    fn near_bottom(&self) -> bool {
        self.max_offset().saturating_sub(self.offset) <= self.tolerance
    }

    /// Recompute the pinned flag; call before every content mutation.
    pub fn before_mutation(&mut self) {
        if self.held.is_some() {
            return;
        }
        self.pinned = self.near_bottom();
    }

    /// Content grew to `content_len` lines.
    pub fn after_append(&mut self, content_len: usize) {
        self.content_len = content_len;
        self.settle();
    }

    /// `count` lines were dropped from the top. Keeps an unpinned view on
    /// the same lines.
    pub fn after_evict(&mut self, count: usize) {
        self.content_len = self.content_len.saturating_sub(count);
        if let Some(target) = self.held.as_mut() {
            *target = target.saturating_sub(count);
        }
        if !self.pinned {
            self.offset = self.offset.saturating_sub(count);
        }
    }

    /// Viewport height changed.
    pub fn set_viewport(&mut self, viewport: usize) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.settle();
    }

    fn settle(&mut self) {
        self.offset = if self.pinned {
            self.max_offset()
        } else {
            self.held.unwrap_or(self.offset).min(self.max_offset())
        };
    }

    /// Manual scroll. Leaving the bottom tolerance un-pins; returning re-pins.
    pub fn scroll_by(&mut self, delta: isize) {
        let target = if delta.is_negative() {
            self.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.offset.saturating_add(delta.unsigned_abs())
        };
        self.held = None;
        self.offset = target.min(self.max_offset());
        self.pinned = self.near_bottom();
    }

    pub fn scroll_to_top(&mut self) {
        self.held = None;
        self.offset = 0;
        self.pinned = self.near_bottom();
    }

    /// Percentage scrub. Only `>= 99` re-pins.
    pub fn scrub_to(&mut self, percent: u8) {
        self.held = None;
        let percent = percent.min(100);
        if percent >= SCRUB_PIN_PERCENT {
            self.offset = self.max_offset();
            self.pinned = true;
            return;
        }
        let max = self.max_offset();
        self.offset = (max * usize::from(percent) + 50) / 100;
        self.pinned = false;
    }

    /// Scroll position as a percentage of the scrollable range.
    pub fn position_percent(&self) -> u8 {
        let max = self.max_offset();
        if max == 0 {
            return 100;
        }
        ((self.offset.min(max) * 100) / max) as u8
    }

    /// The surface was cleared.
    pub fn on_clear(&mut self) {
        self.offset = 0;
        self.pinned = true;
        self.content_len = 0;
        self.held = None;
    }

    /// The surface was emptied so a reconnected feed can replay its history.
    /// An unpinned view keeps its offset and stays unpinned while the
    /// replay refills; only manual navigation releases it.
    pub fn on_replay(&mut self) {
        if self.pinned {
            self.on_clear();
            return;
        }
        self.held = Some(self.held.unwrap_or(self.offset));
        self.content_len = 0;
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(lines: usize, viewport: usize) -> ScrollStickController {
        let mut scroll = ScrollStickController::default();
        scroll.set_viewport(viewport);
        for len in 1..=lines {
            scroll.before_mutation();
            scroll.after_append(len);
        }
        scroll
    }

    #[test]
    fn test_pinned_view_follows_appends() {
        let scroll = filled(50, 10);
        assert!(scroll.is_pinned());
        assert_eq!(scroll.offset(), 40);
    }

    #[test]
    fn test_scrolling_up_unpins_and_freezes_view() {
        let mut scroll = filled(50, 10);
        scroll.scroll_by(-5);
        assert!(!scroll.is_pinned());
        assert_eq!(scroll.offset(), 35);

        scroll.before_mutation();
        scroll.after_append(51);
        assert_eq!(scroll.offset(), 35);
    }

    #[test]
    fn test_within_tolerance_stays_pinned() {
        let mut scroll = filled(50, 10);
        scroll.scroll_by(-1);
        assert!(scroll.is_pinned());
        scroll.before_mutation();
        scroll.after_append(51);
        assert_eq!(scroll.offset(), 41);
    }

    #[test]
    fn test_scrolling_back_down_repins() {
        let mut scroll = filled(50, 10);
        scroll.scroll_by(-20);
        assert!(!scroll.is_pinned());
        scroll.scroll_by(100);
        assert!(scroll.is_pinned());
        assert_eq!(scroll.offset(), 40);
    }

    #[test]
    fn test_scrub_repins_only_near_full() {
        let mut scroll = filled(110, 10);
        scroll.scrub_to(50);
        assert_eq!(scroll.offset(), 50);
        assert!(!scroll.is_pinned());

        scroll.scrub_to(90);
        assert_eq!(scroll.offset(), 90);
        assert!(!scroll.is_pinned());

        scroll.scrub_to(99);
        assert!(scroll.is_pinned());
        assert_eq!(scroll.offset(), 100);
    }

    #[test]
    fn test_clear_resets_and_repins() {
        let mut scroll = filled(50, 10);
        scroll.scroll_by(-30);
        scroll.on_clear();
        assert_eq!(scroll.offset(), 0);
        assert!(scroll.is_pinned());
        assert_eq!(scroll.max_offset(), 0);
    }

    #[test]
    fn test_replay_keeps_unpinned_position() {
        let mut scroll = filled(100, 10);
        scroll.scroll_to_top();
        scroll.scroll_by(25);
        assert!(!scroll.is_pinned());

        scroll.on_replay();
        for len in 1..=100 {
            scroll.before_mutation();
            scroll.after_append(len);
            assert!(!scroll.is_pinned(), "re-pinned at replay line {len}");
        }
        assert_eq!(scroll.offset(), 25);

        scroll.before_mutation();
        scroll.after_append(101);
        assert_eq!(scroll.offset(), 25);
    }

    #[test]
    fn test_replay_of_pinned_view_follows_tail() {
        let mut scroll = filled(50, 10);
        scroll.on_replay();
        for len in 1..=60 {
            scroll.before_mutation();
            scroll.after_append(len);
        }
        assert!(scroll.is_pinned());
        assert_eq!(scroll.offset(), 50);
    }

    #[test]
    fn test_navigation_releases_replay_hold() {
        let mut scroll = filled(100, 10);
        scroll.scroll_to_top();
        scroll.on_replay();
        for len in 1..=100 {
            scroll.before_mutation();
            scroll.after_append(len);
        }
        scroll.scroll_by(200);
        assert!(scroll.is_pinned());
        scroll.before_mutation();
        scroll.after_append(101);
        assert_eq!(scroll.offset(), 91);
    }

    #[test]
    fn test_eviction_keeps_unpinned_lines_in_view() {
        let mut scroll = filled(50, 10);
        scroll.scroll_by(-20);
        scroll.before_mutation();
        scroll.after_evict(1);
        scroll.after_append(50);
        assert_eq!(scroll.offset(), 19);
    }

    #[test]
    fn test_short_content_is_always_at_bottom() {
        let mut scroll = filled(3, 10);
        scroll.scroll_by(-5);
        assert!(scroll.is_pinned());
        assert_eq!(scroll.position_percent(), 100);
    }
}
