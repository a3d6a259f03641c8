//! Event-driven run timeline and percent derivation.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::event::{EventKind, RunSummary, SyncEvent};

/// Percent shown right after a run starts, so the bar never looks stalled at zero.
pub const INITIAL_PERCENT: u8 = 5;

const PRE_ANCHOR: u8 = 33;
const POST_ANCHOR: u8 = 66;
const DONE_ANCHOR: u8 = 100;
const POST_CEILING: u8 = 99;

/// Milestone a run has most recently reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Phase {
    /// No run observed yet
    #[default]
    Idle,
    Start,
    Pre,
    Post,
    Done,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Start => "start",
            Phase::Pre => "pre",
            Phase::Post => "post",
            Phase::Done => "done",
        }
    }
}

/// The four ordered timeline flags.
///
/// Raising a flag raises every earlier one, so `start <= pre <= post <= done`
/// always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelinePhase {
    pub start: bool,
    pub pre: bool,
    pub post: bool,
    pub done: bool,
}

impl TimelinePhase {
    /// Flags as a tuple, handy for assertions.
    pub fn flags(&self) -> (bool, bool, bool, bool) {
        (self.start, self.pre, self.post, self.done)
    }

    /// Latest milestone reached.
    pub fn phase(&self) -> Phase {
        if self.done {
            Phase::Done
        } else if self.post {
            Phase::Post
        } else if self.pre {
            Phase::Pre
        } else if self.start {
            Phase::Start
        } else {
            Phase::Idle
        }
    }

    /// Raise flags up to and including `phase`. Never lowers a flag.
    pub fn raise(&mut self, phase: Phase) {
        if phase >= Phase::Start {
            self.start = true;
        }
        if phase >= Phase::Pre {
            self.pre = true;
        }
        if phase >= Phase::Post {
            self.post = true;
        }
        if phase >= Phase::Done {
            self.done = true;
        }
    }

    /// Raise whatever `other` has raised.
    pub fn merge(&mut self, other: &TimelinePhase) {
        self.raise(other.phase());
    }
}

/// Snapshot of what the progress bar shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub percent: u8,
    pub timeline: TimelinePhase,
}

impl ProgressState {
    pub fn phase(&self) -> Phase {
        self.timeline.phase()
    }
}

/// Notification target for timeline and percent changes.
pub trait ProgressSink {
    fn update_timeline(&mut self, timeline: &TimelinePhase);
    fn update_progress(&mut self, percent: u8);
}

impl ProgressSink for () {
    fn update_timeline(&mut self, _timeline: &TimelinePhase) {}
    fn update_progress(&mut self, _percent: u8) {}
}

/// Derives [`ProgressState`] from [`SyncEvent`]s.
///
/// Within a run percent never decreases; only a run-start event resets it.
/// 100 is reserved for run-done.
#[derive(Debug, Clone, Default)]
pub struct ProgressStateMachine {
    state: ProgressState,
}

impl ProgressStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn percent(&self) -> u8 {
        self.state.percent
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn timeline(&self) -> TimelinePhase {
        self.state.timeline
    }

    /// Apply an event without notifying anyone. Returns whether it matched.
    pub fn apply(&mut self, event: &SyncEvent) -> bool {
        self.apply_with(event, &mut ())
    }

    /// Apply an event and notify `sink` if it matched the transition table.
    pub fn apply_with(&mut self, event: &SyncEvent, sink: &mut dyn ProgressSink) -> bool {
        match event.kind() {
            EventKind::RunStart => {
                self.state.timeline = TimelinePhase::default();
                self.state.timeline.raise(Phase::Start);
                self.state.percent = INITIAL_PERCENT;
            }
            EventKind::PreSync => {
                self.raise(Phase::Pre, PRE_ANCHOR);
            }
            EventKind::ApplyStart | EventKind::ApplyDone => {
                self.raise(Phase::Post, POST_ANCHOR);
            }
            EventKind::ApplyProgress => {
                self.raise(Phase::Post, POST_ANCHOR);
                if let Some(fraction) = event.fraction() {
                    let span = f64::from(DONE_ANCHOR - POST_ANCHOR);
                    let computed = (f64::from(POST_ANCHOR) + fraction * span).floor() as u8;
                    self.bump(computed.min(POST_CEILING));
                }
            }
            EventKind::RunDone => self.finish(),
            EventKind::Other => {
                trace!(event = %event.event, "ignoring event outside the progress table");
                return false;
            }
        }
        self.notify(sink);
        true
    }

    /// Fold a run snapshot in without notifying anyone.
    pub fn apply_summary(&mut self, summary: &RunSummary) -> bool {
        self.apply_summary_with(summary, &mut ())
    }

    /// Fold a run snapshot in. Snapshots only raise flags; a finished
    /// timeline drives the terminal state. Returns whether anything changed.
    pub fn apply_summary_with(&mut self, summary: &RunSummary, sink: &mut dyn ProgressSink) -> bool {
        let before = self.state;
        if summary.timeline.done {
            self.finish();
        } else {
            match summary.timeline.phase() {
                Phase::Post => self.raise(Phase::Post, POST_ANCHOR),
                Phase::Pre => self.raise(Phase::Pre, PRE_ANCHOR),
                Phase::Start => self.raise(Phase::Start, INITIAL_PERCENT),
                _ => {}
            }
        }
        let changed = self.state != before;
        if changed {
            self.notify(sink);
        }
        changed
    }

    fn raise(&mut self, phase: Phase, floor: u8) {
        self.state.timeline.raise(phase);
        self.bump(floor);
    }

    fn bump(&mut self, percent: u8) {
        self.state.percent = self.state.percent.max(percent);
    }

    fn finish(&mut self) {
        self.state.timeline.raise(Phase::Done);
        self.state.percent = DONE_ANCHOR;
    }

    fn notify(&self, sink: &mut dyn ProgressSink) {
        sink.update_timeline(&self.state.timeline);
        sink.update_progress(self.state.percent);
    }
}
