//! # cwmon-progress
//!
//! Derives a run timeline and a progress percentage from the synchronizer's
//! loosely-typed orchestrator events.
//!
//! - [`SyncEvent`] / [`RunSummary`] - payloads of the summary feed
//! - [`TimelinePhase`] - the four ordered milestones of a run
//! - [`ProgressStateMachine`] - event-driven transitions and percent interpolation
//! - [`ProgressSink`] - notification target for the rendering layer
//!
//! ## Example
//!
//! ```
//! use cwmon_progress::{ProgressStateMachine, SyncEvent};
//!
//! let mut machine = ProgressStateMachine::new();
//! machine.apply(&SyncEvent::named("run:start"));
//! machine.apply(&SyncEvent::named("plan"));
//! machine.apply(&SyncEvent::progress("apply:add:progress", 5.0, 10.0));
//! assert_eq!(machine.percent(), 83);
//! ```

pub mod event;
pub mod machine;

pub use event::{
    EventKind, PayloadError, RunSummary, SummaryPayload, SyncEvent, normalize_event_name,
    parse_summary_payload,
};
pub use machine::{
    INITIAL_PERCENT, Phase, ProgressSink, ProgressState, ProgressStateMachine, TimelinePhase,
};
