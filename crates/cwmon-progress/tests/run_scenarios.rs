//! End-to-end progress scenarios for cwmon-progress.
//!
//! These tests drive the machine with event sequences shaped like a real
//! synchronizer run and check the timeline and percent the dashboard shows.

use cwmon_progress::{
    Phase, ProgressSink, ProgressStateMachine, SummaryPayload, SyncEvent, TimelinePhase,
    parse_summary_payload,
};

#[derive(Default)]
struct Recorder {
    steps: Vec<((bool, bool, bool, bool), u8)>,
    pending: Option<(bool, bool, bool, bool)>,
}

impl ProgressSink for Recorder {
    fn update_timeline(&mut self, timeline: &TimelinePhase) {
        self.pending = Some(timeline.flags());
    }

    fn update_progress(&mut self, percent: u8) {
        if let Some(flags) = self.pending.take() {
            self.steps.push((flags, percent));
        }
    }
}

#[cfg(test)]
mod canonical_run {
    use super::*;

    #[test]
    fn test_four_event_run() {
        let mut machine = ProgressStateMachine::new();
        let mut recorder = Recorder::default();

        for event in [
            SyncEvent::named("run-start"),
            SyncEvent::named("plan"),
            SyncEvent::progress("apply-add-progress", 5.0, 10.0),
            SyncEvent::named("run-done"),
        ] {
            machine.apply_with(&event, &mut recorder);
        }

        let flags: Vec<_> = recorder.steps.iter().map(|(f, _)| *f).collect();
        assert_eq!(
            flags,
            vec![
                (true, false, false, false),
                (true, true, false, false),
                (true, true, true, false),
                (true, true, true, true),
            ]
        );
        assert_eq!(recorder.steps[2].1, 83);
        assert_eq!(recorder.steps[3].1, 100);
    }

    #[test]
    fn test_server_style_names_match() {
        let mut machine = ProgressStateMachine::new();
        machine.apply(&SyncEvent::named("run:start"));
        machine.apply(&SyncEvent::named("snapshot:start"));
        machine.apply(&SyncEvent::named("apply:remove:start"));
        assert_eq!(machine.timeline().flags(), (true, true, true, false));
    }
}

#[cfg(test)]
mod invariants {
    use super::*;

    fn noisy_run() -> Vec<SyncEvent> {
        let mut events = vec![
            SyncEvent::named("run:start"),
            SyncEvent::named("run:pair"),
            SyncEvent::named("debug").with_msg("snapshot: reading PLEX"),
            SyncEvent::named("one:plan"),
            SyncEvent::named("apply:add:start"),
        ];
        for done in 0..=20 {
            events.push(SyncEvent::progress("apply:add:progress", f64::from(done), 20.0));
        }
        events.push(SyncEvent::named("apply:add:done"));
        events.push(SyncEvent::named("apply:remove:start"));
        for done in 0..=5 {
            events.push(SyncEvent::progress("apply:remove:progress", f64::from(done), 5.0));
        }
        events.push(SyncEvent::named("cascade:pre"));
        events.push(SyncEvent::named("cascade:summary"));
        events.push(SyncEvent::named("something:new"));
        events
    }

    #[test]
    fn test_percent_monotonic_within_run() {
        let mut machine = ProgressStateMachine::new();
        let mut last = 0;
        for event in noisy_run() {
            machine.apply(&event);
            assert!(
                machine.percent() >= last,
                "percent dropped from {last} to {} on {}",
                machine.percent(),
                event.event
            );
            last = machine.percent();
        }
        assert!(last < 100, "100 is reserved for run-done");
    }

    #[test]
    fn test_flags_never_revert_within_run() {
        let mut machine = ProgressStateMachine::new();
        let mut previous = TimelinePhase::default();
        for event in noisy_run() {
            machine.apply(&event);
            let current = machine.timeline();
            if event.event != "run:start" && event.event != "run:pair" {
                assert!(current.phase() >= previous.phase(), "{}", event.event);
            }
            previous = current;
        }
    }

    #[test]
    fn test_run_done_is_terminal_from_any_phase() {
        for prefix in [
            vec![],
            vec![SyncEvent::named("run:start")],
            vec![SyncEvent::named("run:start"), SyncEvent::named("plan")],
            vec![SyncEvent::progress("apply:add:progress", 1.0, 3.0)],
        ] {
            let mut machine = ProgressStateMachine::new();
            for event in &prefix {
                machine.apply(event);
            }
            machine.apply(&SyncEvent::named("run:done"));
            assert_eq!(machine.timeline().flags(), (true, true, true, true));
            assert_eq!(machine.percent(), 100);
            assert_eq!(machine.phase(), Phase::Done);
        }
    }

    #[test]
    fn test_second_run_resets_progress() {
        let mut machine = ProgressStateMachine::new();
        machine.apply(&SyncEvent::named("run:start"));
        machine.apply(&SyncEvent::named("run:done"));
        machine.apply(&SyncEvent::named("run:start"));
        assert_eq!(machine.percent(), 5);
        assert_eq!(machine.phase(), Phase::Start);
    }
}

#[cfg(test)]
mod wire_payloads {
    use super::*;

    #[test]
    fn test_summary_feed_frames_drive_machine() {
        let frames = [
            ("run:start", r#"{"event":"run:start","dry_run":false}"#),
            ("plan", r#"{"event":"plan","feature":"watchlist","add":3,"rem":0}"#),
            (
                "apply:add:progress",
                r#"{"event":"apply:add:progress","dst":"SIMKL","done":1,"total":2}"#,
            ),
            (
                "message",
                r#"{"running":true,"timeline":{"start":true,"pre":true,"post":true,"done":false}}"#,
            ),
        ];

        let mut machine = ProgressStateMachine::new();
        for (name, data) in frames {
            match parse_summary_payload(name, data).unwrap() {
                SummaryPayload::Event(event) => {
                    machine.apply(&event);
                }
                SummaryPayload::Snapshot(summary) => {
                    machine.apply_summary(&summary);
                }
            }
        }
        assert_eq!(machine.percent(), 83);
        assert_eq!(machine.phase(), Phase::Post);
    }
}
