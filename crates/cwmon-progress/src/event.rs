//! Payloads pushed by the run-summary feed.
//!
//! The feed carries two shapes of JSON object:
//!
//! - orchestrator events: `{"event":"apply:add:progress","done":5,"total":10,...}`,
//!   usually framed with a matching SSE `event:` line
//! - run snapshots: `{"running":true,"timeline":{"start":true,...},...}` with
//!   no `event` key
//!
//! Anything else is a malformed payload and is dropped by the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::machine::TimelinePhase;

/// Errors raised while decoding a summary-feed payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Payload is not valid JSON
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is JSON but not an object
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// Object is neither an event nor a run snapshot
    #[error("unrecognized payload shape")]
    Unrecognized,
}

/// One orchestrator event from the structured feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    /// Event name; the discriminant for every progress transition
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Remaining fields (`dst`, `feature`, `src`, counts...), kept for display
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// Coarse classification of an event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A new run (or pair within a run) begins
    RunStart,
    /// Snapshotting or planning, before anything is written
    PreSync,
    /// Writes to a destination begin
    ApplyStart,
    /// Sub-task completion counter
    ApplyProgress,
    /// A write batch or cascade finished
    ApplyDone,
    /// The run finished
    RunDone,
    /// Anything the progress machine does not track
    Other,
}

/// Normalize an event name so `run:start`, `run_start` and `Run-Start` compare equal.
pub fn normalize_event_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ':' | '_' | ' ' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

impl SyncEvent {
    /// Event with only a name.
    pub fn named(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            done: None,
            total: None,
            msg: None,
            extra: Map::new(),
        }
    }

    /// Progress event carrying a `done`/`total` pair.
    pub fn progress(event: impl Into<String>, done: f64, total: f64) -> Self {
        Self {
            done: Some(done),
            total: Some(total),
            ..Self::named(event)
        }
    }

    /// Event carrying a free-form message.
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Attach an extra display field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Parse a single JSON object as an event.
    pub fn from_json(data: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Classify the event name.
    pub fn kind(&self) -> EventKind {
        let name = normalize_event_name(&self.event);
        match name.as_str() {
            "run-start" | "run-pair" | "pair-start" => EventKind::RunStart,
            "snapshot-start" | "plan" | "one-plan" | "two-plan" => EventKind::PreSync,
            "debug" if self.mentions_snapshot() => EventKind::PreSync,
            "apply-start" | "apply-add-start" | "apply-remove-start" | "apply-update-start"
            | "cascade-pre" => EventKind::ApplyStart,
            "apply-add-progress" | "apply-remove-progress" | "apply-update-progress" => {
                EventKind::ApplyProgress
            }
            "apply-add-done" | "apply-remove-done" | "apply-update-done" | "cascade-summary" => {
                EventKind::ApplyDone
            }
            "run-done" => EventKind::RunDone,
            _ => EventKind::Other,
        }
    }

    fn mentions_snapshot(&self) -> bool {
        self.msg
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().contains("snapshot"))
    }

    /// Completion fraction in `0.0..=1.0`, when `done`/`total` are usable.
    pub fn fraction(&self) -> Option<f64> {
        let done = self.done?;
        let total = self.total?;
        if !done.is_finite() || !total.is_finite() || total <= 0.0 {
            return None;
        }
        Some((done / total).clamp(0.0, 1.0))
    }

    /// Extra field rendered as text (strings verbatim, numbers and bools formatted).
    pub fn field(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// One-line human description used by the formatted (non-debug) view.
    pub fn describe(&self) -> String {
        let name = normalize_event_name(&self.event);
        let feature = self
            .field("feature")
            .map(|f| format!(" [{f}]"))
            .unwrap_or_default();
        let dst = self.field("dst").unwrap_or_else(|| "destination".to_string());

        match name.as_str() {
            "run-start" => "▶ Sync run started".to_string(),
            "run-pair" => {
                let pos = match (self.field("i"), self.field("n")) {
                    (Some(i), Some(n)) => format!(" {i}/{n}"),
                    _ => String::new(),
                };
                let src = self.field("src").unwrap_or_else(|| "?".into());
                let mode = self.field("mode").map(|m| format!(" ({m})")).unwrap_or_default();
                format!("Pair{pos}: {src} → {}{mode}", self.field("dst").unwrap_or_else(|| "?".into()))
            }
            "snapshot-start" => {
                let a = self.field("src").or_else(|| self.field("a")).unwrap_or_else(|| "?".into());
                let b = self.field("dst").or_else(|| self.field("b")).unwrap_or_else(|| "?".into());
                format!("Snapshot {a} ↔ {b}{feature}")
            }
            "plan" | "one-plan" | "two-plan" => {
                let add = self.field("add").or_else(|| self.field("adds")).unwrap_or_else(|| "0".into());
                let rem = self.field("rem").or_else(|| self.field("removes")).unwrap_or_else(|| "0".into());
                format!("Plan{feature}: +{add} / -{rem}")
            }
            "apply-add-start" | "apply-remove-start" | "apply-update-start" | "apply-start" => {
                format!("Applying {} to {dst}{feature}", apply_verb(&name))
            }
            "apply-add-progress" | "apply-remove-progress" | "apply-update-progress" => {
                let done = self.done.map(|d| d.floor() as u64).unwrap_or(0);
                let total = self.total.map(|t| t.floor() as u64).unwrap_or(0);
                format!("{} {dst}{feature}: {done}/{total}", capitalize(apply_verb(&name)))
            }
            "apply-add-done" | "apply-remove-done" | "apply-update-done" => {
                let count = self
                    .field("count")
                    .or_else(|| self.nested_count())
                    .unwrap_or_else(|| "0".into());
                format!("{} on {dst}{feature} done: {count}", capitalize(apply_verb(&name)))
            }
            "cascade-pre" => "Running end-of-run tombstone cascade".to_string(),
            "cascade-summary" => {
                format!("Cascade removed {}", self.field("removed").unwrap_or_else(|| "0".into()))
            }
            "run-done" => {
                let added = self.field("added").unwrap_or_else(|| "0".into());
                let removed = self.field("removed").unwrap_or_else(|| "0".into());
                format!("✔ Sync run finished: +{added} / -{removed}")
            }
            _ => match self.msg.as_deref() {
                Some(msg) if !msg.is_empty() => format!("{}: {msg}", self.event),
                _ => self.event.clone(),
            },
        }
    }

    fn nested_count(&self) -> Option<String> {
        let result = self.extra.get("result")?.as_object()?;
        result
            .get("count")
            .or_else(|| result.get("confirmed"))
            .map(|v| v.to_string())
    }
}

fn apply_verb(name: &str) -> &'static str {
    if name.contains("-remove-") {
        "removals"
    } else if name.contains("-update-") {
        "updates"
    } else {
        "additions"
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whole-run snapshot pushed by the summary feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSummary {
    pub running: Option<bool>,
    pub exit_code: Option<i32>,
    pub result: Option<String>,
    pub duration_sec: Option<f64>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub timeline: TimelinePhase,
}

impl RunSummary {
    /// True once the server reports the run as finished.
    pub fn is_finished(&self) -> bool {
        self.running == Some(false) && self.exit_code.is_some()
    }

    /// One-line description of a finished run.
    pub fn describe(&self) -> String {
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".into());
        let result = self
            .result
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(|r| format!(" {r}"))
            .unwrap_or_default();
        let duration = self
            .duration_sec
            .map(|d| format!(" in {d:.1}s"))
            .unwrap_or_default();
        format!("Run finished{result} (exit {code}){duration}")
    }
}

/// A decoded summary-feed message.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryPayload {
    Event(SyncEvent),
    Snapshot(RunSummary),
}

/// Decode one summary-feed message.
///
/// `sse_event` is the SSE `event:` field (`"message"` when absent). An object
/// without an `event` key takes its name from a non-default SSE event field;
/// otherwise it must look like a run snapshot.
pub fn parse_summary_payload(sse_event: &str, data: &str) -> Result<SummaryPayload, PayloadError> {
    let value: Value = serde_json::from_str(data.trim())?;
    let Value::Object(mut object) = value else {
        return Err(PayloadError::NotAnObject);
    };

    let has_event = object
        .get("event")
        .and_then(Value::as_str)
        .is_some_and(|e| !e.trim().is_empty());
    let sse_name = sse_event.trim();

    if !has_event && !sse_name.is_empty() && sse_name != "message" {
        object.insert("event".into(), Value::String(sse_name.to_string()));
        let event: SyncEvent = serde_json::from_value(Value::Object(object))?;
        return Ok(SummaryPayload::Event(event));
    }
    if has_event {
        let event: SyncEvent = serde_json::from_value(Value::Object(object))?;
        return Ok(SummaryPayload::Event(event));
    }
    if object.contains_key("timeline") || object.contains_key("running") {
        let summary: RunSummary = serde_json::from_value(Value::Object(object))?;
        return Ok(SummaryPayload::Snapshot(summary));
    }
    Err(PayloadError::Unrecognized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_event_name() {
        assert_eq!(normalize_event_name("run:start"), "run-start");
        assert_eq!(normalize_event_name(" Apply_Add:Progress "), "apply-add-progress");
        assert_eq!(normalize_event_name("run-done"), "run-done");
    }

    #[test]
    fn test_kind_table() {
        let cases = [
            ("run:start", EventKind::RunStart),
            ("run:pair", EventKind::RunStart),
            ("pair-start", EventKind::RunStart),
            ("snapshot:start", EventKind::PreSync),
            ("plan", EventKind::PreSync),
            ("one:plan", EventKind::PreSync),
            ("apply:start", EventKind::ApplyStart),
            ("apply:add:start", EventKind::ApplyStart),
            ("apply:remove:start", EventKind::ApplyStart),
            ("cascade:pre", EventKind::ApplyStart),
            ("apply:add:progress", EventKind::ApplyProgress),
            ("apply:remove:progress", EventKind::ApplyProgress),
            ("apply:add:done", EventKind::ApplyDone),
            ("cascade:summary", EventKind::ApplyDone),
            ("run:done", EventKind::RunDone),
            ("cascade:remove:start", EventKind::Other),
            ("totally-new-event", EventKind::Other),
        ];
        for (name, kind) in cases {
            assert_eq!(SyncEvent::named(name).kind(), kind, "{name}");
        }
    }

    #[test]
    fn test_debug_snapshot_message_is_presync() {
        let event = SyncEvent::named("debug").with_msg("building Snapshot for trakt");
        assert_eq!(event.kind(), EventKind::PreSync);
        let event = SyncEvent::named("debug").with_msg("apply:add:corrected");
        assert_eq!(event.kind(), EventKind::Other);
    }

    #[test]
    fn test_fraction_guards_bad_totals() {
        assert_eq!(SyncEvent::progress("x", 5.0, 10.0).fraction(), Some(0.5));
        assert_eq!(SyncEvent::progress("x", 15.0, 10.0).fraction(), Some(1.0));
        assert_eq!(SyncEvent::progress("x", 1.0, 0.0).fraction(), None);
        assert_eq!(SyncEvent::named("x").fraction(), None);
    }

    #[test]
    fn test_event_keeps_extra_fields() {
        let event = SyncEvent::from_json(
            r#"{"event":"apply:add:progress","dst":"TRAKT","feature":"watchlist","done":3,"total":9,"ok":true}"#,
        )
        .unwrap();
        assert_eq!(event.done, Some(3.0));
        assert_eq!(event.field("dst").as_deref(), Some("TRAKT"));
        assert_eq!(event.field("ok").as_deref(), Some("true"));
        assert_eq!(event.describe(), "Additions TRAKT [watchlist]: 3/9");
    }

    #[test]
    fn test_describe_common_events() {
        assert_eq!(SyncEvent::named("run:start").describe(), "▶ Sync run started");
        let plan = SyncEvent::named("plan")
            .with_field("feature", "history")
            .with_field("add", 4)
            .with_field("rem", 1);
        assert_eq!(plan.describe(), "Plan [history]: +4 / -1");
        let done = SyncEvent::named("run:done")
            .with_field("added", 7)
            .with_field("removed", 2);
        assert_eq!(done.describe(), "✔ Sync run finished: +7 / -2");
        let unknown = SyncEvent::named("cache:warm").with_msg("ok");
        assert_eq!(unknown.describe(), "cache:warm: ok");
    }

    #[test]
    fn test_parse_event_payload() {
        let payload =
            parse_summary_payload("apply:add:done", r#"{"event":"apply:add:done","count":3}"#).unwrap();
        assert!(matches!(payload, SummaryPayload::Event(e) if e.event == "apply:add:done"));
    }

    #[test]
    fn test_parse_takes_name_from_sse_field() {
        let payload = parse_summary_payload("run:done", r#"{"added":1}"#).unwrap();
        match payload {
            SummaryPayload::Event(e) => assert_eq!(e.kind(), EventKind::RunDone),
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_snapshot_payload() {
        let payload = parse_summary_payload(
            "message",
            r#"{"running":false,"exit_code":0,"result":"EQUAL","timeline":{"start":true,"pre":true,"post":true,"done":true},"plex_post":null}"#,
        )
        .unwrap();
        match payload {
            SummaryPayload::Snapshot(s) => {
                assert!(s.is_finished());
                assert!(s.timeline.done);
                assert_eq!(s.describe(), "Run finished EQUAL (exit 0)");
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(parse_summary_payload("message", "{oops"), Err(PayloadError::Json(_))));
        assert!(matches!(parse_summary_payload("message", "[1,2]"), Err(PayloadError::NotAnObject)));
        assert!(matches!(
            parse_summary_payload("message", r#"{"hello":1}"#),
            Err(PayloadError::Unrecognized)
        ));
    }
}
