//! Detects connections that stay open but stop delivering messages.
//!
//! Some servers and proxies hold a half-dead socket open indefinitely; the
//! only symptom is silence. While the terminal is focused, silence longer
//! than the threshold asks the owning stream for one forced reconnect.

use std::time::{Duration, Instant};

/// Staleness check for one stream.
#[derive(Debug, Clone)]
pub struct StalenessWatchdog {
    threshold: Duration,
    armed: bool,
    last_forced: Option<Instant>,
}

impl StalenessWatchdog {
    /// New, disarmed watchdog.
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            armed: false,
            last_forced: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Start watching a freshly opened stream.
    pub fn arm(&mut self) {
        self.armed = true;
        self.last_forced = None;
    }

    /// Stop watching; no reconnect will be requested until re-armed.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.last_forced = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Periodic check. Returns true when a forced reconnect is due.
    ///
    /// A forced reconnect counts as activity, so one stale episode yields
    /// exactly one reconnect.
    pub fn check(&mut self, now: Instant, last_activity: Instant, visible: bool) -> bool {
        if !self.armed || !visible {
            return false;
        }
        let effective = match self.last_forced {
            Some(forced) => forced.max(last_activity),
            None => last_activity,
        };
        if now.saturating_duration_since(effective) > self.threshold {
            self.last_forced = Some(now);
            return true;
        }
        false
    }

    /// Focus changed. Regaining focus runs the same check immediately.
    pub fn visibility_changed(&mut self, visible: bool, now: Instant, last_activity: Instant) -> bool {
        visible && self.check(now, last_activity, true)
    }
}
