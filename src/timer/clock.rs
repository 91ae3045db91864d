use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The single study countdown.
///
/// Pure state transitions at 1-second resolution; an external ticker owns the
/// cadence and calls [`StudyClock::tick`]. Remaining time is derived, never
/// stored: the signed value goes negative in overtime, and the clamped value
/// is what a countdown display shows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyClock {
    total_seconds: i64,
    elapsed_seconds: i64,
    started_at: Option<DateTime<Utc>>,
    is_running: bool,
}

impl StudyClock {
    pub fn new(total_seconds: i64) -> Self {
        Self {
            total_seconds,
            elapsed_seconds: 0,
            started_at: None,
            is_running: false,
        }
    }

    /// Starts or resumes. `started_at` is recorded on the first start only;
    /// resuming after a pause keeps the original anchor. Idempotent while
    /// running.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.is_running = true;
    }

    /// Freezes elapsed/remaining at their last tick value.
    pub fn pause(&mut self) {
        self.is_running = false;
    }

    pub fn reset(&mut self, total_seconds: i64) {
        *self = Self::new(total_seconds);
    }

    /// Jumps the clock as if `cumulative_seconds` had already elapsed and
    /// starts it. Seeking past the total leaves the signed remaining
    /// negative; that is overtime, not an error.
    pub fn seek(&mut self, cumulative_seconds: i64, now: DateTime<Utc>) {
        self.elapsed_seconds = cumulative_seconds;
        self.started_at = Some(now - Duration::seconds(cumulative_seconds));
        self.is_running = true;
    }

    /// Advances one second. No-op while paused.
    pub fn tick(&mut self) {
        if self.is_running {
            self.elapsed_seconds += 1;
        }
    }

    pub fn elapsed_seconds(&self) -> i64 {
        self.elapsed_seconds
    }

    pub fn total_seconds(&self) -> i64 {
        self.total_seconds
    }

    /// Signed remaining time; negative means overtime.
    pub fn remaining_seconds(&self) -> i64 {
        self.total_seconds - self.elapsed_seconds
    }

    /// Display form of the countdown, floored at zero.
    pub fn remaining_clamped(&self) -> i64 {
        self.remaining_seconds().max(0)
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_overtime(&self) -> bool {
        self.remaining_seconds() < 0
    }
}
