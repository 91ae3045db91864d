use serde::{Deserialize, Serialize};

/// Elapsed-time tracking for whichever segment is active.
///
/// Each phase transition re-activates the timer with that segment's budget,
/// which also re-arms the one-shot overtime latch. The same instance serves
/// introduction, paragraphs, review questions and conclusion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentTimer {
    elapsed_seconds: i64,
    budget_seconds: i64,
    alert_fired: bool,
}

impl SegmentTimer {
    pub fn new() -> Self {
        Self {
            elapsed_seconds: 0,
            budget_seconds: 0,
            alert_fired: false,
        }
    }

    /// Enters a new segment: elapsed returns to zero and the overtime latch
    /// re-arms. A non-positive budget disables overtime detection.
    pub fn activate(&mut self, budget_seconds: i64) {
        self.elapsed_seconds = 0;
        self.budget_seconds = budget_seconds;
        self.alert_fired = false;
    }

    /// Advances one second. Returns `true` exactly once per activation, on
    /// the tick that pushes elapsed past the budget.
    pub fn tick(&mut self) -> bool {
        self.elapsed_seconds += 1;
        if !self.alert_fired && self.budget_seconds > 0 && self.elapsed_seconds > self.budget_seconds
        {
            self.alert_fired = true;
            return true;
        }
        false
    }

    pub fn elapsed_seconds(&self) -> i64 {
        self.elapsed_seconds
    }

    pub fn budget_seconds(&self) -> i64 {
        self.budget_seconds
    }

    pub fn is_overtime(&self) -> bool {
        self.budget_seconds > 0 && self.elapsed_seconds > self.budget_seconds
    }

    pub fn overrun_seconds(&self) -> i64 {
        if self.is_overtime() {
            self.elapsed_seconds - self.budget_seconds
        } else {
            0
        }
    }
}

impl Default for SegmentTimer {
    fn default() -> Self {
        Self::new()
    }
}
