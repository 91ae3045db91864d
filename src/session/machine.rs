//! The presentation state machine.
//!
//! One explicit state struct owns everything mutable about a live study: the
//! phase, the countdown clock, the active segment's timer and the one-shot
//! alert latches. Every transition and every tick re-derives the schedule
//! budget from position and remaining time; nothing else carries over.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::AlertSeverity;
use crate::config::StudyConfig;
use crate::document::Document;
use crate::schedule::budget::{self, BudgetInputs, ScheduleBudget};
use crate::schedule::scale::{scale_seconds, ScalePlan};
use crate::session::phase::StudyPhase;
use crate::timer::clock::StudyClock;
use crate::timer::segment::SegmentTimer;

pub const DEFAULT_URGENT_THRESHOLD_SECONDS: i64 = 30;

/// Serializable view of the session for event payloads and the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySnapshot {
    pub phase: StudyPhase,
    pub has_started: bool,
    pub is_running: bool,
    pub elapsed_seconds: i64,
    pub remaining_seconds: i64,
    pub remaining_display_seconds: i64,
    pub total_seconds: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub scale_factor: f64,
    pub per_question_seconds: i64,
    pub segment_elapsed_seconds: i64,
    pub segment_budget_seconds: i64,
    pub segment_overtime: bool,
    pub paragraphs_delivered: usize,
    pub paragraph_count: usize,
    pub final_question_count: usize,
    pub alerts_fired: u32,
}

pub struct StudySession {
    document: Arc<Document>,
    config: StudyConfig,
    plan: ScalePlan,
    clock: StudyClock,
    phase: StudyPhase,
    has_started: bool,
    segment: SegmentTimer,
    urgent_threshold_seconds: i64,
    urgent_fired: bool,
    final_fired: bool,
    alerts_fired: u32,
}

impl StudySession {
    pub fn new(document: Arc<Document>, config: StudyConfig) -> Self {
        let plan = ScalePlan::new(&document, &config);
        let clock = StudyClock::new(config.total_seconds());
        Self {
            document,
            config,
            plan,
            clock,
            phase: StudyPhase::Introduction,
            has_started: false,
            segment: SegmentTimer::new(),
            urgent_threshold_seconds: DEFAULT_URGENT_THRESHOLD_SECONDS,
            urgent_fired: false,
            final_fired: false,
            alerts_fired: 0,
        }
    }

    pub fn with_urgent_threshold(mut self, seconds: i64) -> Self {
        self.urgent_threshold_seconds = seconds;
        self
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        if !self.has_started {
            self.has_started = true;
            self.segment.activate(self.plan.introduction_seconds);
        }
        self.clock.start(now);
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.has_started && !self.phase.is_finished() {
            self.clock.start(now);
        }
    }

    /// Moves to the next segment. Entering `Finished` pauses the clock.
    /// Returns false when nothing changed (not started, or already finished).
    pub fn advance(&mut self, now: DateTime<Utc>) -> bool {
        if !self.has_started {
            return false;
        }
        let next = self
            .phase
            .advance(self.document.paragraph_count(), self.document.final_question_count());
        if next == self.phase {
            return false;
        }
        self.enter(next, now);
        true
    }

    /// Moves to the previous segment; the exact inverse of `advance`,
    /// including restarting the clock when leaving `Finished`.
    pub fn retreat(&mut self, now: DateTime<Utc>) -> bool {
        if !self.has_started {
            return false;
        }
        let previous = self
            .phase
            .retreat(self.document.paragraph_count(), self.document.final_question_count());
        if previous == self.phase {
            return false;
        }
        let was_finished = self.phase.is_finished();
        self.enter(previous, now);
        if was_finished {
            self.clock.start(now);
        }
        true
    }

    fn enter(&mut self, phase: StudyPhase, now: DateTime<Utc>) {
        self.phase = phase;
        if phase.is_finished() {
            self.clock.pause();
            self.segment.activate(0);
        } else {
            let estimate = self.segment_estimate(phase, now);
            self.segment.activate(estimate);
        }
    }

    /// Estimated duration of a segment at the instant it becomes active:
    /// scaled bookend times for introduction/conclusion, the adaptive window
    /// for a paragraph, the adjusted per-question slice for a review question.
    fn segment_estimate(&self, phase: StudyPhase, now: DateTime<Utc>) -> i64 {
        match phase {
            StudyPhase::Introduction => self.plan.introduction_seconds,
            StudyPhase::Conclusion => self.plan.conclusion_seconds,
            StudyPhase::Finished => 0,
            StudyPhase::Paragraph(i) => {
                let budget = self.budget_for_position(i, now);
                budget
                    .paragraphs
                    .get(i)
                    .map(|w| w.duration_seconds)
                    .unwrap_or(0)
            }
            StudyPhase::Review(_) => self.budget(now).per_question_seconds,
        }
    }

    /// Jumps the clock as if `cumulative_seconds` had already elapsed.
    pub fn seek(&mut self, cumulative_seconds: i64, now: DateTime<Utc>) {
        self.has_started = true;
        self.clock.seek(cumulative_seconds.max(0), now);
    }

    /// Jumps into the middle of the document: the clock lands on the
    /// scale-only projected start of the chosen paragraph and the phase
    /// follows.
    pub fn jump_to_paragraph(&mut self, index: usize, now: DateTime<Utc>) {
        let count = self.document.paragraph_count();
        if count == 0 {
            return;
        }
        let index = index.min(count - 1);
        let offset: i64 = self.plan.introduction_seconds
            + self.document.paragraphs[..index]
                .iter()
                .map(|p| scale_seconds(p.total_time_seconds, self.plan.factor))
                .sum::<i64>();
        self.has_started = true;
        self.clock.seek(offset, now);
        self.enter(StudyPhase::Paragraph(index), now);
    }

    pub fn reset(&mut self) {
        self.clock.reset(self.config.total_seconds());
        self.phase = StudyPhase::Introduction;
        self.has_started = false;
        self.segment = SegmentTimer::new();
        self.urgent_fired = false;
        self.final_fired = false;
        self.alerts_fired = 0;
    }

    /// One second of study time. The clock update is fully applied before
    /// any threshold is evaluated. Returns the alerts this tick fired.
    pub fn tick(&mut self) -> Vec<AlertSeverity> {
        if !self.clock.is_running() {
            return Vec::new();
        }
        self.clock.tick();

        let mut alerts = Vec::new();
        if self.segment.tick() {
            alerts.push(AlertSeverity::Warning);
        }
        let remaining = self.clock.remaining_seconds();
        if !self.urgent_fired && remaining > 0 && remaining <= self.urgent_threshold_seconds {
            self.urgent_fired = true;
            alerts.push(AlertSeverity::Urgent);
        }
        if !self.final_fired && remaining <= 0 {
            self.final_fired = true;
            alerts.push(AlertSeverity::Final);
        }
        self.alerts_fired += alerts.len() as u32;
        alerts
    }

    pub fn budget(&self, now: DateTime<Utc>) -> ScheduleBudget {
        let position = self
            .phase
            .current_paragraph_index(self.document.paragraph_count());
        self.budget_for_position(position, now)
    }

    fn budget_for_position(&self, position: usize, now: DateTime<Utc>) -> ScheduleBudget {
        budget::compute(&BudgetInputs {
            document: &self.document,
            current_paragraph: position,
            remaining_seconds: self.clock.remaining_seconds(),
            scale_factor: self.plan.factor,
            nominal_answer_seconds: self.config.answer_seconds,
            study_started_at: self.clock.started_at().unwrap_or(now),
            now,
        })
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> StudySnapshot {
        let paragraph_count = self.document.paragraph_count();
        StudySnapshot {
            phase: self.phase,
            has_started: self.has_started,
            is_running: self.clock.is_running(),
            elapsed_seconds: self.clock.elapsed_seconds(),
            remaining_seconds: self.clock.remaining_seconds(),
            remaining_display_seconds: self.clock.remaining_clamped(),
            total_seconds: self.clock.total_seconds(),
            started_at: self.clock.started_at(),
            scale_factor: self.plan.factor,
            per_question_seconds: self.budget(now).per_question_seconds,
            segment_elapsed_seconds: self.segment.elapsed_seconds(),
            segment_budget_seconds: self.segment.budget_seconds(),
            segment_overtime: self.segment.is_overtime(),
            paragraphs_delivered: self.phase.current_paragraph_index(paragraph_count),
            paragraph_count,
            final_question_count: self.document.final_question_count(),
            alerts_fired: self.alerts_fired,
        }
    }

    pub fn phase(&self) -> StudyPhase {
        self.phase
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn plan(&self) -> &ScalePlan {
        &self.plan
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn alerts_fired(&self) -> u32 {
        self.alerts_fired
    }

    pub fn clock(&self) -> &StudyClock {
        &self.clock
    }
}
