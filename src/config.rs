use serde::{Deserialize, Serialize};

use crate::document::model::DEFAULT_ANSWER_SECONDS;

pub const MIN_TOTAL_MINUTES: u32 = 15;
pub const MAX_TOTAL_MINUTES: u32 = 90;
pub const DEFAULT_TOTAL_MINUTES: u32 = 60;
pub const DEFAULT_INTRODUCTION_SECONDS: u32 = 60;
pub const DEFAULT_CONCLUSION_SECONDS: u32 = 60;
pub const DEFAULT_READING_SPEED_WPM: u32 = 160;

/// Operator-chosen study parameters.
///
/// The engine assumes these are already validated; [`StudyConfig::sanitized`]
/// is the boundary where raw operator input gets clamped. Introduction and
/// conclusion values are nominal and get scaled with everything else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudyConfig {
    pub total_duration_minutes: u32,
    pub introduction_seconds: u32,
    pub conclusion_seconds: u32,
    pub answer_seconds: u32,
    /// Feeds the document analyzer, not the schedule engine; kept so the
    /// driver can report it alongside the plan.
    pub reading_speed_wpm: u32,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            total_duration_minutes: DEFAULT_TOTAL_MINUTES,
            introduction_seconds: DEFAULT_INTRODUCTION_SECONDS,
            conclusion_seconds: DEFAULT_CONCLUSION_SECONDS,
            answer_seconds: DEFAULT_ANSWER_SECONDS,
            reading_speed_wpm: DEFAULT_READING_SPEED_WPM,
        }
    }
}

impl StudyConfig {
    /// Clamps raw operator input into the supported ranges.
    pub fn sanitized(mut self) -> Self {
        self.total_duration_minutes = self
            .total_duration_minutes
            .clamp(MIN_TOTAL_MINUTES, MAX_TOTAL_MINUTES);
        if self.answer_seconds == 0 {
            self.answer_seconds = DEFAULT_ANSWER_SECONDS;
        }
        if self.reading_speed_wpm == 0 {
            self.reading_speed_wpm = DEFAULT_READING_SPEED_WPM;
        }
        self
    }

    pub fn total_seconds(&self) -> i64 {
        self.total_duration_minutes as i64 * 60
    }
}
