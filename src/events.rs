use serde::Serialize;

use crate::alerts::AlertSeverity;
use crate::db::models::StudyRecordInfo;
use crate::session::StudySnapshot;

/// Everything the controller tells the embedding host about a live study.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum StudyEvent {
    /// A transition, navigation or lifecycle change happened.
    StateChanged(StudySnapshot),
    /// Periodic tick-path progress.
    Heartbeat(StudySnapshot),
    AlertFired { severity: AlertSeverity },
    StudyCompleted(StudyRecordInfo),
}

impl StudyEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StudyEvent::StateChanged(_) => "state-changed",
            StudyEvent::Heartbeat(_) => "heartbeat",
            StudyEvent::AlertFired { .. } => "alert-fired",
            StudyEvent::StudyCompleted(_) => "study-completed",
        }
    }
}

/// Outbound event port. The host decides what rendering means; emission must
/// not block and must not fail the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: StudyEvent);
}

/// Sink that drops everything; for headless use and tests.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: StudyEvent) {}
}
