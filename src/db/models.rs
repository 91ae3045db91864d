use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StudyStatus {
    Running,
    Completed,
    Cancelled,
    Interrupted,
}

impl StudyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyStatus::Running => "Running",
            StudyStatus::Completed => "Completed",
            StudyStatus::Cancelled => "Cancelled",
            StudyStatus::Interrupted => "Interrupted",
        }
    }
}

/// One delivered (or in-flight) study, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: StudyStatus,
    pub planned_seconds: i64,
    pub elapsed_seconds: i64,
    pub paragraphs_total: i64,
    pub paragraphs_delivered: i64,
    pub alerts_fired: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a record that event consumers care about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyRecordInfo {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: StudyStatus,
    pub planned_seconds: i64,
    pub elapsed_seconds: i64,
    pub paragraphs_delivered: i64,
}

impl From<StudyRecord> for StudyRecordInfo {
    fn from(record: StudyRecord) -> Self {
        Self {
            id: record.id,
            started_at: record.started_at,
            stopped_at: record.stopped_at,
            status: record.status,
            planned_seconds: record.planned_seconds,
            elapsed_seconds: record.elapsed_seconds,
            paragraphs_delivered: record.paragraphs_delivered,
        }
    }
}
