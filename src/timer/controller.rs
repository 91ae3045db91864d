use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::info;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    alerts::Notify,
    config::StudyConfig,
    db::{
        models::{StudyRecord, StudyRecordInfo, StudyStatus},
        Database,
    },
    document::Document,
    events::{EventSink, StudyEvent},
    schedule::ScheduleBudget,
    session::{StudySession, StudySnapshot},
};

const ENABLE_LOGS: bool = false;
use crate::log_info;

struct ActiveStudy {
    session: StudySession,
    record_id: String,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Owns the live study and its 1-second cadence.
///
/// The session and the clock live behind one mutex; every tick and every
/// navigation takes that lock, so remaining time and position are always read
/// together. The ticker task only delivers cadence; all state transitions
/// happen inside [`StudySession`].
#[derive(Clone)]
pub struct StudyController {
    active: Arc<Mutex<Option<ActiveStudy>>>,
    db: Database,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn Notify>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl StudyController {
    pub fn new(db: Database, events: Arc<dyn EventSink>, notifier: Arc<dyn Notify>) -> Self {
        let debug_mode = std::env::var("LECTERN_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            active: Arc::new(Mutex::new(None)),
            db,
            events,
            notifier,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
        }
    }

    /// Shortens the tick cadence; for tests.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub async fn start_study(
        &self,
        document: Arc<Document>,
        config: StudyConfig,
        urgent_threshold_seconds: i64,
    ) -> Result<StudySnapshot> {
        {
            let active = self.active.lock().await;
            if let Some(study) = active.as_ref() {
                if !study.session.phase().is_finished() {
                    return Err(anyhow!("a study is already in progress"));
                }
            }
        }

        let config = config.sanitized();
        let record_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let mut session = StudySession::new(document.clone(), config.clone())
            .with_urgent_threshold(urgent_threshold_seconds);
        session.start(started_at);
        let snapshot = session.snapshot(started_at);

        let record = StudyRecord {
            id: record_id.clone(),
            started_at,
            stopped_at: None,
            status: StudyStatus::Running,
            planned_seconds: config.total_seconds(),
            elapsed_seconds: 0,
            paragraphs_total: document.paragraph_count() as i64,
            paragraphs_delivered: 0,
            alerts_fired: 0,
            created_at: started_at,
            updated_at: started_at,
        };
        self.db.insert_study(&record).await?;

        {
            let mut active = self.active.lock().await;
            *active = Some(ActiveStudy { session, record_id });
        }

        self.spawn_ticker().await;
        info!(
            "Study started: {} paragraphs in {} minutes (scale {:.2})",
            document.paragraph_count(),
            config.total_duration_minutes,
            snapshot.scale_factor
        );
        self.events.emit(StudyEvent::StateChanged(snapshot.clone()));

        Ok(snapshot)
    }

    pub async fn snapshot(&self) -> Option<StudySnapshot> {
        let active = self.active.lock().await;
        active.as_ref().map(|s| s.session.snapshot(Utc::now()))
    }

    pub async fn budget(&self) -> Option<ScheduleBudget> {
        let active = self.active.lock().await;
        active.as_ref().map(|s| s.session.budget(Utc::now()))
    }

    pub async fn pause(&self) -> Result<StudySnapshot> {
        self.mutate(|session, _now| session.pause()).await
    }

    pub async fn resume(&self) -> Result<StudySnapshot> {
        self.mutate(|session, now| session.resume(now)).await
    }

    pub async fn advance(&self) -> Result<StudySnapshot> {
        self.mutate(|session, now| {
            session.advance(now);
        })
        .await
    }

    pub async fn retreat(&self) -> Result<StudySnapshot> {
        self.mutate(|session, now| {
            session.retreat(now);
        })
        .await
    }

    pub async fn seek(&self, cumulative_seconds: i64) -> Result<StudySnapshot> {
        self.mutate(|session, now| session.seek(cumulative_seconds, now))
            .await
    }

    pub async fn jump_to_paragraph(&self, index: usize) -> Result<StudySnapshot> {
        self.mutate(|session, now| session.jump_to_paragraph(index, now))
            .await
    }

    async fn mutate<F>(&self, apply: F) -> Result<StudySnapshot>
    where
        F: FnOnce(&mut StudySession, chrono::DateTime<Utc>),
    {
        let now = Utc::now();
        let snapshot = {
            let mut active = self.active.lock().await;
            let study = active
                .as_mut()
                .ok_or_else(|| anyhow!("no active study"))?;
            apply(&mut study.session, now);
            study.session.snapshot(now)
        };
        self.events.emit(StudyEvent::StateChanged(snapshot.clone()));
        Ok(snapshot)
    }

    /// Finalizes the delivered study and releases the ticker.
    pub async fn end_study(&self) -> Result<StudyRecordInfo> {
        let stopped_at = Utc::now();

        let (snapshot, record_id) = {
            let mut active = self.active.lock().await;
            let mut study = active.take().ok_or_else(|| anyhow!("no active study to end"))?;
            study.session.pause();
            (study.session.snapshot(stopped_at), study.record_id)
        };

        self.cancel_ticker().await;

        self.db
            .mark_study_status(
                &record_id,
                StudyStatus::Completed,
                snapshot.elapsed_seconds,
                Some(stopped_at),
                stopped_at,
            )
            .await?;
        self.db
            .update_study_progress(
                &record_id,
                snapshot.elapsed_seconds,
                snapshot.paragraphs_delivered as i64,
                snapshot.alerts_fired as i64,
                stopped_at,
            )
            .await?;

        let info = StudyRecordInfo {
            id: record_id,
            started_at: snapshot.started_at.unwrap_or(stopped_at),
            stopped_at: Some(stopped_at),
            status: StudyStatus::Completed,
            planned_seconds: snapshot.total_seconds,
            elapsed_seconds: snapshot.elapsed_seconds,
            paragraphs_delivered: snapshot.paragraphs_delivered as i64,
        };

        self.events.emit(StudyEvent::StudyCompleted(info.clone()));
        info!(
            "Study completed after {}s of {}s planned",
            info.elapsed_seconds, info.planned_seconds
        );
        Ok(info)
    }

    /// Abandons the study without marking it delivered.
    pub async fn cancel_study(&self) -> Result<()> {
        let cancelled_at = Utc::now();
        let taken = {
            let mut active = self.active.lock().await;
            active.take()
        };

        self.cancel_ticker().await;

        if let Some(study) = taken {
            let snapshot = study.session.snapshot(cancelled_at);
            self.db
                .mark_study_status(
                    &study.record_id,
                    StudyStatus::Cancelled,
                    snapshot.elapsed_seconds,
                    Some(cancelled_at),
                    cancelled_at,
                )
                .await?;
        }
        Ok(())
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(ticker) = ticker_guard.take() {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let active = self.active.clone();
        let events = self.events.clone();
        let notifier = self.notifier.clone();
        let db = self.db.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately;
            // swallow it so second one lands a full period after start.
            interval.tick().await;

            let mut ticks: u32 = 0;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let (alerts, snapshot, record_id) = {
                    let mut guard = active.lock().await;
                    let Some(study) = guard.as_mut() else { break };
                    let alerts = study.session.tick();
                    let snapshot = study.session.snapshot(Utc::now());
                    (alerts, snapshot, study.record_id.clone())
                };

                log_info!(
                    "tick: {}s elapsed, {}s remaining, phase {}",
                    snapshot.elapsed_seconds,
                    snapshot.remaining_seconds,
                    snapshot.phase.label()
                );

                for severity in alerts {
                    notifier.notify(severity);
                    events.emit(StudyEvent::AlertFired { severity });
                }

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    let db_clone = db.clone();
                    let events_clone = events.clone();
                    let snapshot_clone = snapshot.clone();
                    tokio::spawn(async move {
                        let now = Utc::now();
                        let _ = db_clone
                            .update_study_progress(
                                &record_id,
                                snapshot_clone.elapsed_seconds,
                                snapshot_clone.paragraphs_delivered as i64,
                                snapshot_clone.alerts_fired as i64,
                                now,
                            )
                            .await;
                        events_clone.emit(StudyEvent::Heartbeat(snapshot_clone));
                    });
                }
            }
        });

        *ticker_guard = Some(Ticker { handle, cancel });
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::SilentNotifier;
    use crate::document::model::{Paragraph, Question};
    use crate::session::StudyPhase;
    use std::path::PathBuf;
    use std::sync::Mutex as StdMutex;

    struct CollectingSink {
        names: StdMutex<Vec<&'static str>>,
    }

    impl CollectingSink {
        fn new() -> Self {
            Self {
                names: StdMutex::new(Vec::new()),
            }
        }

        fn seen(&self, name: &str) -> bool {
            self.names.lock().unwrap().iter().any(|n| *n == name)
        }
    }

    impl EventSink for CollectingSink {
        fn emit(&self, event: StudyEvent) {
            self.names.lock().unwrap().push(event.name());
        }
    }

    fn temp_db_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lectern-ctrl-{}-{}.sqlite3", tag, Uuid::new_v4()))
    }

    fn document() -> Arc<Document> {
        Arc::new(Document {
            paragraphs: vec![Paragraph {
                number: 1,
                text: "One.".into(),
                word_count: 1,
                reading_time_seconds: 40,
                total_time_seconds: 75,
                questions: vec![Question {
                    text: "?".into(),
                    answer_time: 35,
                    is_final_question: false,
                    parenthesis_content: None,
                    content_type: None,
                }],
            }],
            final_questions: vec![],
            total_paragraphs: 1,
            total_words: 1,
            total_questions: 1,
            total_reading_time_seconds: 40,
            total_question_time_seconds: 35,
            total_time_seconds: 75,
            final_questions_start_time: 75,
        })
    }

    fn controller(path: PathBuf, sink: Arc<CollectingSink>) -> StudyController {
        let db = Database::new(path).unwrap();
        StudyController::new(db, sink, Arc::new(SilentNotifier))
    }

    #[tokio::test]
    async fn start_navigate_and_end_a_study() {
        let path = temp_db_path("lifecycle");
        let sink = Arc::new(CollectingSink::new());
        let controller = controller(path.clone(), sink.clone());

        let snapshot = controller
            .start_study(document(), StudyConfig::default(), 30)
            .await
            .unwrap();
        assert_eq!(snapshot.phase, StudyPhase::Introduction);
        assert!(snapshot.is_running);

        let snapshot = controller.advance().await.unwrap();
        assert_eq!(snapshot.phase, StudyPhase::Paragraph(0));

        let info = controller.end_study().await.unwrap();
        assert_eq!(info.status, StudyStatus::Completed);
        assert!(sink.seen("state-changed"));
        assert!(sink.seen("study-completed"));
        assert!(controller.snapshot().await.is_none());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_active() {
        let path = temp_db_path("reject");
        let sink = Arc::new(CollectingSink::new());
        let controller = controller(path.clone(), sink);

        controller
            .start_study(document(), StudyConfig::default(), 30)
            .await
            .unwrap();
        let second = controller
            .start_study(document(), StudyConfig::default(), 30)
            .await;
        assert!(second.is_err());

        controller.cancel_study().await.unwrap();
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn ticker_advances_the_clock() {
        let path = temp_db_path("ticker");
        let sink = Arc::new(CollectingSink::new());
        let controller =
            controller(path.clone(), sink).with_tick_interval(Duration::from_millis(10));

        controller
            .start_study(document(), StudyConfig::default(), 30)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = controller.snapshot().await.unwrap();
        assert!(snapshot.elapsed_seconds > 0);

        controller.cancel_study().await.unwrap();
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn navigation_without_a_study_errors() {
        let path = temp_db_path("noactive");
        let sink = Arc::new(CollectingSink::new());
        let controller = controller(path.clone(), sink);
        assert!(controller.advance().await.is_err());
        assert!(controller.end_study().await.is_err());
        let _ = std::fs::remove_file(path);
    }
}
