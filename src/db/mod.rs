//! Study-history store.
//!
//! SQLite connections are not `Sync`, so a dedicated worker thread owns the
//! connection and executes closures shipped over an mpsc channel; async
//! callers get their results back through a oneshot.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::oneshot;

mod migrations;
pub mod models;

use migrations::run_migrations;
use models::{StudyRecord, StudyStatus};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

fn parse_optional_datetime(value: Option<String>, field: &str) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

fn status_from_str(value: &str) -> Result<StudyStatus> {
    match value {
        "Running" => Ok(StudyStatus::Running),
        "Completed" => Ok(StudyStatus::Completed),
        "Cancelled" => Ok(StudyStatus::Cancelled),
        "Interrupted" => Ok(StudyStatus::Interrupted),
        other => Err(anyhow!("unknown study status '{other}'")),
    }
}

fn row_to_record(row: &Row) -> Result<StudyRecord> {
    let started_at: String = row.get("started_at")?;
    let stopped_at: Option<String> = row.get("stopped_at")?;
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(StudyRecord {
        id: row.get("id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        stopped_at: parse_optional_datetime(stopped_at, "stopped_at")?,
        status: status_from_str(&status)?,
        planned_seconds: row.get("planned_seconds")?,
        elapsed_seconds: row.get("elapsed_seconds")?,
        paragraphs_total: row.get("paragraphs_total")?,
        paragraphs_delivered: row.get("paragraphs_delivered")?,
        alerts_fired: row.get("alerts_fired")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("lectern-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(
                            Err(anyhow::Error::new(err).context("failed to open SQLite database")),
                        );
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_study(&self, record: &StudyRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO study_records (id, started_at, stopped_at, status, planned_seconds,
                     elapsed_seconds, paragraphs_total, paragraphs_delivered, alerts_fired,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    record.planned_seconds,
                    record.elapsed_seconds,
                    record.paragraphs_total,
                    record.paragraphs_delivered,
                    record.alerts_fired,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn update_study_progress(
        &self,
        id: &str,
        elapsed_seconds: i64,
        paragraphs_delivered: i64,
        alerts_fired: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE study_records
                 SET elapsed_seconds = ?2, paragraphs_delivered = ?3, alerts_fired = ?4,
                     updated_at = ?5
                 WHERE id = ?1",
                params![
                    id,
                    elapsed_seconds,
                    paragraphs_delivered,
                    alerts_fired,
                    updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn mark_study_status(
        &self,
        id: &str,
        status: StudyStatus,
        elapsed_seconds: i64,
        stopped_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE study_records
                 SET status = ?2, elapsed_seconds = ?3, stopped_at = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    id,
                    status.as_str(),
                    elapsed_seconds,
                    stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// A study left in `Running` means the last process died mid-delivery.
    pub async fn get_incomplete_study(&self) -> Result<Option<StudyRecord>> {
        self.execute(|conn| {
            let record = conn
                .query_row(
                    "SELECT * FROM study_records
                     WHERE status = 'Running'
                     ORDER BY started_at DESC
                     LIMIT 1",
                    [],
                    |row| Ok(row_to_record(row)),
                )
                .optional()?;
            record.transpose()
        })
        .await
    }

    pub async fn mark_study_interrupted(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE study_records
                 SET status = 'Interrupted', stopped_at = ?2, updated_at = ?2
                 WHERE id = ?1",
                params![id, now.to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn list_recent_studies(&self, limit: u32) -> Result<Vec<StudyRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM study_records
                 ORDER BY started_at DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| Ok(row_to_record(row)))?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row??);
            }
            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lectern-test-{}-{}.sqlite3", tag, uuid::Uuid::new_v4()))
    }

    fn record(id: &str, status: StudyStatus) -> StudyRecord {
        let now = Utc::now();
        StudyRecord {
            id: id.into(),
            started_at: now,
            stopped_at: None,
            status,
            planned_seconds: 3600,
            elapsed_seconds: 0,
            paragraphs_total: 12,
            paragraphs_delivered: 0,
            alerts_fired: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_update_and_read_back() {
        let path = temp_db_path("roundtrip");
        let db = Database::new(path.clone()).unwrap();

        db.insert_study(&record("a", StudyStatus::Running)).await.unwrap();
        db.update_study_progress("a", 120, 3, 1, Utc::now()).await.unwrap();
        db.mark_study_status("a", StudyStatus::Completed, 150, Some(Utc::now()), Utc::now())
            .await
            .unwrap();

        let records = db.list_recent_studies(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, StudyStatus::Completed);
        assert_eq!(records[0].elapsed_seconds, 150);
        assert_eq!(records[0].paragraphs_delivered, 3);

        drop(db);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn incomplete_study_is_found_and_recoverable() {
        let path = temp_db_path("recovery");
        let db = Database::new(path.clone()).unwrap();

        db.insert_study(&record("stale", StudyStatus::Running)).await.unwrap();
        let found = db.get_incomplete_study().await.unwrap();
        assert_eq!(found.map(|r| r.id), Some("stale".to_string()));

        db.mark_study_interrupted("stale", Utc::now()).await.unwrap();
        assert!(db.get_incomplete_study().await.unwrap().is_none());

        drop(db);
        let _ = std::fs::remove_file(path);
    }
}
