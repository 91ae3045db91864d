//! Adaptive presentation-timing engine.
//!
//! Fits a document's authored segment durations into an operator-chosen
//! total, then continuously re-distributes the remaining time across the
//! segments not yet delivered while a live countdown runs.

pub mod alerts;
pub mod config;
pub mod db;
pub mod document;
pub mod events;
pub mod schedule;
pub mod session;
pub mod settings;
pub mod timer;
pub mod utils;

pub use alerts::{AlertSeverity, ChimeEngine, Notify, SilentNotifier};
pub use config::StudyConfig;
pub use db::Database;
pub use document::{Document, Paragraph, Question};
pub use events::{EventSink, NullSink, StudyEvent};
pub use schedule::{ScalePlan, ScheduleBudget};
pub use session::{StudyPhase, StudySession, StudySnapshot};
pub use settings::SettingsStore;
pub use timer::{StudyClock, StudyController};
