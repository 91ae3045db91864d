//! Terminal driver: prints the scaled plan for an analyzed document and can
//! run the live countdown interactively.
//!
//! Usage: lectern <document.json> [--minutes N] [--data-dir PATH] [--run]

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};

use lectern::{
    document::time_model, events::StudyEvent, ChimeEngine, Database, Document, EventSink,
    SettingsStore, StudyController, StudySession,
};

struct CliArgs {
    document_path: PathBuf,
    minutes: Option<u32>,
    data_dir: PathBuf,
    run: bool,
}

fn parse_args() -> Result<CliArgs> {
    let mut document_path = None;
    let mut minutes = None;
    let mut data_dir = PathBuf::from(".lectern");
    let mut run = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--minutes" => {
                let value = args.next().ok_or_else(|| anyhow!("--minutes needs a value"))?;
                minutes = Some(value.parse().context("--minutes must be a number")?);
            }
            "--data-dir" => {
                let value = args.next().ok_or_else(|| anyhow!("--data-dir needs a value"))?;
                data_dir = PathBuf::from(value);
            }
            "--run" => run = true,
            other if !other.starts_with("--") && document_path.is_none() => {
                document_path = Some(PathBuf::from(other));
            }
            other => return Err(anyhow!("unrecognized argument '{other}'")),
        }
    }

    Ok(CliArgs {
        document_path: document_path
            .ok_or_else(|| anyhow!("usage: lectern <document.json> [--minutes N] [--run]"))?,
        minutes,
        data_dir,
        run,
    })
}

fn mmss(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let s = seconds.abs();
    format!("{}{}:{:02}", sign, s / 60, s % 60)
}

/// Prints study events as they happen; the countdown line is rewritten by
/// each heartbeat.
struct TerminalSink;

impl EventSink for TerminalSink {
    fn emit(&self, event: StudyEvent) {
        match event {
            StudyEvent::StateChanged(snap) => {
                println!(
                    "[{}] {} | segment {} / {}",
                    mmss(snap.remaining_seconds),
                    snap.phase.label(),
                    mmss(snap.segment_elapsed_seconds),
                    mmss(snap.segment_budget_seconds),
                );
            }
            StudyEvent::Heartbeat(snap) => {
                println!(
                    "[{}] {} | {}s per question{}",
                    mmss(snap.remaining_seconds),
                    snap.phase.label(),
                    snap.per_question_seconds,
                    if snap.segment_overtime { " | OVERTIME" } else { "" },
                );
            }
            StudyEvent::AlertFired { severity } => {
                println!("*** {} alert ***", severity.as_str());
            }
            StudyEvent::StudyCompleted(info) => {
                println!(
                    "Study complete: {} of {} planned, {} paragraphs delivered",
                    mmss(info.elapsed_seconds),
                    mmss(info.planned_seconds),
                    info.paragraphs_delivered,
                );
            }
        }
    }
}

fn print_plan(document: &Document, session: &StudySession) {
    let now = Utc::now();
    let plan = session.plan();
    let budget = session.budget(now);

    println!(
        "Nominal {} -> planned {} (scale {:.2})",
        mmss(plan.nominal_total_seconds),
        mmss(plan.operator_total_seconds),
        plan.factor,
    );
    println!(
        "Introduction {} | conclusion {} | {}s per question | last question by {}",
        mmss(plan.introduction_seconds),
        mmss(plan.conclusion_seconds),
        budget.per_question_seconds,
        mmss(time_model::time_until_last_question(document)),
    );

    let mut offset = plan.introduction_seconds;
    println!("  #  start  length  questions");
    for (window, paragraph) in budget.paragraphs.iter().zip(&document.paragraphs) {
        println!(
            "{:>3}  {:>5}  {:>6}  {:>9}",
            window.number,
            mmss(offset),
            mmss(window.duration_seconds),
            paragraph.question_count(),
        );
        offset += window.duration_seconds;
    }
    if !document.final_questions.is_empty() {
        println!(
            "review: {} questions from {}",
            document.final_questions.len(),
            mmss(offset),
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = parse_args()?;

    let raw = std::fs::read_to_string(&args.document_path)
        .with_context(|| format!("failed to read {}", args.document_path.display()))?;
    let document: Arc<Document> =
        Arc::new(serde_json::from_str(&raw).context("document JSON did not match the analyzer schema")?);

    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("failed to create {}", args.data_dir.display()))?;
    let settings = SettingsStore::new(args.data_dir.join("settings.json"))?;
    let database = Database::new(args.data_dir.join("lectern.sqlite3"))?;

    // Finalize studies that were running when the process last died.
    if let Some(stale) = database.get_incomplete_study().await? {
        warn!("Recovered incomplete study {}; marking as Interrupted", stale.id);
        database.mark_study_interrupted(&stale.id, Utc::now()).await?;
    }

    let mut config = settings.study_defaults();
    if let Some(minutes) = args.minutes {
        config.total_duration_minutes = minutes;
    }
    let config = config.sanitized();

    let preview = StudySession::new(document.clone(), config.clone());
    print_plan(&document, &preview);

    if !args.run {
        return Ok(());
    }

    let alert_settings = settings.alerts();
    let notifier = Arc::new(ChimeEngine::new(alert_settings.sound_enabled));
    let controller = StudyController::new(database, Arc::new(TerminalSink), notifier);

    controller
        .start_study(document, config, alert_settings.urgent_threshold_seconds)
        .await?;

    println!("commands: n=next  b=back  p=pause/resume  s <secs>=seek  j <par>=jump  q=quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("n") => {
                let snap = controller.advance().await?;
                if snap.phase.is_finished() {
                    controller.end_study().await?;
                    break;
                }
            }
            Some("b") => {
                controller.retreat().await?;
            }
            Some("p") => {
                let running = controller
                    .snapshot()
                    .await
                    .map(|s| s.is_running)
                    .unwrap_or(false);
                if running {
                    controller.pause().await?;
                } else {
                    controller.resume().await?;
                }
            }
            Some("s") => match parts.next().and_then(|v| v.parse::<i64>().ok()) {
                Some(seconds) => {
                    controller.seek(seconds).await?;
                }
                None => println!("usage: s <seconds>"),
            },
            Some("j") => match parts.next().and_then(|v| v.parse::<usize>().ok()) {
                Some(number) => {
                    // Operator speaks in 1-based paragraph numbers.
                    controller.jump_to_paragraph(number.saturating_sub(1)).await?;
                }
                None => println!("usage: j <paragraph>"),
            },
            Some("q") => {
                controller.end_study().await?;
                break;
            }
            Some(other) => println!("unknown command '{other}'"),
            None => {}
        }
    }

    Ok(())
}
