pub mod chime;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use log::warn;
use rodio::{OutputStream, Sink};
use serde::{Deserialize, Serialize};

use chime::ChimeTone;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AlertSeverity {
    /// The active segment ran past its budget.
    Warning,
    /// The whole study is nearly out of time.
    Urgent,
    /// Total time exhausted.
    Final,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Urgent => "urgent",
            AlertSeverity::Final => "final",
        }
    }
}

/// Fire-and-forget overtime notifier. Implementations must swallow their own
/// failures; a missed chime never reaches the schedule engine.
pub trait Notify: Send + Sync {
    fn notify(&self, severity: AlertSeverity);
}

/// Notifier that does nothing. Used in tests and headless runs.
pub struct SilentNotifier;

impl Notify for SilentNotifier {
    fn notify(&self, _severity: AlertSeverity) {}
}

enum ChimeCommand {
    Play(AlertSeverity),
}

/// Plays severity-coded chimes through the default audio output.
///
/// The rodio output handle is not `Send`, so a dedicated audio thread owns it
/// and receives commands over a channel, created lazily on the first chime.
pub struct ChimeEngine {
    tx: Arc<Mutex<Option<Sender<ChimeCommand>>>>,
    enabled: Arc<AtomicBool>,
}

impl ChimeEngine {
    pub fn new(enabled: bool) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn ensure_thread(&self) -> Result<Sender<ChimeCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<ChimeCommand>();

        thread::Builder::new()
            .name("chime-engine".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("failed to open audio output: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        ChimeCommand::Play(severity) => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                warn!("chime unavailable: {err}");
                                continue;
                            }
                            if let Some(ref s) = sink {
                                for tone in pattern_for(severity) {
                                    s.append(tone);
                                }
                            }
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }
}

impl Notify for ChimeEngine {
    fn notify(&self, severity: AlertSeverity) {
        if !self.enabled.load(Ordering::SeqCst) {
            return;
        }
        match self.ensure_thread() {
            Ok(tx) => {
                if tx.send(ChimeCommand::Play(severity)).is_err() {
                    warn!("chime thread is gone; alert {} dropped", severity.as_str());
                }
            }
            Err(err) => warn!("failed to start chime thread: {err}"),
        }
    }
}

/// Severity-coded tone sequences: one mid beep, two high beeps, three long
/// low beeps. Gaps are zero-amplitude tones on the same sink.
fn pattern_for(severity: AlertSeverity) -> Vec<ChimeTone> {
    match severity {
        AlertSeverity::Warning => vec![ChimeTone::beep(660.0, 350)],
        AlertSeverity::Urgent => vec![
            ChimeTone::beep(880.0, 250),
            ChimeTone::gap(120),
            ChimeTone::beep(880.0, 250),
        ],
        AlertSeverity::Final => vec![
            ChimeTone::beep(520.0, 500),
            ChimeTone::gap(150),
            ChimeTone::beep(520.0, 500),
            ChimeTone::gap(150),
            ChimeTone::beep(520.0, 700),
        ],
    }
}
