use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::config::StudyConfig;

/// Display theme identifier. Closed set; rendering is the host's business.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    Light,
    Dark,
    Sepia,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSettings {
    pub sound_enabled: bool,
    /// Stored for hosts that have a vibration primitive; the bundled chime
    /// engine ignores it.
    pub vibration_enabled: bool,
    pub urgent_threshold_seconds: i64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            vibration_enabled: false,
            urgent_threshold_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    #[serde(default)]
    alerts: AlertSettings,
    #[serde(default)]
    study_defaults: StudyConfig,
    #[serde(default)]
    theme: Theme,
}

/// File-backed preference store with an in-memory cache. The schedule engine
/// never reads this directly; resolved values are injected at study start.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn alerts(&self) -> AlertSettings {
        self.data.read().unwrap().alerts.clone()
    }

    pub fn study_defaults(&self) -> StudyConfig {
        self.data.read().unwrap().study_defaults.clone()
    }

    pub fn theme(&self) -> Theme {
        self.data.read().unwrap().theme
    }

    pub fn update_alerts(&self, alerts: AlertSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.alerts = alerts;
        self.persist(&guard)
    }

    pub fn update_study_defaults(&self, defaults: StudyConfig) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.study_defaults = defaults.sanitized();
        self.persist(&guard)
    }

    pub fn update_theme(&self, theme: Theme) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.theme = theme;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
