use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

/// Timing and threshold knobs of the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Invested time accrues in steps of this size.
    pub tick_interval_secs: u64,
    /// How long the scanner waits for the next page of a lazy list.
    pub pagination_timeout_secs: u64,
    /// Bound on the course-style header probe.
    pub classify_timeout_secs: u64,
    /// Watch-page playlists at or above this size must be enrolled from the
    /// playlist page.
    pub large_playlist_threshold: usize,
    pub wide_layout_min_width: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 30,
            pagination_timeout_secs: 60,
            classify_timeout_secs: 120,
            large_playlist_threshold: 200,
            wide_layout_min_width: 1080,
        }
    }
}

impl TrackerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn pagination_timeout(&self) -> Duration {
        Duration::from_secs(self.pagination_timeout_secs)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    tracker: TrackerSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn tracker(&self) -> TrackerSettings {
        match self.data.read() {
            Ok(guard) => guard.tracker.clone(),
            Err(poisoned) => poisoned.into_inner().tracker.clone(),
        }
    }

    pub fn update_tracker(&self, settings: TrackerSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        guard.tracker = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
