//! Synchronization settings and the configuration source
//!
//! The engine treats a [`SyncConfig`] as immutable for the lifetime of a
//! session. [`ConfigSource`] publishes changes through a watch channel; each
//! published change ends the current session and starts a new one.

use crate::{
    constants::{
        DATA_DIR_ENV, DEFAULT_FX_INTERVAL_MS, DEFAULT_HISTORY_INTERVAL_MS,
        DEFAULT_PRICE_INTERVAL_MS, MIN_TIMER_PERIOD_MS, SETTINGS_FILE_NAME,
    },
    error::ConfigError,
    types::Coin,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;

/// Selectable price refresh cadences: (label, milliseconds)
pub const PRICE_INTERVAL_PRESETS: &[(&str, u64)] = &[
    ("15 s", 15_000),
    ("30 s", 30_000),
    ("1 min", 60_000),
    ("2 min", 120_000),
];

/// Selectable history / exchange rate cadences: (label, milliseconds)
pub const SLOW_INTERVAL_PRESETS: &[(&str, u64)] = &[
    ("1 min", 60_000),
    ("5 min", 300_000),
    ("10 min", 600_000),
    ("15 min", 900_000),
];

/// Coin selection and refresh cadences of one sync session
///
/// Intervals are not validated. A zero interval is only raised to the
/// smallest constructible timer period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub coin: Coin,
    pub price_interval_ms: u64,
    pub history_interval_ms: u64,
    pub fx_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            coin: Coin::BTC,
            price_interval_ms: DEFAULT_PRICE_INTERVAL_MS,
            history_interval_ms: DEFAULT_HISTORY_INTERVAL_MS,
            fx_interval_ms: DEFAULT_FX_INTERVAL_MS,
        }
    }
}

impl SyncConfig {
    pub fn price_interval(&self) -> Duration {
        timer_period(self.price_interval_ms)
    }

    pub fn history_interval(&self) -> Duration {
        timer_period(self.history_interval_ms)
    }

    pub fn fx_interval(&self) -> Duration {
        timer_period(self.fx_interval_ms)
    }

    /// Returns a copy with every field set in `update` replaced
    pub fn merged(&self, update: &SettingsUpdate) -> Self {
        Self {
            coin: update.coin.unwrap_or(self.coin),
            price_interval_ms: update.price_interval_ms.unwrap_or(self.price_interval_ms),
            history_interval_ms: update.history_interval_ms.unwrap_or(self.history_interval_ms),
            fx_interval_ms: update.fx_interval_ms.unwrap_or(self.fx_interval_ms),
        }
    }

    /// Load settings from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from_path(path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable settings");
                Self::default()
            }
        }
    }

    /// Save settings to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default settings file: `$CRYPTO_OVERLAY_DATA_DIR` or the platform
    /// config directory
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return Ok(Path::new(&dir).join(SETTINGS_FILE_NAME));
        }

        let dirs = directories::ProjectDirs::from("com", "jvelascodev", "crypto-overlay")
            .ok_or(ConfigError::NoDataDir)?;
        Ok(dirs.config_dir().join(SETTINGS_FILE_NAME))
    }
}

fn timer_period(ms: u64) -> Duration {
    Duration::from_millis(ms.max(MIN_TIMER_PERIOD_MS))
}

/// Partial settings change coming from the settings UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub coin: Option<Coin>,
    pub price_interval_ms: Option<u64>,
    pub history_interval_ms: Option<u64>,
    pub fx_interval_ms: Option<u64>,
}

impl SettingsUpdate {
    pub fn coin(coin: Coin) -> Self {
        Self {
            coin: Some(coin),
            ..Self::default()
        }
    }
}

/// Owner of the current [`SyncConfig`]
///
/// Subscribers are only notified when an update changes the value.
pub struct ConfigSource {
    tx: watch::Sender<SyncConfig>,
    path: Option<PathBuf>,
}

impl ConfigSource {
    /// In-memory source, nothing persisted
    pub fn new(initial: SyncConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx, path: None }
    }

    /// Source persisted to `path`, seeded from it when present
    pub fn persisted(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, _rx) = watch::channel(SyncConfig::load_or_default(&path));
        Self {
            tx,
            path: Some(path),
        }
    }

    pub fn current(&self) -> SyncConfig {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncConfig> {
        self.tx.subscribe()
    }

    /// Applies a partial change; returns whether anything changed
    ///
    /// Persistence is best effort: a failed save is logged and the new value
    /// is still published.
    pub fn update(&self, update: SettingsUpdate) -> bool {
        let mut next = None;
        let changed = self.tx.send_if_modified(|config| {
            let merged = config.merged(&update);
            if merged == *config {
                return false;
            }
            *config = merged;
            next = Some(merged);
            true
        });

        if let (Some(config), Some(path)) = (next, &self.path) {
            if let Err(e) = config.save_to_path(path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to persist settings");
            }
        }

        changed
    }
}
