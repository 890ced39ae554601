use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use crate::{config::WatchdogConfig, registry::WatchedApp};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "settings";

use crate::log_warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub watchdog: WatchdogConfig,
    /// Merged into the built-in registry, e.g. apps used on emulators.
    pub extra_watched_apps: Vec<WatchedApp>,
    pub monitoring_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            watchdog: WatchdogConfig::default(),
            extra_watched_apps: Vec::new(),
            monitoring_enabled: true,
        }
    }
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
            parse_or_default(&contents, &path)
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> UserSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn watchdog(&self) -> WatchdogConfig {
        self.get().watchdog
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        settings
            .watchdog
            .validate()
            .context("Refusing to store invalid watchdog settings")?;

        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn set_monitoring_enabled(&self, enabled: bool) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        next.monitoring_enabled = enabled;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

fn parse_or_default(contents: &str, path: &Path) -> UserSettings {
    match serde_json::from_str::<UserSettings>(contents) {
        Ok(settings) if settings.watchdog.validate().is_ok() => settings,
        Ok(settings) => {
            log_warn!(
                "Invalid watchdog settings in {}, using defaults for them",
                path.display()
            );
            UserSettings {
                watchdog: WatchdogConfig::default(),
                ..settings
            }
        }
        Err(err) => {
            log_warn!("Corrupt settings file {}: {err}", path.display());
            UserSettings::default()
        }
    }
}
