use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings backend poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Operator preferences that outlive a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub theme: Theme,
    pub install_prompt_dismissed: bool,
    pub ios_prompt_dismissed: bool,
}

/// Where serialized settings live.
pub trait SettingsBackend {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<String>, StorageError>;
    fn save(&self, contents: &str) -> Result<(), StorageError>;
}

/// One pretty-printed JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// In-process backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    contents: Mutex<Option<String>>,
}

impl SettingsBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>, StorageError> {
        self.contents
            .lock()
            .map(|c| c.clone())
            .map_err(|_| StorageError::Poisoned)
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        let mut c = self.contents.lock().map_err(|_| StorageError::Poisoned)?;
        *c = Some(contents.to_string());
        Ok(())
    }
}

/// Explicit load/modify/save lifecycle over a backend.
pub struct SettingsStore<B: SettingsBackend> {
    backend: B,
    current: AppSettings,
}

impl<B: SettingsBackend> SettingsStore<B> {
    /// Loads from the backend; nothing saved yet means defaults.
    pub fn open(backend: B) -> Result<Self, StorageError> {
        let current = match backend.load()? {
            Some(raw) => {
                let s: AppSettings = serde_json::from_str(&raw)?;
                info!("settings loaded (theme={:?})", s.theme);
                s
            }
            None => {
                warn!("no saved settings, using defaults");
                AppSettings::default()
            }
        };
        Ok(Self { backend, current })
    }

    pub fn settings(&self) -> &AppSettings {
        &self.current
    }

    pub fn save(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&self.current)?;
        self.backend.save(&json)?;
        info!("settings saved (theme={:?})", self.current.theme);
        Ok(())
    }

    /// Replaces the settings and persists them.
    pub fn update(&mut self, settings: AppSettings) -> Result<(), StorageError> {
        self.current = settings;
        self.save()
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, StorageError> {
        self.current.theme = self.current.theme.toggled();
        self.save()?;
        Ok(self.current.theme)
    }

    pub fn dismiss_install_prompt(&mut self) -> Result<(), StorageError> {
        self.current.install_prompt_dismissed = true;
        self.current.ios_prompt_dismissed = true;
        self.save()
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

/// Reads settings from a JSON file. Missing file gives the defaults.
pub fn load_settings(path: impl AsRef<Path>) -> Result<AppSettings, StorageError> {
    let store = SettingsStore::open(JsonFileBackend::new(path.as_ref()))?;
    Ok(store.current)
}

/// Writes settings to a JSON file (pretty-printed).
pub fn save_settings(settings: &AppSettings, path: impl AsRef<Path>) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(settings)?;
    JsonFileBackend::new(path.as_ref()).save(&json)?;
    info!("settings saved to {}", path.as_ref().display());
    Ok(())
}
