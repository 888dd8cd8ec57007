//! Persisted viewer settings.
//!
//! Stored as pretty-printed JSON. A missing or unreadable file falls back to the
//! defaults, and keys absent from an older file take their default values.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::catalog::{ComicCatalog, ComicDefinition, default_comic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub date: NaiveDate,
    pub folder_path: String,
    pub comics: Vec<ComicDefinition>,
    pub selected_comic: String,
}

impl Default for Settings {
    fn default() -> Self {
        let comic = default_comic();
        Self {
            date: Local::now().date_naive(),
            folder_path: String::new(),
            selected_comic: comic.name.clone(),
            comics: vec![comic],
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Error loading settings: {:#}. Resetting to defaults.", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Copies the catalog's comic list and selection into the settings.
    pub fn sync_catalog(&mut self, catalog: &ComicCatalog) {
        self.comics = catalog.comics().to_vec();
        self.selected_comic = catalog.selected().name.clone();
    }
}

/// Settings plus the file they are saved to. Updates change the in-memory copy;
/// `save` writes the current copy out.
pub struct SettingsStore {
    path: PathBuf,
    settings: Mutex<Settings>,
    write_lock: tokio::sync::Mutex<()>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = Settings::load(&path);
        Self {
            path,
            settings: Mutex::new(settings),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Result<Settings> {
        let settings = self
            .settings
            .lock()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        Ok(settings.clone())
    }

    pub fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<()> {
        let mut settings = self
            .settings
            .lock()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        apply(&mut settings);
        Ok(())
    }

    /// Writes the latest settings. Saves are serialized so an older copy never
    /// lands after a newer one.
    pub async fn save(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let settings = self.snapshot()?;
        settings.save(&self.path).await
    }
}
