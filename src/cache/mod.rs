use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use log::debug;

pub const JPG_EXT: &str = "jpg";
pub const BMP_EXT: &str = "bmp";

/// Identifies one strip on disk: `{short_code}{YYMMDD}.{jpg|bmp}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub short_code: String,
    pub date: NaiveDate,
}

impl CacheKey {
    pub fn new(short_code: &str, date: NaiveDate) -> Self {
        Self {
            short_code: short_code.to_string(),
            date,
        }
    }

    pub fn stem(&self) -> String {
        format!(
            "{}{:02}{:02}{:02}",
            self.short_code,
            self.date.year().rem_euclid(100),
            self.date.month(),
            self.date.day()
        )
    }

    pub fn file_name(&self, ext: &str) -> String {
        format!("{}.{}", self.stem(), ext)
    }

    /// Destination of freshly downloaded strips.
    pub fn jpg_path(&self, folder: &Path) -> PathBuf {
        folder.join(self.file_name(JPG_EXT))
    }

    /// Lookup order: jpg first, then bmp.
    pub fn candidates(&self, folder: &Path) -> [PathBuf; 2] {
        [
            folder.join(self.file_name(JPG_EXT)),
            folder.join(self.file_name(BMP_EXT)),
        ]
    }
}

pub async fn ensure_folder(folder: &Path) -> Result<()> {
    tokio::fs::create_dir_all(folder)
        .await
        .with_context(|| format!("Failed to create cache folder: {}", folder.display()))
}

/// Returns the cached strip for `key`, if any. Creates `folder` when missing.
pub async fn resolve(key: &CacheKey, folder: &Path) -> Result<Option<PathBuf>> {
    ensure_folder(folder).await?;
    for candidate in key.candidates(folder) {
        let is_file = tokio::fs::metadata(&candidate)
            .await
            .is_ok_and(|m| m.is_file());
        if is_file {
            debug!("Cache hit: {}", candidate.display());
            return Ok(Some(candidate));
        }
    }
    debug!("Cache miss: {}", key.stem());
    Ok(None)
}

/// Accepts a bare file name that can be served from the cache folder.
pub fn is_servable_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.starts_with('.')
}

pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("bmp") => "image/bmp",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
