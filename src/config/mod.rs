use std::path::{Path, PathBuf};

use clap::Parser;

use crate::resolver::DEFAULT_PAGE_TEMPLATE;

#[derive(Debug, Parser)]
pub struct Config {
    #[clap(long, env = "PORT", default_value = "5000")]
    port: u16,
    #[clap(long, env = "COMIC_VIEWER_PATH")]
    folder: Option<PathBuf>,
    #[clap(long, env = "COMIC_SETTINGS_FILE", default_value = "settings.json")]
    settings_file: PathBuf,
    #[clap(long, env = "COMIC_PAGE_TEMPLATE", default_value = DEFAULT_PAGE_TEMPLATE)]
    page_template: String,

    #[clap(long, env = "LIMIT", default_value = "4")]
    limit: usize,
}

impl Config {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }

    pub fn page_template(&self) -> &str {
        &self.page_template
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Cache folder: the flag or env var, then the stored folder, then `~/Pictures/comics`.
    pub fn cache_folder(&self, stored: &str) -> PathBuf {
        if let Some(folder) = &self.folder {
            return folder.clone();
        }
        if !stored.trim().is_empty() {
            return PathBuf::from(stored.trim());
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Pictures")
            .join("comics")
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn folder_flag_wins_over_stored_path() {
        let config =
            Config::try_parse_from(["comic-cache", "--folder", "/srv/comics"]).unwrap();
        assert_eq!(config.cache_folder("/home/me/strips"), PathBuf::from("/srv/comics"));
    }

    #[test]
    fn stored_path_used_without_flag() {
        let config = Config::try_parse_from(["comic-cache"]).unwrap();
        if config.folder.is_none() {
            assert_eq!(config.cache_folder(" /home/me/strips "), PathBuf::from("/home/me/strips"));
            assert!(config.cache_folder("").ends_with("Pictures/comics"));
        }
    }
}
