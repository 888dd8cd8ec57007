pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod date_nav;
pub mod jobs;
pub mod resolver;
pub mod settings;
mod t_log;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post, put},
};
use log::warn;
use tokio::sync::Mutex;

use api::{
    comics::{handle_add_comic, handle_edit_comic, handle_list_comics, handle_select_comic},
    image::{handle_latest_status, handle_request_image, handle_serve_image, handle_ticket_status},
    navigate::handle_navigate,
};
use catalog::ComicCatalog;
use jobs::DownloadJobTracker;
use settings::SettingsStore;

/// Shared state behind every route.
#[derive(Clone)]
pub struct ComicService {
    catalog: Arc<Mutex<ComicCatalog>>,
    tracker: DownloadJobTracker,
    settings: Arc<SettingsStore>,
    folder: PathBuf,
}

impl ComicService {
    /// Builds the catalog from the stored settings. Every catalog change is mirrored
    /// into the in-memory settings; handlers call [`ComicService::save_settings`] once
    /// the catalog lock is released.
    pub fn new(settings: SettingsStore, folder: PathBuf, tracker: DownloadJobTracker) -> Result<Self> {
        let stored = settings.snapshot()?;
        let mut catalog = ComicCatalog::new(stored.comics, Some(&stored.selected_comic));

        let settings = Arc::new(settings);
        let store = settings.clone();
        catalog.subscribe(move |catalog, event| {
            if let Err(e) = store.update(|s| s.sync_catalog(catalog)) {
                warn!("Failed to record settings after {:?}: {:#}", event, e);
            }
        });

        Ok(Self {
            catalog: Arc::new(Mutex::new(catalog)),
            tracker,
            settings,
            folder,
        })
    }

    pub fn catalog(&self) -> &Arc<Mutex<ComicCatalog>> {
        &self.catalog
    }

    pub fn tracker(&self) -> &DownloadJobTracker {
        &self.tracker
    }

    pub fn folder(&self) -> &PathBuf {
        &self.folder
    }

    pub async fn save_settings(&self) {
        if let Err(e) = self.settings.save().await {
            warn!("Failed to save settings: {:#}", e);
        }
    }
}

pub fn router(service: ComicService) -> Router {
    Router::new()
        .route("/request_image", post(handle_request_image))
        .route("/status", get(handle_latest_status))
        .route("/status/{ticket}", get(handle_ticket_status))
        .route("/image/{filename}", get(handle_serve_image))
        .route("/comics", get(handle_list_comics).post(handle_add_comic))
        .route("/comics/select", post(handle_select_comic))
        .route("/comics/{name}", put(handle_edit_comic))
        .route("/navigate", post(handle_navigate))
        .with_state(service)
}
