use anyhow::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use log::{error, info, warn};
use serde_json::{Value, json};

use super::{ImageRequest, StatusResponse, catalog_error, error_body};
use crate::{
    ComicService,
    cache::{self, CacheKey},
    catalog::CatalogError,
    jobs::Ticket,
};

pub async fn handle_request_image(
    State(service): State<ComicService>,
    Json(request): Json<ImageRequest>,
) -> (StatusCode, Json<Value>) {
    match service
        .request_image(request.comic.as_deref(), request.date)
        .await
    {
        Ok(ticket) => (
            StatusCode::ACCEPTED,
            Json(json!({"status": "loading", "ticket": ticket})),
        ),
        Err(e) => match e.downcast::<CatalogError>() {
            Ok(e) => catalog_error(e),
            Err(e) => {
                error!("Image request failed: {:#}", e);
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to start image request: {:#}", e),
                )
            }
        },
    }
}

pub async fn handle_latest_status(State(service): State<ComicService>) -> Json<StatusResponse> {
    match service.tracker.poll_latest().await {
        Some(job) => Json(job.into()),
        None => Json(StatusResponse::idle()),
    }
}

pub async fn handle_ticket_status(
    State(service): State<ComicService>,
    Path(ticket): Path<Ticket>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<Value>)> {
    match service.tracker.poll(ticket).await {
        Some(job) => Ok(Json(job.into())),
        None => Err(error_body(
            StatusCode::NOT_FOUND,
            format!("unknown ticket: {}", ticket),
        )),
    }
}

pub async fn handle_serve_image(
    State(service): State<ComicService>,
    Path(filename): Path<String>,
) -> Response {
    if !cache::is_servable_name(&filename) {
        return error_body(StatusCode::BAD_REQUEST, format!("invalid file name: {}", filename))
            .into_response();
    }

    let path = service.folder.join(&filename);
    info!("Sending {}", path.display());
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, cache::content_type(&path))],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error_body(StatusCode::NOT_FOUND, format!("no such image: {}", filename))
                .into_response()
        }
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

impl ComicService {
    /// Serves `comic` on `date` from the cache, or starts a download for it.
    /// Either way the caller gets a ticket to poll.
    pub async fn request_image(&self, comic: Option<&str>, date: NaiveDate) -> Result<Ticket> {
        let comic = {
            let mut catalog = self.catalog.lock().await;
            match comic {
                Some(name) => catalog.set_selected(name)?.clone(),
                None => catalog.selected().clone(),
            }
        };

        if let Err(e) = self.settings.update(|s| s.date = date) {
            warn!("Failed to record last viewed date: {:#}", e);
        }
        self.save_settings().await;

        let key = CacheKey::new(&comic.short_code, date);
        let ticket = match cache::resolve(&key, &self.folder).await? {
            Some(path) => {
                info!("Loaded {} from {}", comic.name, path.display());
                self.tracker.record_hit(&key, path).await
            }
            None => {
                info!("No cached image for {} on {}, downloading", comic.name, date);
                self.tracker.submit(&comic, date, &self.folder).await?.ticket
            }
        };
        Ok(ticket)
    }
}
