use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use log::info;
use serde_json::{Value, json};

use super::{ComicsResponse, SelectRequest, catalog_error, error_body};
use crate::{ComicService, catalog::ComicDefinition};

pub async fn handle_list_comics(State(service): State<ComicService>) -> Json<ComicsResponse> {
    let catalog = service.catalog.lock().await;
    Json(ComicsResponse {
        comics: catalog.comics().to_vec(),
        selected: catalog.selected().name.clone(),
    })
}

pub async fn handle_add_comic(
    State(service): State<ComicService>,
    Json(definition): Json<ComicDefinition>,
) -> (StatusCode, Json<Value>) {
    let response = {
        let mut catalog = service.catalog.lock().await;
        match catalog.add(definition) {
            Ok(comic) => (StatusCode::CREATED, Json(json!(comic))),
            Err(e) => {
                info!("Rejected new comic: {}", e);
                return catalog_error(e);
            }
        }
    };
    service.save_settings().await;
    response
}

pub async fn handle_edit_comic(
    State(service): State<ComicService>,
    Path(name): Path<String>,
    Json(definition): Json<ComicDefinition>,
) -> (StatusCode, Json<Value>) {
    let response = {
        let mut catalog = service.catalog.lock().await;
        match catalog.edit(&name, definition) {
            Ok(Some(comic)) => (StatusCode::OK, Json(json!(comic))),
            // The catalog treats this as a no-op; callers over HTTP still get told.
            Ok(None) => {
                return error_body(StatusCode::NOT_FOUND, format!("comic not found: {}", name));
            }
            Err(e) => {
                info!("Rejected edit of {}: {}", name, e);
                return catalog_error(e);
            }
        }
    };
    service.save_settings().await;
    response
}

pub async fn handle_select_comic(
    State(service): State<ComicService>,
    Json(request): Json<SelectRequest>,
) -> (StatusCode, Json<Value>) {
    let response = {
        let mut catalog = service.catalog.lock().await;
        match catalog.set_selected(&request.name) {
            Ok(comic) => (StatusCode::OK, Json(json!(comic))),
            Err(e) => return catalog_error(e),
        }
    };
    service.save_settings().await;
    response
}
