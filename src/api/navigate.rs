use axum::{Json, extract::State, http::StatusCode};
use log::warn;
use serde_json::Value;

use super::{NavigateRequest, NavigateResponse, error_body};
use crate::{ComicService, date_nav};

pub async fn handle_navigate(
    State(service): State<ComicService>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<NavigateResponse>, (StatusCode, Json<Value>)> {
    let date = date_nav::shift(request.date, request.step).ok_or_else(|| {
        error_body(
            StatusCode::BAD_REQUEST,
            format!("cannot move {} by {:?}", request.date, request.step),
        )
    })?;

    if let Err(e) = service.settings.update(|s| s.date = date) {
        warn!("Failed to record last viewed date: {:#}", e);
    }
    service.save_settings().await;
    Ok(Json(NavigateResponse { date }))
}
