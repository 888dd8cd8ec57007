pub mod comics;
pub mod image;
pub mod navigate;

use axum::{Json, http::StatusCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    catalog::{CatalogError, ComicDefinition},
    date_nav::Step,
    jobs::{FailureKind, JobSnapshot, JobStatus, Ticket},
};

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    /// Comic name; the current selection when absent.
    pub comic: Option<String>,
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn idle() -> Self {
        Self {
            status: JobStatus::Idle,
            ticket: None,
            file_path: None,
            failure: None,
            error: None,
        }
    }
}

impl From<JobSnapshot> for StatusResponse {
    fn from(job: JobSnapshot) -> Self {
        let file_path = job
            .file_path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|name| format!("/image/{}", name.to_string_lossy()));
        Self {
            status: job.status,
            ticket: Some(job.ticket),
            file_path,
            failure: job.failure,
            error: job.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ComicsResponse {
    pub comics: Vec<ComicDefinition>,
    pub selected: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub date: NaiveDate,
    pub step: Step,
}

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub date: NaiveDate,
}

fn error_body(status: StatusCode, msg: impl ToString) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"msg": msg.to_string()})))
}

fn catalog_error(e: CatalogError) -> (StatusCode, Json<Value>) {
    let status = match e {
        CatalogError::DuplicateKey { .. } => StatusCode::CONFLICT,
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::MissingField(_) | CatalogError::InvalidShortCode(_) => {
            StatusCode::BAD_REQUEST
        }
    };
    error_body(status, e)
}
