use std::path::{Path, PathBuf};

use reqwest::{Client, Response, Url};
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};

use super::{FailureKind, Ticket};
use crate::t_warn;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("empty response body from {0}")]
    EmptyBody(Url),

    #[error("write failed: {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Network(_) | FetchError::EmptyBody(_) => FailureKind::Network,
            FetchError::Filesystem { .. } => FailureKind::Filesystem,
        }
    }

    fn fs(path: &Path, source: std::io::Error) -> Self {
        FetchError::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Partial downloads live next to the destination under a hidden, ticket-unique name.
fn temp_path(destination: &Path, ticket: Ticket) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.{}.part", name, ticket.simple()))
}

/// Streams `url` into `destination`. The final path only ever holds a complete body.
pub async fn fetch_to_cache(
    client: &Client,
    url: Url,
    destination: &Path,
    ticket: Ticket,
) -> Result<u64, FetchError> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;

    let temp = temp_path(destination, ticket);
    let written = match write_body(response, &temp).await {
        Ok(0) => Err(FetchError::EmptyBody(url)),
        other => other,
    };

    let result = match written {
        Ok(bytes) => tokio::fs::rename(&temp, destination)
            .await
            .map(|_| bytes)
            .map_err(|e| FetchError::fs(destination, e)),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&temp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                t_warn!(ticket, "Could not remove {}: {}", temp.display(), e);
            }
        }
    }
    result
}

async fn write_body(mut response: Response, path: &Path) -> Result<u64, FetchError> {
    let mut file = File::create(path)
        .await
        .map_err(|e| FetchError::fs(path, e))?;

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::fs(path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| FetchError::fs(path, e))?;
    file.sync_all().await.map_err(|e| FetchError::fs(path, e))?;
    Ok(written)
}
