mod fetch;

use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use uuid::Uuid;

use crate::{
    cache::CacheKey, catalog::ComicDefinition, resolver::UrlResolver, t_error, t_info, t_warn,
};

pub use fetch::FetchError;

/// Finished records kept for polling before the oldest ones are dropped.
pub const MAX_RETAINED_JOBS: usize = 64;

pub type Ticket = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Resolving,
    Fetching,
    Success,
    Failure,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    #[error("no image url could be resolved")]
    UrlResolution,
    #[error("network failure")]
    Network,
    #[error("filesystem failure")]
    Filesystem,
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("cache folder unavailable: {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Point-in-time copy of one job. Records are only ever replaced or updated as a
/// whole under the tracker lock, so `status` and `file_path` always belong together.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub ticket: Ticket,
    pub status: JobStatus,
    pub file_path: Option<PathBuf>,
    pub comic_key: String,
    pub date: NaiveDate,
    pub failure: Option<FailureKind>,
    pub error: Option<String>,
}

impl JobSnapshot {
    fn resolving(ticket: Ticket, key: &CacheKey) -> Self {
        Self {
            ticket,
            status: JobStatus::Resolving,
            file_path: None,
            comic_key: key.short_code.clone(),
            date: key.date,
            failure: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub ticket: Ticket,
    /// Set when an in-flight job for the same strip was reused.
    pub joined: bool,
}

#[derive(Default)]
struct TrackerState {
    jobs: HashMap<Ticket, JobSnapshot>,
    order: VecDeque<Ticket>,
    in_flight: HashMap<CacheKey, Ticket>,
    latest: Option<Ticket>,
}

impl TrackerState {
    fn insert(&mut self, record: JobSnapshot) {
        let ticket = record.ticket;
        self.jobs.insert(ticket, record);
        self.order.push_back(ticket);
        self.latest = Some(ticket);
        self.prune(ticket);
    }

    /// Drops the oldest finished records beyond the retention limit. Running jobs
    /// and `keep` survive.
    fn prune(&mut self, keep: Ticket) {
        let mut excess = self.order.len().saturating_sub(MAX_RETAINED_JOBS);
        if excess == 0 {
            return;
        }
        let jobs = &mut self.jobs;
        self.order.retain(|ticket| {
            if excess == 0 || *ticket == keep {
                return true;
            }
            let finished = jobs.get(ticket).is_none_or(|j| j.status.is_terminal());
            if finished {
                jobs.remove(ticket);
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    fn update(&mut self, ticket: Ticket, apply: impl FnOnce(&mut JobSnapshot)) {
        if let Some(record) = self.jobs.get_mut(&ticket) {
            apply(record);
        }
    }

    fn release(&mut self, key: &CacheKey, ticket: Ticket) {
        if self.in_flight.get(key) == Some(&ticket) {
            self.in_flight.remove(key);
        }
    }
}

struct TrackerInner {
    resolver: Arc<dyn UrlResolver>,
    client: Client,
    semaphore: Arc<Semaphore>,
    state: Mutex<TrackerState>,
}

/// Tracks asynchronous resolve-then-fetch jobs that fill the strip cache.
///
/// Every submission gets its own ticket. At most `limit` pipelines run at once and at
/// most one job is in flight per cache key.
#[derive(Clone)]
pub struct DownloadJobTracker {
    inner: Arc<TrackerInner>,
}

impl DownloadJobTracker {
    pub fn new(resolver: Arc<dyn UrlResolver>, client: Client, limit: usize) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                resolver,
                client,
                semaphore: Arc::new(Semaphore::new(limit.max(1))),
                state: Mutex::new(TrackerState::default()),
            }),
        }
    }

    /// Records the job as `Resolving` and starts the pipeline in the background.
    pub async fn submit(
        &self,
        comic: &ComicDefinition,
        date: NaiveDate,
        folder: &Path,
    ) -> Result<Submission, SubmitError> {
        tokio::fs::create_dir_all(folder)
            .await
            .map_err(|source| SubmitError::Filesystem {
                path: folder.to_path_buf(),
                source,
            })?;

        let key = CacheKey::new(&comic.short_code, date);
        let ticket = {
            let mut state = self.inner.state.lock().await;
            if let Some(&existing) = state.in_flight.get(&key) {
                state.latest = Some(existing);
                t_info!(existing, "Joined in-flight download for {}", key.stem());
                return Ok(Submission {
                    ticket: existing,
                    joined: true,
                });
            }
            let ticket = Uuid::new_v4();
            state.insert(JobSnapshot::resolving(ticket, &key));
            state.in_flight.insert(key.clone(), ticket);
            ticket
        };
        t_info!(ticket, "Accepted download for {} ({})", key.stem(), comic.name);

        let inner = self.inner.clone();
        let source_slug = comic.source_slug.clone();
        let destination = key.jpg_path(folder);
        tokio::spawn(async move {
            let Ok(_permit) = inner.semaphore.clone().acquire_owned().await else {
                return;
            };
            let pipeline = {
                let inner = inner.clone();
                let key = key.clone();
                let destination = destination.clone();
                tokio::spawn(async move {
                    run_pipeline(&inner, ticket, &source_slug, &key, &destination).await
                })
            };
            let joined = pipeline.await;

            let mut state = inner.state.lock().await;
            let outcome = joined.unwrap_or_else(|e| {
                t_error!(ticket, "Download task aborted: {}", e);
                let kind = match state.jobs.get(&ticket).map(|j| j.status) {
                    Some(JobStatus::Fetching) => FailureKind::Network,
                    _ => FailureKind::UrlResolution,
                };
                Err((kind, format!("download task aborted: {}", e)))
            });
            state.update(ticket, |record| match outcome {
                Ok(()) => {
                    record.status = JobStatus::Success;
                    record.file_path = Some(destination.clone());
                }
                Err((kind, message)) => {
                    record.status = JobStatus::Failure;
                    record.file_path = None;
                    record.failure = Some(kind);
                    record.error = Some(message);
                }
            });
            state.release(&key, ticket);
        });

        Ok(Submission {
            ticket,
            joined: false,
        })
    }

    /// Records a cache hit as an already finished job.
    pub async fn record_hit(&self, key: &CacheKey, path: PathBuf) -> Ticket {
        let ticket = Uuid::new_v4();
        let mut record = JobSnapshot::resolving(ticket, key);
        record.status = JobStatus::Success;
        record.file_path = Some(path);
        self.inner.state.lock().await.insert(record);
        ticket
    }

    pub async fn poll(&self, ticket: Ticket) -> Option<JobSnapshot> {
        self.inner.state.lock().await.jobs.get(&ticket).cloned()
    }

    /// Snapshot of the most recent submission, `None` while nothing was submitted.
    pub async fn poll_latest(&self) -> Option<JobSnapshot> {
        let state = self.inner.state.lock().await;
        state.latest.and_then(|t| state.jobs.get(&t).cloned())
    }

    pub async fn in_flight(&self) -> usize {
        self.inner.state.lock().await.in_flight.len()
    }
}

async fn run_pipeline(
    inner: &TrackerInner,
    ticket: Ticket,
    source_slug: &str,
    key: &CacheKey,
    destination: &Path,
) -> Result<(), (FailureKind, String)> {
    let date = key.date;
    let resolved = inner
        .resolver
        .resolve_image_url(source_slug, date.year(), date.month(), date.day())
        .await;
    let url = match resolved {
        Ok(Some(url)) => url,
        Ok(None) => {
            t_warn!(ticket, "No image url for {} on {}", source_slug, date);
            return Err((
                FailureKind::UrlResolution,
                format!("no image found for {} on {}", source_slug, date),
            ));
        }
        Err(e) => {
            t_error!(ticket, "Url resolution failed for {}: {:?}", source_slug, e);
            return Err((FailureKind::UrlResolution, e.to_string()));
        }
    };

    t_info!(ticket, "Fetching {}", url);
    inner
        .state
        .lock()
        .await
        .update(ticket, |record| record.status = JobStatus::Fetching);

    match fetch::fetch_to_cache(&inner.client, url, destination, ticket).await {
        Ok(bytes) => {
            t_info!(
                ticket,
                "Cached {} ({} bytes)",
                destination.display(),
                bytes
            );
            Ok(())
        }
        Err(e) => {
            t_error!(ticket, "Download failed: {}", e);
            Err((e.kind(), e.to_string()))
        }
    }
}
