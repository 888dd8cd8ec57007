// Shared helpers: a fake image host and scripted url resolvers.
#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::{
    Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use reqwest::Url;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::Notify,
};

use comic_cache::{
    jobs::{DownloadJobTracker, JobSnapshot, Ticket},
    resolver::UrlResolver,
};

/// Body served for `/strip/{name}`.
pub fn strip_bytes(name: &str) -> Vec<u8> {
    format!("image-bytes:{}", name).into_bytes()
}

async fn strip_handler(Path(name): Path<String>) -> impl IntoResponse {
    (StatusCode::OK, strip_bytes(&name))
}

async fn empty_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Starts a fake image host. Returns its base url.
pub async fn start_upstream() -> String {
    let app = Router::new()
        .route("/strip/{name}", get(strip_handler))
        .route("/empty", get(empty_handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://127.0.0.1:{}", port)
}

/// Starts a host that promises a large body, sends a fraction of it and hangs up.
pub async fn start_truncating_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: image/jpeg\r\ncontent-length: 100000\r\n\r\n")
                .await;
            let _ = socket.write_all(&[0xffu8; 1000]).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://127.0.0.1:{}/strip.jpg", port)
}

/// Points every strip at `{base}/strip/{slug}-{yyyymmdd}`, optionally after a gate opens.
pub struct UpstreamResolver {
    base: String,
    gate: Option<Arc<Notify>>,
}

impl UpstreamResolver {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            gate: None,
        }
    }

    pub fn gated(base: &str, gate: Arc<Notify>) -> Self {
        Self {
            base: base.to_string(),
            gate: Some(gate),
        }
    }
}

#[async_trait]
impl UrlResolver for UpstreamResolver {
    async fn resolve_image_url(
        &self,
        source_slug: &str,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Option<Url>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let url = format!(
            "{}/strip/{}-{:04}{:02}{:02}",
            self.base, source_slug, year, month, day
        );
        Ok(Some(Url::parse(&url)?))
    }
}

/// Always resolves to the same url.
pub struct FixedResolver(pub Option<String>);

#[async_trait]
impl UrlResolver for FixedResolver {
    async fn resolve_image_url(&self, _: &str, _: i32, _: u32, _: u32) -> Result<Option<Url>> {
        match &self.0 {
            Some(url) => Ok(Some(Url::parse(url)?)),
            None => Ok(None),
        }
    }
}

pub struct BrokenResolver;

#[async_trait]
impl UrlResolver for BrokenResolver {
    async fn resolve_image_url(&self, _: &str, _: i32, _: u32, _: u32) -> Result<Option<Url>> {
        Err(anyhow!("page layout changed"))
    }
}

pub struct PanickingResolver;

#[async_trait]
impl UrlResolver for PanickingResolver {
    async fn resolve_image_url(&self, _: &str, _: i32, _: u32, _: u32) -> Result<Option<Url>> {
        panic!("resolver bug");
    }
}

/// Never answers for `slug`; every other comic resolves to nothing right away.
pub struct StallingResolver(pub &'static str);

#[async_trait]
impl UrlResolver for StallingResolver {
    async fn resolve_image_url(&self, source_slug: &str, _: i32, _: u32, _: u32) -> Result<Option<Url>> {
        if source_slug == self.0 {
            std::future::pending::<()>().await;
        }
        Ok(None)
    }
}

/// Counts how many resolutions run at the same time.
#[derive(Default)]
pub struct CountingResolver {
    pub running: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

#[async_trait]
impl UrlResolver for CountingResolver {
    async fn resolve_image_url(&self, _: &str, _: i32, _: u32, _: u32) -> Result<Option<Url>> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(None)
    }
}

pub fn tracker(resolver: impl UrlResolver + 'static) -> DownloadJobTracker {
    tracker_with_limit(resolver, 4)
}

pub fn tracker_with_limit(resolver: impl UrlResolver + 'static, limit: usize) -> DownloadJobTracker {
    DownloadJobTracker::new(Arc::new(resolver), reqwest::Client::new(), limit)
}

pub async fn wait_terminal(tracker: &DownloadJobTracker, ticket: Ticket) -> JobSnapshot {
    for _ in 0..400 {
        if let Some(job) = tracker.poll(ticket).await {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {} did not finish", ticket);
}
