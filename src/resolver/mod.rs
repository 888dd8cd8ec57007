use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 Edg/121.0.0.0";
pub const DEFAULT_PAGE_TEMPLATE: &str = "https://www.gocomics.com/{slug}/{year}/{month}/{day}";

static OG_IMAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<meta[^>]+(?:property|name)\s*=\s*["']og:image["'][^>]*content\s*=\s*["']([^"']+)["']|<meta[^>]+content\s*=\s*["']([^"']+)["'][^>]*(?:property|name)\s*=\s*["']og:image["']"#,
    )
    .unwrap()
});

/// Turns a comic's source slug and a date into the URL of that day's strip.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// `Ok(None)` means the source has no strip for that day.
    async fn resolve_image_url(
        &self,
        source_slug: &str,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Option<Url>>;
}

/// Fetches a per-day page built from a URL template and reads its `og:image` tag.
pub struct PageScrapeResolver {
    client: Client,
    template: String,
}

impl PageScrapeResolver {
    pub fn new(client: Client, template: impl Into<String>) -> Self {
        Self {
            client,
            template: template.into(),
        }
    }

    pub fn page_url(&self, source_slug: &str, year: i32, month: u32, day: u32) -> Result<Url> {
        let url = self
            .template
            .replace("{slug}", source_slug)
            .replace("{year}", &format!("{:04}", year))
            .replace("{month}", &format!("{:02}", month))
            .replace("{day}", &format!("{:02}", day));
        Url::parse(&url).map_err(|e| anyhow!("Invalid page url {}: {}", url, e))
    }
}

pub fn extract_og_image(html: &str) -> Option<&str> {
    OG_IMAGE_REGEX
        .captures(html)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str())
}

#[async_trait]
impl UrlResolver for PageScrapeResolver {
    async fn resolve_image_url(
        &self,
        source_slug: &str,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Option<Url>> {
        let page = self.page_url(source_slug, year, month, day)?;
        debug!("Fetching strip page: {}", page);

        let response = self.client.get(page.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            info!("No strip page for {} on {}-{:02}-{:02}", source_slug, year, month, day);
            return Ok(None);
        }
        let html = response.error_for_status()?.text().await?;

        match extract_og_image(&html) {
            Some(src) => {
                let url = page.join(src)?;
                info!("Resolved strip image: {}", url);
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }
}
