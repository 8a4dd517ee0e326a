use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::data_models::{SearchResult, WebPage};
use crate::error::ScrapeError;
use crate::extractor::{Extraction, Extractor};

pub const MAX_URL_CHARS: usize = 200;
pub const MAX_BODY_BYTES: usize = 5_000_000;
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[async_trait]
pub trait Scrapper: Send + Sync {
    fn name(&self) -> &'static str;

    /// Downloads one page and returns its decoded body.
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;

    /// CPU-only; runs after the fetch slot has been released.
    fn extract(&self, html: &str, url: &str) -> Extraction;

    async fn check_availability(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapperKind {
    Http,
}

impl ScrapperKind {
    pub fn from_name(name: &str) -> Option<ScrapperKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "http" | "default" => Some(ScrapperKind::Http),
            _ => None,
        }
    }
}

pub fn is_text_content_type(content_type: &str) -> bool {
    let ct = content_type.trim().to_ascii_lowercase();
    ct.starts_with("text/html") || ct.starts_with("text/plain") || ct.contains("xml")
}

pub struct HttpScrapper {
    client: reqwest::Client,
    extractor: Extractor,
}

impl HttpScrapper {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            extractor: Extractor::new(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ScrapeError> {
        Self::new(config.fetch_connect_timeout, config.fetch_timeout)
    }
}

#[async_trait]
impl Scrapper for HttpScrapper {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let url_chars = url.chars().count();
        if url_chars >= MAX_URL_CHARS {
            return Err(ScrapeError::UrlTooLong(url_chars));
        }

        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !is_text_content_type(&content_type) {
            return Err(ScrapeError::UnsupportedContentType(content_type));
        }

        if let Some(declared) = response.content_length() {
            if declared > MAX_BODY_BYTES as u64 {
                return Err(ScrapeError::BodyTooLarge {
                    limit: MAX_BODY_BYTES,
                });
            }
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(ScrapeError::BodyTooLarge {
                    limit: MAX_BODY_BYTES,
                });
            }
            if chunk.contains(&0) {
                return Err(ScrapeError::BinaryContent);
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn extract(&self, html: &str, url: &str) -> Extraction {
        self.extractor.extract(html, url)
    }
}

fn log_failure(url: &str, err: &ScrapeError) {
    match err {
        ScrapeError::Cancelled => log::debug!("scrape of {url} abandoned: {err}"),
        e if e.is_rejection() => log::warn!("scrape rejected for {url}: {e}"),
        e => log::error!("scrape failed for {url}: {e}"),
    }
}

/// Search metadata wins; extraction only fills the gaps.
fn apply_extraction(page: &mut WebPage, extraction: Extraction) {
    if page.title.is_none() {
        page.title = extraction.title;
    }
    if page.summary.is_none() {
        page.summary = extraction.summary;
    }
    if page.publication_date.is_none() {
        page.publication_date = extraction.publication_date;
    }
    page.content = Some(extraction.content);
}

async fn scrape_one(
    scrapper: Arc<dyn Scrapper>,
    mut page: WebPage,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> WebPage {
    let html = {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log_failure(&page.url, &ScrapeError::Cancelled);
                return page;
            }
            permit = semaphore.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return page,
            },
        };

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            res = scrapper.fetch(&page.url) => res,
        };
        match fetched {
            Ok(html) => html,
            Err(e) => {
                log_failure(&page.url, &e);
                return page;
            }
        }
    };

    let url = page.url.clone();
    let extracted = tokio::task::spawn_blocking(move || scrapper.extract(&html, &url)).await;
    match extracted {
        Ok(extraction) => apply_extraction(&mut page, extraction),
        Err(e) => log::error!("extraction task for {} failed: {e}", page.url),
    }
    page
}

/// Fetches every page with at most `max_concurrent` requests in flight.
///
/// The output has the same length and order as the input. A page whose fetch
/// fails, or that was still pending when `cancel` fired, comes back unchanged.
pub async fn scrape_all(
    scrapper: &Arc<dyn Scrapper>,
    pages: Vec<WebPage>,
    max_concurrent: usize,
    cancel: &CancellationToken,
) -> Vec<WebPage> {
    let start = Instant::now();
    let total = pages.len();
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

    let (fallbacks, handles): (Vec<_>, Vec<_>) = pages
        .into_iter()
        .map(|page| {
            let fallback = page.clone();
            let handle = tokio::spawn(scrape_one(
                scrapper.clone(),
                page,
                semaphore.clone(),
                cancel.clone(),
            ));
            (fallback, handle)
        })
        .unzip();

    let scraped: Vec<WebPage> = join_all(handles)
        .await
        .into_iter()
        .zip(fallbacks)
        .map(|(joined, fallback)| match joined {
            Ok(page) => page,
            Err(e) => {
                log::error!("scrape task for {} failed: {e}", fallback.url);
                fallback
            }
        })
        .collect();

    let successful = scraped.iter().filter(|p| p.content.is_some()).count();
    log::info!(
        "scraped {successful}/{total} pages with {} (successful={successful}, failed={}, total={total}, ms={})",
        scrapper.name(),
        total - successful,
        start.elapsed().as_millis()
    );
    scraped
}

/// Scrapes the pages of a search result in place.
pub async fn scrape_search_result(
    scrapper: &Arc<dyn Scrapper>,
    mut result: SearchResult,
    max_concurrent: usize,
    cancel: &CancellationToken,
) -> SearchResult {
    if result.webpages.is_empty() {
        log::warn!("no pages to scrape for {:?}", result.query);
        return result;
    }
    let pages = std::mem::take(&mut result.webpages);
    result.webpages = scrape_all(scrapper, pages, max_concurrent, cancel).await;
    result
}
