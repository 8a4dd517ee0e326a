use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;

use crate::data_models::{SearchResult, WebPage};
use crate::error::ConfigError;
use crate::http_client::{DEFAULT_CONNECT_TIMEOUT, HttpClient};

/// Video and social hosts whose pages carry no scrapeable text.
pub const BLOCKED_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "tiktok.com",
    "instagram.com",
    "facebook.com",
];

pub fn is_blocked(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    BLOCKED_DOMAINS.contains(&host)
}

/// Query in, ordered candidate pages out. Pages come back without content or chunks.
#[async_trait]
pub trait Searcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResult>;

    async fn check_availability(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    Serper,
    Static,
    None,
}

impl SearchBackend {
    pub fn from_name(name: &str) -> Option<SearchBackend> {
        match name.trim().to_ascii_lowercase().as_str() {
            "serper" => Some(SearchBackend::Serper),
            "static" | "fixture" => Some(SearchBackend::Static),
            "none" | "disabled" | "" => Some(SearchBackend::None),
            _ => None,
        }
    }
}

/// Serves a fixed page list. Used for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSearcher {
    pages: Vec<WebPage>,
    summary: Option<String>,
}

impl StaticSearcher {
    pub fn new(pages: Vec<WebPage>) -> Self {
        Self {
            pages,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Loads a JSON array of pages.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading search fixture {}", path.display()))?;
        let pages: Vec<WebPage> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing search fixture {}", path.display()))?;
        Ok(Self::new(pages))
    }
}

#[async_trait]
impl Searcher for StaticSearcher {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResult> {
        let webpages = self
            .pages
            .iter()
            .filter(|p| !is_blocked(&p.url))
            .take(max_results)
            .map(|p| WebPage {
                content: None,
                chunks: None,
                ..p.clone()
            })
            .collect();
        let mut result = SearchResult::new(query, webpages);
        result.summary = self.summary.clone();
        Ok(result)
    }

    async fn check_availability(&self) -> bool {
        true
    }
}

pub const SERPER_BASE_URL: &str = "https://google.serper.dev";

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
    #[serde(default, rename = "answerBox")]
    answer_box: Option<SerperAnswerBox>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    link: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerperAnswerBox {
    answer: Option<String>,
    snippet: Option<String>,
}

/// Google results through the Serper API.
#[derive(Debug, Clone)]
pub struct SerperSearcher {
    client: HttpClient,
}

impl SerperSearcher {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(SERPER_BASE_URL, api_key, timeout)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey("serper").into());
        }
        let client = HttpClient::with_timeouts(
            base_url,
            &[("X-API-KEY", api_key)],
            timeout,
            DEFAULT_CONNECT_TIMEOUT,
        )?;
        log::info!("serper searcher ready at {}", client.base_url());
        Ok(Self { client })
    }

    fn map_response(response: SerperResponse, query: &str) -> SearchResult {
        let webpages: Vec<WebPage> = response
            .organic
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let url = item.link?;
                if is_blocked(&url) {
                    log::debug!("dropping blocked result {url}");
                    return None;
                }
                Some(WebPage {
                    url,
                    title: item.title,
                    summary: item.snippet,
                    publication_date: item.date,
                    relevance_score: Some(1.0 - i as f64 * 0.1),
                    content: None,
                    chunks: None,
                })
            })
            .collect();

        if webpages.is_empty() {
            log::warn!("no results found for query: {query:?}");
        }
        let mut result = SearchResult::new(query, webpages);
        result.summary = response
            .answer_box
            .and_then(|a| a.answer.or(a.snippet))
            .filter(|s| !s.trim().is_empty());
        result
    }
}

#[async_trait]
impl Searcher for SerperSearcher {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResult> {
        let start = Instant::now();
        log::info!("serper search for {query:?}");
        let raw = self
            .client
            .post("/search", &json!({ "q": query, "num": max_results }))
            .await
            .with_context(|| format!("serper search failed for {query:?}"))?;
        let response: SerperResponse =
            serde_json::from_value(raw).context("unexpected serper response shape")?;
        let result = Self::map_response(response, query);
        log::info!(
            "serper search returned {} results in {}ms",
            result.webpages.len(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    async fn check_availability(&self) -> bool {
        match self.client.get("/health").await {
            Ok(body) => {
                let ok = body.get("status").and_then(|s| s.as_str()) == Some("ok");
                if !ok {
                    log::warn!("serper health check returned {body}");
                }
                ok
            }
            Err(e) => {
                log::error!("serper availability check failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocklist() {
        assert!(is_blocked("https://www.youtube.com/watch?v=1"));
        assert!(is_blocked("https://youtu.be/abc"));
        assert!(!is_blocked("https://music.youtube.com.example.org/"));
        assert!(!is_blocked("https://bitcoin.org/en/"));
        assert!(!is_blocked("not a url"));
    }

    #[test]
    fn test_serper_mapping() {
        let response: SerperResponse = serde_json::from_value(json!({
            "organic": [
                {"link": "https://a.com", "title": "A", "snippet": "about a", "date": "Jan 1, 2024"},
                {"link": "https://www.youtube.com/watch?v=x", "title": "video"},
                {"title": "no link"},
                {"link": "https://c.com"}
            ],
            "answerBox": {"snippet": "the answer"}
        }))
        .unwrap();
        let result = SerperSearcher::map_response(response, "q");
        let urls: Vec<_> = result.webpages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com", "https://c.com"]);
        assert_eq!(result.webpages[0].relevance_score, Some(1.0));
        assert_eq!(result.webpages[0].publication_date.as_deref(), Some("Jan 1, 2024"));
        assert!((result.webpages[1].relevance_score.unwrap() - 0.7).abs() < 1e-9);
        assert_eq!(result.summary.as_deref(), Some("the answer"));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = SerperSearcher::new("", Duration::from_secs(1)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingApiKey("serper"))
        );
    }

    #[tokio::test]
    async fn test_static_searcher_truncates_and_strips_content() {
        let searcher = StaticSearcher::new(vec![
            WebPage::new("https://a.com").with_content("stale"),
            WebPage::new("https://youtube.com/x"),
            WebPage::new("https://b.com"),
            WebPage::new("https://c.com"),
        ]);
        let result = searcher.search("q", 2).await.unwrap();
        assert_eq!(result.webpages.len(), 2);
        assert_eq!(result.webpages[0].content, None);
        assert_eq!(result.webpages[1].url, "https://b.com");
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(SearchBackend::from_name("Serper"), Some(SearchBackend::Serper));
        assert_eq!(SearchBackend::from_name("none"), Some(SearchBackend::None));
        assert_eq!(SearchBackend::from_name("bing"), None);
    }
}
