use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stage names used as keys in [`SearchResult::time_ms`].
pub mod stages {
    pub const SEARCH: &str = "search";
    pub const SCRAPE: &str = "scrape";
    pub const CHUNK: &str = "chunk";
    pub const RANK: &str = "rank";
    pub const TOTAL: &str = "total";
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WebPage {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Short description from the search engine or the page's own metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    /// Ordering hint handed out by the search backend, not a BM25 score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    /// Full extracted text. Stays `None` until scraped or when the fetch failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `None` = not chunked yet, `Some(vec![])` = chunked (or pruned) down to nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<String>>,
}

impl WebPage {
    pub fn new(url: impl Into<String>) -> WebPage {
        WebPage {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> WebPage {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> WebPage {
        self.content = Some(content.into());
        self
    }

    pub fn with_chunks<S: Into<String>>(mut self, chunks: impl IntoIterator<Item = S>) -> WebPage {
        self.chunks = Some(chunks.into_iter().map(Into::into).collect());
        self
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub query: String,
    pub webpages: Vec<WebPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub time_ms: BTreeMap<String, u64>,
}

impl SearchResult {
    pub fn new(query: impl Into<String>, webpages: Vec<WebPage>) -> SearchResult {
        SearchResult {
            query: query.into(),
            webpages,
            summary: None,
            timestamp: now_rfc3339(),
            time_ms: BTreeMap::new(),
        }
    }

    pub fn empty(query: impl Into<String>) -> SearchResult {
        Self::new(query, Vec::new())
    }

    pub fn record_time(&mut self, stage: &str, millis: u64) {
        self.time_ms.insert(stage.to_string(), millis);
    }

    pub fn total_chunks(&self) -> usize {
        self.webpages.iter().map(WebPage::chunk_count).sum()
    }

    /// Drops pages whose url was already seen, keeping the first occurrence.
    pub fn dedup_urls(&mut self) -> usize {
        let mut seen = std::collections::HashSet::new();
        let before = self.webpages.len();
        self.webpages.retain(|p| seen.insert(p.url.clone()));
        before - self.webpages.len()
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut result = SearchResult::new(
            "q",
            vec![
                WebPage::new("https://a.com").with_title("first"),
                WebPage::new("https://b.com"),
                WebPage::new("https://a.com").with_title("second"),
            ],
        );
        assert_eq!(result.dedup_urls(), 1);
        assert_eq!(result.webpages.len(), 2);
        assert_eq!(result.webpages[0].title.as_deref(), Some("first"));
        assert_eq!(result.webpages[1].url, "https://b.com");
    }

    #[test]
    fn test_none_fields_are_omitted() {
        let page = WebPage::new("https://a.com");
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json, serde_json::json!({"url": "https://a.com"}));
    }

    #[test]
    fn test_empty_chunks_survive_round_trip_distinct_from_none() {
        let page = WebPage::new("https://a.com").with_chunks(Vec::<String>::new());
        let json = serde_json::to_string(&page).unwrap();
        let back: WebPage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunks, Some(vec![]));
    }
}
