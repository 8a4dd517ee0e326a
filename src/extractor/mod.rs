//! Raw HTML in, clean text plus metadata out.
//!
//! Strategies run from most to least precise; the first one that produces
//! non-empty text wins. A strategy that errors or panics is skipped. When none
//! succeed the raw HTML itself is kept as content, so extraction never fails.

use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::Result;
use scraper::Html;

mod article;
mod boilerplate;
mod metadata;

pub use article::ArticleStrategy;
pub use boilerplate::BoilerplateStrategy;
pub use metadata::{PageMetadata, extract_metadata};

/// Wide enough that html2text never wraps prose into artificial lines.
const HTML2TEXT_WIDTH: usize = 1_000;

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the strategy found nothing worth keeping.
    fn extract(&self, html: &str) -> Result<Option<String>>;
}

#[derive(Debug, Default)]
pub struct Html2TextStrategy;

impl ExtractionStrategy for Html2TextStrategy {
    fn name(&self) -> &'static str {
        "html2text"
    }

    fn extract(&self, html: &str) -> Result<Option<String>> {
        let text = html2text::from_read(html.as_bytes(), HTML2TEXT_WIDTH)?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub title: Option<String>,
    pub publication_date: Option<String>,
    pub summary: Option<String>,
    pub content: String,
    /// Name of the strategy that produced `content`, `None` for the raw fallback.
    pub strategy: Option<&'static str>,
}

pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_strategies(vec![
            Box::new(ArticleStrategy),
            Box::new(BoilerplateStrategy),
            Box::new(Html2TextStrategy),
        ])
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn extract(&self, html: &str, url: &str) -> Extraction {
        let meta = catch_unwind(AssertUnwindSafe(|| {
            extract_metadata(&Html::parse_document(html))
        }))
        .unwrap_or_else(|_| {
            log::warn!("metadata extraction panicked for {url}");
            PageMetadata::default()
        });

        let (content, strategy) = self.extract_content(html, url);
        Extraction {
            title: meta.title,
            publication_date: meta.publication_date,
            summary: meta.summary,
            content,
            strategy,
        }
    }

    fn extract_content(&self, html: &str, url: &str) -> (String, Option<&'static str>) {
        for strategy in &self.strategies {
            let outcome = catch_unwind(AssertUnwindSafe(|| strategy.extract(html)));
            match outcome {
                Ok(Ok(Some(text))) if !text.trim().is_empty() => {
                    log::debug!("extracted {url} with {}", strategy.name());
                    return (text.trim().to_string(), Some(strategy.name()));
                }
                Ok(Ok(_)) => {
                    log::debug!("{} found no content for {url}", strategy.name());
                }
                Ok(Err(e)) => {
                    log::warn!("{} extraction failed for {url}: {:#}", strategy.name(), e);
                }
                Err(_) => {
                    log::warn!("{} extraction panicked for {url}", strategy.name());
                }
            }
        }
        log::warn!("all extraction strategies failed for {url}, keeping raw html");
        (html.to_string(), None)
    }
}
