use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::chunker::{self, Chunker, ChunkerKind};
use crate::config::Config;
use crate::error::ConfigError;
use crate::pipeline::{PipelineSettings, RetrievalPipeline};
use crate::ranker::{Bm25Ranker, Ranker, RankerKind};
use crate::scrapper::{HttpScrapper, Scrapper, ScrapperKind};
use crate::searcher::{SearchBackend, Searcher, SerperSearcher, StaticSearcher};

/// Builds each stage from configuration on first use and keeps it for the
/// resolver's lifetime.
pub struct ProviderResolver {
    config: Config,
    searcher: OnceCell<Option<Arc<dyn Searcher>>>,
    scrapper: OnceCell<Option<Arc<dyn Scrapper>>>,
    chunker: OnceCell<Arc<dyn Chunker>>,
    ranker: OnceCell<Arc<dyn Ranker>>,
    pipeline: OnceCell<Option<Arc<RetrievalPipeline>>>,
}

impl ProviderResolver {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        chunker::validate_params(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            config,
            searcher: OnceCell::new(),
            scrapper: OnceCell::new(),
            chunker: OnceCell::new(),
            ranker: OnceCell::new(),
            pipeline: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_rag_enabled(&self) -> bool {
        self.config.web_rag_provider.trim().eq_ignore_ascii_case("custom")
    }

    pub async fn searcher(&self) -> Option<Arc<dyn Searcher>> {
        self.searcher
            .get_or_init(|| async { self.build_searcher() })
            .await
            .clone()
    }

    fn build_searcher(&self) -> Option<Arc<dyn Searcher>> {
        let name = &self.config.web_search_provider;
        match SearchBackend::from_name(name) {
            Some(SearchBackend::Serper) => {
                match SerperSearcher::new(&self.config.serper_api_key, self.config.search_timeout)
                {
                    Ok(searcher) => Some(Arc::new(searcher)),
                    Err(e) => {
                        log::error!("serper searcher unavailable: {e:#}");
                        None
                    }
                }
            }
            Some(SearchBackend::Static) => {
                let Some(path) = self.config.web_search_fixture.as_deref() else {
                    log::error!("static searcher selected but WEB_SEARCH_FIXTURE is not set");
                    return None;
                };
                match StaticSearcher::from_file(path) {
                    Ok(searcher) => Some(Arc::new(searcher)),
                    Err(e) => {
                        log::error!("static searcher unavailable: {e:#}");
                        None
                    }
                }
            }
            Some(SearchBackend::None) => {
                log::info!("web search disabled");
                None
            }
            None => {
                log::error!("unknown web search provider {name:?}");
                None
            }
        }
    }

    pub async fn scrapper(&self) -> Option<Arc<dyn Scrapper>> {
        self.scrapper
            .get_or_init(|| async { self.build_scrapper() })
            .await
            .clone()
    }

    fn build_scrapper(&self) -> Option<Arc<dyn Scrapper>> {
        let name = &self.config.web_scraper_provider;
        let kind = ScrapperKind::from_name(name).unwrap_or_else(|| {
            log::warn!("unknown scraper {name:?}, falling back to http");
            ScrapperKind::Http
        });
        match kind {
            ScrapperKind::Http => match HttpScrapper::from_config(&self.config) {
                Ok(scrapper) => Some(Arc::new(scrapper)),
                Err(e) => {
                    log::error!("http scrapper unavailable: {e}");
                    None
                }
            },
        }
    }

    pub async fn chunker(&self) -> Result<Arc<dyn Chunker>, ConfigError> {
        self.chunker
            .get_or_try_init(|| async { self.build_chunker() })
            .await
            .cloned()
    }

    fn build_chunker(&self) -> Result<Arc<dyn Chunker>, ConfigError> {
        let name = &self.config.web_chunker_provider;
        let kind = ChunkerKind::from_name(name).unwrap_or_else(|| {
            log::warn!("unknown chunker {name:?}, falling back to recursive");
            ChunkerKind::Recursive
        });
        let chunker = kind.build(self.config.chunk_size, self.config.chunk_overlap)?;
        log::info!(
            "using {} chunker (size={}, overlap={})",
            chunker.name(),
            self.config.chunk_size,
            self.config.chunk_overlap
        );
        Ok(Arc::from(chunker))
    }

    pub async fn ranker(&self) -> Arc<dyn Ranker> {
        self.ranker
            .get_or_init(|| async { self.build_ranker() })
            .await
            .clone()
    }

    fn build_ranker(&self) -> Arc<dyn Ranker> {
        let name = &self.config.web_ranking_provider;
        let kind = RankerKind::from_name(name).unwrap_or_else(|| {
            log::warn!("unknown ranker {name:?}, falling back to bm25");
            RankerKind::Bm25
        });
        match kind {
            RankerKind::Bm25 => Arc::new(Bm25Ranker::new()),
        }
    }

    /// The assembled pipeline, or `None` when RAG is disabled or a stage is missing.
    pub async fn pipeline(&self) -> Option<Arc<RetrievalPipeline>> {
        self.pipeline
            .get_or_init(|| async { self.build_pipeline().await })
            .await
            .clone()
    }

    async fn build_pipeline(&self) -> Option<Arc<RetrievalPipeline>> {
        if !self.is_rag_enabled() {
            log::info!(
                "web rag provider {:?} is not enabled",
                self.config.web_rag_provider
            );
            return None;
        }
        let searcher = self.searcher().await?;
        let scrapper = self.scrapper().await?;
        let chunker = match self.chunker().await {
            Ok(chunker) => chunker,
            Err(e) => {
                log::error!("chunker unavailable: {e}");
                return None;
            }
        };
        let ranker = self.ranker().await;
        log::info!(
            "web rag pipeline: search={} scrape={} chunk={} rank={}",
            searcher.name(),
            scrapper.name(),
            chunker.name(),
            ranker.name()
        );
        Some(Arc::new(RetrievalPipeline::new(
            searcher,
            scrapper,
            chunker,
            ranker,
            PipelineSettings::from_config(&self.config),
        )))
    }
}
