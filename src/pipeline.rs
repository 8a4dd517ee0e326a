//! Search → scrape → chunk → rank, with per-stage timings and a deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::chunker::Chunker;
use crate::config::Config;
use crate::data_models::{SearchResult, stages};
use crate::ranker::Ranker;
use crate::scrapper::{Scrapper, scrape_search_result};
use crate::searcher::Searcher;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub max_concurrent: usize,
    pub local_k: usize,
    pub global_k: usize,
    pub enable_chunking: bool,
    pub deadline: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent: config.max_concurrent_fetches,
            local_k: config.local_k,
            global_k: config.global_k,
            enable_chunking: config.enable_chunking,
            deadline: config.pipeline_deadline,
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

pub struct RetrievalPipeline {
    searcher: Arc<dyn Searcher>,
    scrapper: Arc<dyn Scrapper>,
    chunker: Arc<dyn Chunker>,
    ranker: Arc<dyn Ranker>,
    settings: PipelineSettings,
}

impl RetrievalPipeline {
    pub fn new(
        searcher: Arc<dyn Searcher>,
        scrapper: Arc<dyn Scrapper>,
        chunker: Arc<dyn Chunker>,
        ranker: Arc<dyn Ranker>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            searcher,
            scrapper,
            chunker,
            ranker,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// True only when every stage reports ready.
    pub async fn check_availability(&self) -> bool {
        let searcher = self.searcher.check_availability().await;
        let scrapper = self.scrapper.check_availability().await;
        let chunker = match self.chunker.validate() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("chunker {} unavailable: {e}", self.chunker.name());
                false
            }
        };
        let ranker = self.ranker.check_availability();
        log::debug!(
            "availability: searcher={searcher} scrapper={scrapper} chunker={chunker} ranker={ranker}"
        );
        searcher && scrapper && chunker && ranker
    }

    pub async fn retrieve_context(&self, query: &str, max_results: usize) -> Result<SearchResult> {
        self.retrieve_context_with_cancel(query, max_results, CancellationToken::new())
            .await
    }

    /// Runs the whole pipeline. Cancelling `cancel` (or hitting the configured
    /// deadline) stops new fetches; pages already scraped are still chunked and
    /// ranked so the caller gets a partial result rather than nothing.
    pub async fn retrieve_context_with_cancel(
        &self,
        query: &str,
        max_results: usize,
        cancel: CancellationToken,
    ) -> Result<SearchResult> {
        let request_id = nanoid::nanoid!(8);
        let span = tracing::info_span!("retrieve", request_id = %request_id, query = %query, max_results);

        let token = cancel.child_token();
        let timer = self.settings.deadline.map(|deadline| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(deadline) => {
                        log::warn!("retrieval deadline of {}ms reached", deadline.as_millis());
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });

        let outcome = self.run(query, max_results, &token).instrument(span).await;

        if let Some(timer) = timer {
            timer.abort();
        }
        outcome
    }

    async fn run(
        &self,
        query: &str,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<SearchResult> {
        let total = Instant::now();
        log::info!("retrieving web context for {query:?}");

        let start = Instant::now();
        let searched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = self.searcher.search(query, max_results) => Some(res?),
        };
        let Some(mut result) = searched else {
            log::warn!("search cancelled for {query:?}");
            let mut result = SearchResult::empty(query);
            result.record_time(stages::SEARCH, elapsed_ms(start));
            return Ok(result);
        };
        let removed = result.dedup_urls();
        if removed > 0 {
            log::debug!("dropped {removed} duplicate urls");
        }
        result.record_time(stages::SEARCH, elapsed_ms(start));

        if result.webpages.is_empty() {
            log::info!("search returned no pages for {query:?}");
            return Ok(result);
        }

        let start = Instant::now();
        let mut result = scrape_search_result(
            &self.scrapper,
            result,
            self.settings.max_concurrent,
            cancel,
        )
        .await;
        result.record_time(stages::SCRAPE, elapsed_ms(start));

        if self.settings.enable_chunking {
            let start = Instant::now();
            let chunked = self.chunker.chunk_search_result(result);
            result = chunked;
            result.record_time(stages::CHUNK, elapsed_ms(start));

            if self.ranker.check_availability() {
                let start = Instant::now();
                result = self.ranker.rank(
                    result,
                    query,
                    self.settings.local_k,
                    self.settings.global_k,
                );
                result.record_time(stages::RANK, elapsed_ms(start));
            } else {
                log::warn!("ranker {} unavailable, skipping rank", self.ranker.name());
            }
        }

        result.record_time(stages::TOTAL, elapsed_ms(total));
        log::info!(
            "retrieved {} pages, {} chunks in {}ms",
            result.webpages.len(),
            result.total_chunks(),
            elapsed_ms(total)
        );
        Ok(result)
    }
}
