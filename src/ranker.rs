use std::collections::HashSet;

use crate::analyzer::TextAnalyzer;
use crate::bm25::Bm25Index;
use crate::data_models::SearchResult;

/// Chunk counts for one page as it moves through the pruning passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunnelRow {
    pub url: String,
    pub initial: usize,
    pub after_local: usize,
    pub final_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingReport {
    pub query: String,
    pub rows: Vec<FunnelRow>,
}

impl RankingReport {
    pub fn totals(&self) -> (usize, usize, usize) {
        self.rows.iter().fold((0, 0, 0), |(a, b, c), r| {
            (a + r.initial, b + r.after_local, c + r.final_count)
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(95);
        let thin = "-".repeat(95);
        out.push_str(&format!("{rule}\nRANKING REPORT | Query: {:?}\n", self.query));
        out.push_str(&format!(
            "{:<55} | {:<6} | {:<7} | FINAL\n{thin}\n",
            "Source URL", "Start", "L-Keep"
        ));
        for row in &self.rows {
            let url = if row.url.chars().count() > 55 {
                format!("{}...", row.url.chars().take(52).collect::<String>())
            } else {
                row.url.clone()
            };
            out.push_str(&format!(
                "{url:<55} | {:<6} | {:<7} | {}\n",
                row.initial, row.after_local, row.final_count
            ));
        }
        let (initial, local, final_count) = self.totals();
        out.push_str(&format!(
            "{thin}\n{:<55} | {initial:<6} | {local:<7} | {final_count}\n{rule}",
            "TOTALS"
        ));
        out
    }
}

pub trait Ranker: Send + Sync {
    fn name(&self) -> &'static str;

    fn rank(&self, result: SearchResult, query: &str, local_k: usize, global_k: usize)
    -> SearchResult;

    fn check_availability(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankerKind {
    Bm25,
}

impl RankerKind {
    pub fn from_name(name: &str) -> Option<RankerKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bm25" => Some(RankerKind::Bm25),
            _ => None,
        }
    }
}

/// Two-pass BM25 pruning: best `local_k` chunks per page, then best
/// `global_k` chunks across all pages. Surviving chunks keep their order.
pub struct Bm25Ranker {
    analyzer: TextAnalyzer,
}

impl Default for Bm25Ranker {
    fn default() -> Self {
        Self {
            analyzer: TextAnalyzer::bm25(),
        }
    }
}

impl Bm25Ranker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of the `k` best chunks, in original order.
    fn top_k_in_order(&self, chunks: &[&str], query_terms: &[String], k: usize) -> Vec<usize> {
        let corpus: Vec<Vec<String>> = chunks.iter().map(|c| self.analyzer.terms(c)).collect();
        let mut keep = Bm25Index::new(&corpus).top_n(query_terms, k);
        keep.sort_unstable();
        keep
    }

    fn rank_local(&self, result: &mut SearchResult, query_terms: &[String], local_k: usize) {
        for page in result.webpages.iter_mut() {
            let Some(chunks) = page.chunks.take() else {
                continue;
            };
            if chunks.len() <= local_k {
                page.chunks = Some(chunks);
                continue;
            }
            let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let keep = self.top_k_in_order(&refs, query_terms, local_k);
            let mut slots: Vec<Option<String>> = chunks.into_iter().map(Some).collect();
            page.chunks = Some(keep.into_iter().filter_map(|i| slots[i].take()).collect());
        }
    }

    fn rank_global(&self, result: &mut SearchResult, query_terms: &[String], global_k: usize) {
        // (page index, chunk index) for every surviving chunk
        let mut pool: Vec<(usize, usize)> = Vec::new();
        let mut texts: Vec<&str> = Vec::new();
        for (page_idx, page) in result.webpages.iter().enumerate() {
            if let Some(chunks) = &page.chunks {
                for (chunk_idx, chunk) in chunks.iter().enumerate() {
                    pool.push((page_idx, chunk_idx));
                    texts.push(chunk);
                }
            }
        }
        if pool.len() <= global_k {
            return;
        }

        let winners: HashSet<(usize, usize)> = self
            .top_k_in_order(&texts, query_terms, global_k)
            .into_iter()
            .map(|i| pool[i])
            .collect();

        for (page_idx, page) in result.webpages.iter_mut().enumerate() {
            if let Some(chunks) = page.chunks.take() {
                page.chunks = Some(
                    chunks
                        .into_iter()
                        .enumerate()
                        .filter(|(chunk_idx, _)| winners.contains(&(page_idx, *chunk_idx)))
                        .map(|(_, chunk)| chunk)
                        .collect(),
                );
            }
        }
    }

    pub fn rank_with_report(
        &self,
        mut result: SearchResult,
        query: &str,
        local_k: usize,
        global_k: usize,
    ) -> (SearchResult, RankingReport) {
        let mut report = RankingReport {
            query: query.to_string(),
            rows: result
                .webpages
                .iter()
                .map(|p| FunnelRow {
                    url: p.url.clone(),
                    initial: p.chunk_count(),
                    ..Default::default()
                })
                .collect(),
        };
        if result.webpages.is_empty() {
            return (result, report);
        }

        log::info!("ranking chunks for {query:?} (local_k={local_k}, global_k={global_k})");
        let query_terms = self.analyzer.terms(query);

        self.rank_local(&mut result, &query_terms, local_k);
        for (row, page) in report.rows.iter_mut().zip(&result.webpages) {
            row.after_local = page.chunk_count();
        }

        self.rank_global(&mut result, &query_terms, global_k);
        for (row, page) in report.rows.iter_mut().zip(&result.webpages) {
            row.final_count = page.chunk_count();
        }

        log::info!("\n{}", report.render());
        (result, report)
    }
}

impl Ranker for Bm25Ranker {
    fn name(&self) -> &'static str {
        "bm25"
    }

    fn rank(
        &self,
        result: SearchResult,
        query: &str,
        local_k: usize,
        global_k: usize,
    ) -> SearchResult {
        self.rank_with_report(result, query, local_k, global_k).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::WebPage;

    fn page(url: &str, chunks: &[&str]) -> WebPage {
        WebPage::new(url).with_chunks(chunks.iter().copied())
    }

    #[test]
    fn test_lightning_query_keeps_only_relevant_sentence() {
        let result = SearchResult::new(
            "what is the lightning network?",
            vec![
                page(
                    "https://a.com",
                    &[
                        "The Lightning Network is a layer 2 scaling solution.",
                        "I like to eat apples in the morning.",
                    ],
                ),
                page("https://b.com", &["Python is a programming language."]),
            ],
        );
        let ranked = Bm25Ranker::new().rank(result, "what is the lightning network?", 10, 1);
        assert_eq!(
            ranked.webpages[0].chunks,
            Some(vec![
                "The Lightning Network is a layer 2 scaling solution.".to_string()
            ])
        );
        assert_eq!(ranked.webpages[1].chunks, Some(vec![]));
    }

    #[test]
    fn test_local_pass_keeps_original_order() {
        let result = SearchResult::new(
            "q",
            vec![page(
                "https://a.com",
                &[
                    "unrelated text",
                    "bitcoin mining",
                    "weather report",
                    "bitcoin fees today",
                    "sports news",
                ],
            )],
        );
        let (ranked, report) = Bm25Ranker::new().rank_with_report(result, "bitcoin", 2, 20);
        assert_eq!(
            ranked.webpages[0].chunks,
            Some(vec!["bitcoin mining".to_string(), "bitcoin fees today".to_string()])
        );
        assert_eq!(report.rows[0].initial, 5);
        assert_eq!(report.rows[0].after_local, 2);
        assert_eq!(report.rows[0].final_count, 2);
    }

    #[test]
    fn test_duplicate_chunks_cannot_exceed_global_cap() {
        let result = SearchResult::new(
            "q",
            vec![
                page("https://a.com", &["same chunk", "other"]),
                page("https://b.com", &["same chunk"]),
            ],
        );
        let ranked = Bm25Ranker::new().rank(result, "same chunk", 10, 1);
        assert_eq!(ranked.total_chunks(), 1);
    }

    #[test]
    fn test_unchunked_pages_and_empty_results_pass_through() {
        let ranker = Bm25Ranker::new();
        let empty = ranker.rank(SearchResult::empty("q"), "q", 10, 20);
        assert!(empty.webpages.is_empty());

        let result = SearchResult::new(
            "q",
            vec![WebPage::new("https://a.com").with_content("text"), page("https://b.com", &["x"])],
        );
        let ranked = ranker.rank(result, "x", 10, 20);
        assert_eq!(ranked.webpages[0].chunks, None);
        assert_eq!(ranked.webpages[0].content.as_deref(), Some("text"));
        assert_eq!(ranked.webpages[1].chunks, Some(vec!["x".to_string()]));
    }

    #[test]
    fn test_report_render_has_totals() {
        let report = RankingReport {
            query: "q".into(),
            rows: vec![FunnelRow {
                url: "https://a.com".into(),
                initial: 3,
                after_local: 2,
                final_count: 1,
            }],
        };
        assert_eq!(report.totals(), (3, 2, 1));
        assert!(report.render().contains("TOTALS"));
    }
}
