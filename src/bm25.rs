//! Okapi BM25 over an in-memory corpus of pre-tokenized documents.
//!
//! ```text
//! score(D, Q) = Σ idf(q) · f(q, D) · (k1 + 1) / (f(q, D) + k1 · (1 − b + b · |D| / avgdl))
//! idf(q)      = ln(N − n(q) + 0.5) − ln(n(q) + 0.5)
//! ```
//!
//! Terms appearing in more than half the corpus get a negative idf; those are
//! replaced by `epsilon · mean(idf)`.

use std::collections::HashMap;

pub const DEFAULT_K1: f64 = 1.5;
pub const DEFAULT_B: f64 = 0.75;
pub const DEFAULT_EPSILON: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct Bm25Index {
    k1: f64,
    b: f64,
    avgdl: f64,
    doc_lens: Vec<usize>,
    doc_freqs: Vec<HashMap<String, usize>>,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn new(corpus: &[Vec<String>]) -> Self {
        Self::with_params(corpus, DEFAULT_K1, DEFAULT_B, DEFAULT_EPSILON)
    }

    pub fn with_params(corpus: &[Vec<String>], k1: f64, b: f64, epsilon: f64) -> Self {
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        // number of documents containing each term
        let mut nd: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;

        for doc in corpus {
            doc_lens.push(doc.len());
            total_len += doc.len();

            let mut freqs: HashMap<String, usize> = HashMap::new();
            for term in doc {
                *freqs.entry(term.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *nd.entry(term.clone()).or_insert(0) += 1;
            }
            doc_freqs.push(freqs);
        }

        let n_docs = corpus.len() as f64;
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_len as f64 / n_docs
        };

        let mut idf: HashMap<String, f64> = HashMap::with_capacity(nd.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, freq) in nd {
            let freq = freq as f64;
            let value = (n_docs - freq + 0.5).ln() - (freq + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term, value);
        }
        if !idf.is_empty() {
            let eps = epsilon * (idf_sum / idf.len() as f64);
            for term in negative {
                idf.insert(term, eps);
            }
        }

        Self {
            k1,
            b,
            avgdl,
            doc_lens,
            doc_freqs,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// One score per document, in corpus order. Repeated query terms count once per occurrence.
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.len()];
        if self.avgdl == 0.0 {
            return scores;
        }
        for q in query {
            let Some(&idf) = self.idf.get(q) else {
                continue;
            };
            for (doc_idx, freqs) in self.doc_freqs.iter().enumerate() {
                let tf = *freqs.get(q).unwrap_or(&0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let norm = 1.0 - self.b + self.b * self.doc_lens[doc_idx] as f64 / self.avgdl;
                scores[doc_idx] += idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm);
            }
        }
        scores
    }

    /// Document indices sorted by descending score. Equal scores keep corpus order.
    pub fn ranked(&self, query: &[String]) -> Vec<usize> {
        let scores = self.scores(query);
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        order
    }

    pub fn top_n(&self, query: &[String], n: usize) -> Vec<usize> {
        let mut order = self.ranked(query);
        order.truncate(n);
        order
    }
}
