use crate::data_models::SearchResult;
use crate::error::ConfigError;

mod fixed;
mod recursive;

pub use fixed::FixedSizeChunker;
pub use recursive::RecursiveChunker;

/// Splits page content into bounded passages for the ranker.
pub trait Chunker: Send + Sync {
    fn name(&self) -> &'static str;

    fn chunk_size(&self) -> usize;

    fn chunk_overlap(&self) -> usize;

    fn chunk_text(&self, text: &str) -> Vec<String>;

    fn validate(&self) -> Result<(), ConfigError> {
        validate_params(self.chunk_size(), self.chunk_overlap())
    }

    /// Chunks every page that has content. Pages without content keep `chunks = None`.
    fn chunk_search_result(&self, mut result: SearchResult) -> SearchResult {
        log::info!(
            "chunking {} pages with the {} chunker",
            result.webpages.len(),
            self.name()
        );
        for page in result.webpages.iter_mut() {
            match page.content.as_deref() {
                Some(content) if !content.is_empty() => {
                    page.chunks = Some(self.chunk_text(content));
                }
                _ => {}
            }
        }
        result
    }
}

pub fn validate_params(chunk_size: usize, chunk_overlap: usize) -> Result<(), ConfigError> {
    if chunk_size == 0 {
        return Err(ConfigError::InvalidChunkSize(chunk_size));
    }
    if chunk_overlap >= chunk_size {
        return Err(ConfigError::InvalidChunkOverlap {
            size: chunk_size,
            overlap: chunk_overlap,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkerKind {
    Recursive,
    Fixed,
}

impl ChunkerKind {
    pub fn from_name(name: &str) -> Option<ChunkerKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "recursive" => Some(ChunkerKind::Recursive),
            "fixed" => Some(ChunkerKind::Fixed),
            _ => None,
        }
    }

    pub fn build(
        self,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Box<dyn Chunker>, ConfigError> {
        Ok(match self {
            ChunkerKind::Recursive => Box::new(RecursiveChunker::new(chunk_size, chunk_overlap)?),
            ChunkerKind::Fixed => Box::new(FixedSizeChunker::new(chunk_size, chunk_overlap)?),
        })
    }
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Last `n` chars of `s`.
pub(crate) fn tail_chars(s: &str, n: usize) -> &str {
    let len = char_len(s);
    if n >= len {
        return s;
    }
    match s.char_indices().nth(len - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
