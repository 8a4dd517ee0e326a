use super::{Chunker, char_len, validate_params};
use crate::error::ConfigError;

/// Remainders shorter than this fraction of `chunk_size` are glued onto the previous chunk.
const MIN_TAIL_RATIO: f64 = 0.3;

/// Sliding window of `chunk_size` chars advancing by `chunk_size - chunk_overlap`.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        validate_params(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl Chunker for FixedSizeChunker {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn chunk_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let len = char_len(text);
        if len <= self.chunk_size {
            return vec![text.to_string()];
        }

        let chars: Vec<char> = text.chars().collect();
        let mut chunks: Vec<String> = Vec::new();
        let mut start = 0usize;

        while start < len {
            let end = start + self.chunk_size;

            if end > len && !chunks.is_empty() {
                let remaining = len - start;
                if (remaining as f64) < self.chunk_size as f64 * MIN_TAIL_RATIO {
                    if let Some(last) = chunks.last_mut() {
                        last.extend(&chars[start..]);
                    }
                    break;
                }
            }

            chunks.push(chars[start..end.min(len)].iter().collect());
            if end >= len {
                break;
            }

            // overlap < chunk_size is validated, this only guards a zero stride
            start = end - self.chunk_overlap;
            if start == 0 {
                start = self.chunk_size;
            }
        }
        chunks
    }
}
