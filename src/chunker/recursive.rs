use super::{Chunker, char_len, tail_chars, validate_params};
use crate::analyzer::{CharacterFilter, InlineWhitespaceFilter};
use crate::error::ConfigError;

/// Boundaries tried in order, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const HIERARCHY: [Separator; 4] = [
    Separator::Paragraph,
    Separator::Line,
    Separator::Sentence,
    Separator::Word,
];

impl Separator {
    fn joiner(self) -> &'static str {
        match self {
            Separator::Paragraph => "\n\n",
            Separator::Line => "\n",
            Separator::Sentence | Separator::Word => " ",
        }
    }

    fn split(self, text: &str) -> Vec<&str> {
        match self {
            Separator::Paragraph => split_paragraphs(text),
            Separator::Line => text.split('\n').collect(),
            Separator::Sentence => split_sentences(text),
            Separator::Word => text.split(' ').collect(),
        }
    }
}

/// Splits on a newline, optional whitespace, and another newline.
fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c != '\n' {
            continue;
        }
        let mut last_newline = None;
        while let Some(&(next_idx, next)) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            if next == '\n' {
                last_newline = Some(next_idx);
            }
            chars.next();
        }
        if let Some(end) = last_newline {
            pieces.push(&text[start..idx]);
            start = end + 1;
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// Splits after `.`, `!` or `?` when followed by spaces. Punctuation stays left.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = idx + c.len_utf8();
        let mut next_start = end;
        while let Some(&(space_idx, ' ')) = chars.peek() {
            next_start = space_idx + 1;
            chars.next();
        }
        if next_start > end {
            pieces.push(&text[start..end]);
            start = next_start;
        }
    }
    pieces.push(&text[start..]);
    pieces
}

fn hard_cut(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Splits on paragraphs, then lines, then sentences, then words, and packs the
/// pieces back together up to `chunk_size` chars.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        validate_params(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    fn split_recursive(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        let Some((&separator, rest)) = separators.split_first() else {
            return hard_cut(text, self.chunk_size);
        };

        let pieces: Vec<&str> = separator
            .split(text)
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if pieces.len() <= 1 {
            return self.split_recursive(text, rest);
        }

        let joiner = separator.joiner();
        let joiner_len = char_len(joiner);
        let mut chunks = Vec::new();
        let mut buffer: Vec<&str> = Vec::new();
        let mut buffer_len = 0;

        for piece in pieces {
            let piece_len = char_len(piece);
            if piece_len > self.chunk_size {
                if !buffer.is_empty() {
                    chunks.push(buffer.join(joiner));
                    buffer.clear();
                    buffer_len = 0;
                }
                chunks.extend(self.split_recursive(piece, rest));
                continue;
            }

            let candidate = if buffer.is_empty() {
                piece_len
            } else {
                buffer_len + joiner_len + piece_len
            };
            if candidate <= self.chunk_size {
                buffer.push(piece);
                buffer_len = candidate;
            } else {
                if !buffer.is_empty() {
                    chunks.push(buffer.join(joiner));
                }
                buffer = vec![piece];
                buffer_len = piece_len;
            }
        }
        if !buffer.is_empty() {
            chunks.push(buffer.join(joiner));
        }
        chunks
    }

    fn apply_overlap(&self, chunks: Vec<String>) -> Vec<String> {
        let mut out = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push(chunk.clone());
                continue;
            }
            let tail = tail_chars(&chunks[i - 1], self.chunk_overlap);
            out.push(format!("{tail}{chunk}"));
        }
        out
    }
}

impl Chunker for RecursiveChunker {
    fn name(&self) -> &'static str {
        "recursive"
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn chunk_text(&self, text: &str) -> Vec<String> {
        let text = InlineWhitespaceFilter
            .filter(text.to_string())
            .trim()
            .to_string();
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(&text) <= self.chunk_size {
            return vec![text];
        }

        let chunks = self.split_recursive(&text, &HIERARCHY);
        let chunks = if self.chunk_overlap > 0 && chunks.len() > 1 {
            self.apply_overlap(chunks)
        } else {
            chunks
        };
        log::debug!("split {} chars into {} chunks", char_len(&text), chunks.len());
        chunks
    }
}
