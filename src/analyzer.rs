use std::collections::HashSet;
use std::sync::OnceLock;

static STOP_WORDS: OnceLock<HashSet<String>> = OnceLock::new();

fn get_stop_words() -> &'static HashSet<String> {
    STOP_WORDS.get_or_init(|| {
        stop_words::get(stop_words::LANGUAGE::English)
            .into_iter()
            .map(|x| x.to_string())
            .collect()
    })
}

pub fn is_stop_word(word: &str) -> bool {
    get_stop_words().contains(word)
}

/// Number of English stop words in `text`. Prose scores high, menus and
/// link lists score low, which is what the article extractor leans on.
pub fn count_stop_words(text: &str) -> usize {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .filter(|w| is_stop_word(&w.to_lowercase()))
        .count()
}

/// A character filter receives the original text as a stream of characters and can transform the stream by adding,
/// removing, or changing characters before tokenization happens.
pub trait CharacterFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// Removes every ASCII punctuation character, wherever it sits in a word:
/// `"U.S.-based"` becomes `"USbased"`.
#[derive(Debug, Default)]
pub struct PunctuationRemovalFilter;

impl CharacterFilter for PunctuationRemovalFilter {
    fn filter(&self, text: String) -> String {
        if !text.chars().any(|c| c.is_ascii_punctuation()) {
            return text;
        }
        text.chars().filter(|c| !c.is_ascii_punctuation()).collect()
    }
}

/// Collapses runs of spaces and tabs into a single space. Newlines are kept.
#[derive(Debug, Default)]
pub struct InlineWhitespaceFilter;

impl CharacterFilter for InlineWhitespaceFilter {
    fn filter(&self, text: String) -> String {
        let mut out = String::with_capacity(text.len());
        let mut in_run = false;
        for c in text.chars() {
            if c == ' ' || c == '\t' {
                if !in_run {
                    out.push(' ');
                }
                in_run = true;
            } else {
                out.push(c);
                in_run = false;
            }
        }
        out
    }
}

/// A tokenizer receives a stream of characters, breaks it up into individual tokens (usually individual words),
/// and outputs a stream of tokens.
/// For instance, a whitespace tokenizer breaks text into tokens whenever it sees any whitespace.
/// It would convert the text "Quick brown fox!" into the terms [Quick, brown, fox!].
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: String) -> Vec<String>;
}

pub struct WhiteSpaceTokenizer;

impl Tokenizer for WhiteSpaceTokenizer {
    fn tokenize(&self, text: String) -> Vec<String> {
        text.split_whitespace()
            .map(|w| w.to_string())
            .collect::<Vec<String>>()
    }
}

/// A token filter receives the token stream and may add, remove, or change tokens.
/// For example, a lowercase token filter converts all tokens to lowercase.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken>;
}

pub struct LowerCaseTokenFilter;

impl TokenFilter for LowerCaseTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .map(|mut t| {
                t.term = t.term.to_lowercase();
                t
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextToken {
    pub term: String,
    pub pos: usize,
}

impl std::ops::Deref for TextToken {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.term
    }
}

/// Pure text analysis pipeline - no async, no IO, just text transformations
pub struct TextAnalyzer {
    char_filters: Vec<Box<dyn CharacterFilter>>,
    tokenizer: Box<dyn Tokenizer>,
    token_filters: Vec<Box<dyn TokenFilter>>,
}

impl TextAnalyzer {
    pub fn new(
        char_filters: Vec<Box<dyn CharacterFilter>>,
        tokenizer: Box<dyn Tokenizer>,
        token_filters: Vec<Box<dyn TokenFilter>>,
    ) -> Self {
        Self {
            char_filters,
            tokenizer,
            token_filters,
        }
    }

    /// Lowercase, strip punctuation, split on whitespace. Chunks and queries
    /// must both go through this so their terms line up.
    pub fn bm25() -> Self {
        Self::new(
            vec![Box::new(PunctuationRemovalFilter)],
            Box::new(WhiteSpaceTokenizer),
            vec![Box::new(LowerCaseTokenFilter)],
        )
    }

    pub fn char_filter(&self, mut content: String) -> String {
        for filter in self.char_filters.iter() {
            content = filter.filter(content);
        }
        content
    }

    pub fn tokenize(&self, content: String) -> Vec<TextToken> {
        self.tokenizer
            .tokenize(content)
            .into_iter()
            .enumerate()
            .map(|(idx, term)| TextToken { term, pos: idx })
            .collect()
    }

    pub fn token_filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        for filter in self.token_filters.iter() {
            tokens = filter.filter(tokens);
        }
        tokens
    }

    /// Analyzes raw content and returns a list of tokens
    pub fn analyze(&self, raw_content: &str) -> Vec<TextToken> {
        let content = self.char_filter(raw_content.to_string());
        let tokens = self.tokenize(content);
        self.token_filter(tokens)
    }

    pub fn terms(&self, raw_content: &str) -> Vec<String> {
        self.analyze(raw_content)
            .into_iter()
            .map(|t| t.term)
            .collect()
    }
}
