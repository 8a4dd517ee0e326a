use thiserror::Error;

/// Per-page failures raised while fetching. Never escalate past the batch.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("url too long ({0} chars)")]
    UrlTooLong(usize),

    #[error("rejected non-text content: '{0}'")]
    UnsupportedContentType(String),

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("rejected binary content (null byte found)")]
    BinaryContent,

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scrape cancelled")]
    Cancelled,
}

impl ScrapeError {
    /// Guard rejections (as opposed to transport failures) are logged at warn.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ScrapeError::UrlTooLong(_)
                | ScrapeError::UnsupportedContentType(_)
                | ScrapeError::BodyTooLarge { .. }
                | ScrapeError::BinaryContent
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid chunk_size: {0}, must be > 0")]
    InvalidChunkSize(usize),

    #[error("chunk_overlap ({overlap}) must be less than chunk_size ({size})")]
    InvalidChunkOverlap { size: usize, overlap: usize },

    #[error("{0} api key is not configured")]
    MissingApiKey(&'static str),
}

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("Provider Error: {0}")]
    Provider(u16),

    #[error("Network Failure: {0}")]
    Network(String),

    #[error("Decode Failure: {0}")]
    Decode(String),
}
