use thiserror::Error;

/// Error type for this crate.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("malformed URL: {0}")]
    MalformedUrl(String),

    #[error("transient I/O error fetching {url}: {source}")]
    TransientIo {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server refused range request for {0}")]
    RangeUnsupported(String),

    #[error("permanent HTTP error fetching {url}: status {status}")]
    PermanentHttp { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("retries exhausted fetching {0}")]
    RetriesExhausted(String),

    #[error("digest mismatch for {path}: expected {expected}, got {got}")]
    DigestMismatch {
        path: String,
        expected: String,
        got: String,
    },

    #[error("async section exceeded error budget: {failures} failures (budget {budget})")]
    SectionFailed { failures: usize, budget: usize },
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, TransportError>;
