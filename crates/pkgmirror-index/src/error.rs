use thiserror::Error;

/// Error type for this crate.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("relation has no links: {0}")]
    EmptyRelation(String),

    #[error("unknown version range operator: {0}")]
    UnknownOperator(String),

    #[error("malformed version range: {0}")]
    MalformedVersionRange(String),
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, IndexError>;
