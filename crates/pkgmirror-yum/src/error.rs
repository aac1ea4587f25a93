use thiserror::Error;

/// Error type for this crate.
#[derive(Debug, Error)]
pub enum YumError {
    #[error("XML error: {0:?}")]
    Xml(#[from] serde_xml_rs::Error),

    #[error("unknown content digest format: {0}")]
    UnknownDigestFormat(String),

    #[error("repository metadata entry not found: {0}")]
    MetadataFileNotFound(&'static str),

    #[error("malformed package version: {0}")]
    MalformedVersion(String),

    #[error("malformed relation string: {0}")]
    MalformedRelation(String),

    #[error("unknown architecture: {0}")]
    UnknownArchitecture(String),

    #[error("malformed URL: {0}")]
    MalformedUrl(String),

    #[error("required external tool not found: {0}")]
    ToolMissing(String),

    #[error("external tool {tool} exited with status {status}")]
    ToolFailed { tool: String, status: i32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transport(#[from] pkgmirror_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, YumError>;
