use thiserror::Error;

/// Error type for this crate.
#[derive(Debug, Error)]
pub enum DebError {
    #[error("malformed URL: {0}")]
    MalformedUrl(String),

    #[error("error parsing version string: {0}")]
    Version(#[from] crate::version::VersionError),

    #[error("control file parse error: {0}")]
    ControlParse(String),

    #[error("malformed index entry: {0}")]
    MalformedIndex(String),

    #[error("malformed relation string: {0}")]
    MalformedRelation(String),

    #[error("unknown architecture: {0}")]
    UnknownArchitecture(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transport(#[from] pkgmirror_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, DebError>;
