use thiserror::Error;

/// Error type for this crate.
///
/// Generic over `E`, the owning [crate::driver::FormatDriver]'s own error
/// type, so a `Manager<D>` surfaces `D::Error` without this crate depending
/// on any concrete format driver.
#[derive(Debug, Error)]
pub enum ManagerError<E> {
    #[error(transparent)]
    Driver(E),

    #[error(transparent)]
    Transport(#[from] pkgmirror_transport::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed destination path: {0}")]
    MalformedDestination(String),
}

/// Result type for this crate.
pub type Result<T, E> = std::result::Result<T, ManagerError<E>>;
