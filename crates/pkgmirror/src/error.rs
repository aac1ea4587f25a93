use thiserror::Error;

/// The binary crate's top-level error, composing every crate's own error
/// enum via `#[from]` and mapping each onto one of the exit codes in
/// [crate::cli]'s `mirror` sub-command documentation.
#[derive(Debug, Error)]
pub enum PkgMirrorError {
    #[error("argument parsing error: {0}")]
    Clap(#[from] clap::Error),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("unknown format driver: {0}")]
    UnknownType(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML configuration error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Deb(#[from] pkgmirror_manager::ManagerError<pkgmirror_deb::DebError>),

    #[error(transparent)]
    Yum(#[from] pkgmirror_manager::ManagerError<pkgmirror_yum::YumError>),
}

impl PkgMirrorError {
    /// Exit code per the `mirror` sub-command's documented contract: 0
    /// success, 1 operation fatal, 2 malformed argument.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Clap(_) | Self::InvalidArgument(_) | Self::UnknownType(_) => 2,
            Self::Io(_) | Self::SerdeYaml(_) | Self::Deb(_) | Self::Yum(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PkgMirrorError>;
