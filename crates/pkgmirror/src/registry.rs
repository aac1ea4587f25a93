/*! Driver registry. Because [pkgmirror_manager::FormatDriver::Version] is an
associated type, a single `HashMap` cannot hold heterogeneous
`Box<dyn FormatDriver<...>>` for both deb and yum at once; instead each
`--type` value is matched to its own concrete `Manager<...>` construction and
run here, keeping [crate::error::PkgMirrorError]'s two `#[from]` arms as the
only place both drivers' error types meet. */

use {
    crate::{
        config::Settings,
        error::{PkgMirrorError, Result},
    },
    pkgmirror_deb::DebDriver,
    pkgmirror_index::{package::Architecture, stats::CopyStatistics},
    pkgmirror_manager::{Context, Manager},
    pkgmirror_transport::{AsyncSection, ConnectionPool},
    pkgmirror_yum::YumDriver,
    std::sync::Arc,
};

pub fn parse_architecture(s: &str) -> Result<Architecture> {
    match s {
        "x86_64" => Ok(Architecture::X86_64),
        "i386" => Ok(Architecture::I386),
        "source" | "src" => Ok(Architecture::Source),
        other => Err(PkgMirrorError::InvalidArgument(format!(
            "unknown --arch value: {other}"
        ))),
    }
}

fn build_context(settings: &Settings) -> Result<Context> {
    let connections = ConnectionPool::new(
        settings.connections,
        3,
        settings.http_proxy.as_deref(),
        settings.https_proxy.as_deref(),
        None,
    )
    .map_err(|e| PkgMirrorError::InvalidArgument(e.to_string()))?;

    let section = AsyncSection::new(settings.threads, settings.connections.max(1) * 4);

    Ok(Context::new(connections, section, 0))
}

/// Run the full mirror operation for `settings`, dispatching to the
/// `FormatDriver` named by `settings.format`.
pub fn run_mirror(settings: &Settings) -> Result<Arc<CopyStatistics>> {
    let arch = parse_architecture(&settings.arch)?;

    let shield = if settings.requires_url.is_empty() {
        None
    } else {
        Some(settings.requires_url.as_slice())
    };

    // The driver holds its own `Arc<Context>` for fetches; the manager holds
    // an independent one for the PARSE/COPY worker pool, so each driver
    // construction below builds two.
    match settings.format.as_str() {
        "deb" => {
            let driver = DebDriver::new(Arc::new(build_context(settings)?));
            let manager = Manager::new(driver, build_context(settings)?);
            Ok(manager.clone_repositories(
                &settings.origin_url,
                arch,
                &settings.destination,
                shield,
                &settings.bootstrap,
                settings.keep_existing,
            )?)
        }
        "yum" => {
            let driver = YumDriver::new(Arc::new(build_context(settings)?));
            let manager = Manager::new(driver, build_context(settings)?);
            Ok(manager.clone_repositories(
                &settings.origin_url,
                arch,
                &settings.destination,
                shield,
                &settings.bootstrap,
                settings.keep_existing,
            )?)
        }
        other => Err(PkgMirrorError::UnknownType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_architecture_accepts_known_values() {
        assert_eq!(parse_architecture("x86_64").unwrap(), Architecture::X86_64);
        assert_eq!(parse_architecture("i386").unwrap(), Architecture::I386);
        assert!(parse_architecture("sparc").is_err());
    }
}
