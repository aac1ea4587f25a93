/*! The [FormatDriver] trait: the common shape every wire format (deb, yum)
implements, per the component design's "Format Driver — common shape". */

use {
    pkgmirror_index::{
        package::{Architecture, Package, Repository},
        relation::PackageRelation,
    },
    std::{fmt, hash::Hash, path::Path, sync::Arc},
};

/// A normalized origin URL, as produced by [FormatDriver::parse_urls].
///
/// `labels` carries whatever format-specific qualifiers a single `base`
/// expands into — a deb origin's `(suite, component)` pair, or nothing for a
/// yum origin, which is just a base URL.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ParsedUrl {
    pub base: String,
    pub labels: Vec<String>,
}

impl ParsedUrl {
    pub fn new(base: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            base: base.into(),
            labels,
        }
    }
}

/// The operations a wire-format driver (deb, yum) must implement to plug
/// into [crate::manager::Manager].
///
/// `Version` specializes [pkgmirror_index]'s generic types for this format;
/// `Error` is the driver's own `thiserror` enum, composed into
/// [crate::error::ManagerError] by the caller.
pub trait FormatDriver: Send + Sync {
    type Version: Ord + Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Split and normalize user-supplied origin URL strings. Fails with a
    /// driver-specific `MalformedUrl` variant on unparseable input.
    fn parse_urls(&self, raw_urls: &[String]) -> Result<Vec<ParsedUrl>, Self::Error>;

    /// Parse a single `"name [op version[| name [op version]]]"` bootstrap
    /// or shield-root string into a [PackageRelation].
    fn parse_relation(&self, raw: &str) -> Result<PackageRelation<Self::Version>, Self::Error>;

    /// Open the upstream release/metadata file for one normalized origin URL
    /// and construct the [Repository] it describes.
    fn get_repository(
        &self,
        parsed: &ParsedUrl,
        arch: Architecture,
    ) -> Result<Arc<Repository>, Self::Error>;

    /// Stream the package index of one repository, invoking `sink` once per
    /// entry. Malformed entries are a fatal `MalformedIndex` for the whole
    /// repository.
    fn get_packages(
        &self,
        repository: &Arc<Repository>,
        sink: &mut dyn FnMut(Package<Self::Version>),
    ) -> Result<(), Self::Error>;

    /// Create the on-disk skeleton for a mirror copy of `repository` rooted
    /// at `destination_root`. Idempotent.
    fn clone_repository(
        &self,
        repository: &Repository,
        destination_root: &Path,
        source: bool,
        locale: bool,
    ) -> Result<Repository, Self::Error>;

    /// Reconcile the packages already on disk in `mirror_repository` with
    /// `packages`: union them if `keep_existing`, else remove whatever is on
    /// disk but not selected. Called before [FormatDriver::rebuild_repository].
    fn assign_packages(
        &self,
        mirror_repository: &Repository,
        packages: &[Package<Self::Version>],
        keep_existing: bool,
    ) -> Result<(), Self::Error>;

    /// Emit the final on-disk metadata (index files, release files, and for
    /// deb the shared top-level suite `Release`) enumerating `packages`.
    fn rebuild_repository(
        &self,
        mirror_repository: &Repository,
        packages: &[Package<Self::Version>],
    ) -> Result<(), Self::Error>;
}
