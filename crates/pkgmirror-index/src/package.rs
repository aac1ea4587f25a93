/*! The format-agnostic [Package] and [Repository] records. */

use {
    crate::relation::{PackageRelation, RelationLink},
    std::{cmp::Ordering, fmt, hash::Hash, hash::Hasher, sync::Arc},
};

/// Target machine architecture of a repository or package.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Architecture {
    X86_64,
    I386,
    Source,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X86_64 => "x86_64",
            Self::I386 => "i386",
            Self::Source => "source",
        })
    }
}

/// A repository: a named, addressable collection of packages of one architecture.
///
/// `name` is a format-specific tuple flattened to a `Vec<String>` here so that
/// both deb's `(suite, component)` and yum's `(name,)` shapes fit without a
/// generic parameter on top of the already-generic [Package].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Repository {
    pub name: Vec<String>,
    pub architecture: Architecture,
    pub origin: String,
    pub url: String,
}

impl Repository {
    pub fn new(
        name: Vec<String>,
        architecture: Architecture,
        origin: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name,
            architecture,
            origin: origin.into(),
            url: url.into(),
        }
    }

    /// Derive a mirror-side clone of this repository rooted at a new URL.
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }

    pub fn label(&self) -> String {
        self.name.join("/")
    }
}

/// Content digests tracked for a package file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChecksumSet {
    pub md5: Option<Vec<u8>>,
    pub sha1: Option<Vec<u8>>,
    pub sha256: Option<Vec<u8>>,
}

/// An immutable package record.
///
/// Equality and hashing use `(name, version)` only, matching the identity
/// semantics an index relies on; two [Package] values with the same name and
/// version but different repositories are considered the same package for
/// set/map purposes (this matches how shield indices substitute for origin
/// packages during resolution).
#[derive(Clone, Debug)]
pub struct Package<V> {
    pub name: String,
    pub version: V,
    pub filename: String,
    /// -1 (represented as `None`) when unknown.
    pub filesize: Option<u64>,
    pub checksum: ChecksumSet,
    pub mandatory: bool,
    /// Dependency edges. Each may itself be an alternative chain (`a | b`).
    pub requires: Vec<PackageRelation<V>>,
    /// Capabilities this package provides, as plain (non-alternating) links:
    /// a package either provides a name or it doesn't.
    pub provides: Vec<RelationLink<V>>,
    /// Packages/capabilities this package obsoletes, as plain links.
    pub obsoletes: Vec<RelationLink<V>>,
    pub repository: Arc<Repository>,
}

impl<V: Clone> Package<V> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        version: V,
        filename: impl Into<String>,
        filesize: Option<u64>,
        checksum: ChecksumSet,
        mandatory: bool,
        requires: Vec<PackageRelation<V>>,
        provides: Vec<RelationLink<V>>,
        obsoletes: Vec<RelationLink<V>>,
        repository: Arc<Repository>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            filename: filename.into(),
            filesize,
            checksum,
            mandatory,
            requires,
            provides,
            obsoletes,
            repository,
        }
    }
}

impl<V: Eq> PartialEq for Package<V> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl<V: Eq> Eq for Package<V> {}

impl<V: Hash> Hash for Package<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl<V: Ord> PartialOrd for Package<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V: Ord> Ord for Package<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name).then(self.version.cmp(&other.version))
    }
}
