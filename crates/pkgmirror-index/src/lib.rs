/*! Format-agnostic package index and dependency resolver primitives.

This crate defines the data model and algorithms shared by every package
repository format a mirror driver might implement: [package::Package],
[package::Repository], [relation::VersionRange] and [relation::PackageRelation],
the [index::Index] they are stored in, and the [resolver::PackagesTree]
dependency closure algorithms built on top of it.

Everything here is generic over a `Version` type parameter bound by
`Ord + Clone + Eq + Hash + Debug + Display`; format crates ([pkgmirror-deb],
[pkgmirror-yum]) supply their own concrete version type and the comparison
rules that come with it.

[pkgmirror-deb]: https://docs.rs/pkgmirror-deb
[pkgmirror-yum]: https://docs.rs/pkgmirror-yum
*/

pub mod error;
pub mod index;
pub mod package;
pub mod relation;
pub mod resolver;
pub mod stats;

pub use crate::error::{IndexError, Result};
