/*! The Debian/APT [pkgmirror_manager::FormatDriver] implementation: deb822
control-file parsing, Debian version ordering, and `Release`-file handling. */

pub mod control;
pub mod driver;
pub mod error;
pub mod release;
pub mod version;

pub use crate::{driver::DebDriver, error::DebError};
