/*! `repomd.xml` and `primary.xml` file formats.

Ported from the teacher's `rpm-repository/src/metadata/{repomd,primary}.rs`,
which parses these documents the same way (`serde-xml-rs` deriving onto
plain structs); this crate is already synchronous, so nothing async needed
dropping. */

use {
    crate::error::{Result, YumError},
    serde::{Deserialize, Serialize},
    std::io::Read,
};

/// A `repomd.xml` file: the entry point into a YUM repository's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoMd {
    /// Revision of the repository, often an integer-like value.
    pub revision: String,
    /// Describes additional metadata files constituting this repository.
    pub data: Vec<RepoMdData>,
}

impl RepoMd {
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_xml_rs::from_reader(reader)?)
    }

    pub fn from_xml(s: &str) -> Result<Self> {
        Ok(serde_xml_rs::from_str(s)?)
    }

    /// Find the `<data>` element of the given `type` (e.g. `"primary"`).
    pub fn find(&self, data_type: &'static str) -> Result<&RepoMdData> {
        self.data
            .iter()
            .find(|d| d.data_type == data_type)
            .ok_or(YumError::MetadataFileNotFound(data_type))
    }
}

/// A `<data>` element in a `repomd.xml` file.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RepoMdData {
    /// The type of data, e.g. `primary`, `filelists`, `other`.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Content checksum of this file, as stored in the repository.
    pub checksum: Checksum,
    /// Where the file is located, relative to the repository root.
    pub location: Location,
    /// Size in bytes of the file as stored in the repository.
    pub size: Option<u64>,
    /// Time the file was created/modified.
    pub timestamp: Option<u64>,
    /// Content checksum of the decoded (usually decompressed) file.
    #[serde(rename = "open-checksum")]
    pub open_checksum: Option<Checksum>,
    /// Size in bytes of the decoded (usually decompressed) file.
    #[serde(rename = "open-size")]
    pub open_size: Option<u64>,
    /// Content checksum of header data.
    #[serde(rename = "header-checksum")]
    pub header_checksum: Option<Checksum>,
    /// Size in bytes of the header.
    #[serde(rename = "header-size")]
    pub header_size: Option<u64>,
}

/// A content checksum, as it appears inside a `repomd.xml` `<data>` element.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Checksum {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(rename = "$value")]
    pub value: String,
}

/// The location of a `<data>` element, relative to the repository root.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Location {
    pub href: String,
}

/// A `primary.xml` file: the full package listing of a YUM repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Primary {
    #[serde(rename = "packages")]
    pub count: usize,
    #[serde(rename = "package")]
    pub packages: Vec<Package>,
}

impl Primary {
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_xml_rs::from_reader(reader)?)
    }

    pub fn from_xml(s: &str) -> Result<Self> {
        Ok(serde_xml_rs::from_str(s)?)
    }
}

/// A package as advertised in a `primary.xml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// The type/flavor of a package, e.g. `rpm`.
    #[serde(rename = "type")]
    pub package_type: String,
    pub name: String,
    /// The machine architecture the package is targeting.
    pub arch: String,
    pub version: PackageVersion,
    /// Content digest of the package file.
    pub checksum: PrimaryChecksum,
    pub summary: String,
    pub description: String,
    pub packager: Option<String>,
    pub url: Option<String>,
    pub time: PackageTime,
    pub size: PackageSize,
    /// Where the package file can be retrieved from, relative to the
    /// repository root.
    pub location: Location,
    pub format: Option<PackageFormat>,
}

/// Describes a package's `epoch:version-release`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PackageVersion {
    pub epoch: u64,
    #[serde(rename = "ver")]
    pub version: String,
    #[serde(rename = "rel")]
    pub release: String,
}

/// Describes the content checksum of a package file.
///
/// Distinct from [Checksum] (the `repomd.xml` variant) because `primary.xml`
/// additionally carries a `pkgid` attribute marking the digest used as the
/// package's unique identifier within the repository.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PrimaryChecksum {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(rename = "$value")]
    pub value: String,
    #[serde(rename = "pkgid")]
    pub pkg_id: Option<String>,
}

/// Times associated with a package.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PackageTime {
    pub file: u64,
    pub build: u64,
}

/// Sizes associated with a package.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PackageSize {
    pub package: u64,
    pub installed: u64,
    pub archive: u64,
}

/// Additional metadata about a package, taken from its RPM header.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PackageFormat {
    pub license: Option<String>,
    pub vendor: Option<String>,
    pub group: Option<String>,
    #[serde(rename = "buildhost")]
    pub build_host: Option<String>,
    /// Name of the source RPM this binary package was built from.
    #[serde(rename = "sourcerpm")]
    pub source_rpm: Option<String>,
    #[serde(rename = "header-range")]
    pub header_range: Option<HeaderRange>,
    pub provides: Option<Entries>,
    pub obsoletes: Option<Entries>,
    pub requires: Option<Entries>,
    pub conflicts: Option<Entries>,
    pub suggests: Option<Entries>,
    pub recommends: Option<Entries>,
    pub supplements: Option<Entries>,
    #[serde(default, rename = "file")]
    pub files: Vec<FileEntry>,
}

/// The byte range of a package's header within its RPM file.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HeaderRange {
    pub start: u64,
    pub end: u64,
}

/// A collection of [PackageEntry], e.g. a package's `<provides>` list.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Entries {
    #[serde(rename = "entry")]
    pub entries: Vec<PackageEntry>,
}

/// Describes a package relationship (dependency, provide, obsolete, ...).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PackageEntry {
    pub name: String,
    /// Version comparison flags, e.g. `GE`, `EQ`.
    pub flags: Option<String>,
    pub epoch: Option<u64>,
    #[serde(rename = "ver")]
    pub version: Option<String>,
    #[serde(rename = "rel")]
    pub release: Option<String>,
    pub pre: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FileEntry {
    /// Missing value implies a regular file.
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    #[serde(rename = "$value")]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPOMD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <revision>1234567890</revision>
  <data type="primary">
    <checksum type="sha256">abcd1234</checksum>
    <open-checksum type="sha256">deadbeef</open-checksum>
    <location href="repodata/abcd1234-primary.xml.gz"/>
    <timestamp>1234567890</timestamp>
    <size>100</size>
    <open-size>500</open-size>
  </data>
</repomd>"#;

    #[test]
    fn repomd_parses_and_finds_primary() {
        let repomd = RepoMd::from_xml(REPOMD_XML).unwrap();
        assert_eq!(repomd.revision, "1234567890");
        let data = repomd.find("primary").unwrap();
        assert_eq!(data.location.href, "repodata/abcd1234-primary.xml.gz");
        assert_eq!(data.checksum.name, "sha256");

        assert!(matches!(
            repomd.find("filelists"),
            Err(YumError::MetadataFileNotFound("filelists"))
        ));
    }

    const PRIMARY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" packages="1">
  <package type="rpm">
    <name>bash</name>
    <arch>x86_64</arch>
    <version epoch="0" ver="5.1.8" rel="4.el9"/>
    <checksum type="sha256" pkgid="YES">cafebabe</checksum>
    <summary>The GNU Bourne Again shell</summary>
    <description>Bash is the shell.</description>
    <packager>Fedora Project</packager>
    <url>https://www.gnu.org/software/bash</url>
    <time file="1620000000" build="1610000000"/>
    <size package="1000" installed="5000" archive="6000"/>
    <location href="Packages/b/bash-5.1.8-4.el9.x86_64.rpm"/>
  </package>
</metadata>"#;

    #[test]
    fn primary_parses_package() {
        let primary = Primary::from_xml(PRIMARY_XML).unwrap();
        assert_eq!(primary.count, 1);
        let pkg = &primary.packages[0];
        assert_eq!(pkg.name, "bash");
        assert_eq!(pkg.version.version, "5.1.8");
        assert_eq!(pkg.version.release, "4.el9");
        assert_eq!(pkg.checksum.pkg_id.as_deref(), Some("YES"));
        assert_eq!(pkg.location.href, "Packages/b/bash-5.1.8-4.el9.x86_64.rpm");
    }
}
